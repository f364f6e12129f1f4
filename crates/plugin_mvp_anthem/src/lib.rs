//! Per-round MVP anthem plugin.
//!
//! Players pick a permission-gated MVP template through a chat-command
//! menu; when the host crowns a round MVP the plugin plays that player's
//! anthem to everyone at each listener's own volume, announces it in chat
//! and center text, and persists preferences through the host cookie
//! capability.
//!
//! All host integration goes through capabilities resolved at startup. If
//! a required capability is missing the plugin logs a warning and stays
//! loaded but inert.

pub mod access;
pub mod config;
pub mod menu;
pub mod overlay;
pub mod playback;
pub mod preferences;
pub mod reconcile;
pub mod resolve;
pub mod runtime;

use crate::config::AnthemConfig;
use crate::overlay::OverlayBoard;
use crate::playback::Playback;
use crate::preferences::PreferenceStore;
use crate::resolve::resolve_effective;
use crate::runtime::AnthemRuntime;
use anthem_event_system::{
    AudioOutput, CommandId, CommandRegistry, CookieStore, EventSystem, HostContext, MenuHost,
    Messenger, PermissionOracle, PlayerConnectedEvent, PlayerDirectory, PlayerDisconnectedEvent,
    PlayerId, PluginError, RoundMvpEvent, Scheduler, ServerTickEvent, SimplePlugin, Translator,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub const PLUGIN_NAME: &str = "mvp_anthem";
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const CONFIG_FILE: &str = "mvp_anthem.toml";

/// Capability keys in resolution order. The second entry, where present,
/// is the key older host builds published the same capability under.
pub mod capability_keys {
    pub const COOKIES: &[&str] = &["cookies.player.v1", "Cookies.Player.V1"];
    pub const AUDIO: &[&str] = &["audio.v1", "audio"];
    pub const SCHEDULER: &[&str] = &["scheduler.v1"];
    pub const MENUS: &[&str] = &["menus.v1"];
    pub const MESSENGER: &[&str] = &["messenger.v1"];
    pub const TRANSLATOR: &[&str] = &["translator.v1"];
    pub const PLAYERS: &[&str] = &["players.v1"];
    pub const COMMANDS: &[&str] = &["commands.v1"];
    pub const PERMISSIONS: &[&str] = &["permissions.v1"];
}

/// Emitted after a round anthem has been announced, for other plugins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthemPlayedEvent {
    pub player_id: PlayerId,
    pub template: String,
    pub sound: String,
    pub listeners: usize,
    pub round: u32,
    pub timestamp: u64,
}

pub struct MvpAnthemPlugin {
    runtime: Option<Arc<AnthemRuntime>>,
    command_ids: Mutex<Vec<CommandId>>,
}

impl MvpAnthemPlugin {
    pub fn new() -> Self {
        Self {
            runtime: None,
            command_ids: Mutex::new(Vec::new()),
        }
    }

    /// Handle to the assembled runtime, present only when every required
    /// capability resolved.
    pub fn runtime(&self) -> Option<Arc<AnthemRuntime>> {
        self.runtime.clone()
    }

    async fn bind(&mut self, context: &HostContext) -> Result<Option<Arc<AnthemRuntime>>, PluginError> {
        let capabilities = context.capabilities();

        macro_rules! require {
            ($trait_ty:ty, $keys:expr) => {
                match capabilities.resolve::<$trait_ty>($keys) {
                    Some(handle) => handle,
                    None => {
                        warn!(
                            keys = ?$keys,
                            "required capability missing, mvp anthem stays disabled"
                        );
                        return Ok(None);
                    }
                }
            };
        }

        let cookies = require!(dyn CookieStore, capability_keys::COOKIES);
        let audio = require!(dyn AudioOutput, capability_keys::AUDIO);
        let scheduler = require!(dyn Scheduler, capability_keys::SCHEDULER);
        let menus = require!(dyn MenuHost, capability_keys::MENUS);
        let messenger = require!(dyn Messenger, capability_keys::MESSENGER);
        let translator = require!(dyn Translator, capability_keys::TRANSLATOR);
        let players = require!(dyn PlayerDirectory, capability_keys::PLAYERS);
        let commands = require!(dyn CommandRegistry, capability_keys::COMMANDS);
        let permissions = require!(dyn PermissionOracle, capability_keys::PERMISSIONS);

        let config_path = context.plugin_data_dir().join(CONFIG_FILE);
        let config = AnthemConfig::load_or_create(&config_path)
            .await
            .map_err(|e| PluginError::InitializationFailed(e.to_string()))?;

        if !config.settings.sound_event_files.is_empty() {
            info!(
                files = ?config.settings.sound_event_files,
                "soundevent files requested for precache"
            );
        }

        Ok(Some(Arc::new(AnthemRuntime {
            config,
            permissions,
            prefs: PreferenceStore::new(cookies),
            playback: Playback::new(audio, Arc::clone(&scheduler)),
            scheduler,
            menus,
            messenger,
            translator,
            players,
            commands,
            overlay: OverlayBoard::new(),
        })))
    }
}

impl Default for MvpAnthemPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SimplePlugin for MvpAnthemPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn version(&self) -> &str {
        PLUGIN_VERSION
    }

    async fn register_handlers(
        &mut self,
        events: Arc<EventSystem>,
        context: Arc<HostContext>,
    ) -> Result<(), PluginError> {
        let Some(runtime) = self.bind(&context).await? else {
            return Ok(());
        };
        self.runtime = Some(Arc::clone(&runtime));

        let map_err = |e: anthem_event_system::EventError| {
            PluginError::InitializationFailed(e.to_string())
        };

        {
            let runtime = Arc::clone(&runtime);
            events
                .on_core("player_connected", move |event: PlayerConnectedEvent| {
                    handle_player_connected(&runtime, event.player_id);
                    Ok(())
                })
                .await
                .map_err(map_err)?;
        }

        {
            let runtime = Arc::clone(&runtime);
            let events_out = Arc::clone(&events);
            events
                .on_core("round_mvp", move |event: RoundMvpEvent| {
                    handle_round_mvp(&runtime, &events_out, event.player_id, event.round);
                    Ok(())
                })
                .await
                .map_err(map_err)?;
        }

        {
            let runtime = Arc::clone(&runtime);
            events
                .on_core("server_tick", move |_: ServerTickEvent| {
                    runtime
                        .overlay
                        .render_tick(runtime.players.as_ref(), runtime.messenger.as_ref());
                    Ok(())
                })
                .await
                .map_err(map_err)?;
        }

        {
            let runtime = Arc::clone(&runtime);
            events
                .on_core("player_disconnected", move |event: PlayerDisconnectedEvent| {
                    runtime.overlay.clear(event.player_id);
                    Ok(())
                })
                .await
                .map_err(map_err)?;
        }

        info!(version = PLUGIN_VERSION, "mvp anthem handlers registered");
        Ok(())
    }

    async fn on_init(&mut self, _context: Arc<HostContext>) -> Result<(), PluginError> {
        let Some(runtime) = &self.runtime else {
            return Ok(());
        };

        let mut ids = self.command_ids.lock().map_err(|_| {
            PluginError::InitializationFailed("command id lock poisoned".to_string())
        })?;
        for command in &runtime.config.settings.commands {
            let command = command.trim();
            if command.is_empty() {
                continue;
            }
            if runtime.commands.is_registered(command) {
                warn!(command, "command already registered elsewhere, skipping");
                continue;
            }
            let runtime_for_command = Arc::clone(runtime);
            let id = runtime.commands.register(
                command,
                Arc::new(move |invocation: &anthem_event_system::CommandInvocation| {
                    let Some(player) = invocation.sender else {
                        return;
                    };
                    menu::open_main_menu(&runtime_for_command, player);
                }),
            );
            debug!(command, "menu command registered");
            ids.push(id);
        }

        Ok(())
    }

    async fn on_shutdown(&mut self, _context: Arc<HostContext>) -> Result<(), PluginError> {
        if let Some(runtime) = &self.runtime {
            let ids: Vec<CommandId> = match self.command_ids.lock() {
                Ok(mut guard) => guard.drain(..).collect(),
                Err(_) => Vec::new(),
            };
            for id in ids {
                runtime.commands.unregister(id);
            }
        }
        info!("mvp anthem shut down");
        Ok(())
    }
}

fn handle_player_connected(runtime: &Arc<AnthemRuntime>, player: PlayerId) {
    let mut preference = runtime.prefs.load(player);
    if reconcile::reconcile_on_connect(
        &runtime.config,
        runtime.permissions.as_ref(),
        &mut preference,
    ) {
        runtime.prefs.save(&preference);
        debug!(%player, "preference record reconciled on connect");
    }
}

fn handle_round_mvp(
    runtime: &Arc<AnthemRuntime>,
    events: &Arc<EventSystem>,
    player: PlayerId,
    round: u32,
) {
    if !runtime.players.is_valid(player) {
        return;
    }
    if runtime.config.settings.remove_builtin_mvp {
        runtime.players.suppress_builtin_mvp(player);
    }

    let mut preference = runtime.prefs.load(player);
    let Some(resolution) =
        resolve_effective(&runtime.config, runtime.permissions.as_ref(), player, &preference)
    else {
        debug!(%player, "round mvp resolved to no anthem");
        return;
    };

    // Persistence strictly precedes playback so a crash mid-round never
    // loses a repaired cache.
    if reconcile::repair_sound_cache(&mut preference, &resolution) {
        runtime.prefs.save(&preference);
    }

    let listeners = runtime.listener_volumes();
    let listener_count = listeners.len();
    if !resolution.sound.trim().is_empty() {
        runtime.playback.play_for_listeners(&resolution.sound, listeners);
    }

    let mvp_name = runtime.player_name(player);

    if resolution.template.show_chat {
        let chat_key = format!("{}.chat", resolution.name);
        for listener in runtime.players.valid_players() {
            runtime.send_prefixed_chat(listener, &chat_key, vec![mvp_name.clone()]);
        }
    }

    let duration = runtime.config.settings.center_text_duration_secs;
    if resolution.template.show_center_text && duration > 0 {
        let html_key = format!("{}.html", resolution.name);
        for listener in runtime.players.valid_players() {
            let message = runtime.translator.text(listener, &html_key, &[&mvp_name]);
            runtime
                .overlay
                .post(runtime.scheduler.as_ref(), listener, message, duration);
        }
    }

    info!(%player, round, template = %resolution.name, via_random = resolution.via_random,
        "round mvp anthem played");

    let played = AnthemPlayedEvent {
        player_id: player,
        template: resolution.name.clone(),
        sound: resolution.sound.clone(),
        listeners: listener_count,
        round,
        timestamp: anthem_event_system::current_timestamp(),
    };
    let events = Arc::clone(events);
    tokio::spawn(async move {
        if let Err(e) = events.emit_plugin(PLUGIN_NAME, "anthem_played", &played).await {
            warn!("failed to emit anthem_played: {e}");
        }
    });
}
