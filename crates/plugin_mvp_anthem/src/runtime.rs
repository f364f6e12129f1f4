//! Bound collaborator handles plus loaded configuration.
//!
//! Assembled once at plugin startup, after capability resolution succeeds,
//! and passed explicitly into every handler and menu closure. If any
//! required capability is missing this struct is never built and the
//! feature stays disabled.

use crate::config::AnthemConfig;
use crate::overlay::OverlayBoard;
use crate::playback::Playback;
use crate::preferences::{clamp_volume, PreferenceStore};
use anthem_event_system::{
    CommandRegistry, MenuHost, Messenger, PermissionOracle, PlayerDirectory, PlayerId, Scheduler,
    Translator,
};
use std::sync::Arc;

pub struct AnthemRuntime {
    pub config: AnthemConfig,
    pub permissions: Arc<dyn PermissionOracle>,
    pub prefs: PreferenceStore,
    pub playback: Playback,
    pub scheduler: Arc<dyn Scheduler>,
    pub menus: Arc<dyn MenuHost>,
    pub messenger: Arc<dyn Messenger>,
    pub translator: Arc<dyn Translator>,
    pub players: Arc<dyn PlayerDirectory>,
    pub commands: Arc<dyn CommandRegistry>,
    pub overlay: OverlayBoard,
}

impl AnthemRuntime {
    pub fn player_name(&self, player: PlayerId) -> String {
        self.players
            .display_name(player)
            .unwrap_or_else(|| "Console".to_string())
    }

    /// Every valid player paired with their own saved volume, falling
    /// back to the configured default for players with no record.
    pub fn listener_volumes(&self) -> Vec<(PlayerId, f32)> {
        self.players
            .valid_players()
            .into_iter()
            .map(|listener| {
                let record = self.prefs.load(listener);
                // Players the plugin has never reconciled (hot-load mid
                // session) hear the configured default.
                let volume = if record.had_first_connect {
                    record.volume
                } else {
                    self.config.settings.default_volume
                };
                (listener, clamp_volume(volume))
            })
            .collect()
    }

    /// Localizes `key` for the player, prefixes it, and sends it as chat
    /// on the next safe world update.
    pub fn send_prefixed_chat(self: &Arc<Self>, player: PlayerId, key: &str, args: Vec<String>) {
        let runtime = Arc::clone(self);
        let key = key.to_string();
        self.scheduler.next_world_update(Box::new(move || {
            if !runtime.players.is_valid(player) {
                return;
            }
            let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
            let prefix = runtime.translator.text(player, "prefix", &[]);
            let message = runtime.translator.text(player, &key, &arg_refs);
            runtime.messenger.send_chat(player, &format!("{prefix} {message}"));
        }));
    }
}
