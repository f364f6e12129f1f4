//! Collaborator interfaces and the plugin lifecycle contract.
//!
//! Every subsystem the host owns is a trait here: plugins consume these as
//! black boxes and never see the implementations. Handles are bound once
//! through the [`CapabilityRegistry`](crate::CapabilityRegistry) and passed
//! around explicitly.

use crate::bus::EventSystem;
use crate::capability::CapabilityRegistry;
use crate::types::PlayerId;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ============================================================================
// Permissions
// ============================================================================

/// Named-permission lookups against the host's admin/permission system.
pub trait PermissionOracle: Send + Sync {
    fn has_permission(&self, player: PlayerId, permission: &str) -> bool;
}

// ============================================================================
// Per-player persistence (cookies)
// ============================================================================

/// Per-player key/value persistence.
///
/// Reads return `None` for keys that were never written; callers default
/// them. Writes are staged per player and flushed by `save`, which may be
/// deferred by the host. No ordering is guaranteed between a `save` and a
/// later read in the same logical step.
pub trait CookieStore: Send + Sync {
    fn load(&self, player: PlayerId);
    fn get_string(&self, player: PlayerId, key: &str) -> Option<String>;
    fn get_f32(&self, player: PlayerId, key: &str) -> Option<f32>;
    fn get_bool(&self, player: PlayerId, key: &str) -> Option<bool>;
    fn set_string(&self, player: PlayerId, key: &str, value: &str);
    fn set_f32(&self, player: PlayerId, key: &str, value: f32);
    fn set_bool(&self, player: PlayerId, key: &str, value: bool);
    fn save(&self, player: PlayerId);
}

// ============================================================================
// Audio
// ============================================================================

/// File extensions the engine can decode directly. Anything else in a
/// sound reference is treated as a named in-engine sound event.
pub const AUDIO_FILE_EXTENSIONS: &[&str] = &[".mp3", ".wav", ".ogg"];

/// How a sound reference should be played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundSource {
    /// Named sound event known to the engine.
    EventName(String),
    /// Relative or absolute path to a decodable audio file.
    FilePath(String),
}

impl SoundSource {
    /// Classify a raw sound reference. Blank references carry no audio.
    pub fn classify(raw: &str) -> Option<SoundSource> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let lower = trimmed.to_ascii_lowercase();
        if AUDIO_FILE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            Some(SoundSource::FilePath(trimmed.to_string()))
        } else {
            Some(SoundSource::EventName(trimmed.to_string()))
        }
    }
}

/// One playback submission: a source, a mixing channel, and per-listener
/// volumes already clamped by the caller.
#[derive(Debug, Clone)]
pub struct SoundRequest {
    pub source: SoundSource,
    pub channel: String,
    pub listeners: Vec<(PlayerId, f32)>,
}

/// Fire-and-forget audio playback. The host defers actual emission to its
/// next safe update boundary; there is no result and no ordering guarantee
/// relative to later submissions for the same player.
pub trait AudioOutput: Send + Sync {
    fn submit(&self, request: SoundRequest);
}

// ============================================================================
// Scheduling
// ============================================================================

/// Handle to a scheduled task that can still be cancelled.
pub trait ScheduledHandle: Send + Sync {
    fn cancel(&self);
}

/// The host's cooperative scheduler. Tasks run on the serialized game
/// logic thread; `next_world_update` lands on the engine's next safe
/// world-mutation boundary.
pub trait Scheduler: Send + Sync {
    fn next_tick(&self, task: Box<dyn FnOnce() + Send>);
    fn next_world_update(&self, task: Box<dyn FnOnce() + Send>);
    fn delay_seconds(&self, seconds: u64, task: Box<dyn FnOnce() + Send>)
        -> Arc<dyn ScheduledHandle>;
}

// ============================================================================
// Menus
// ============================================================================

pub type MenuBuilderFn = Arc<dyn Fn(PlayerId) -> MenuSpec + Send + Sync>;
pub type MenuClickFn = Arc<dyn Fn(PlayerId) + Send + Sync>;

/// A renderable menu screen. The host owns layout, input and styling;
/// plugins only supply this model.
pub struct MenuSpec {
    pub title: String,
    pub freeze_player: bool,
    pub enable_sounds: bool,
    pub options: Vec<MenuOption>,
}

pub struct MenuOption {
    pub label: String,
    pub enabled: bool,
    pub close_after_click: bool,
    pub action: MenuAction,
}

pub enum MenuAction {
    /// Informational row, not selectable.
    Static,
    /// Runs the closure with the clicking player.
    Button(MenuClickFn),
    /// Opens the menu produced by the builder.
    Submenu(MenuBuilderFn),
}

impl MenuOption {
    pub fn text(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: false,
            close_after_click: false,
            action: MenuAction::Static,
        }
    }

    pub fn button<F>(label: impl Into<String>, on_click: F) -> Self
    where
        F: Fn(PlayerId) + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            enabled: true,
            close_after_click: true,
            action: MenuAction::Button(Arc::new(on_click)),
        }
    }

    pub fn submenu<F>(label: impl Into<String>, builder: F) -> Self
    where
        F: Fn(PlayerId) -> MenuSpec + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            enabled: true,
            close_after_click: false,
            action: MenuAction::Submenu(Arc::new(builder)),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn keep_open(mut self) -> Self {
        self.close_after_click = false;
        self
    }
}

/// Renders menu models for a player.
pub trait MenuHost: Send + Sync {
    fn open_menu(&self, player: PlayerId, menu: MenuSpec);
}

// ============================================================================
// Messaging and localization
// ============================================================================

/// Per-player text delivery. Center text is shown until replaced or the
/// sender stops re-sending it; chat lines are one-shot.
pub trait Messenger: Send + Sync {
    fn send_chat(&self, player: PlayerId, text: &str);
    fn send_center_text(&self, player: PlayerId, text: &str);
}

/// Per-player localization of message keys.
pub trait Translator: Send + Sync {
    fn text(&self, player: PlayerId, key: &str, args: &[&str]) -> String;
}

// ============================================================================
// Players
// ============================================================================

/// Live-player lookups and engine-side player state tweaks.
pub trait PlayerDirectory: Send + Sync {
    fn valid_players(&self) -> Vec<PlayerId>;
    fn is_valid(&self, player: PlayerId) -> bool;
    fn display_name(&self, player: PlayerId) -> Option<String>;
    /// Clears the engine's own MVP presentation for the player so a
    /// custom effect can replace it.
    fn suppress_builtin_mvp(&self, player: PlayerId);
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(pub u64);

/// Who invoked a chat command. `sender` is `None` for the server console.
#[derive(Debug, Clone, Copy)]
pub struct CommandInvocation {
    pub sender: Option<PlayerId>,
}

pub type CommandHandler = Arc<dyn Fn(&CommandInvocation) + Send + Sync>;

pub trait CommandRegistry: Send + Sync {
    fn is_registered(&self, name: &str) -> bool;
    fn register(&self, name: &str, handler: CommandHandler) -> CommandId;
    fn unregister(&self, id: CommandId);
}

// ============================================================================
// Context and plugin lifecycle
// ============================================================================

/// Everything a plugin receives from the host at startup.
pub struct HostContext {
    events: Arc<EventSystem>,
    capabilities: Arc<CapabilityRegistry>,
    plugin_data_dir: PathBuf,
}

impl HostContext {
    pub fn new(
        events: Arc<EventSystem>,
        capabilities: Arc<CapabilityRegistry>,
        plugin_data_dir: PathBuf,
    ) -> Self {
        Self { events, capabilities, plugin_data_dir }
    }

    pub fn events(&self) -> Arc<EventSystem> {
        Arc::clone(&self.events)
    }

    pub fn capabilities(&self) -> Arc<CapabilityRegistry> {
        Arc::clone(&self.capabilities)
    }

    /// Directory the host reserves for this plugin's config and data.
    pub fn plugin_data_dir(&self) -> &Path {
        &self.plugin_data_dir
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("plugin initialization failed: {0}")]
    InitializationFailed(String),
    #[error("plugin execution error: {0}")]
    ExecutionError(String),
}

/// Plugin lifecycle: handlers are registered on every plugin before any
/// plugin runs `on_init`, so startup emissions always find their
/// listeners. `register_handlers` must not emit events or touch
/// collaborators beyond binding them.
#[async_trait]
pub trait SimplePlugin: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    async fn register_handlers(
        &mut self,
        events: Arc<EventSystem>,
        context: Arc<HostContext>,
    ) -> Result<(), PluginError>;

    async fn on_init(&mut self, _context: Arc<HostContext>) -> Result<(), PluginError> {
        Ok(())
    }

    async fn on_shutdown(&mut self, _context: Arc<HostContext>) -> Result<(), PluginError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_file_paths_by_extension() {
        assert_eq!(
            SoundSource::classify("flawless.mp3"),
            Some(SoundSource::FilePath("flawless.mp3".into()))
        );
        assert_eq!(
            SoundSource::classify("sounds/round/WIN.WAV"),
            Some(SoundSource::FilePath("sounds/round/WIN.WAV".into()))
        );
        assert_eq!(
            SoundSource::classify("Anthem.Victory"),
            Some(SoundSource::EventName("Anthem.Victory".into()))
        );
    }

    #[test]
    fn blank_references_carry_no_audio() {
        assert_eq!(SoundSource::classify(""), None);
        assert_eq!(SoundSource::classify("   "), None);
    }

    #[test]
    fn extension_match_is_suffix_only() {
        // "mp3" without the dot is a sound event name, not a file.
        assert_eq!(
            SoundSource::classify("mp3"),
            Some(SoundSource::EventName("mp3".into()))
        );
    }
}
