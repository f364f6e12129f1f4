//! Modeled surface of the host plugin runtime.
//!
//! The MVP anthem feature lives inside a game server it does not own. This
//! crate captures the slice of that runtime the plugin actually touches:
//! core lifecycle events, a typed event bus, string-keyed capability
//! injection, and the collaborator interfaces (cookies, audio, menus,
//! scheduling, messaging) the host provides.

pub mod bus;
pub mod capability;
pub mod events;
pub mod host;
pub mod types;

pub use bus::{create_event_system, EventError, EventSystem, EventSystemStats};
pub use capability::CapabilityRegistry;
pub use events::{
    PlayerConnectedEvent, PlayerDisconnectedEvent, RoundMvpEvent, ServerTickEvent,
};
pub use host::{
    AudioOutput, CommandHandler, CommandId, CommandInvocation, CommandRegistry, CookieStore,
    HostContext, MenuAction, MenuBuilderFn, MenuClickFn, MenuHost, MenuOption, MenuSpec,
    Messenger, PermissionOracle, PlayerDirectory, PluginError, ScheduledHandle, Scheduler,
    SimplePlugin, SoundRequest, SoundSource, Translator, AUDIO_FILE_EXTENSIONS,
};
pub use types::PlayerId;

/// Seconds since the unix epoch, used to stamp emitted events.
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
