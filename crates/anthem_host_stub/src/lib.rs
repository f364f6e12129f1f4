//! In-memory implementations of every host capability.
//!
//! Used by the plugin's integration tests and by the demo server binary.
//! Each stub records what was asked of it so tests can assert on ordering
//! and content; the scheduler is pumped manually so deferred work runs at
//! a point the caller controls.

use anthem_event_system::{
    AudioOutput, CapabilityRegistry, CommandHandler, CommandId, CommandInvocation,
    CommandRegistry, CookieStore, MenuHost, MenuSpec, Messenger, PermissionOracle,
    PlayerDirectory, PlayerId, ScheduledHandle, Scheduler, SoundRequest, Translator,
};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::trace;

// ============================================================================
// Cookies
// ============================================================================

#[derive(Debug, Clone)]
enum CookieValue {
    Text(String),
    Number(f32),
    Flag(bool),
}

/// Cookie store over a shared map, counting flushes per player.
#[derive(Default)]
pub struct MemoryCookieStore {
    values: DashMap<(PlayerId, String), CookieValue>,
    saves: DashMap<PlayerId, u64>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `save` ran for the player.
    pub fn save_count(&self, player: PlayerId) -> u64 {
        self.saves.get(&player).map(|count| *count).unwrap_or(0)
    }
}

impl CookieStore for MemoryCookieStore {
    fn load(&self, player: PlayerId) {
        trace!(%player, "cookie load");
    }

    fn get_string(&self, player: PlayerId, key: &str) -> Option<String> {
        match self.values.get(&(player, key.to_string()))?.value() {
            CookieValue::Text(value) => Some(value.clone()),
            _ => None,
        }
    }

    fn get_f32(&self, player: PlayerId, key: &str) -> Option<f32> {
        match self.values.get(&(player, key.to_string()))?.value() {
            CookieValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    fn get_bool(&self, player: PlayerId, key: &str) -> Option<bool> {
        match self.values.get(&(player, key.to_string()))?.value() {
            CookieValue::Flag(value) => Some(*value),
            _ => None,
        }
    }

    fn set_string(&self, player: PlayerId, key: &str, value: &str) {
        self.values
            .insert((player, key.to_string()), CookieValue::Text(value.to_string()));
    }

    fn set_f32(&self, player: PlayerId, key: &str, value: f32) {
        self.values
            .insert((player, key.to_string()), CookieValue::Number(value));
    }

    fn set_bool(&self, player: PlayerId, key: &str, value: bool) {
        self.values
            .insert((player, key.to_string()), CookieValue::Flag(value));
    }

    fn save(&self, player: PlayerId) {
        *self.saves.entry(player).or_insert(0) += 1;
    }
}

// ============================================================================
// Permissions
// ============================================================================

/// Mutable grant table; tests grant and revoke mid-scenario.
#[derive(Default)]
pub struct StaticPermissions {
    grants: DashMap<(PlayerId, String), ()>,
}

impl StaticPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, player: PlayerId, permission: &str) {
        self.grants.insert((player, permission.to_string()), ());
    }

    pub fn revoke(&self, player: PlayerId, permission: &str) {
        self.grants.remove(&(player, permission.to_string()));
    }
}

impl PermissionOracle for StaticPermissions {
    fn has_permission(&self, player: PlayerId, permission: &str) -> bool {
        self.grants.contains_key(&(player, permission.to_string()))
    }
}

// ============================================================================
// Audio
// ============================================================================

#[derive(Default)]
pub struct RecordingAudio {
    submitted: Mutex<Vec<SoundRequest>>,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_submitted(&self) -> Vec<SoundRequest> {
        self.submitted.lock().map(|mut s| s.drain(..).collect()).unwrap_or_default()
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl AudioOutput for RecordingAudio {
    fn submit(&self, request: SoundRequest) {
        if let Ok(mut submitted) = self.submitted.lock() {
            submitted.push(request);
        }
    }
}

// ============================================================================
// Scheduler
// ============================================================================

pub struct StubHandle {
    cancelled: AtomicBool,
}

impl StubHandle {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl ScheduledHandle for StubHandle {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

type Task = Box<dyn FnOnce() + Send>;

struct Delayed {
    remaining_secs: u64,
    handle: Arc<StubHandle>,
    task: Task,
}

/// Scheduler whose queues only drain when the caller pumps them.
#[derive(Default)]
pub struct ManualScheduler {
    tick_tasks: Mutex<Vec<Task>>,
    world_tasks: Mutex<Vec<Task>>,
    delayed: Mutex<Vec<Delayed>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs everything queued for the next tick, including tasks those
    /// tasks queue themselves.
    pub fn run_tick_tasks(&self) {
        loop {
            let batch: Vec<Task> = match self.tick_tasks.lock() {
                Ok(mut tasks) => tasks.drain(..).collect(),
                Err(_) => return,
            };
            if batch.is_empty() {
                return;
            }
            for task in batch {
                task();
            }
        }
    }

    pub fn run_world_updates(&self) {
        loop {
            let batch: Vec<Task> = match self.world_tasks.lock() {
                Ok(mut tasks) => tasks.drain(..).collect(),
                Err(_) => return,
            };
            if batch.is_empty() {
                return;
            }
            for task in batch {
                task();
            }
        }
    }

    /// Advances virtual time, firing delayed tasks that come due and were
    /// not cancelled.
    pub fn advance_seconds(&self, seconds: u64) {
        let due: Vec<Delayed> = match self.delayed.lock() {
            Ok(mut delayed) => {
                for entry in delayed.iter_mut() {
                    entry.remaining_secs = entry.remaining_secs.saturating_sub(seconds);
                }
                let (due, pending): (Vec<_>, Vec<_>) =
                    delayed.drain(..).partition(|entry| entry.remaining_secs == 0);
                *delayed = pending;
                due
            }
            Err(_) => return,
        };
        for entry in due {
            if !entry.handle.is_cancelled() {
                (entry.task)();
            }
        }
    }

    pub fn pending_delayed(&self) -> usize {
        self.delayed.lock().map(|d| d.len()).unwrap_or(0)
    }
}

impl Scheduler for ManualScheduler {
    fn next_tick(&self, task: Task) {
        if let Ok(mut tasks) = self.tick_tasks.lock() {
            tasks.push(task);
        }
    }

    fn next_world_update(&self, task: Task) {
        if let Ok(mut tasks) = self.world_tasks.lock() {
            tasks.push(task);
        }
    }

    fn delay_seconds(&self, seconds: u64, task: Task) -> Arc<dyn ScheduledHandle> {
        let handle = Arc::new(StubHandle { cancelled: AtomicBool::new(false) });
        if let Ok(mut delayed) = self.delayed.lock() {
            delayed.push(Delayed {
                remaining_secs: seconds.max(1),
                handle: Arc::clone(&handle),
                task,
            });
        }
        handle
    }
}

// ============================================================================
// Messaging and localization
// ============================================================================

#[derive(Default)]
pub struct RecordingMessenger {
    chat: Mutex<Vec<(PlayerId, String)>>,
    center: Mutex<Vec<(PlayerId, String)>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_chat(&self) -> Vec<(PlayerId, String)> {
        self.chat.lock().map(|mut c| c.drain(..).collect()).unwrap_or_default()
    }

    pub fn take_center(&self) -> Vec<(PlayerId, String)> {
        self.center.lock().map(|mut c| c.drain(..).collect()).unwrap_or_default()
    }
}

impl Messenger for RecordingMessenger {
    fn send_chat(&self, player: PlayerId, text: &str) {
        if let Ok(mut chat) = self.chat.lock() {
            chat.push((player, text.to_string()));
        }
    }

    fn send_center_text(&self, player: PlayerId, text: &str) {
        if let Ok(mut center) = self.center.lock() {
            center.push((player, text.to_string()));
        }
    }
}

/// Translator that renders `key` plus args in a fixed shape so tests can
/// assert on exact output without a real locale catalog.
pub struct KeyTranslator;

impl Translator for KeyTranslator {
    fn text(&self, _player: PlayerId, key: &str, args: &[&str]) -> String {
        if args.is_empty() {
            key.to_string()
        } else {
            format!("{key}({})", args.join(","))
        }
    }
}

// ============================================================================
// Menus
// ============================================================================

#[derive(Default)]
pub struct RecordingMenuHost {
    opened: Mutex<Vec<(PlayerId, MenuSpec)>>,
}

impl RecordingMenuHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened_count(&self) -> usize {
        self.opened.lock().map(|o| o.len()).unwrap_or(0)
    }

    /// Most recently opened menu for a player, removed from the record.
    pub fn take_last_for(&self, player: PlayerId) -> Option<MenuSpec> {
        let mut opened = self.opened.lock().ok()?;
        let index = opened.iter().rposition(|(p, _)| *p == player)?;
        Some(opened.remove(index).1)
    }
}

impl MenuHost for RecordingMenuHost {
    fn open_menu(&self, player: PlayerId, menu: MenuSpec) {
        if let Ok(mut opened) = self.opened.lock() {
            opened.push((player, menu));
        }
    }
}

// ============================================================================
// Players
// ============================================================================

#[derive(Default)]
pub struct MemoryPlayers {
    names: DashMap<PlayerId, String>,
    suppressed: Mutex<Vec<PlayerId>>,
}

impl MemoryPlayers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, player: PlayerId, name: &str) {
        self.names.insert(player, name.to_string());
    }

    pub fn leave(&self, player: PlayerId) {
        self.names.remove(&player);
    }

    pub fn suppressed(&self) -> Vec<PlayerId> {
        self.suppressed.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl PlayerDirectory for MemoryPlayers {
    fn valid_players(&self) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = self.names.iter().map(|entry| *entry.key()).collect();
        players.sort_by_key(|player| player.as_u64());
        players
    }

    fn is_valid(&self, player: PlayerId) -> bool {
        self.names.contains_key(&player)
    }

    fn display_name(&self, player: PlayerId) -> Option<String> {
        self.names.get(&player).map(|name| name.value().clone())
    }

    fn suppress_builtin_mvp(&self, player: PlayerId) {
        if let Ok(mut suppressed) = self.suppressed.lock() {
            suppressed.push(player);
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Default)]
pub struct StubCommands {
    next_id: AtomicU64,
    by_name: DashMap<String, CommandId>,
    handlers: DashMap<CommandId, (String, CommandHandler)>,
}

impl StubCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatches a command as if a player (or console) typed it.
    pub fn invoke(&self, name: &str, invocation: CommandInvocation) -> bool {
        let Some(id) = self.by_name.get(name).map(|id| *id) else {
            return false;
        };
        let Some(entry) = self.handlers.get(&id) else {
            return false;
        };
        let handler = Arc::clone(&entry.value().1);
        drop(entry);
        handler(&invocation);
        true
    }

    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_name.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl CommandRegistry for StubCommands {
    fn is_registered(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    fn register(&self, name: &str, handler: CommandHandler) -> CommandId {
        let id = CommandId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.by_name.insert(name.to_string(), id);
        self.handlers.insert(id, (name.to_string(), handler));
        id
    }

    fn unregister(&self, id: CommandId) {
        if let Some((_, (name, _))) = self.handlers.remove(&id) {
            self.by_name.remove(&name);
        }
    }
}

// ============================================================================
// Assembly
// ============================================================================

/// The whole stub host, with typed handles kept alongside the registered
/// capabilities so callers can drive and inspect them.
pub struct StubHost {
    pub cookies: Arc<MemoryCookieStore>,
    pub permissions: Arc<StaticPermissions>,
    pub audio: Arc<RecordingAudio>,
    pub scheduler: Arc<ManualScheduler>,
    pub messenger: Arc<RecordingMessenger>,
    pub menus: Arc<RecordingMenuHost>,
    pub players: Arc<MemoryPlayers>,
    pub commands: Arc<StubCommands>,
}

impl StubHost {
    pub fn new() -> Self {
        Self {
            cookies: Arc::new(MemoryCookieStore::new()),
            permissions: Arc::new(StaticPermissions::new()),
            audio: Arc::new(RecordingAudio::new()),
            scheduler: Arc::new(ManualScheduler::new()),
            messenger: Arc::new(RecordingMessenger::new()),
            menus: Arc::new(RecordingMenuHost::new()),
            players: Arc::new(MemoryPlayers::new()),
            commands: Arc::new(StubCommands::new()),
        }
    }

    /// Publishes every capability under its current key.
    pub fn provide_all(&self, registry: &CapabilityRegistry) {
        registry.provide::<dyn CookieStore>("cookies.player.v1", self.cookies.clone());
        registry.provide::<dyn PermissionOracle>("permissions.v1", self.permissions.clone());
        registry.provide::<dyn AudioOutput>("audio.v1", self.audio.clone());
        registry.provide::<dyn Scheduler>("scheduler.v1", self.scheduler.clone());
        registry.provide::<dyn Messenger>("messenger.v1", self.messenger.clone());
        registry.provide::<dyn Translator>("translator.v1", Arc::new(KeyTranslator));
        registry.provide::<dyn MenuHost>("menus.v1", self.menus.clone());
        registry.provide::<dyn PlayerDirectory>("players.v1", self.players.clone());
        registry.provide::<dyn CommandRegistry>("commands.v1", self.commands.clone());
    }

    /// Runs queued tick and world-update work, in that order.
    pub fn pump(&self) {
        self.scheduler.run_tick_tasks();
        self.scheduler.run_world_updates();
    }
}

impl Default for StubHost {
    fn default() -> Self {
        Self::new()
    }
}
