//! Per-player deferred center-text announcements.
//!
//! The host stops showing center text unless it is re-sent, so active
//! messages are replayed once per tick until their expiry task fires.
//! Posting a new message for a player cancels and replaces the previous
//! expiry so nothing double-fires.

use anthem_event_system::{Messenger, PlayerDirectory, PlayerId, ScheduledHandle, Scheduler};
use dashmap::DashMap;
use std::sync::Arc;

struct OverlayEntry {
    message: String,
    expiry: Arc<dyn ScheduledHandle>,
}

#[derive(Clone, Default)]
pub struct OverlayBoard {
    entries: Arc<DashMap<PlayerId, OverlayEntry>>,
}

impl OverlayBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows `message` to `player` for `duration_secs`. A zero duration
    /// or blank message clears any active entry instead.
    pub fn post(
        &self,
        scheduler: &dyn Scheduler,
        player: PlayerId,
        message: String,
        duration_secs: u64,
    ) {
        // Cancel-and-replace: the old expiry must never fire for the new
        // message.
        if let Some((_, previous)) = self.entries.remove(&player) {
            previous.expiry.cancel();
        }

        if duration_secs == 0 || message.trim().is_empty() {
            return;
        }

        let entries = Arc::clone(&self.entries);
        let expiry = scheduler.delay_seconds(
            duration_secs,
            Box::new(move || {
                entries.remove(&player);
            }),
        );

        self.entries.insert(player, OverlayEntry { message, expiry });
    }

    /// Drops a player's entry, cancelling its expiry. Used on disconnect.
    pub fn clear(&self, player: PlayerId) {
        if let Some((_, entry)) = self.entries.remove(&player) {
            entry.expiry.cancel();
        }
    }

    /// Re-sends every active message; called once per tick. Entries for
    /// players that are no longer valid are evicted.
    pub fn render_tick(&self, players: &dyn PlayerDirectory, messenger: &dyn Messenger) {
        if self.entries.is_empty() {
            return;
        }

        let stale: Vec<PlayerId> = self
            .entries
            .iter()
            .filter(|entry| !players.is_valid(*entry.key()))
            .map(|entry| *entry.key())
            .collect();
        for player in stale {
            self.clear(player);
        }

        for entry in self.entries.iter() {
            messenger.send_center_text(*entry.key(), &entry.value().message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FlagHandle {
        cancelled: AtomicBool,
    }

    impl ScheduledHandle for FlagHandle {
        fn cancel(&self) {
            self.cancelled.store(true, Ordering::SeqCst);
        }
    }

    /// Scheduler that parks delayed tasks until the test fires them.
    #[derive(Default)]
    struct ParkedScheduler {
        delayed: Mutex<Vec<(Arc<FlagHandle>, Box<dyn FnOnce() + Send>)>>,
    }

    impl ParkedScheduler {
        fn fire_pending(&self) {
            let tasks: Vec<_> = self.delayed.lock().unwrap().drain(..).collect();
            for (handle, task) in tasks {
                if !handle.cancelled.load(Ordering::SeqCst) {
                    task();
                }
            }
        }

        fn scheduled_count(&self) -> usize {
            self.delayed.lock().unwrap().len()
        }
    }

    impl Scheduler for ParkedScheduler {
        fn next_tick(&self, task: Box<dyn FnOnce() + Send>) {
            task();
        }
        fn next_world_update(&self, task: Box<dyn FnOnce() + Send>) {
            task();
        }
        fn delay_seconds(
            &self,
            _seconds: u64,
            task: Box<dyn FnOnce() + Send>,
        ) -> Arc<dyn ScheduledHandle> {
            let handle = Arc::new(FlagHandle { cancelled: AtomicBool::new(false) });
            self.delayed.lock().unwrap().push((Arc::clone(&handle), task));
            handle
        }
    }

    struct EveryoneValid;
    impl PlayerDirectory for EveryoneValid {
        fn valid_players(&self) -> Vec<PlayerId> {
            vec![]
        }
        fn is_valid(&self, _player: PlayerId) -> bool {
            true
        }
        fn display_name(&self, _player: PlayerId) -> Option<String> {
            None
        }
        fn suppress_builtin_mvp(&self, _player: PlayerId) {}
    }

    #[derive(Default)]
    struct CountingMessenger {
        center_sends: AtomicUsize,
    }

    impl Messenger for CountingMessenger {
        fn send_chat(&self, _player: PlayerId, _text: &str) {}
        fn send_center_text(&self, _player: PlayerId, _text: &str) {
            self.center_sends.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn reposting_cancels_the_previous_expiry() {
        let scheduler = ParkedScheduler::default();
        let board = OverlayBoard::new();
        let player = PlayerId(1);

        board.post(&scheduler, player, "first".into(), 10);
        board.post(&scheduler, player, "second".into(), 10);

        assert_eq!(board.len(), 1);
        assert_eq!(scheduler.scheduled_count(), 2);

        // Only the second expiry may act; the first was cancelled and
        // must not remove the replacement entry early.
        scheduler.fire_pending();
        assert!(board.is_empty());
    }

    #[test]
    fn expiry_removes_the_entry() {
        let scheduler = ParkedScheduler::default();
        let board = OverlayBoard::new();

        board.post(&scheduler, PlayerId(1), "mvp!".into(), 5);
        assert_eq!(board.len(), 1);

        scheduler.fire_pending();
        assert!(board.is_empty());
    }

    #[test]
    fn zero_duration_clears_instead_of_posting() {
        let scheduler = ParkedScheduler::default();
        let board = OverlayBoard::new();

        board.post(&scheduler, PlayerId(1), "mvp!".into(), 10);
        board.post(&scheduler, PlayerId(1), "mvp!".into(), 0);
        assert!(board.is_empty());
    }

    #[test]
    fn render_tick_resends_active_messages() {
        let scheduler = ParkedScheduler::default();
        let board = OverlayBoard::new();
        let messenger = CountingMessenger::default();

        board.post(&scheduler, PlayerId(1), "one".into(), 10);
        board.post(&scheduler, PlayerId(2), "two".into(), 10);

        board.render_tick(&EveryoneValid, &messenger);
        board.render_tick(&EveryoneValid, &messenger);
        assert_eq!(messenger.center_sends.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn render_tick_evicts_invalid_players() {
        struct NobodyValid;
        impl PlayerDirectory for NobodyValid {
            fn valid_players(&self) -> Vec<PlayerId> {
                vec![]
            }
            fn is_valid(&self, _player: PlayerId) -> bool {
                false
            }
            fn display_name(&self, _player: PlayerId) -> Option<String> {
                None
            }
            fn suppress_builtin_mvp(&self, _player: PlayerId) {}
        }

        let scheduler = ParkedScheduler::default();
        let board = OverlayBoard::new();
        let messenger = CountingMessenger::default();

        board.post(&scheduler, PlayerId(1), "one".into(), 10);
        board.render_tick(&NobodyValid, &messenger);

        assert!(board.is_empty());
        assert_eq!(messenger.center_sends.load(Ordering::SeqCst), 0);
    }
}
