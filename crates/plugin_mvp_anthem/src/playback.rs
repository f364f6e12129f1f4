//! Sound submission to the host audio capability.
//!
//! Playback is fire-and-forget and deferred to the engine's next world
//! update; callers must finish any related persistence *before* handing a
//! sound to this module.

use anthem_event_system::{AudioOutput, PlayerId, Scheduler, SoundRequest, SoundSource};
use crate::preferences::clamp_volume;
use std::sync::Arc;

/// Mixing channel for the shared round-MVP anthem.
pub const ROUND_CHANNEL: &str = "mvp_anthem.round_mvp";

fn preview_channel(player: PlayerId) -> String {
    format!("mvp_anthem.preview.{player}")
}

#[derive(Clone)]
pub struct Playback {
    audio: Arc<dyn AudioOutput>,
    scheduler: Arc<dyn Scheduler>,
}

impl Playback {
    pub fn new(audio: Arc<dyn AudioOutput>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self { audio, scheduler }
    }

    /// Plays a sound to a set of listeners, each at their own volume.
    /// Blank references and empty listener sets are silently dropped.
    pub fn play_for_listeners(&self, sound_ref: &str, listeners: Vec<(PlayerId, f32)>) {
        let Some(source) = SoundSource::classify(sound_ref) else {
            return;
        };
        if listeners.is_empty() {
            return;
        }

        let request = SoundRequest {
            source,
            channel: ROUND_CHANNEL.to_string(),
            listeners: listeners
                .into_iter()
                .map(|(player, volume)| (player, clamp_volume(volume)))
                .collect(),
        };

        let audio = Arc::clone(&self.audio);
        self.scheduler
            .next_world_update(Box::new(move || audio.submit(request)));
    }

    /// Plays a preview to one player only, on a per-player channel so it
    /// never interferes with a concurrent round anthem.
    pub fn play_preview(&self, player: PlayerId, sound_ref: &str, volume: f32) {
        let Some(source) = SoundSource::classify(sound_ref) else {
            return;
        };

        let request = SoundRequest {
            source,
            channel: preview_channel(player),
            listeners: vec![(player, clamp_volume(volume))],
        };

        let audio = Arc::clone(&self.audio);
        self.scheduler
            .next_world_update(Box::new(move || audio.submit(request)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anthem_event_system::ScheduledHandle;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingAudio {
        submitted: Mutex<Vec<SoundRequest>>,
    }

    impl AudioOutput for RecordingAudio {
        fn submit(&self, request: SoundRequest) {
            self.submitted.lock().unwrap().push(request);
        }
    }

    struct NoopHandle;
    impl ScheduledHandle for NoopHandle {
        fn cancel(&self) {}
    }

    /// Runs world-update tasks inline so tests observe submissions
    /// immediately.
    struct InlineScheduler;

    impl Scheduler for InlineScheduler {
        fn next_tick(&self, task: Box<dyn FnOnce() + Send>) {
            task();
        }
        fn next_world_update(&self, task: Box<dyn FnOnce() + Send>) {
            task();
        }
        fn delay_seconds(
            &self,
            _seconds: u64,
            _task: Box<dyn FnOnce() + Send>,
        ) -> Arc<dyn ScheduledHandle> {
            Arc::new(NoopHandle)
        }
    }

    fn playback() -> (Arc<RecordingAudio>, Playback) {
        let audio = Arc::new(RecordingAudio::default());
        let playback = Playback::new(audio.clone(), Arc::new(InlineScheduler));
        (audio, playback)
    }

    #[test]
    fn submits_clamped_per_listener_volumes() {
        let (audio, playback) = playback();
        playback.play_for_listeners(
            "win.mp3",
            vec![(PlayerId(1), 0.4), (PlayerId(2), 7.0), (PlayerId(3), -1.0)],
        );

        let submitted = audio.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].channel, ROUND_CHANNEL);
        assert_eq!(submitted[0].source, SoundSource::FilePath("win.mp3".into()));
        assert_eq!(
            submitted[0].listeners,
            vec![(PlayerId(1), 0.4), (PlayerId(2), 1.0), (PlayerId(3), 0.0)]
        );
    }

    #[test]
    fn blank_sound_or_no_listeners_submits_nothing() {
        let (audio, playback) = playback();
        playback.play_for_listeners("", vec![(PlayerId(1), 0.5)]);
        playback.play_for_listeners("win.mp3", vec![]);
        assert!(audio.submitted.lock().unwrap().is_empty());
    }

    #[test]
    fn preview_uses_a_per_player_channel() {
        let (audio, playback) = playback();
        playback.play_preview(PlayerId(9), "Anthem.Victory", 0.3);

        let submitted = audio.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].channel, "mvp_anthem.preview.9");
        assert_eq!(
            submitted[0].source,
            SoundSource::EventName("Anthem.Victory".into())
        );
        assert_eq!(submitted[0].listeners, vec![(PlayerId(9), 0.3)]);
    }
}
