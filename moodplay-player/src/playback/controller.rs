//! Playback transport controller
//!
//! Owns the active playlist cursor, shuffle/repeat modes, transport state
//! and progress, and drives the media engine. All mutation happens on the
//! coordinator task; the controller emits state-change events on the bus
//! so UIs stay current without polling.

use std::sync::Arc;

use rand::Rng;
use tracing::{debug, warn};

use moodplay_common::events::{EventBus, MoodplayEvent, PlaybackState};
use moodplay_common::time::format_progress;
use moodplay_common::{Playlist, Track};

use crate::error::{Error, Result};
use crate::playback::engine::MediaEngine;

/// Default volume on a fresh session (0-100)
pub const DEFAULT_VOLUME: u8 = 50;

/// Transport state machine over the media engine
pub struct PlaybackController {
    engine: Box<dyn MediaEngine>,
    bus: Arc<EventBus>,
    playlist: Playlist,
    cursor: usize,
    shuffle: bool,
    repeat: bool,
    volume: u8,
    state: PlaybackState,
    position_ms: u64,
    duration_ms: u64,
}

impl PlaybackController {
    pub fn new(mut engine: Box<dyn MediaEngine>, bus: Arc<EventBus>) -> Self {
        engine.set_volume(DEFAULT_VOLUME);
        Self {
            engine,
            bus,
            playlist: Playlist::default(),
            cursor: 0,
            shuffle: false,
            repeat: false,
            volume: DEFAULT_VOLUME,
            state: PlaybackState::Idle,
            position_ms: 0,
            duration_ms: 0,
        }
    }

    /// Replace the active playlist and reset the cursor
    ///
    /// Does not start or interrupt playback.
    pub fn load_playlist(&mut self, playlist: Playlist) {
        debug!("Playlist loaded: {} track(s)", playlist.len());
        self.playlist = playlist;
        self.cursor = 0;
    }

    /// Select a track and command the engine to load and play it
    ///
    /// Shuffle picks a uniformly random index each call (not guaranteed
    /// distinct from the current one); otherwise the cursor is used modulo
    /// playlist length, which also repairs a stale cursor after a playlist
    /// swap.
    pub fn play(&mut self) -> Result<()> {
        if self.playlist.is_empty() {
            let message = "No tracks available for this selection".to_string();
            self.bus.emit_lossy(MoodplayEvent::StatusMessage {
                message: message.clone(),
                timestamp: chrono::Utc::now(),
            });
            self.set_state(PlaybackState::Stopped);
            return Err(Error::NoTracksAvailable(message));
        }

        let index = if self.shuffle {
            rand::thread_rng().gen_range(0..self.playlist.len())
        } else {
            self.cursor % self.playlist.len()
        };
        self.cursor = index;
        self.start_track(index)
    }

    /// Load and start the track at `index`
    fn start_track(&mut self, index: usize) -> Result<()> {
        let track = self
            .playlist
            .get(index)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("cursor {index} out of range")))?;

        if let Err(e) = self.engine.load_track(&track) {
            warn!("Failed to load {}: {}", track.path.display(), e);
            self.bus.emit_lossy(MoodplayEvent::StatusMessage {
                message: format!("Cannot play {}: {}", track.title, e),
                timestamp: chrono::Utc::now(),
            });
            self.set_state(PlaybackState::Stopped);
            return Err(e);
        }

        self.engine.play();
        self.position_ms = 0;
        self.duration_ms = self.engine.duration_ms().unwrap_or(0);
        self.set_state(PlaybackState::Playing);
        self.bus.emit_lossy(MoodplayEvent::TrackStarted {
            track_id: track.id,
            title: track.title.clone(),
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Pause playback; no-op unless Playing with loaded media
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing && self.engine.has_media() {
            self.engine.pause();
            self.set_state(PlaybackState::Paused);
        }
    }

    /// Resume paused playback; no-op unless Paused with loaded media
    pub fn resume(&mut self) {
        if self.state == PlaybackState::Paused && self.engine.has_media() {
            self.engine.play();
            self.set_state(PlaybackState::Playing);
        }
    }

    /// Halt playback and reset progress; safe to call at any time
    pub fn stop(&mut self) {
        self.engine.stop();
        self.position_ms = 0;
        self.duration_ms = 0;
        self.set_state(PlaybackState::Stopped);
    }

    /// Jump to a chosen track and play it
    pub fn play_at(&mut self, index: usize) -> Result<()> {
        if index >= self.playlist.len() {
            return Err(Error::BadRequest(format!(
                "track index {index} out of range ({} track(s))",
                self.playlist.len()
            )));
        }
        self.cursor = index;
        self.start_track(index)
    }

    /// Advance the cursor by one (wrapping) and play
    pub fn next(&mut self) -> Result<()> {
        if self.playlist.is_empty() {
            return Ok(());
        }
        self.cursor = (self.cursor + 1) % self.playlist.len();
        self.start_track(self.cursor)
    }

    /// Retreat the cursor by one (wrapping) and play
    pub fn prev(&mut self) -> Result<()> {
        if self.playlist.is_empty() {
            return Ok(());
        }
        let len = self.playlist.len();
        self.cursor = (self.cursor + len - 1) % len;
        self.start_track(self.cursor)
    }

    /// Flip shuffle; turning it on immediately re-plays with a random pick
    pub fn toggle_shuffle(&mut self) -> Result<()> {
        self.shuffle = !self.shuffle;
        self.bus.emit_lossy(MoodplayEvent::ShuffleChanged {
            enabled: self.shuffle,
            timestamp: chrono::Utc::now(),
        });
        if self.shuffle {
            return self.play();
        }
        Ok(())
    }

    /// Flip repeat; affects behavior only at natural track-end
    pub fn toggle_repeat(&mut self) {
        self.repeat = !self.repeat;
        self.bus.emit_lossy(MoodplayEvent::RepeatChanged {
            enabled: self.repeat,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Clamp and forward the volume to the engine
    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
        self.engine.set_volume(self.volume);
        self.bus.emit_lossy(MoodplayEvent::VolumeChanged {
            volume: self.volume,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Seek within the loaded media, clamped to its duration
    pub fn seek(&mut self, position_ms: u64) {
        if !self.engine.has_media() {
            return;
        }
        let clamped = match self.engine.duration_ms() {
            Some(duration) => position_ms.min(duration),
            None => position_ms,
        };
        self.engine.seek(clamped);
        self.position_ms = clamped;
    }

    /// Progress tick; no-op unless Playing
    ///
    /// Republishes position/duration and handles the end-of-track signal:
    /// repeat replays the current track, otherwise the cursor advances.
    pub fn tick(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }

        self.position_ms = self.engine.position_ms();
        if let Some(duration) = self.engine.duration_ms() {
            self.duration_ms = duration;
        }
        self.bus.emit_lossy(MoodplayEvent::PlaybackProgress {
            position_ms: self.position_ms,
            duration_ms: self.duration_ms,
            display: format_progress(self.position_ms, self.duration_ms),
            timestamp: chrono::Utc::now(),
        });

        if self.engine.finished() {
            debug!("Track ended (repeat: {})", self.repeat);
            let result = if self.repeat {
                self.start_track(self.cursor)
            } else {
                self.next()
            };
            if let Err(e) = result {
                warn!("Failed to continue after track end: {e}");
            }
        }
    }

    /// Return all playback state to session defaults
    pub fn reset(&mut self) {
        self.engine.stop();
        self.playlist = Playlist::default();
        self.cursor = 0;
        self.shuffle = false;
        self.repeat = false;
        self.position_ms = 0;
        self.duration_ms = 0;
        self.volume = DEFAULT_VOLUME;
        self.engine.set_volume(self.volume);
        self.set_state(PlaybackState::Idle);
    }

    fn set_state(&mut self, new_state: PlaybackState) {
        if self.state == new_state {
            return;
        }
        let old_state = self.state;
        self.state = new_state;
        self.bus.emit_lossy(MoodplayEvent::PlaybackStateChanged {
            old_state,
            new_state,
            timestamp: chrono::Utc::now(),
        });
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    /// Track under the cursor, if the playlist has one
    pub fn current_track(&self) -> Option<&Track> {
        self.playlist.get(self.cursor)
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// In-memory engine recording transport calls
    ///
    /// The `finished` flag is shared so a test can signal a natural
    /// track-end after the engine is boxed into the controller.
    #[derive(Default)]
    #[allow(dead_code)]
    struct FakeEngine {
        loaded: Option<Track>,
        playing: bool,
        finished: Arc<AtomicBool>,
        position_ms: u64,
        duration_ms: Option<u64>,
        volume: u8,
        load_count: usize,
    }

    impl MediaEngine for FakeEngine {
        fn load_track(&mut self, track: &Track) -> Result<()> {
            self.loaded = Some(track.clone());
            self.load_count += 1;
            self.finished.store(false, Ordering::SeqCst);
            self.position_ms = 0;
            Ok(())
        }

        fn play(&mut self) {
            self.playing = true;
        }

        fn pause(&mut self) {
            self.playing = false;
        }

        fn stop(&mut self) {
            self.playing = false;
            self.loaded = None;
            self.position_ms = 0;
        }

        fn seek(&mut self, position_ms: u64) {
            self.position_ms = position_ms;
        }

        fn set_volume(&mut self, volume: u8) {
            self.volume = volume;
        }

        fn position_ms(&self) -> u64 {
            self.position_ms
        }

        fn duration_ms(&self) -> Option<u64> {
            self.duration_ms
        }

        fn has_media(&self) -> bool {
            self.loaded.is_some()
        }

        fn finished(&self) -> bool {
            self.finished.load(Ordering::SeqCst)
        }
    }

    fn playlist(titles: &[&str]) -> Playlist {
        Playlist::new(
            titles
                .iter()
                .map(|t| Track::from_path(PathBuf::from(format!("/music/{t}.mp3"))))
                .collect(),
        )
    }

    fn controller_with(tracks: &[&str]) -> PlaybackController {
        let bus = Arc::new(EventBus::new(64));
        let mut controller = PlaybackController::new(Box::<FakeEngine>::default(), bus);
        controller.load_playlist(playlist(tracks));
        controller
    }

    #[test]
    fn play_on_empty_playlist_reports_no_tracks() {
        let mut controller = controller_with(&[]);
        match controller.play() {
            Err(Error::NoTracksAvailable(_)) => {}
            other => panic!("expected NoTracksAvailable, got {other:?}"),
        }
        assert_eq!(controller.state(), PlaybackState::Stopped);
    }

    #[test]
    fn play_starts_at_cursor_zero_without_shuffle() {
        let mut controller = controller_with(&["s1", "s2"]);
        controller.play().unwrap();
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(controller.cursor(), 0);
        assert_eq!(controller.current_track().unwrap().title, "s1");
    }

    #[test]
    fn play_at_selects_the_requested_track() {
        let mut controller = controller_with(&["a", "b", "c"]);
        controller.play_at(2).unwrap();
        assert_eq!(controller.cursor(), 2);
        assert_eq!(controller.current_track().unwrap().title, "c");
        assert_eq!(controller.state(), PlaybackState::Playing);
    }

    #[test]
    fn play_at_rejects_out_of_range_index() {
        let mut controller = controller_with(&["a", "b"]);
        match controller.play_at(2) {
            Err(Error::BadRequest(_)) => {}
            other => panic!("expected BadRequest, got {other:?}"),
        }
        // Cursor untouched by the rejected jump
        assert_eq!(controller.cursor(), 0);
    }

    #[test]
    fn next_then_prev_restores_cursor() {
        let mut controller = controller_with(&["a", "b", "c"]);
        controller.play().unwrap();
        let original = controller.cursor();

        controller.next().unwrap();
        controller.prev().unwrap();
        assert_eq!(controller.cursor(), original);

        controller.prev().unwrap();
        controller.next().unwrap();
        assert_eq!(controller.cursor(), original);
    }

    #[test]
    fn next_and_prev_wrap_both_directions() {
        let mut controller = controller_with(&["a", "b", "c"]);
        controller.prev().unwrap();
        assert_eq!(controller.cursor(), 2);
        controller.next().unwrap();
        assert_eq!(controller.cursor(), 0);
    }

    #[test]
    fn singleton_playlist_always_resolves_to_same_track() {
        let mut controller = controller_with(&["only"]);
        controller.play().unwrap();
        controller.next().unwrap();
        assert_eq!(controller.current_track().unwrap().title, "only");
        controller.prev().unwrap();
        assert_eq!(controller.current_track().unwrap().title, "only");
    }

    #[test]
    fn double_toggle_restores_flags() {
        let mut controller = controller_with(&["a", "b"]);

        let repeat = controller.repeat();
        controller.toggle_repeat();
        controller.toggle_repeat();
        assert_eq!(controller.repeat(), repeat);

        let shuffle = controller.shuffle();
        controller.toggle_shuffle().unwrap();
        controller.toggle_shuffle().unwrap();
        assert_eq!(controller.shuffle(), shuffle);
    }

    #[test]
    fn enabling_shuffle_re_triggers_play() {
        let mut controller = controller_with(&["a", "b"]);
        assert_eq!(controller.state(), PlaybackState::Idle);
        controller.toggle_shuffle().unwrap();
        assert_eq!(controller.state(), PlaybackState::Playing);
    }

    #[test]
    fn shuffle_play_stays_in_bounds() {
        let mut controller = controller_with(&["a", "b", "c"]);
        controller.toggle_shuffle().unwrap();
        for _ in 0..20 {
            controller.play().unwrap();
            assert!(controller.cursor() < 3);
        }
    }

    #[test]
    fn pause_and_resume_require_loaded_media() {
        let mut controller = controller_with(&["a"]);

        // Nothing loaded yet: both are no-ops
        controller.pause();
        assert_eq!(controller.state(), PlaybackState::Idle);
        controller.resume();
        assert_eq!(controller.state(), PlaybackState::Idle);

        controller.play().unwrap();
        controller.pause();
        assert_eq!(controller.state(), PlaybackState::Paused);
        controller.resume();
        assert_eq!(controller.state(), PlaybackState::Playing);
    }

    #[test]
    fn stop_resets_progress_and_is_idempotent() {
        let mut controller = controller_with(&["a"]);
        controller.play().unwrap();
        controller.stop();
        assert_eq!(controller.state(), PlaybackState::Stopped);
        assert_eq!(controller.position_ms(), 0);
        // Safe to call again, and before any play at all
        controller.stop();
        assert_eq!(controller.state(), PlaybackState::Stopped);
    }

    #[test]
    fn seek_clamps_to_duration_and_needs_media() {
        let bus = Arc::new(EventBus::new(64));
        let engine = FakeEngine {
            duration_ms: Some(60_000),
            ..FakeEngine::default()
        };
        let mut controller = PlaybackController::new(Box::new(engine), bus);
        controller.load_playlist(playlist(&["a"]));

        // No media loaded: no-op
        controller.seek(10_000);
        assert_eq!(controller.position_ms(), 0);

        controller.play().unwrap();
        controller.seek(90_000);
        assert_eq!(controller.position_ms(), 60_000);
    }

    #[test]
    fn volume_clamps_to_100() {
        let mut controller = controller_with(&["a"]);
        controller.set_volume(150);
        assert_eq!(controller.volume(), 100);
        controller.set_volume(30);
        assert_eq!(controller.volume(), 30);
    }

    #[test]
    fn track_end_with_repeat_replays_same_track() {
        let finished = Arc::new(AtomicBool::new(false));
        let engine = FakeEngine {
            finished: Arc::clone(&finished),
            ..FakeEngine::default()
        };
        let mut controller = PlaybackController::new(Box::new(engine), Arc::new(EventBus::new(64)));
        controller.load_playlist(playlist(&["a", "b"]));
        controller.play().unwrap();
        controller.toggle_repeat();

        finished.store(true, Ordering::SeqCst);
        controller.tick();
        assert_eq!(controller.cursor(), 0);
        assert_eq!(controller.state(), PlaybackState::Playing);
    }

    #[test]
    fn track_end_without_repeat_advances() {
        let finished = Arc::new(AtomicBool::new(false));
        let engine = FakeEngine {
            finished: Arc::clone(&finished),
            ..FakeEngine::default()
        };
        let mut controller = PlaybackController::new(Box::new(engine), Arc::new(EventBus::new(64)));
        controller.load_playlist(playlist(&["a", "b"]));
        controller.play().unwrap();

        finished.store(true, Ordering::SeqCst);
        controller.tick();
        assert_eq!(controller.cursor(), 1);
        assert_eq!(controller.current_track().unwrap().title, "b");
    }

    #[test]
    fn tick_is_a_noop_when_not_playing() {
        let bus = Arc::new(EventBus::new(64));
        let mut rx = bus.subscribe();
        let mut controller = PlaybackController::new(Box::<FakeEngine>::default(), Arc::clone(&bus));
        controller.load_playlist(playlist(&["a"]));

        controller.tick();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn reset_returns_defaults() {
        let mut controller = controller_with(&["a", "b"]);
        controller.play().unwrap();
        controller.toggle_repeat();
        controller.set_volume(90);

        controller.reset();
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert!(controller.playlist().is_empty());
        assert!(!controller.repeat());
        assert!(!controller.shuffle());
        assert_eq!(controller.volume(), DEFAULT_VOLUME);
    }
}
