//! Session coordinator: the single owner of mutable session state
//!
//! One tokio task owns the capture session, the playback controller and
//! the history log. UIs talk to it through a typed command channel and
//! observe it through the EventBus; every mutation is serialized through
//! this task, so no handler body ever runs concurrently with another.
//!
//! Three named periodic activities are multiplexed in the task's select
//! loop: the capture poll (~100ms, only while Capturing), the one-shot
//! capture deadline (~10s after capture start), and the playback progress
//! tick (~1000ms, only while Playing).

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use moodplay_common::events::{CaptureState, EventBus, MoodplayEvent, PlaybackState, SessionPhase};
use moodplay_common::types::HistoryEntry;
use moodplay_common::{Emotion, Language, Playlist, Track};

use crate::capture::{CaptureSession, PollOutcome};
use crate::error::{Error, Result};
use crate::history::HistoryLog;
use crate::library::PlaylistIndex;
use crate::playback::PlaybackController;

/// Timing knobs for the coordinator's periodic activities
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Capture frame poll cadence
    pub poll_interval: Duration,
    /// Wall-clock budget for one capture window
    pub capture_budget: Duration,
    /// Classify every Nth polled frame
    pub classify_stride: u64,
    /// Playback progress republish cadence
    pub progress_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            capture_budget: Duration::from_secs(10),
            classify_stride: 5,
            progress_interval: Duration::from_secs(1),
        }
    }
}

/// Reply channel for commands that can fail
type Reply<T> = oneshot::Sender<Result<T>>;

/// Typed commands dispatched by the UI boundary
pub enum Command {
    Login { username: String, reply: Reply<()> },
    Logout { reply: Reply<()> },
    StartDetection { reply: Reply<()> },
    StopDetection { reply: Reply<()> },
    Play { reply: Reply<()> },
    PlayIndex { index: usize, reply: Reply<()> },
    Pause { reply: Reply<()> },
    Resume { reply: Reply<()> },
    Stop { reply: Reply<()> },
    Next { reply: Reply<()> },
    Prev { reply: Reply<()> },
    ToggleShuffle { reply: Reply<()> },
    ToggleRepeat { reply: Reply<()> },
    SetVolume { volume: u8, reply: Reply<()> },
    Seek { position_ms: u64, reply: Reply<()> },
    SetLanguage { language: Language, reply: Reply<()> },
    ClearHistory { reply: Reply<()> },
    History { reply: oneshot::Sender<Vec<HistoryEntry>> },
    Playlist { reply: oneshot::Sender<PlaylistView> },
    Snapshot { reply: oneshot::Sender<StateSnapshot> },
    Shutdown { reply: oneshot::Sender<()> },
}

/// Resolved playlist as presented to UIs for track selection
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistView {
    pub cursor: usize,
    pub tracks: Vec<Track>,
}

/// Point-in-time view of the whole session for state queries
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub phase: SessionPhase,
    pub username: Option<String>,
    pub language: Language,
    pub capture_state: CaptureState,
    pub detected_emotion: Option<Emotion>,
    pub playback_state: PlaybackState,
    pub current_track: Option<String>,
    pub playlist_len: usize,
    pub cursor: usize,
    pub shuffle: bool,
    pub repeat: bool,
    pub volume: u8,
    pub position_ms: u64,
    pub duration_ms: u64,
}

/// Cloneable handle for issuing commands to the coordinator task
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    async fn request(&self, make: impl FnOnce(Reply<()>) -> Command) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| Error::Internal("session task is gone".into()))?;
        rx.await
            .map_err(|_| Error::Internal("session task dropped the reply".into()))?
    }

    pub async fn login(&self, username: String) -> Result<()> {
        self.request(|reply| Command::Login { username, reply }).await
    }

    pub async fn logout(&self) -> Result<()> {
        self.request(|reply| Command::Logout { reply }).await
    }

    pub async fn start_detection(&self) -> Result<()> {
        self.request(|reply| Command::StartDetection { reply }).await
    }

    pub async fn stop_detection(&self) -> Result<()> {
        self.request(|reply| Command::StopDetection { reply }).await
    }

    pub async fn play(&self) -> Result<()> {
        self.request(|reply| Command::Play { reply }).await
    }

    /// Play the track at a specific playlist index
    pub async fn play_index(&self, index: usize) -> Result<()> {
        self.request(|reply| Command::PlayIndex { index, reply }).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(|reply| Command::Pause { reply }).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.request(|reply| Command::Resume { reply }).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.request(|reply| Command::Stop { reply }).await
    }

    pub async fn next(&self) -> Result<()> {
        self.request(|reply| Command::Next { reply }).await
    }

    pub async fn prev(&self) -> Result<()> {
        self.request(|reply| Command::Prev { reply }).await
    }

    pub async fn toggle_shuffle(&self) -> Result<()> {
        self.request(|reply| Command::ToggleShuffle { reply }).await
    }

    pub async fn toggle_repeat(&self) -> Result<()> {
        self.request(|reply| Command::ToggleRepeat { reply }).await
    }

    pub async fn set_volume(&self, volume: u8) -> Result<()> {
        self.request(|reply| Command::SetVolume { volume, reply }).await
    }

    pub async fn seek(&self, position_ms: u64) -> Result<()> {
        self.request(|reply| Command::Seek { position_ms, reply }).await
    }

    pub async fn set_language(&self, language: Language) -> Result<()> {
        self.request(|reply| Command::SetLanguage { language, reply }).await
    }

    pub async fn clear_history(&self) -> Result<()> {
        self.request(|reply| Command::ClearHistory { reply }).await
    }

    /// History entries for the active user (empty when logged out)
    pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::History { reply })
            .await
            .map_err(|_| Error::Internal("session task is gone".into()))?;
        rx.await
            .map_err(|_| Error::Internal("session task dropped the reply".into()))
    }

    /// Resolved playlist with the current cursor position
    pub async fn playlist(&self) -> Result<PlaylistView> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Playlist { reply })
            .await
            .map_err(|_| Error::Internal("session task is gone".into()))?;
        rx.await
            .map_err(|_| Error::Internal("session task dropped the reply".into()))
    }

    pub async fn snapshot(&self) -> Result<StateSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot { reply })
            .await
            .map_err(|_| Error::Internal("session task is gone".into()))?;
        rx.await
            .map_err(|_| Error::Internal("session task dropped the reply".into()))
    }

    /// Stop the coordinator, flushing history; resolves when it is done
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }
}

/// Orchestrates capture, playlist resolution, playback and history
pub struct SessionCoordinator {
    config: SessionConfig,
    bus: Arc<EventBus>,
    index: Arc<PlaylistIndex>,
    capture: CaptureSession,
    playback: PlaybackController,
    history: HistoryLog,
    phase: SessionPhase,
    username: Option<String>,
    language: Language,
    /// One-shot deadline forcing capture stop; None while not capturing
    capture_deadline: Option<Instant>,
}

impl SessionCoordinator {
    pub fn new(
        config: SessionConfig,
        bus: Arc<EventBus>,
        index: Arc<PlaylistIndex>,
        capture: CaptureSession,
        playback: PlaybackController,
        history: HistoryLog,
    ) -> Self {
        Self {
            config,
            bus,
            index,
            capture,
            playback,
            history,
            phase: SessionPhase::LoggedOut,
            username: None,
            language: Language::default(),
            capture_deadline: None,
        }
    }

    /// Spawn the coordinator task and return its command handle
    pub fn spawn(self) -> SessionHandle {
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(self.run(rx));
        SessionHandle { tx }
    }

    /// Actor loop: commands plus the three named periodic activities
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        let mut poll = tokio::time::interval(self.config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut progress = tokio::time::interval(self.config.progress_interval);
        progress.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // A disarmed deadline still needs a future for select below
            let deadline = self
                .capture_deadline
                .unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(Command::Shutdown { reply }) => {
                        self.shutdown();
                        let _ = reply.send(());
                        break;
                    }
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        self.shutdown();
                        break;
                    }
                },

                _ = poll.tick(), if self.capture.is_capturing() => {
                    self.poll_capture();
                }

                _ = tokio::time::sleep_until(deadline), if self.capture_deadline.is_some() => {
                    debug!("Capture deadline reached");
                    self.finish_capture();
                }

                _ = progress.tick(), if self.playback.is_playing() => {
                    self.playback.tick();
                }
            }
        }

        debug!("Session coordinator stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Login { username, reply } => {
                let _ = reply.send(self.login(username));
            }
            Command::Logout { reply } => {
                let _ = reply.send(self.logout());
            }
            Command::StartDetection { reply } => {
                let _ = reply.send(self.start_detection());
            }
            Command::StopDetection { reply } => {
                let _ = reply.send(self.stop_detection());
            }
            Command::Play { reply } => {
                let _ = reply.send(self.playback.play());
            }
            Command::PlayIndex { index, reply } => {
                let _ = reply.send(self.playback.play_at(index));
            }
            Command::Pause { reply } => {
                self.playback.pause();
                let _ = reply.send(Ok(()));
            }
            Command::Resume { reply } => {
                self.playback.resume();
                let _ = reply.send(Ok(()));
            }
            Command::Stop { reply } => {
                self.playback.stop();
                let _ = reply.send(Ok(()));
            }
            Command::Next { reply } => {
                let _ = reply.send(self.playback.next());
            }
            Command::Prev { reply } => {
                let _ = reply.send(self.playback.prev());
            }
            Command::ToggleShuffle { reply } => {
                let _ = reply.send(self.playback.toggle_shuffle());
            }
            Command::ToggleRepeat { reply } => {
                self.playback.toggle_repeat();
                let _ = reply.send(Ok(()));
            }
            Command::SetVolume { volume, reply } => {
                self.playback.set_volume(volume);
                let _ = reply.send(Ok(()));
            }
            Command::Seek { position_ms, reply } => {
                self.playback.seek(position_ms);
                let _ = reply.send(Ok(()));
            }
            Command::SetLanguage { language, reply } => {
                let _ = reply.send(self.set_language(language));
            }
            Command::ClearHistory { reply } => {
                let _ = reply.send(self.clear_history());
            }
            Command::History { reply } => {
                let entries = self
                    .username
                    .as_deref()
                    .map(|u| self.history.entries_for(u).to_vec())
                    .unwrap_or_default();
                let _ = reply.send(entries);
            }
            Command::Playlist { reply } => {
                let _ = reply.send(PlaylistView {
                    cursor: self.playback.cursor(),
                    tracks: self.playback.playlist().tracks().to_vec(),
                });
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown { .. } => unreachable!("handled in run loop"),
        }
    }

    fn login(&mut self, username: String) -> Result<()> {
        if self.phase != SessionPhase::LoggedOut {
            return Err(Error::InvalidState("already logged in".into()));
        }
        let username = username.trim().to_string();
        if username.is_empty() {
            return Err(Error::BadRequest("Username cannot be empty".into()));
        }

        info!("User {} logged in", username);
        self.username = Some(username);
        self.set_phase(SessionPhase::AwaitingCapture);
        Ok(())
    }

    /// Tear down the session from any state
    fn logout(&mut self) -> Result<()> {
        if self.capture.stop() {
            self.bus.emit_lossy(MoodplayEvent::CaptureStateChanged {
                state: CaptureState::Off,
                timestamp: chrono::Utc::now(),
            });
        }
        self.capture_deadline = None;
        self.capture.reset();
        self.playback.reset();

        if let Err(e) = self.history.flush() {
            warn!("History flush on logout failed: {e}");
        }

        if let Some(username) = self.username.take() {
            info!("User {} logged out", username);
        }
        self.set_phase(SessionPhase::LoggedOut);
        Ok(())
    }

    fn start_detection(&mut self) -> Result<()> {
        match self.phase {
            SessionPhase::LoggedOut => {
                return Err(Error::InvalidState("not logged in".into()));
            }
            SessionPhase::Capturing => {
                return Err(Error::InvalidState("capture already running".into()));
            }
            SessionPhase::Resolved => {
                // Explicit re-sense: stop playback and forget the old
                // result, playlist included, so transport commands issued
                // during the new window cannot replay the stale list
                self.playback.stop();
                self.playback.load_playlist(Playlist::default());
                self.capture.reset();
                self.set_phase(SessionPhase::AwaitingCapture);
            }
            SessionPhase::AwaitingCapture => {}
        }

        match self.capture.start() {
            Ok(()) => {
                self.capture_deadline = Some(Instant::now() + self.capture.budget());
                self.bus.emit_lossy(MoodplayEvent::CaptureStateChanged {
                    state: CaptureState::Capturing,
                    timestamp: chrono::Utc::now(),
                });
                self.set_phase(SessionPhase::Capturing);
                Ok(())
            }
            Err(e) => {
                self.bus.emit_lossy(MoodplayEvent::StatusMessage {
                    message: e.to_string(),
                    timestamp: chrono::Utc::now(),
                });
                Err(e)
            }
        }
    }

    /// Explicit toggle-off; safe to call when not capturing
    fn stop_detection(&mut self) -> Result<()> {
        if self.capture.is_capturing() {
            self.finish_capture();
        }
        Ok(())
    }

    fn poll_capture(&mut self) {
        match self.capture.poll() {
            PollOutcome::Detected(emotion) => {
                self.bus.emit_lossy(MoodplayEvent::EmotionDetected {
                    emotion,
                    timestamp: chrono::Utc::now(),
                });
            }
            PollOutcome::NoFace => {
                self.bus.emit_lossy(MoodplayEvent::NoFaceDetected {
                    timestamp: chrono::Utc::now(),
                });
            }
            PollOutcome::Sampled | PollOutcome::NoFrame => {}
        }
    }

    /// Close the capture window and resolve the session
    ///
    /// With a detected emotion: resolve the playlist for the current
    /// language, load it, start playback and record the history entry.
    /// Without one: stop with a status message and no history entry.
    fn finish_capture(&mut self) {
        if !self.capture.stop() {
            return;
        }
        self.capture_deadline = None;
        self.bus.emit_lossy(MoodplayEvent::CaptureStateChanged {
            state: CaptureState::Off,
            timestamp: chrono::Utc::now(),
        });

        match self.capture.detected() {
            Some(emotion) => {
                self.resolve_and_play(emotion);
                if let Some(username) = self.username.clone() {
                    let entry = self.history.append(&username, emotion, self.language);
                    self.bus.emit_lossy(MoodplayEvent::HistoryAppended {
                        username,
                        entry,
                        timestamp: chrono::Utc::now(),
                    });
                }
            }
            None => {
                self.playback.stop();
                self.bus.emit_lossy(MoodplayEvent::StatusMessage {
                    message: "No emotion detected".into(),
                    timestamp: chrono::Utc::now(),
                });
            }
        }
        self.set_phase(SessionPhase::Resolved);
    }

    fn resolve_and_play(&mut self, emotion: Emotion) {
        let playlist = self.index.resolve(emotion, self.language);
        self.bus.emit_lossy(MoodplayEvent::PlaylistResolved {
            emotion,
            language: self.language,
            track_count: playlist.len(),
            timestamp: chrono::Utc::now(),
        });
        self.playback.load_playlist(playlist);
        if let Err(e) = self.playback.play() {
            // Status already emitted by the controller
            warn!("Playback not started: {e}");
        }
    }

    /// Change the song language; while Resolved this re-resolves the
    /// playlist for the already-detected emotion without recapturing
    fn set_language(&mut self, language: Language) -> Result<()> {
        self.language = language;
        self.bus.emit_lossy(MoodplayEvent::LanguageChanged {
            language,
            timestamp: chrono::Utc::now(),
        });

        if self.phase == SessionPhase::Resolved {
            if let Some(emotion) = self.capture.detected() {
                let playlist = self.index.resolve(emotion, language);
                self.bus.emit_lossy(MoodplayEvent::PlaylistResolved {
                    emotion,
                    language,
                    track_count: playlist.len(),
                    timestamp: chrono::Utc::now(),
                });
                self.playback.load_playlist(playlist);
            }
        }
        Ok(())
    }

    fn clear_history(&mut self) -> Result<()> {
        let username = self
            .username
            .clone()
            .ok_or_else(|| Error::InvalidState("not logged in".into()))?;

        self.history.clear(&username);
        if let Err(e) = self.history.flush() {
            warn!("History flush after clear failed: {e}");
        }
        self.bus.emit_lossy(MoodplayEvent::HistoryCleared {
            username,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Release everything on process shutdown
    fn shutdown(&mut self) {
        info!("Session coordinator shutting down");
        if self.capture.stop() {
            self.bus.emit_lossy(MoodplayEvent::CaptureStateChanged {
                state: CaptureState::Off,
                timestamp: chrono::Utc::now(),
            });
        }
        self.playback.stop();
        if let Err(e) = self.history.flush() {
            warn!("History flush on shutdown failed: {e}");
        }
    }

    fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            phase: self.phase,
            username: self.username.clone(),
            language: self.language,
            capture_state: self.capture.state(),
            detected_emotion: self.capture.detected(),
            playback_state: self.playback.state(),
            current_track: self.playback.current_track().map(|t| t.title.clone()),
            playlist_len: self.playback.playlist().len(),
            cursor: self.playback.cursor(),
            shuffle: self.playback.shuffle(),
            repeat: self.playback.repeat(),
            volume: self.playback.volume(),
            position_ms: self.playback.position_ms(),
            duration_ms: self.playback.duration_ms(),
        }
    }

    fn set_phase(&mut self, new_phase: SessionPhase) {
        if self.phase == new_phase {
            return;
        }
        let old_phase = self.phase;
        self.phase = new_phase;
        info!("Session phase: {} -> {}", old_phase, new_phase);
        self.bus.emit_lossy(MoodplayEvent::SessionPhaseChanged {
            old_phase,
            new_phase,
            timestamp: chrono::Utc::now(),
        });
    }
}
