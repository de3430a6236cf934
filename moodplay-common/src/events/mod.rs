//! Event types for the moodplay event system
//!
//! # Architecture
//!
//! Moodplay uses hybrid communication:
//! - **EventBus** (tokio::broadcast): one-to-many state-change notification
//! - **Command channel** (tokio::mpsc): UI request → single coordinator task
//!
//! Every handled error and every state transition updates an observable
//! status by emitting one of these events; the HTTP layer relays them to
//! connected UIs over SSE.

mod state_types;

pub use state_types::{CaptureState, PlaybackState, SessionPhase};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::types::{Emotion, HistoryEntry, Language};

/// Moodplay event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MoodplayEvent {
    /// Session state machine moved to a new phase
    SessionPhaseChanged {
        old_phase: SessionPhase,
        new_phase: SessionPhase,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Capture device opened or released
    CaptureStateChanged {
        state: CaptureState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Classifier produced an emotion for a sampled frame
    ///
    /// Overwrites any previously detected emotion for this session.
    EmotionDetected {
        emotion: Emotion,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A sampled frame contained no face
    ///
    /// Informational only; a previously detected emotion is not cleared.
    NoFaceDetected {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playlist re-resolved for an (emotion, language) pair
    PlaylistResolved {
        emotion: Emotion,
        language: Language,
        track_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback transport state changed
    PlaybackStateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track was loaded into the media engine and started
    TrackStarted {
        track_id: Uuid,
        title: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback progress update
    ///
    /// Emitted once per progress tick while playing.
    PlaybackProgress {
        position_ms: u64,
        duration_ms: u64,
        /// "mm:ss / mm:ss" display string
        display: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Volume changed (0-100)
    VolumeChanged {
        volume: u8,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Shuffle mode toggled
    ShuffleChanged {
        enabled: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Repeat mode toggled
    RepeatChanged {
        enabled: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Song language selection changed
    LanguageChanged {
        language: Language,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A history entry was recorded for the active user
    HistoryAppended {
        username: String,
        entry: HistoryEntry,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// History cleared for a user
    HistoryCleared {
        username: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Human-readable status line (recoverable errors surface here)
    StatusMessage {
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl MoodplayEvent {
    /// Event type string for the SSE `event:` field
    pub fn type_str(&self) -> &'static str {
        match self {
            MoodplayEvent::SessionPhaseChanged { .. } => "SessionPhaseChanged",
            MoodplayEvent::CaptureStateChanged { .. } => "CaptureStateChanged",
            MoodplayEvent::EmotionDetected { .. } => "EmotionDetected",
            MoodplayEvent::NoFaceDetected { .. } => "NoFaceDetected",
            MoodplayEvent::PlaylistResolved { .. } => "PlaylistResolved",
            MoodplayEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            MoodplayEvent::TrackStarted { .. } => "TrackStarted",
            MoodplayEvent::PlaybackProgress { .. } => "PlaybackProgress",
            MoodplayEvent::VolumeChanged { .. } => "VolumeChanged",
            MoodplayEvent::ShuffleChanged { .. } => "ShuffleChanged",
            MoodplayEvent::RepeatChanged { .. } => "RepeatChanged",
            MoodplayEvent::LanguageChanged { .. } => "LanguageChanged",
            MoodplayEvent::HistoryAppended { .. } => "HistoryAppended",
            MoodplayEvent::HistoryCleared { .. } => "HistoryCleared",
            MoodplayEvent::StatusMessage { .. } => "StatusMessage",
        }
    }
}

/// Broadcast bus for one-to-many event distribution
///
/// Wraps `tokio::sync::broadcast`; emission never blocks and slow
/// subscribers lag rather than backpressure the coordinator.
pub struct EventBus {
    tx: broadcast::Sender<MoodplayEvent>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

/// Channel capacity used when no explicit capacity is configured
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<MoodplayEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` when no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: MoodplayEvent,
    ) -> Result<usize, broadcast::error::SendError<MoodplayEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscribers case
    pub fn emit_lossy(&self, event: MoodplayEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_subscribe() {
        let bus = EventBus::new(100);
        let _rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_eventbus_emit_no_subscribers() {
        let bus = EventBus::new(100);
        let event = MoodplayEvent::PlaybackStateChanged {
            old_state: PlaybackState::Paused,
            new_state: PlaybackState::Playing,
            timestamp: chrono::Utc::now(),
        };

        assert!(bus.emit(event).is_err());
    }

    #[tokio::test]
    async fn test_eventbus_emit_with_subscriber() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();

        let event = MoodplayEvent::PlaybackStateChanged {
            old_state: PlaybackState::Paused,
            new_state: PlaybackState::Playing,
            timestamp: chrono::Utc::now(),
        };

        assert!(bus.emit(event).is_ok());

        let received = rx.recv().await.unwrap();
        match received {
            MoodplayEvent::PlaybackStateChanged {
                old_state,
                new_state,
                ..
            } => {
                assert_eq!(old_state, PlaybackState::Paused);
                assert_eq!(new_state, PlaybackState::Playing);
            }
            _ => panic!("Wrong event type received"),
        }
    }

    #[test]
    fn test_eventbus_emit_lossy() {
        let bus = EventBus::new(100);
        let event = MoodplayEvent::PlaybackProgress {
            position_ms: 1000,
            duration_ms: 60000,
            display: "00:01 / 01:00".to_string(),
            timestamp: chrono::Utc::now(),
        };

        // Should not panic even without subscribers
        bus.emit_lossy(event);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = MoodplayEvent::EmotionDetected {
            emotion: Emotion::Happy,
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"EmotionDetected""#));
        assert!(json.contains(r#""emotion":"Happy""#));
        assert_eq!(event.type_str(), "EmotionDetected");
    }
}
