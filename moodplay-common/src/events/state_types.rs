//! Session, capture and playback state enumerations
//!
//! Supporting types carried inside events and state snapshots.

use serde::{Deserialize, Serialize};

/// Playback transport state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// No playlist loaded yet
    Idle,
    Playing,
    Paused,
    Stopped,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Capture device state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    /// Device closed
    Off,
    /// Device open, frames being polled
    Capturing,
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureState::Off => write!(f, "off"),
            CaptureState::Capturing => write!(f, "capturing"),
        }
    }
}

/// Top-level session state machine phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum SessionPhase {
    /// No user logged in; all session state at defaults
    LoggedOut,
    /// Logged in, waiting for a start-detection request
    AwaitingCapture,
    /// Capture session active, classifying frames
    Capturing,
    /// Capture finished; playback either started or stopped with a message
    Resolved,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::LoggedOut => write!(f, "LoggedOut"),
            SessionPhase::AwaitingCapture => write!(f, "AwaitingCapture"),
            SessionPhase::Capturing => write!(f, "Capturing"),
            SessionPhase::Resolved => write!(f, "Resolved"),
        }
    }
}
