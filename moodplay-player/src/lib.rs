//! # Moodplay Player (moodplay-player)
//!
//! Emotion-triggered playback controller.
//!
//! **Purpose:** Sense the user's facial emotion through a bounded camera
//! capture window, resolve an (emotion, language) playlist from the music
//! library, drive playback of it, and record each detection in per-user
//! history, all behind an HTTP/SSE control interface.
//!
//! **Architecture:** One coordinator task owns every piece of mutable
//! session state; HTTP handlers and timers talk to it over channels.

pub mod api;
pub mod capture;
pub mod error;
pub mod history;
pub mod library;
pub mod playback;
pub mod session;

pub use error::{Error, Result};
pub use session::{SessionConfig, SessionCoordinator, SessionHandle};
