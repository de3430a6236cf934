//! # Moodplay Common Library
//!
//! Shared code for the moodplay workspace:
//! - Closed domain enumerations (Emotion, Language) and library types
//! - Event types (MoodplayEvent enum) and the EventBus
//! - Session/playback/capture state enumerations
//! - Configuration resolution
//! - Timestamp and clock formatting utilities

pub mod config;
pub mod error;
pub mod events;
pub mod time;
pub mod types;

pub use error::{Error, Result};
pub use types::{Emotion, Language, Playlist, Track};
