//! Playback: media engine boundary and transport controller

pub mod controller;
pub mod engine;

pub use controller::PlaybackController;
pub use engine::{MediaEngine, RodioEngine};
