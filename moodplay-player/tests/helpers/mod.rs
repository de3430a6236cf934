//! Test helpers for session coordinator integration tests
//!
//! Fake implementations of the three hardware boundaries (capture device,
//! face classifier, media engine) with shared counters so tests can assert
//! on lifecycle behavior from outside the coordinator task.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::Luma;

use moodplay_common::types::{Playlist, Track};
use moodplay_common::{Emotion, Language};

use moodplay_player::capture::{
    CaptureDevice, Detection, FaceClassifier, Frame, Region,
};
use moodplay_player::error::Result;
use moodplay_player::library::PlaylistIndex;
use moodplay_player::playback::MediaEngine;

/// Capture device yielding synthetic frames forever, counting lifecycle calls
pub struct FakeDevice {
    opened: bool,
    pub opens: Arc<AtomicUsize>,
    pub releases: Arc<AtomicUsize>,
}

impl FakeDevice {
    pub fn new() -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let opens = Arc::new(AtomicUsize::new(0));
        let releases = Arc::new(AtomicUsize::new(0));
        let device = Self {
            opened: false,
            opens: Arc::clone(&opens),
            releases: Arc::clone(&releases),
        };
        (device, opens, releases)
    }
}

impl CaptureDevice for FakeDevice {
    fn open(&mut self) -> Result<()> {
        self.opened = true;
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_frame(&mut self) -> Option<Frame> {
        if !self.opened {
            return None;
        }
        Some(Frame::from_fn(64, 64, |x, y| {
            Luma([if (x + y) % 2 == 0 { 200 } else { 60 }])
        }))
    }

    fn release(&mut self) {
        self.opened = false;
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Classifier that always reports a fixed emotion (or no face for None)
pub struct ScriptedClassifier {
    emotion: Option<Emotion>,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedClassifier {
    pub fn new(emotion: Option<Emotion>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let classifier = Self {
            emotion,
            calls: Arc::clone(&calls),
        };
        (classifier, calls)
    }
}

impl FaceClassifier for ScriptedClassifier {
    fn classify(&self, _frame: &Frame) -> Option<Detection> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.emotion.map(|emotion| Detection {
            region: Region {
                x: 0,
                y: 0,
                width: 64,
                height: 64,
            },
            emotion,
        })
    }
}

/// Media engine recording loaded track titles, never touching audio hardware
pub struct FakeEngine {
    pub loads: Arc<Mutex<Vec<String>>>,
    pub finished: Arc<AtomicBool>,
    has_media: bool,
    volume: u8,
    position_ms: u64,
}

impl FakeEngine {
    pub fn new() -> (Self, Arc<Mutex<Vec<String>>>, Arc<AtomicBool>) {
        let loads = Arc::new(Mutex::new(Vec::new()));
        let finished = Arc::new(AtomicBool::new(false));
        let engine = Self {
            loads: Arc::clone(&loads),
            finished: Arc::clone(&finished),
            has_media: false,
            volume: 0,
            position_ms: 0,
        };
        (engine, loads, finished)
    }
}

impl MediaEngine for FakeEngine {
    fn load_track(&mut self, track: &Track) -> Result<()> {
        if let Ok(mut loads) = self.loads.lock() {
            loads.push(track.title.clone());
        }
        self.has_media = true;
        self.position_ms = 0;
        self.finished.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn play(&mut self) {}

    fn pause(&mut self) {}

    fn stop(&mut self) {
        self.has_media = false;
        self.position_ms = 0;
        self.finished.store(false, Ordering::SeqCst);
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
        self.has_media.then_some(180_000)
    }

    fn has_media(&self) -> bool {
        self.has_media
    }

    fn finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

/// Playlist of synthetic tracks named t1..tN
pub fn playlist_of(names: &[&str]) -> Playlist {
    Playlist::new(
        names
            .iter()
            .map(|n| Track::from_path(format!("/music/{n}.mp3").into()))
            .collect(),
    )
}

/// Index holding one playlist for the given (emotion, language) pair
pub fn index_with(emotion: Emotion, language: Language, names: &[&str]) -> PlaylistIndex {
    PlaylistIndex::from_playlists(vec![(emotion, language, playlist_of(names))])
}
