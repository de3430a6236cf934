//! Capture session: camera lifecycle and periodic classification sampling
//!
//! The session owns the capture device exclusively. Polling happens on an
//! external cadence (the coordinator's poll timer); every Nth frame is
//! submitted to the classifier. A detection overwrites the previously
//! latched emotion; a no-face sample leaves it untouched. The session
//! itself keeps no timers; the coordinator drives `poll` and enforces the
//! capture deadline.

pub mod classifier;
pub mod device;

pub use classifier::{Detection, EmotionModel, FaceClassifier, Region};
pub use device::{CaptureDevice, Frame, SpoolDevice};

use std::time::Duration;

use tracing::{debug, info};

use moodplay_common::events::CaptureState;
use moodplay_common::Emotion;

use crate::error::Result;

/// Outcome of one poll tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Not capturing, or no frame was available
    NoFrame,
    /// Frame consumed without classification (off-stride)
    Sampled,
    /// Frame classified, no face found
    NoFace,
    /// Frame classified, emotion latched
    Detected(Emotion),
}

/// Capture session state and sampling logic
pub struct CaptureSession {
    device: Box<dyn CaptureDevice>,
    classifier: Box<dyn FaceClassifier>,
    state: CaptureState,
    /// Frames consumed since capture start
    frame_count: u64,
    /// Classify every Nth frame
    stride: u64,
    /// Wall-clock budget after which the coordinator forces a stop
    budget: Duration,
    /// Last detected emotion; survives no-face samples, cleared on reset
    detected: Option<Emotion>,
}

impl CaptureSession {
    pub fn new(
        device: Box<dyn CaptureDevice>,
        classifier: Box<dyn FaceClassifier>,
        stride: u64,
        budget: Duration,
    ) -> Self {
        Self {
            device,
            classifier,
            state: CaptureState::Off,
            frame_count: 0,
            stride: stride.max(1),
            budget,
            detected: None,
        }
    }

    /// Open the capture device and begin a capture window
    ///
    /// On failure the state is unchanged (Off).
    pub fn start(&mut self) -> Result<()> {
        self.device.open()?;
        self.state = CaptureState::Capturing;
        self.frame_count = 0;
        info!("Capture started (stride {}, budget {:?})", self.stride, self.budget);
        Ok(())
    }

    /// Consume at most one frame and classify it when on-stride
    pub fn poll(&mut self) -> PollOutcome {
        if self.state != CaptureState::Capturing {
            return PollOutcome::NoFrame;
        }

        let Some(frame) = self.device.read_frame() else {
            return PollOutcome::NoFrame;
        };

        self.frame_count += 1;
        if self.frame_count % self.stride != 0 {
            return PollOutcome::Sampled;
        }

        match self.classifier.classify(&frame) {
            Some(detection) => {
                debug!(
                    "Frame {}: detected {} at {:?}",
                    self.frame_count, detection.emotion, detection.region
                );
                self.detected = Some(detection.emotion);
                PollOutcome::Detected(detection.emotion)
            }
            None => {
                debug!("Frame {}: no face", self.frame_count);
                PollOutcome::NoFace
            }
        }
    }

    /// Release the device; idempotent
    ///
    /// Returns true when the device was actually released by this call.
    pub fn stop(&mut self) -> bool {
        if self.state != CaptureState::Capturing {
            return false;
        }
        self.device.release();
        self.state = CaptureState::Off;
        info!(
            "Capture stopped after {} frame(s), detected: {:?}",
            self.frame_count, self.detected
        );
        true
    }

    /// Clear the frame counter and the latched emotion
    pub fn reset(&mut self) {
        self.frame_count = 0;
        self.detected = None;
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_capturing(&self) -> bool {
        self.state == CaptureState::Capturing
    }

    pub fn detected(&self) -> Option<Emotion> {
        self.detected
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
