//! Face classifier boundary
//!
//! Wraps the face-region detector and the emotion classifier behind one
//! narrow interface: a frame goes in, at most one `(Region, Emotion)` comes
//! out. Zero detections are a silent None, never an error. A missing model
//! resource is a fatal startup condition surfaced before any session
//! begins.
//!
//! The built-in model is a linear softmax over a 48x48 grayscale face
//! crop with one weight vector per label, loaded from a JSON resource.

use std::path::Path;

use image::imageops::FilterType;
use serde::Deserialize;
use tracing::info;

use moodplay_common::Emotion;

use crate::capture::device::Frame;
use crate::error::{Error, Result};

/// Face bounding region within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One classified face
#[derive(Debug, Clone)]
pub struct Detection {
    pub region: Region,
    pub emotion: Emotion,
}

/// Classifier boundary: frame in, at most one detection out
pub trait FaceClassifier: Send + Sync {
    fn classify(&self, frame: &Frame) -> Option<Detection>;
}

/// Model input edge length (48x48 grayscale crop)
const INPUT_SIZE: u32 = 48;

/// Minimum mean luma for a frame to plausibly contain a face
const MIN_MEAN_LUMA: f32 = 20.0;

/// Minimum luma variance; a flat frame has no face in it
const MIN_LUMA_VARIANCE: f32 = 40.0;

/// On-disk weight layout
#[derive(Debug, Deserialize)]
struct ModelFile {
    labels: Vec<String>,
    /// One weight vector of INPUT_SIZE^2 entries per label
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

/// Linear softmax emotion model over a centered face crop
#[derive(Debug)]
pub struct EmotionModel {
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

impl EmotionModel {
    /// Load model weights from a JSON resource
    ///
    /// Any failure here is `ModelUnavailable`; the caller treats it as
    /// fatal before a session starts.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::ModelUnavailable(format!("{}: {}", path.display(), e)))?;
        let model: ModelFile = serde_json::from_str(&raw)
            .map_err(|e| Error::ModelUnavailable(format!("{}: {}", path.display(), e)))?;

        let expected_labels: Vec<&str> = Emotion::ALL.iter().map(|e| e.as_str()).collect();
        if model.labels != expected_labels {
            return Err(Error::ModelUnavailable(format!(
                "{}: label set {:?} does not match {:?}",
                path.display(),
                model.labels,
                expected_labels
            )));
        }

        let input_len = (INPUT_SIZE * INPUT_SIZE) as usize;
        if model.weights.len() != expected_labels.len()
            || model.bias.len() != expected_labels.len()
            || model.weights.iter().any(|w| w.len() != input_len)
        {
            return Err(Error::ModelUnavailable(format!(
                "{}: weight shape mismatch",
                path.display()
            )));
        }

        info!("Classifier model loaded from {}", path.display());
        Ok(Self {
            weights: model.weights,
            bias: model.bias,
        })
    }

    /// Centered square region heuristic for the dominant face
    ///
    /// A webcam frame from the grabber has the subject centered; a real
    /// cascade detector can be slotted in behind the same trait.
    fn face_region(frame: &Frame) -> Option<Region> {
        let (w, h) = frame.dimensions();
        if w < INPUT_SIZE || h < INPUT_SIZE {
            return None;
        }

        let n = (w as f32 * h as f32).max(1.0);
        let mean = frame.pixels().map(|p| p.0[0] as f32).sum::<f32>() / n;
        let variance = frame
            .pixels()
            .map(|p| {
                let d = p.0[0] as f32 - mean;
                d * d
            })
            .sum::<f32>()
            / n;

        // Too dark or too flat: no face this tick
        if mean < MIN_MEAN_LUMA || variance < MIN_LUMA_VARIANCE {
            return None;
        }

        let side = w.min(h);
        Some(Region {
            x: (w - side) / 2,
            y: (h - side) / 2,
            width: side,
            height: side,
        })
    }

    /// Probability vector over the seven labels for a prepared crop
    fn probabilities(&self, input: &[f32]) -> Vec<f32> {
        let scores: Vec<f32> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(w, b)| w.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect();

        let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
        let sum: f32 = exps.iter().sum();
        exps.iter().map(|e| e / sum).collect()
    }
}

impl FaceClassifier for EmotionModel {
    fn classify(&self, frame: &Frame) -> Option<Detection> {
        let region = Self::face_region(frame)?;

        let crop = image::imageops::crop_imm(frame, region.x, region.y, region.width, region.height)
            .to_image();
        let resized = image::imageops::resize(&crop, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
        let input: Vec<f32> = resized.pixels().map(|p| p.0[0] as f32 / 255.0).collect();

        let probs = self.probabilities(&input);
        let best = probs
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| i)?;

        Some(Detection {
            region,
            emotion: Emotion::ALL[best],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use std::io::Write;

    fn write_model(dir: &Path, weights: Vec<Vec<f32>>, bias: Vec<f32>) -> std::path::PathBuf {
        let labels: Vec<&str> = Emotion::ALL.iter().map(|e| e.as_str()).collect();
        let path = dir.join("model.json");
        let mut file = std::fs::File::create(&path).unwrap();
        let body = serde_json::json!({
            "labels": labels,
            "weights": weights,
            "bias": bias,
        });
        file.write_all(body.to_string().as_bytes()).unwrap();
        path
    }

    fn uniform_model(dir: &Path, bias: Vec<f32>) -> EmotionModel {
        let len = (INPUT_SIZE * INPUT_SIZE) as usize;
        let weights = vec![vec![0.0f32; len]; Emotion::ALL.len()];
        EmotionModel::load(&write_model(dir, weights, bias)).unwrap()
    }

    /// Frame bright and noisy enough to pass the face heuristic
    fn face_like_frame() -> Frame {
        Frame::from_fn(64, 64, |x, y| Luma([if (x + y) % 2 == 0 { 200 } else { 60 }]))
    }

    #[test]
    fn missing_model_file_is_model_unavailable() {
        match EmotionModel::load(Path::new("/nonexistent/model.json")) {
            Err(Error::ModelUnavailable(_)) => {}
            other => panic!("expected ModelUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn wrong_label_set_is_model_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("model.json");
        std::fs::write(
            &path,
            r#"{"labels":["Happy"],"weights":[[0.0]],"bias":[0.0]}"#,
        )
        .unwrap();
        assert!(matches!(
            EmotionModel::load(&path),
            Err(Error::ModelUnavailable(_))
        ));
    }

    #[test]
    fn dark_frame_yields_no_detection() {
        let tmp = tempfile::tempdir().unwrap();
        let model = uniform_model(tmp.path(), vec![0.0; 7]);
        let dark = Frame::from_pixel(64, 64, Luma([3u8]));
        assert!(model.classify(&dark).is_none());
    }

    #[test]
    fn flat_frame_yields_no_detection() {
        let tmp = tempfile::tempdir().unwrap();
        let model = uniform_model(tmp.path(), vec![0.0; 7]);
        let flat = Frame::from_pixel(64, 64, Luma([180u8]));
        assert!(model.classify(&flat).is_none());
    }

    #[test]
    fn bias_selects_the_winning_label() {
        let tmp = tempfile::tempdir().unwrap();
        // Happy is index 3 in classifier output order
        let mut bias = vec![0.0f32; 7];
        bias[3] = 5.0;
        let model = uniform_model(tmp.path(), bias);

        let detection = model.classify(&face_like_frame()).expect("face expected");
        assert_eq!(detection.emotion, Emotion::Happy);
        // Centered square region on a square frame covers it fully
        assert_eq!(detection.region.width, 64);
        assert_eq!(detection.region.height, 64);
    }
}
