//! Capture device boundary
//!
//! The camera is an external collaborator consumed through the
//! [`CaptureDevice`] trait: open, poll one frame, release. The device is
//! exclusively owned by the capture session for the session lifetime.
//!
//! The built-in backend is a spool directory: an external frame grabber
//! drops image files into a directory and the device consumes them oldest
//! first, decoding to grayscale. This keeps the camera process itself out
//! of the daemon while exercising the full capture path.

use std::path::PathBuf;
use std::time::SystemTime;

use image::GrayImage;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Grayscale video frame as delivered by the device
pub type Frame = GrayImage;

/// Camera lifecycle boundary
pub trait CaptureDevice: Send {
    /// Open the device; must leave it closed on failure
    fn open(&mut self) -> Result<()>;

    /// Pull the next available frame, if any
    ///
    /// Returns None when no frame is ready this tick.
    fn read_frame(&mut self) -> Option<Frame>;

    /// Release the device; idempotent
    fn release(&mut self);
}

/// Image file extensions the spool consumes
const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Spool-directory frame source
pub struct SpoolDevice {
    dir: PathBuf,
    opened: bool,
}

impl SpoolDevice {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir, opened: false }
    }

    /// Oldest spooled frame file by modification time
    fn next_file(&self) -> Option<PathBuf> {
        let entries = std::fs::read_dir(&self.dir).ok()?;
        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .min_by_key(|path| {
                path.metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH)
            })
    }
}

impl CaptureDevice for SpoolDevice {
    fn open(&mut self) -> Result<()> {
        if !self.dir.is_dir() {
            return Err(Error::DeviceUnavailable(format!(
                "frame spool {} is not a directory",
                self.dir.display()
            )));
        }
        self.opened = true;
        debug!("Frame spool opened at {}", self.dir.display());
        Ok(())
    }

    fn read_frame(&mut self) -> Option<Frame> {
        if !self.opened {
            return None;
        }

        let path = self.next_file()?;
        let decoded = image::open(&path);
        // Consume the file either way so a bad frame cannot wedge the spool
        if let Err(e) = std::fs::remove_file(&path) {
            warn!("Failed to remove consumed frame {}: {}", path.display(), e);
        }

        match decoded {
            Ok(img) => Some(img.to_luma8()),
            Err(e) => {
                warn!("Undecodable frame {}: {}", path.display(), e);
                None
            }
        }
    }

    fn release(&mut self) {
        if self.opened {
            debug!("Frame spool released");
        }
        self.opened = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_fails_when_spool_missing() {
        let mut device = SpoolDevice::new(PathBuf::from("/nonexistent/spool"));
        match device.open() {
            Err(Error::DeviceUnavailable(_)) => {}
            other => panic!("expected DeviceUnavailable, got {other:?}"),
        }
        // Failed open leaves the device closed
        assert!(device.read_frame().is_none());
    }

    #[test]
    fn release_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let mut device = SpoolDevice::new(tmp.path().to_path_buf());
        device.open().unwrap();
        device.release();
        device.release();
        assert!(device.read_frame().is_none());
    }

    #[test]
    fn consumes_spooled_frames_oldest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let frame = GrayImage::from_pixel(8, 8, image::Luma([128u8]));
        frame.save(tmp.path().join("a.png")).unwrap();

        let mut device = SpoolDevice::new(tmp.path().to_path_buf());
        device.open().unwrap();

        let read = device.read_frame().expect("frame should decode");
        assert_eq!(read.dimensions(), (8, 8));
        // Consumed: nothing left in the spool
        assert!(device.read_frame().is_none());
    }
}
