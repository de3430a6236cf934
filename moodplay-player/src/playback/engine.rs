//! Media engine boundary
//!
//! The underlying audio stack is an external collaborator behind the
//! [`MediaEngine`] trait: load a track, transport control, position and
//! duration queries, volume, seek, and an end-of-track signal observed on
//! the progress tick.
//!
//! The rodio backend runs on a dedicated audio thread owning the output
//! stream (the stream handle is not Send), with a command channel in and a
//! shared status snapshot out. Track-end is detected on the audio thread's
//! own tick via `sink.empty()` and latched into the status, so the
//! controller observes it asynchronously without blocking anyone.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rodio::{Decoder, OutputStreamBuilder, Sink, Source};
use tracing::{debug, info, warn};

use moodplay_common::Track;

use crate::error::{Error, Result};

/// Media engine boundary consumed by the playback controller
pub trait MediaEngine: Send {
    /// Load a track, replacing any loaded media; does not start playback
    fn load_track(&mut self, track: &Track) -> Result<()>;

    /// Begin or resume playback of the loaded media
    fn play(&mut self);

    /// Pause playback, keeping position
    fn pause(&mut self);

    /// Halt playback and unload media
    fn stop(&mut self);

    /// Seek within the loaded media
    fn seek(&mut self, position_ms: u64);

    /// Set output volume, 0-100
    fn set_volume(&mut self, volume: u8);

    /// Current position in milliseconds (0 with nothing loaded)
    fn position_ms(&self) -> u64;

    /// Duration of the loaded media, when known
    fn duration_ms(&self) -> Option<u64>;

    /// Whether media is currently loaded
    fn has_media(&self) -> bool;

    /// Whether the loaded media reached its natural end
    fn finished(&self) -> bool;
}

/// Audio thread tick; position/finished snapshots refresh at this rate
const AUDIO_TICK: Duration = Duration::from_millis(200);

/// Commands sent to the audio thread
enum AudioCommand {
    Load(PathBuf),
    Play,
    Pause,
    Stop,
    Seek(u64),
    SetVolume(f32),
    Shutdown,
}

/// Snapshot shared between the audio thread and the engine handle
#[derive(Debug, Default)]
struct EngineStatus {
    position_ms: u64,
    duration_ms: Option<u64>,
    has_media: bool,
    finished: bool,
}

/// rodio-backed media engine
///
/// The handle is Send; the output stream lives on the audio thread for its
/// whole lifetime and is released when the engine shuts down.
pub struct RodioEngine {
    tx: Sender<AudioCommand>,
    status: Arc<Mutex<EngineStatus>>,
}

impl RodioEngine {
    /// Spawn the audio thread and open the default output stream
    pub fn new() -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let status = Arc::new(Mutex::new(EngineStatus::default()));
        let thread_status = Arc::clone(&status);

        std::thread::Builder::new()
            .name("moodplay-audio".to_string())
            .spawn(move || audio_thread(rx, thread_status, ready_tx))
            .map_err(|e| Error::Engine(format!("failed to spawn audio thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("Audio output stream opened");
                Ok(Self { tx, status })
            }
            Ok(Err(e)) => Err(Error::Engine(format!("failed to open audio output: {e}"))),
            Err(_) => Err(Error::Engine("audio thread exited during startup".into())),
        }
    }

    fn send(&self, cmd: AudioCommand) {
        // A dead audio thread means playback is already gone
        let _ = self.tx.send(cmd);
    }

    fn status(&self) -> EngineStatus {
        let st = self.status.lock().unwrap_or_else(|p| p.into_inner());
        EngineStatus {
            position_ms: st.position_ms,
            duration_ms: st.duration_ms,
            has_media: st.has_media,
            finished: st.finished,
        }
    }
}

impl MediaEngine for RodioEngine {
    fn load_track(&mut self, track: &Track) -> Result<()> {
        // Surface unreadable files to the caller; decode errors are
        // reported by the audio thread when it opens the stream
        File::open(&track.path)
            .map_err(|e| Error::Engine(format!("{}: {}", track.path.display(), e)))?;
        self.send(AudioCommand::Load(track.path.clone()));
        Ok(())
    }

    fn play(&mut self) {
        self.send(AudioCommand::Play);
    }

    fn pause(&mut self) {
        self.send(AudioCommand::Pause);
    }

    fn stop(&mut self) {
        self.send(AudioCommand::Stop);
    }

    fn seek(&mut self, position_ms: u64) {
        self.send(AudioCommand::Seek(position_ms));
    }

    fn set_volume(&mut self, volume: u8) {
        self.send(AudioCommand::SetVolume(volume.min(100) as f32 / 100.0));
    }

    fn position_ms(&self) -> u64 {
        self.status().position_ms
    }

    fn duration_ms(&self) -> Option<u64> {
        self.status().duration_ms
    }

    fn has_media(&self) -> bool {
        self.status().has_media
    }

    fn finished(&self) -> bool {
        self.status().finished
    }
}

impl Drop for RodioEngine {
    fn drop(&mut self) {
        let _ = self.tx.send(AudioCommand::Shutdown);
    }
}

/// Audio thread body: command loop plus periodic status ticks
fn audio_thread(
    rx: Receiver<AudioCommand>,
    status: Arc<Mutex<EngineStatus>>,
    ready_tx: Sender<std::result::Result<(), String>>,
) {
    let stream = match OutputStreamBuilder::open_default_stream() {
        Ok(stream) => {
            let _ = ready_tx.send(Ok(()));
            stream
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e.to_string()));
            return;
        }
    };

    let mut sink: Option<Sink> = None;
    let mut volume = 0.5f32;

    loop {
        match rx.recv_timeout(AUDIO_TICK) {
            Ok(AudioCommand::Load(path)) => {
                if let Some(old) = sink.take() {
                    old.stop();
                }

                let decoded = File::open(&path)
                    .map_err(|e| e.to_string())
                    .and_then(|f| Decoder::new(BufReader::new(f)).map_err(|e| e.to_string()));

                match decoded {
                    Ok(decoder) => {
                        let duration_ms = decoder.total_duration().map(|d| d.as_millis() as u64);
                        let new_sink = Sink::connect_new(stream.mixer());
                        new_sink.set_volume(volume);
                        new_sink.append(decoder);
                        new_sink.pause();

                        let mut st = status.lock().unwrap_or_else(|p| p.into_inner());
                        st.has_media = true;
                        st.finished = false;
                        st.position_ms = 0;
                        st.duration_ms = duration_ms;
                        drop(st);

                        debug!("Loaded {} ({:?} ms)", path.display(), duration_ms);
                        sink = Some(new_sink);
                    }
                    Err(e) => {
                        warn!("Decode failed for {}: {}", path.display(), e);
                        let mut st = status.lock().unwrap_or_else(|p| p.into_inner());
                        *st = EngineStatus::default();
                    }
                }
            }
            Ok(AudioCommand::Play) => {
                if let Some(sink) = &sink {
                    sink.play();
                }
            }
            Ok(AudioCommand::Pause) => {
                if let Some(sink) = &sink {
                    sink.pause();
                }
            }
            Ok(AudioCommand::Stop) => {
                if let Some(old) = sink.take() {
                    old.stop();
                }
                let mut st = status.lock().unwrap_or_else(|p| p.into_inner());
                *st = EngineStatus::default();
            }
            Ok(AudioCommand::Seek(ms)) => {
                if let Some(sink) = &sink {
                    if sink.try_seek(Duration::from_millis(ms)).is_err() {
                        warn!("Seek to {ms}ms failed (decoder may not support it)");
                    }
                }
            }
            Ok(AudioCommand::SetVolume(v)) => {
                volume = v.clamp(0.0, 1.0);
                if let Some(sink) = &sink {
                    sink.set_volume(volume);
                }
            }
            Ok(AudioCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        if let Some(current) = &sink {
            let mut st = status.lock().unwrap_or_else(|p| p.into_inner());
            st.position_ms = current.get_pos().as_millis() as u64;
            if current.empty() {
                st.finished = true;
            }
        }
    }

    if let Some(old) = sink.take() {
        old.stop();
    }
    debug!("Audio thread shut down");
}
