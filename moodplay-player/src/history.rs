//! Per-user session history with JSON persistence
//!
//! Append-only during a session; cleared only on explicit user action.
//! Persisted as a mapping from username to an ordered list of
//! (timestamp, emotion, language) triples, written as a full overwrite.
//! An absent or corrupt file loads as an empty set rather than failing;
//! save failures are logged, never surfaced as blocking errors.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use moodplay_common::types::HistoryEntry;
use moodplay_common::{time, Emotion, Language};

use crate::error::{Error, Result};

/// Username → ordered detection-to-playback events
type HistorySet = HashMap<String, Vec<HistoryEntry>>;

/// History log for all known users, owned by the session coordinator
pub struct HistoryLog {
    path: PathBuf,
    entries: HistorySet,
}

impl HistoryLog {
    /// Load history from storage; tolerant of missing or corrupt files
    pub fn load(path: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HistorySet>(&raw) {
                Ok(entries) => {
                    debug!(
                        "Loaded history for {} user(s) from {}",
                        entries.len(),
                        path.display()
                    );
                    entries
                }
                Err(e) => {
                    warn!(
                        "Corrupt history file {}, starting empty: {}",
                        path.display(),
                        e
                    );
                    HistorySet::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No history file at {}, starting empty", path.display());
                HistorySet::new()
            }
            Err(e) => {
                warn!(
                    "Cannot read history file {}, starting empty: {}",
                    path.display(),
                    e
                );
                HistorySet::new()
            }
        };

        Self { path, entries }
    }

    /// Append an entry stamped with the current wall-clock time
    pub fn append(&mut self, username: &str, emotion: Emotion, language: Language) -> HistoryEntry {
        let entry = HistoryEntry {
            timestamp: time::history_timestamp(),
            emotion,
            language,
        };
        self.entries
            .entry(username.to_string())
            .or_default()
            .push(entry.clone());
        info!("History: {} felt {} ({})", username, emotion, language);
        entry
    }

    /// Truncate one user's history to empty
    pub fn clear(&mut self, username: &str) {
        if let Some(user_entries) = self.entries.get_mut(username) {
            user_entries.clear();
        }
    }

    /// Entries recorded for one user, oldest first
    pub fn entries_for(&self, username: &str) -> &[HistoryEntry] {
        self.entries
            .get(username)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Persist the full set as one overwrite
    pub fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("{}: {}", parent.display(), e)))?;
        }
        let body = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| Error::Storage(e.to_string()))?;
        std::fs::write(&self.path, body)
            .map_err(|e| Error::Storage(format!("{}: {}", self.path.display(), e)))?;
        debug!("History flushed to {}", self.path.display());
        Ok(())
    }
}
