//! Playlist index built from the on-disk music library
//!
//! The library is a directory tree keyed by emotion then language:
//! `<root>/<Emotion>/<Language>/*.mp3`. The index is built once at startup
//! and is read-only afterwards; `resolve` is a total function over the two
//! closed enumerations, so a lookup can never fail. Absent directories
//! simply yield empty playlists.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, warn};

use moodplay_common::{Emotion, Language, Playlist, Track};

/// Audio file extensions recognized by the scan
const AUDIO_EXTENSIONS: [&str; 4] = ["mp3", "flac", "ogg", "wav"];

/// Total mapping from (Emotion, Language) to an ordered playlist
pub struct PlaylistIndex {
    playlists: HashMap<(Emotion, Language), Playlist>,
}

impl PlaylistIndex {
    /// Scan the library root and build the index
    ///
    /// A missing root or missing subdirectories are not errors; the
    /// affected pairs resolve to empty playlists.
    pub fn scan(root: &Path) -> Self {
        if !root.exists() {
            warn!("Music library root {} does not exist", root.display());
        }

        let mut playlists = HashMap::new();
        let mut total_tracks = 0usize;

        for emotion in Emotion::ALL {
            for language in Language::ALL {
                let dir = root.join(emotion.as_str()).join(language.as_str());
                let tracks = scan_dir(&dir);
                if !tracks.is_empty() {
                    debug!(
                        "{}/{}: {} track(s)",
                        emotion,
                        language,
                        tracks.len()
                    );
                }
                total_tracks += tracks.len();
                playlists.insert((emotion, language), Playlist::new(tracks));
            }
        }

        info!(
            "Library scan complete: {} tracks under {}",
            total_tracks,
            root.display()
        );
        Self { playlists }
    }

    /// Build an index directly from pre-assembled playlists (tests)
    pub fn from_playlists(entries: Vec<(Emotion, Language, Playlist)>) -> Self {
        let mut playlists = HashMap::new();
        for (emotion, language, playlist) in entries {
            playlists.insert((emotion, language), playlist);
        }
        Self { playlists }
    }

    /// Look up the playlist for an (emotion, language) pair
    ///
    /// Total: unknown pairs yield an empty playlist.
    pub fn resolve(&self, emotion: Emotion, language: Language) -> Playlist {
        self.playlists
            .get(&(emotion, language))
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of indexed tracks
    pub fn track_count(&self) -> usize {
        self.playlists.values().map(|p| p.len()).sum()
    }
}

/// Collect the audio files in one directory, sorted by file name
///
/// Sorting makes discovery order stable across platforms; readdir order is
/// not guaranteed.
fn scan_dir(dir: &Path) -> Vec<Track> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    paths.into_iter().map(Track::from_path).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn resolve_is_total_over_missing_pairs() {
        let tmp = tempfile::tempdir().unwrap();
        let index = PlaylistIndex::scan(tmp.path());

        for emotion in Emotion::ALL {
            for language in Language::ALL {
                assert!(index.resolve(emotion, language).is_empty());
            }
        }
    }

    #[test]
    fn resolve_is_total_when_root_is_missing() {
        let index = PlaylistIndex::scan(Path::new("/nonexistent/moodplay/library"));
        assert!(index.resolve(Emotion::Happy, Language::English).is_empty());
        assert_eq!(index.track_count(), 0);
    }

    #[test]
    fn scan_picks_up_audio_files_in_name_order() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("Sad").join("English");
        touch(&dir.join("s2.mp3"));
        touch(&dir.join("s1.mp3"));
        touch(&dir.join("cover.jpg"));

        let index = PlaylistIndex::scan(tmp.path());
        let playlist = index.resolve(Emotion::Sad, Language::English);

        assert_eq!(playlist.len(), 2);
        assert_eq!(playlist.get(0).unwrap().title, "s1");
        assert_eq!(playlist.get(1).unwrap().title, "s2");

        // Other pairs remain empty
        assert!(index.resolve(Emotion::Sad, Language::Tamil).is_empty());
        assert!(index.resolve(Emotion::Happy, Language::English).is_empty());
    }
}
