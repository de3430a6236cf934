//! Domain types shared across moodplay crates
//!
//! The two closed enumerations (Emotion, Language) key every playlist
//! lookup, so both carry a complete `ALL` table for building total maps.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emotion label produced by the face classifier
///
/// Fixed closed set matching the classifier's seven output classes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Neutral,
    Sad,
    Surprise,
}

impl Emotion {
    /// All emotion labels in classifier output order
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Neutral,
        Emotion::Sad,
        Emotion::Surprise,
    ];

    /// Label string, also the library subdirectory name for this emotion
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "Angry",
            Emotion::Disgust => "Disgust",
            Emotion::Fear => "Fear",
            Emotion::Happy => "Happy",
            Emotion::Neutral => "Neutral",
            Emotion::Sad => "Sad",
            Emotion::Surprise => "Surprise",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emotion::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| crate::Error::InvalidInput(format!("unknown emotion: {s}")))
    }
}

/// Song language selection
///
/// Independent of the detected emotion; selectable at any time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Language {
    Telugu,
    Tamil,
    English,
}

impl Language {
    /// All supported languages
    pub const ALL: [Language; 3] = [Language::Telugu, Language::Tamil, Language::English];

    /// Label string, also the library subdirectory name for this language
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Telugu => "Telugu",
            Language::Tamil => "Tamil",
            Language::English => "English",
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::English
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| crate::Error::InvalidInput(format!("unknown language: {s}")))
    }
}

/// One playable track in the library
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    /// Stable identifier assigned at scan time
    pub id: Uuid,
    /// Display name (file stem)
    pub title: String,
    /// Backing audio file
    pub path: PathBuf,
}

impl Track {
    /// Create a track for an audio file path
    pub fn from_path(path: PathBuf) -> Self {
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            id: Uuid::new_v4(),
            title,
            path,
        }
    }
}

/// Ordered track sequence for one (Emotion, Language) pair
///
/// Immutable after the startup library scan. Insertion order is discovery
/// order. May be empty; lookups always produce a playlist, never an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Playlist {
    tracks: Vec<Track>,
}

impl Playlist {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }
}

/// Raw on-disk form of a history entry: (timestamp, emotion, language)
type RawHistoryEntry = (String, String, String);

/// One detection-to-playback event in a user's history
///
/// Serialized as a (timestamp-string, emotion-string, language-string)
/// triple for lossless round-trips with the history file format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawHistoryEntry", into = "RawHistoryEntry")]
pub struct HistoryEntry {
    /// Wall-clock timestamp, "YYYY-MM-DD HH:MM:SS"
    pub timestamp: String,
    /// Emotion detected for this session
    pub emotion: Emotion,
    /// Language selected when playback was triggered
    pub language: Language,
}

impl TryFrom<RawHistoryEntry> for HistoryEntry {
    type Error = crate::Error;

    fn try_from((timestamp, emotion, language): RawHistoryEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            timestamp,
            emotion: emotion.parse()?,
            language: language.parse()?,
        })
    }
}

impl From<HistoryEntry> for RawHistoryEntry {
    fn from(entry: HistoryEntry) -> Self {
        (
            entry.timestamp,
            entry.emotion.to_string(),
            entry.language.to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emotion_round_trips_through_label() {
        for emotion in Emotion::ALL {
            assert_eq!(emotion.as_str().parse::<Emotion>().unwrap(), emotion);
        }
    }

    #[test]
    fn unknown_emotion_label_is_rejected() {
        assert!("Bored".parse::<Emotion>().is_err());
    }

    #[test]
    fn language_defaults_to_english() {
        assert_eq!(Language::default(), Language::English);
    }

    #[test]
    fn track_title_is_file_stem() {
        let track = Track::from_path(PathBuf::from("/music/Happy/English/s1.mp3"));
        assert_eq!(track.title, "s1");
    }

    #[test]
    fn history_entry_serializes_as_triple() {
        let entry = HistoryEntry {
            timestamp: "2024-03-01 10:30:00".to_string(),
            emotion: Emotion::Sad,
            language: Language::English,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"["2024-03-01 10:30:00","Sad","English"]"#);

        let back: HistoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn malformed_history_entry_fails_to_parse() {
        let err = serde_json::from_str::<HistoryEntry>(r#"["now","Sleepy","English"]"#);
        assert!(err.is_err());
    }
}
