pub mod engine;
pub mod player;
pub mod scanner;
pub mod track;

pub use engine::{EngineState, MediaEngine};
#[cfg(feature = "audio")]
pub use engine::RodioEngine;
pub use player::{PlaybackController, PlayerEvent};
pub use scanner::MediaScanner;
pub use track::Track;

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Flac,
    Ogg,
    Mp4,
    Wav,
    Aiff,
    Unknown,
}

impl AudioFormat {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "mp3" => AudioFormat::Mp3,
            "flac" => AudioFormat::Flac,
            "ogg" | "oga" | "opus" => AudioFormat::Ogg,
            "mp4" | "m4a" | "aac" => AudioFormat::Mp4,
            "wav" => AudioFormat::Wav,
            "aif" | "aiff" => AudioFormat::Aiff,
            _ => AudioFormat::Unknown,
        }
    }
}

/// What a file on disk is, as far as building a playlist is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    Audio(AudioFormat),
    /// m3u, cue and friends. Never enqueued as a track.
    Playlist,
    Other,
}

const PLAYLIST_EXTENSIONS: [&str; 5] = ["m3u", "asx", "xspf", "b4s", "cue"];

/// Classifies by extension only; the file is not opened.
pub fn classify(path: &Path) -> FileClass {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return FileClass::Other;
    };

    if PLAYLIST_EXTENSIONS.iter().any(|p| ext.eq_ignore_ascii_case(p)) {
        return FileClass::Playlist;
    }

    match AudioFormat::from_extension(ext) {
        AudioFormat::Unknown => FileClass::Other,
        format => FileClass::Audio(format),
    }
}

pub fn is_audio_track(path: &Path) -> bool {
    matches!(classify(path), FileClass::Audio(_))
}
