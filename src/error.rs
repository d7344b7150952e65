//! Error kinds shared by the registry, the engine wrapper and both controllers.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Tag left the field before it could be read.
    #[error("Tag was not present when looking up its identifier")]
    NoTag,

    /// Tag is present but carries no NDEF message at all.
    #[error("Tag doesn't have a valid message, please try another tag")]
    NoMessage,

    /// Tag has a message, but no usable text record in it.
    #[error("Tag message does not contain an identifier")]
    NoIdentifier,

    #[error("No media path is registered for tag identifier {id}")]
    NoPath { id: String },

    #[error("Registry entry is not valid: identifier {id:?}, path {path:?}")]
    InvalidEntry { id: String, path: String },

    #[error("Engine did not reach {action} after {attempts} attempts")]
    PlaybackTimeout { action: &'static str, attempts: u32 },

    #[error("Writing to the tag failed: {0}")]
    TagWriteFailed(String),

    #[error("No reader found at {location} after {attempts} attempts, if one is present it may be occupied")]
    DeviceUnavailable { location: String, attempts: u32 },

    #[error("Media path does not exist: {0}")]
    MissingMedia(PathBuf),

    #[error("Malformed NDEF message: {0}")]
    Ndef(String),

    #[error("Playback engine error: {0}")]
    Engine(String),

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors a controller logs and loops on, as opposed to ones that end the process.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NoTag
                | Error::NoMessage
                | Error::NoIdentifier
                | Error::NoPath { .. }
                | Error::InvalidEntry { .. }
                | Error::PlaybackTimeout { .. }
                | Error::TagWriteFailed(_)
                | Error::MissingMedia(_)
                | Error::Ndef(_)
        )
    }
}
