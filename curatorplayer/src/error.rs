//! Error types for the Curator player

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving, loading or persisting tracks
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Track store failure
    #[error("Track store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// JSON (de)serialization failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The audio source cannot be reached
    #[error("Audio source {uri} is unreachable: {reason}")]
    Unreachable { uri: String, reason: String },

    /// The track is not in the store
    #[error("Unknown track: {0}")]
    UnknownTrack(String),

    /// The sound resource could not be built or driven
    #[error("Sound error: {0}")]
    Sound(String),
}

impl Error {
    pub fn unreachable(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unreachable {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    pub fn sound(msg: impl Into<String>) -> Self {
        Self::Sound(msg.into())
    }
}
