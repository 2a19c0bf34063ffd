/// Result alias that carries the custom [`RetroDeskError`] type.
pub type Result<T> = std::result::Result<T, RetroDeskError>;

/// Common error type for the core crate.
///
/// Playback failures never reach the user interface as values: the
/// controller logs them and falls back to its last valid state. The type
/// still exists so that collaborators can report what went wrong.
#[derive(Debug, thiserror::Error)]
pub enum RetroDeskError {
    /// The audio output pipeline could not be created.
    #[error("audio output unavailable: {0}")]
    OutputUnavailable(String),
    /// A fetched resource could not be turned into a playable buffer.
    #[error("failed to decode `{uri}`: {reason}")]
    Decode { uri: String, reason: String },
    /// A resource could not be fetched at all.
    #[error("failed to fetch `{uri}`: {reason}")]
    Transport { uri: String, reason: String },
    /// An operation was attempted in a state that does not allow it.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("no track at index {index} (playlist has {len} tracks)")]
    UnknownTrack { index: usize, len: usize },
    #[error("unknown window `{0}`")]
    UnknownWindow(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Fft(#[from] realfft::FftError),
}

impl RetroDeskError {
    pub fn decode(uri: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    pub fn transport(uri: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transport {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid<T: Into<String>>(msg: T) -> Self {
        Self::InvalidOperation(msg.into())
    }
}
