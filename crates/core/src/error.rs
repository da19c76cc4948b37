use std::time::Duration;

/// Result alias that carries the custom [`CodesongError`] type.
pub type Result<T> = std::result::Result<T, CodesongError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum CodesongError {
    /// The audio resource could not be retrieved: network failure or a
    /// non-success HTTP status.
    #[error("failed to fetch `{url}`: {reason}")]
    Fetch { url: String, reason: String },
    /// The retrieved bytes are not audio we know how to decode.
    #[error("failed to decode audio: {0}")]
    Decode(String),
    /// The output device could not be opened or written to.
    #[error("audio device error: {0}")]
    Device(String),
    /// Playback did not report that it started within the bounded wait.
    #[error("audio did not start within {} ms", .0.as_millis())]
    Timeout(Duration),
    #[error("failed to render banner: {0}")]
    Banner(String),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("{0}")]
    InvalidInput(&'static str),
    /// Free-form failure that does not belong to a particular stage.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl CodesongError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Name of the stage that failed, used when reporting to the console.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::Decode(_) => "decode",
            Self::Device(_) => "device",
            Self::Timeout(_) => "timeout",
            Self::Banner(_) => "banner",
            Self::Config(_) => "config",
            Self::InvalidInput(_) => "input",
            Self::Message(_) | Self::Io(_) => "player",
        }
    }

    /// Whether the error came out of the audio pipeline rather than the
    /// display itself.
    pub fn is_playback(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. } | Self::Decode(_) | Self::Device(_) | Self::Timeout(_)
        )
    }
}

impl From<&str> for CodesongError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for CodesongError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
