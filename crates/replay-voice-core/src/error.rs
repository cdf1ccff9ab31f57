//! Error types for the Replay Voice engine.

use crate::status::StatusCode;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Main error type for engine operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The canned audio payload could not be loaded
    #[error("Audio payload load failed: {message}")]
    PayloadLoad {
        /// Error message describing the failure
        message: String,
    },

    /// Memory for an out-parameter or the payload could not be allocated
    #[error("Memory allocation error: {message}")]
    Allocation {
        /// Error message describing the allocation failure
        message: String,
    },

    /// The output site refused the pushed events
    #[error("Output site rejected events with status {status}")]
    SinkRejected {
        /// Status returned by the site
        status: StatusCode,
    },

    /// The output site failed the audio write outright
    #[error("Output site write failed with status {status}")]
    WriteFailed {
        /// Status returned by the site
        status: StatusCode,
    },

    /// The output site accepted fewer bytes than requested and strict writes are enabled
    #[error("Short write: {written} of {requested} bytes accepted")]
    ShortWrite {
        /// Bytes handed to the site
        requested: u32,
        /// Bytes the site reported as written
        written: u32,
    },

    /// No object token has been associated with the engine
    #[error("No object token has been set")]
    MissingToken,

    /// Invalid input error
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message describing the invalid input
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Error message describing the configuration issue
        message: String,
    },

    /// File I/O error
    #[error("File I/O error: {message}")]
    FileError {
        /// Error message describing the file operation failure
        message: String,
    },
}

impl EngineError {
    /// Create a new payload load error
    #[must_use]
    pub fn payload<S: Into<String>>(message: S) -> Self {
        Self::PayloadLoad {
            message: message.into(),
        }
    }

    /// Create a new allocation error
    #[must_use]
    pub fn allocation<S: Into<String>>(message: S) -> Self {
        Self::Allocation {
            message: message.into(),
        }
    }

    /// Create a new invalid input error
    #[must_use]
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    #[must_use]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a new file error
    #[must_use]
    pub fn file<S: Into<String>>(message: S) -> Self {
        Self::FileError {
            message: message.into(),
        }
    }

    /// Status code the host receives for this error.
    ///
    /// Statuses that originated at the output site are passed through unchanged.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::SinkRejected { status } | Self::WriteFailed { status } => *status,
            Self::Allocation { .. } => StatusCode::OUT_OF_MEMORY,
            Self::MissingToken => StatusCode::UNINITIALIZED,
            Self::InvalidInput { .. } => StatusCode::INVALID_ARG,
            Self::PayloadLoad { .. }
            | Self::ShortWrite { .. }
            | Self::ConfigurationError { .. }
            | Self::FileError { .. } => StatusCode::FAIL,
        }
    }

    /// Whether the failure was reported by the host's output site
    #[must_use]
    pub const fn is_site_error(&self) -> bool {
        matches!(
            self,
            Self::SinkRejected { .. } | Self::WriteFailed { .. } | Self::ShortWrite { .. }
        )
    }

    /// Get the error category for logging
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::PayloadLoad { .. } => "payload",
            Self::Allocation { .. } => "allocation",
            Self::SinkRejected { .. } => "sink_rejected",
            Self::WriteFailed { .. } => "write_failed",
            Self::ShortWrite { .. } => "short_write",
            Self::MissingToken => "missing_token",
            Self::InvalidInput { .. } => "input",
            Self::ConfigurationError { .. } => "configuration",
            Self::FileError { .. } => "file",
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::file(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        Self::configuration(format!("TOML parse error: {err}"))
    }
}
