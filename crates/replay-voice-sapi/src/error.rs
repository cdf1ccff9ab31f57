//! Failures at the COM boundary and their `HRESULT` mapping.

use crate::ffi_types::{HRESULT, S_OK};
use replay_voice_core::{EngineError, StatusCode};
use std::any::Any;
use thiserror::Error;

/// Errors raised while translating a host call
#[derive(Error, Debug)]
pub enum BoundaryError {
    /// A required pointer argument was null
    #[error("Null pointer passed for {argument}")]
    NullPointer { argument: &'static str },

    /// An argument could not be interpreted
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The engine panicked inside a host call
    #[error("Engine panicked: {message}")]
    Panic { message: String },

    /// Failure reported by the engine
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl BoundaryError {
    /// Null pointer for the named argument
    #[must_use]
    pub const fn null(argument: &'static str) -> Self {
        Self::NullPointer { argument }
    }

    /// Invalid argument with a description
    #[must_use]
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::Panic { message }
    }

    /// Status code returned to the host
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NullPointer { .. } => StatusCode::POINTER,
            Self::InvalidArgument { .. } => StatusCode::INVALID_ARG,
            Self::Panic { .. } => StatusCode::UNEXPECTED,
            Self::Engine(e) => e.status_code(),
        }
    }
}

/// Conversion of a boundary outcome into the value returned to the host
pub trait IntoHResult {
    /// `S_OK` on success, the mapped failure code otherwise
    fn into_hresult(self) -> HRESULT;
}

impl IntoHResult for Result<(), BoundaryError> {
    fn into_hresult(self) -> HRESULT {
        match self {
            Ok(()) => S_OK,
            Err(e) => {
                let status = e.status_code();
                tracing::warn!("Returning {} to host: {}", status, e);
                status.raw()
            }
        }
    }
}

/// Result of translating one host call
pub type BoundaryResult<T> = std::result::Result<T, BoundaryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(BoundaryError::null("ppv").status_code(), StatusCode::POINTER);
        assert_eq!(
            BoundaryError::invalid_argument("bad").status_code(),
            StatusCode::INVALID_ARG
        );
        assert_eq!(
            BoundaryError::from(EngineError::MissingToken).status_code(),
            StatusCode::UNINITIALIZED
        );
        let rejected: BoundaryResult<()> = Err(BoundaryError::from(EngineError::SinkRejected {
            status: StatusCode(0x8004_5003_u32 as i32),
        }));
        assert_eq!(rejected.into_hresult(), 0x8004_5003_u32 as i32);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        let err = BoundaryError::from_panic(payload.as_ref());
        assert_eq!(err.to_string(), "Engine panicked: boom");
        assert_eq!(err.status_code(), StatusCode::UNEXPECTED);
    }

    #[test]
    fn test_ok_is_s_ok() {
        let ok: BoundaryResult<()> = Ok(());
        assert_eq!(ok.into_hresult(), S_OK);
    }
}
