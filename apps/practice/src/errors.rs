use thiserror::Error;

use crate::capture::CaptureError;
use crate::client::ServiceError;
use crate::session::Phase;

/// How a failure should be treated by whoever drives a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Non-fatal; the caller may simply ignore it.
    InputRejected,
    /// The capture device refused access.
    Permission,
    /// The remote question/evaluation service failed.
    Remote,
    /// Bad user input caught before anything was sent.
    Validation,
    Internal,
}

/// Crate-level error type.
/// Every session operation returns `Result<T, PracticeError>`.
#[derive(Debug, Error)]
pub enum PracticeError {
    #[error("A session is already in progress ({0})")]
    AlreadyInProgress(Phase),

    #[error("Not permitted: {0}")]
    NotPermitted(String),

    #[error("Session is not accepting input")]
    NotAcceptingInput,

    #[error("Submission requires every question answered ({answered}/{total})")]
    Incomplete { answered: usize, total: usize },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Capture device error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Remote service error: {0}")]
    Remote(#[from] ServiceError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PracticeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PracticeError::AlreadyInProgress(_)
            | PracticeError::NotPermitted(_)
            | PracticeError::NotAcceptingInput
            | PracticeError::Incomplete { .. } => ErrorKind::InputRejected,
            PracticeError::Validation(_) => ErrorKind::Validation,
            PracticeError::Capture(CaptureError::PermissionDenied) => ErrorKind::Permission,
            PracticeError::Capture(_) | PracticeError::Internal(_) => ErrorKind::Internal,
            PracticeError::Remote(_) => ErrorKind::Remote,
        }
    }

    /// Stable machine-readable code for the condition.
    pub fn code(&self) -> &'static str {
        match self {
            PracticeError::AlreadyInProgress(_) => "ALREADY_IN_PROGRESS",
            PracticeError::NotPermitted(_) => "NOT_PERMITTED",
            PracticeError::NotAcceptingInput => "NOT_ACCEPTING_INPUT",
            PracticeError::Incomplete { .. } => "INCOMPLETE",
            PracticeError::Validation(_) => "VALIDATION_ERROR",
            PracticeError::Capture(CaptureError::PermissionDenied) => "PERMISSION_DENIED",
            PracticeError::Capture(_) => "CAPTURE_ERROR",
            PracticeError::Remote(_) => "REMOTE_ERROR",
            PracticeError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message suitable for showing to the person practising.
    /// Device and service internals are logged, not shown.
    pub fn user_message(&self) -> String {
        match self {
            PracticeError::Capture(CaptureError::PermissionDenied) => {
                "Microphone access is required for this feature. Please allow microphone access and try again."
                    .to_string()
            }
            PracticeError::Capture(e) => {
                tracing::error!("Capture error: {e}");
                "Unable to access microphone. Please check permissions and try again.".to_string()
            }
            PracticeError::Remote(e) => {
                tracing::error!("Remote error: {e}");
                "The practice service could not be reached. Please try again.".to_string()
            }
            PracticeError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "Something went wrong. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// A cloneable snapshot of a failure, handed to session observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub message: String,
}

impl From<&PracticeError> for Report {
    fn from(err: &PracticeError) -> Self {
        Report {
            kind: err.kind(),
            code: err.code(),
            message: err.user_message(),
        }
    }
}
