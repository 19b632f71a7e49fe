// crates/tracker/src/errors.rs
//! Error taxonomy and the single-slot error sink.

use std::sync::Mutex;

use qpeptide_api::ApiError;
use thiserror::Error;
use tracing::warn;

/// Broad classification of a reported failure, used for display routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Network,
    Server,
    Timeout,
    PartialBatch,
}

/// Failures surfaced to the user through the [`ErrorSink`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackError {
    /// Input rejected client-side before any network call.
    #[error("{0}")]
    Validation(String),

    /// Transport failure; no HTTP status available.
    #[error("Unable to reach the server. Please check your connection.")]
    Network,

    /// Non-2xx response with an extracted message.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// The poll ceiling or the peptide-fetch ceiling elapsed.
    #[error("{0}")]
    Timeout(String),

    /// Some entries of a batch delete failed; the rest are not rolled back.
    #[error("{}", .failures.join("\n"))]
    PartialBatch { failures: Vec<String> },
}

impl TrackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackError::Validation(_) => ErrorKind::Validation,
            TrackError::Network => ErrorKind::Network,
            TrackError::Server { .. } => ErrorKind::Server,
            TrackError::Timeout(_) => ErrorKind::Timeout,
            TrackError::PartialBatch { .. } => ErrorKind::PartialBatch,
        }
    }

    /// Status code surfaced alongside the message; 0 means "no HTTP status".
    pub fn status_code(&self) -> u16 {
        match self {
            TrackError::Validation(_) => 400,
            TrackError::Network => 0,
            TrackError::Server { status, .. } => *status,
            TrackError::Timeout(_) => 0,
            TrackError::PartialBatch { .. } => 400,
        }
    }

    /// Map a client error onto the tracker taxonomy.
    pub fn from_api(err: ApiError) -> Self {
        match err {
            ApiError::Network(_) => TrackError::Network,
            ApiError::Server { status, message } => TrackError::Server { status, message },
        }
    }
}

/// Process-wide single-slot error channel.
///
/// Any component reports here; the UI observes and clears. Holds at most one
/// error — a new report overwrites the previous one.
pub struct ErrorSink {
    slot: Mutex<Option<TrackError>>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub fn report(&self, error: TrackError) {
        warn!(
            status_code = error.status_code(),
            kind = ?error.kind(),
            "{error}"
        );
        *self.lock() = Some(error);
    }

    /// The currently held error, if any.
    pub fn current(&self) -> Option<TrackError> {
        self.lock().clone()
    }

    /// Observe and clear in one step.
    pub fn take(&self) -> Option<TrackError> {
        self.lock().take()
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<TrackError>> {
        // A panic while holding the slot leaves plain data behind; recover it.
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ErrorSink {
    fn default() -> Self {
        Self::new()
    }
}
