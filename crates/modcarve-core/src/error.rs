//! Error types and exit code constants for modcarve.
//!
//! This module provides a unified error type (`CarveError`) for everything
//! that aborts a run: an invalid split plan, an unreadable workspace, or an
//! internal bug. Per-symbol and per-file problems during a run are *not*
//! errors; they are recorded as skips or findings in the stage reports and
//! the run continues.
//!
//! ## Error Code Mapping
//!
//! Exit codes are stable for scripting:
//! - `2`: Invalid arguments (bad plan, malformed request)
//! - `3`: Resolution errors (plan file or workspace not found)
//! - `10`: Internal errors (bugs, unexpected state)

use std::fmt;

use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output and process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad plan, malformed request).
    InvalidArguments = 2,
    /// Resolution errors (plan file or workspace not found).
    ResolutionError = 3,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
///
/// All subsystem failures are converted to this type before being rendered
/// as a JSON error response or a text diagnostic.
#[derive(Debug, Error)]
pub enum CarveError {
    /// The split plan failed validation or could not be parsed.
    #[error("invalid plan: {message}")]
    InvalidPlan { message: String },

    /// A required file or directory does not exist.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// An I/O operation on a specific path failed.
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    Internal { message: String },
}

pub type CarveResult<T> = Result<T, CarveError>;

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&CarveError> for OutputErrorCode {
    fn from(err: &CarveError) -> Self {
        match err {
            CarveError::InvalidPlan { .. } => OutputErrorCode::InvalidArguments,
            CarveError::NotFound { .. } => OutputErrorCode::ResolutionError,
            CarveError::Io { .. } => OutputErrorCode::InternalError,
            CarveError::Internal { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<CarveError> for OutputErrorCode {
    fn from(err: CarveError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl CarveError {
    /// Create an invalid plan error.
    pub fn invalid_plan(message: impl Into<String>) -> Self {
        CarveError::InvalidPlan {
            message: message.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        CarveError::NotFound { path: path.into() }
    }

    /// Create an I/O error tied to a path.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        CarveError::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        CarveError::Internal {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod error_code_mapping {
        use super::*;

        #[test]
        fn invalid_plan_maps_to_invalid_arguments() {
            let err = CarveError::invalid_plan("duplicate module file 'utils.js'");
            assert_eq!(
                OutputErrorCode::from(&err),
                OutputErrorCode::InvalidArguments
            );
            assert_eq!(err.error_code().code(), 2);
        }

        #[test]
        fn not_found_maps_to_resolution_error() {
            let err = CarveError::not_found("modcarve.json");
            assert_eq!(OutputErrorCode::from(&err), OutputErrorCode::ResolutionError);
            assert_eq!(err.error_code().code(), 3);
        }

        #[test]
        fn io_maps_to_internal_error() {
            let err = CarveError::io(
                "js_modules/utils.js",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            );
            assert_eq!(OutputErrorCode::from(&err), OutputErrorCode::InternalError);
            assert_eq!(err.error_code().code(), 10);
        }

        #[test]
        fn internal_maps_to_internal_error() {
            let err = CarveError::internal("unexpected state");
            assert_eq!(err.error_code().code(), 10);
        }
    }

    mod display {
        use super::*;

        #[test]
        fn invalid_plan_message_includes_detail() {
            let err = CarveError::invalid_plan("sources must not be empty");
            assert_eq!(err.to_string(), "invalid plan: sources must not be empty");
        }

        #[test]
        fn not_found_message_includes_path() {
            let err = CarveError::not_found("js/core.js");
            assert_eq!(err.to_string(), "not found: js/core.js");
        }
    }
}
