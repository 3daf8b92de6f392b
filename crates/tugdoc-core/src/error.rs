// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Error types and error code constants for tugdoc.
//!
//! This module provides a unified error type (`TugdocError`) that bridges
//! domain-specific errors from the model builder and the batch driver into a
//! common format suitable for JSON output.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller)
//! - `3`: Resolution errors (input file or module not found)
//! - `10`: Internal errors (bugs, unexpected state)
//!
//! Recoverable anomalies in the analyzed source never surface here. They are
//! reported through [`crate::diagnostics`] and the build carries on.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed request).
    InvalidArguments = 2,
    /// Resolution errors (input not found, unknown module).
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
// Source Errors
// ============================================================================

/// A fatal failure to obtain a module's syntax tree.
///
/// These are the only failures that abort a single module's build. The
/// builder converts them into a terminal `ERRORED` state plus one diagnostic.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not be read at all.
    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The source was read but could not be parsed.
    #[error("cannot parse {origin}: {message}")]
    Unparseable { origin: String, message: String },
}

impl SourceError {
    /// Create an unparseable-source error.
    pub fn unparseable(origin: impl Into<String>, message: impl Into<String>) -> Self {
        SourceError::Unparseable {
            origin: origin.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
///
/// This is the canonical error type that all subsystem errors are converted to
/// before being rendered as JSON output.
#[derive(Debug, Error)]
pub enum TugdocError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Input path not found.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// A module name could not be placed in the package hierarchy.
    #[error("cannot register module '{name}': {reason}")]
    ModuleRegistration { name: String, reason: String },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&TugdocError> for OutputErrorCode {
    fn from(err: &TugdocError) -> Self {
        match err {
            TugdocError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            TugdocError::FileNotFound { .. } => OutputErrorCode::ResolutionError,
            TugdocError::ModuleRegistration { .. } => OutputErrorCode::ResolutionError,
            TugdocError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<TugdocError> for OutputErrorCode {
    fn from(err: TugdocError) -> Self {
        OutputErrorCode::from(&err)
    }
}

impl From<serde_json::Error> for TugdocError {
    fn from(err: serde_json::Error) -> Self {
        TugdocError::InvalidArguments {
            message: format!("JSON error: {}", err),
            details: None,
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl TugdocError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        TugdocError::InvalidArguments {
            message: message.into(),
            details: None,
        }
    }

    /// Create an invalid arguments error with JSON details.
    pub fn invalid_args_with_details(
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        TugdocError::InvalidArguments {
            message: message.into(),
            details: Some(details),
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        TugdocError::FileNotFound { path: path.into() }
    }

    /// Create a module registration error.
    pub fn module_registration(name: impl Into<String>, reason: impl Into<String>) -> Self {
        TugdocError::ModuleRegistration {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        TugdocError::InternalError {
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
        fn invalid_arguments_maps_to_invalid_arguments() {
            let err = TugdocError::invalid_args("missing input");
            assert_eq!(
                OutputErrorCode::from(&err),
                OutputErrorCode::InvalidArguments
            );
            assert_eq!(err.error_code().code(), 2);
        }

        #[test]
        fn file_not_found_maps_to_resolution_error() {
            let err = TugdocError::file_not_found("missing.json");
            assert_eq!(err.error_code(), OutputErrorCode::ResolutionError);
            assert_eq!(err.error_code().code(), 3);
        }

        #[test]
        fn module_registration_maps_to_resolution_error() {
            let err = TugdocError::module_registration("pkg.mod", "parent package missing");
            assert_eq!(err.error_code(), OutputErrorCode::ResolutionError);
        }

        #[test]
        fn internal_error_maps_to_internal_error() {
            let err = TugdocError::internal("unexpected state");
            assert_eq!(err.error_code(), OutputErrorCode::InternalError);
            assert_eq!(err.error_code().code(), 10);
        }

        #[test]
        fn json_error_converts_to_invalid_arguments() {
            let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
            let err = TugdocError::from(json_err);
            assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
        }
    }

    mod error_display {
        use super::*;

        #[test]
        fn module_registration_display() {
            let err = TugdocError::module_registration("a.b", "parent package 'a' is not registered");
            assert_eq!(
                err.to_string(),
                "cannot register module 'a.b': parent package 'a' is not registered"
            );
        }

        #[test]
        fn unparseable_source_display() {
            let err = SourceError::unparseable("mod.json", "unexpected token");
            assert_eq!(err.to_string(), "cannot parse mod.json: unexpected token");
        }

        #[test]
        fn unreadable_source_display_includes_path() {
            let err = SourceError::Unreadable {
                path: PathBuf::from("pkg/mod.json"),
                source: io::Error::new(io::ErrorKind::NotFound, "gone"),
            };
            assert_eq!(err.to_string(), "cannot read pkg/mod.json: gone");
        }
    }

    #[test]
    fn code_values_are_stable() {
        assert_eq!(OutputErrorCode::InvalidArguments.code(), 2);
        assert_eq!(OutputErrorCode::ResolutionError.code(), 3);
        assert_eq!(OutputErrorCode::InternalError.code(), 10);
        assert_eq!(format!("{}", OutputErrorCode::InternalError), "10");
    }
}
