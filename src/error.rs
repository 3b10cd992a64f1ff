//! Unified error type and stable error codes.
//!
//! Each subsystem carries its own error enum (`IdentError`, `WireError`,
//! `MutateError`, `SessionError`). This module bridges them into a single
//! [`PbxError`] suitable for CLI-style consumers, with a stable integer
//! [`ErrorCode`] per failure class and a fatal/recoverable split: parse
//! failures and identifier-space exhaustion kill the run, a missing target
//! only fails the one operation.

use std::fmt;

use thiserror::Error;

use crate::graph::WireError;
use crate::ident::IdentError;
use crate::mutate::MutateError;
use crate::session::{LoadError, ParseFailure, SessionError, WriteFailure};

// ============================================================================
// Error Codes
// ============================================================================

/// Stable integer codes, one per failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    /// The document could not be loaded (parse failure, malformed shape,
    /// cancelled or vanished worker).
    ParseFailure = 2,
    /// A named group or build phase does not exist (or is the wrong type).
    TargetNotFound = 3,
    /// The writer collaborator failed.
    WriteFailure = 4,
    /// An operation ran before the session was ready.
    NotReady = 5,
    /// Internal errors: identifier-space exhaustion, unexpected state.
    Internal = 10,
}

impl ErrorCode {
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type bridging every subsystem.
#[derive(Debug, Error)]
pub enum PbxError {
    /// The reader collaborator rejected the document, the wire shape was
    /// malformed, or the load was abandoned.
    #[error("load failed: {message}")]
    LoadFailed { message: String },

    /// A named group or build phase was not found.
    #[error("no {section} entry named '{name}'")]
    TargetNotFound { section: String, name: String },

    /// A named target exists but is the wrong record type.
    #[error("'{name}' in {section} is not a {expected}")]
    WrongRecordKind {
        section: String,
        name: String,
        expected: &'static str,
    },

    /// Identifier allocation exhausted its retry cap.
    #[error("identifier space exhausted after {attempts} attempts")]
    IdentifierSpaceExhausted { attempts: usize },

    /// The writer collaborator failed.
    #[error("write failed: {message}")]
    WriteFailed { message: String },

    /// The session has not reached ready.
    #[error("document is not ready")]
    NotReady,
}

impl PbxError {
    /// The stable code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            PbxError::LoadFailed { .. } => ErrorCode::ParseFailure,
            PbxError::TargetNotFound { .. } => ErrorCode::TargetNotFound,
            PbxError::WrongRecordKind { .. } => ErrorCode::TargetNotFound,
            PbxError::IdentifierSpaceExhausted { .. } => ErrorCode::Internal,
            PbxError::WriteFailed { .. } => ErrorCode::WriteFailure,
            PbxError::NotReady => ErrorCode::NotReady,
        }
    }

    /// Fatal errors should end the consuming process; the rest fail one
    /// operation and leave the document intact.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.error_code(),
            ErrorCode::ParseFailure | ErrorCode::Internal
        )
    }
}

// ============================================================================
// Bridges
// ============================================================================

impl From<IdentError> for PbxError {
    fn from(err: IdentError) -> Self {
        match err {
            IdentError::SpaceExhausted { attempts } => {
                PbxError::IdentifierSpaceExhausted { attempts }
            }
        }
    }
}

impl From<WireError> for PbxError {
    fn from(err: WireError) -> Self {
        PbxError::LoadFailed {
            message: err.to_string(),
        }
    }
}

impl From<MutateError> for PbxError {
    fn from(err: MutateError) -> Self {
        match err {
            MutateError::TargetNotFound { section, name } => {
                PbxError::TargetNotFound { section, name }
            }
            MutateError::WrongRecordKind {
                section,
                name,
                expected,
            } => PbxError::WrongRecordKind {
                section,
                name,
                expected,
            },
            MutateError::Ident(err) => err.into(),
        }
    }
}

impl From<ParseFailure> for PbxError {
    fn from(err: ParseFailure) -> Self {
        PbxError::LoadFailed {
            message: err.to_string(),
        }
    }
}

impl From<WriteFailure> for PbxError {
    fn from(err: WriteFailure) -> Self {
        PbxError::WriteFailed {
            message: err.to_string(),
        }
    }
}

impl From<LoadError> for PbxError {
    fn from(err: LoadError) -> Self {
        PbxError::LoadFailed {
            message: err.to_string(),
        }
    }
}

impl From<SessionError> for PbxError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotReady => PbxError::NotReady,
            SessionError::Load(err) => err.into(),
            SessionError::Timeout { timeout_ms } => PbxError::LoadFailed {
                message: format!("parse did not complete within {timeout_ms}ms"),
            },
            SessionError::Write(err) => err.into(),
            SessionError::Mutate(err) => err.into(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
