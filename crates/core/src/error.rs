//! Error taxonomy shared by the session and the audit trail.
//!
//! Per-statement failures are wrapped in [`RitualError`]; each maps to a
//! serializable [`ErrorKind`] that audit records carry. Failures that must stop a
//! session from starting at all are [`SessionInitError`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::anchors::AnchorError;
use crate::archive::NotFoundError;
use crate::bandwidth::BandwidthError;
use crate::syntax::SyntaxError;
use crate::voice::UnknownPersonaError;

/// Failure reported by an external collaborator (voice responder or memory archive).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("dispatch cancelled")]
    Cancelled,
    #[error("dispatch timed out after {after_ms} ms")]
    TimedOut { after_ms: u64 },
    #[error("collaborator failed: {0}")]
    Failed(String),
}

/// Audit-facing tag for an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Syntax,
    Anchor,
    Bandwidth,
    UnknownPersona,
    NotFound,
    Cancelled,
    TimedOut,
    CollaboratorFailed,
    SessionClosed,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Syntax => "syntax",
            ErrorKind::Anchor => "anchor",
            ErrorKind::Bandwidth => "bandwidth",
            ErrorKind::UnknownPersona => "unknown_persona",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::TimedOut => "timed_out",
            ErrorKind::CollaboratorFailed => "collaborator_failed",
            ErrorKind::SessionClosed => "session_closed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RitualError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Anchor(#[from] AnchorError),
    #[error(transparent)]
    Bandwidth(#[from] BandwidthError),
    #[error(transparent)]
    UnknownPersona(#[from] UnknownPersonaError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// The session was closed; nothing was processed or audited.
    #[error("session is closed")]
    SessionClosed,
}

impl RitualError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RitualError::Syntax(_) => ErrorKind::Syntax,
            RitualError::Anchor(_) => ErrorKind::Anchor,
            RitualError::Bandwidth(_) => ErrorKind::Bandwidth,
            RitualError::UnknownPersona(_) => ErrorKind::UnknownPersona,
            RitualError::NotFound(_) => ErrorKind::NotFound,
            RitualError::Dispatch(DispatchError::Cancelled) => ErrorKind::Cancelled,
            RitualError::Dispatch(DispatchError::TimedOut { .. }) => ErrorKind::TimedOut,
            RitualError::Dispatch(DispatchError::Failed(_)) => ErrorKind::CollaboratorFailed,
            RitualError::SessionClosed => ErrorKind::SessionClosed,
        }
    }
}

/// Fatal errors raised while constructing a session.
#[derive(Debug, Error)]
pub enum SessionInitError {
    #[error("unsupported digest algorithm '{0}'; only sha256 is available")]
    UnsupportedDigest(String),

    #[error("invalid interpreter configuration: {0}")]
    InvalidConfig(String),

    #[error("audit chain corrupted at sequence {sequence}: {reason}")]
    ChainCorrupted { sequence: u64, reason: String },

    #[error("malformed audit log entry on line {line}: {source}")]
    MalformedLog {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("audit log I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
