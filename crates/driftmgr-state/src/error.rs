//! Parsing and analysis errors.

use std::fmt;

/// Errors surfaced while decoding a state document. The analyzer never
/// fails except by construction of a [`ParseError::Validation`] upstream
/// of it — it has no error variants of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The byte stream is not a JSON object of the expected top-level shape.
    InvalidFraming(String),
    /// A required field was missing or of the wrong type.
    SchemaViolation(String),
    /// The document's `version` field is an unsupported major version.
    VersionMismatch { found: u64, supported: &'static str },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidFraming(msg) => write!(f, "invalid framing: {msg}"),
            ParseError::SchemaViolation(msg) => write!(f, "schema violation: {msg}"),
            ParseError::VersionMismatch { found, supported } => {
                write!(f, "unsupported version {found}, expected one of {supported}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for driftmgr_core::DriftError {
    fn from(err: ParseError) -> Self {
        driftmgr_core::DriftError::Validation {
            message: err.to_string(),
        }
    }
}
