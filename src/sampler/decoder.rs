//! Snapshot decoding
//!
//! Turns the text of one frame into a [`MetricsSnapshot`]. Decoding is strict
//! about JSON syntax and about the types of known fields, but permissive
//! about presence: every missing or `null` group or field takes its zero
//! value, and unknown fields are skipped. Values are not range-checked.

use crate::types::MetricsSnapshot;
use serde_json::error::Category;
use thiserror::Error;

/// Why a frame could not be decoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} error at line {line} column {column}: {message}")]
pub struct DecodeError {
    /// Broad classification of the failure
    pub kind: DecodeErrorKind,
    /// 1-based line within the frame (frames are normally a single line)
    pub line: usize,
    /// 1-based column within the frame
    pub column: usize,
    /// Decoder message
    pub message: String,
}

/// Classification of a decode failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Text is not valid JSON
    Syntax,
    /// Valid JSON, but a known field has the wrong type
    Type,
    /// Text ended in the middle of a value
    Truncated,
    /// Failure reading the input
    Io,
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeErrorKind::Syntax => write!(f, "syntax"),
            DecodeErrorKind::Type => write!(f, "type"),
            DecodeErrorKind::Truncated => write!(f, "truncated input"),
            DecodeErrorKind::Io => write!(f, "io"),
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        let kind = match err.classify() {
            Category::Syntax => DecodeErrorKind::Syntax,
            Category::Data => DecodeErrorKind::Type,
            Category::Eof => DecodeErrorKind::Truncated,
            Category::Io => DecodeErrorKind::Io,
        };
        Self {
            kind,
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}

/// Decode one frame into a snapshot
pub fn decode_snapshot(frame: &str) -> Result<MetricsSnapshot, DecodeError> {
    serde_json::from_str(frame).map_err(DecodeError::from)
}
