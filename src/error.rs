//! Error types for walrog
//!
//! Provides a unified error type for all log operations. Every variant falls
//! into one of three categories (configuration, I/O, corruption) so callers
//! can decide whether a retry makes sense.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::wal::Lsn;

/// Result type alias using WalError
pub type Result<T> = std::result::Result<T, WalError>;

/// Unified error type for walrog operations
#[derive(Debug, Error)]
pub enum WalError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Segment IO error on {}: {source}", .path.display())]
    Segment {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Flush of {buffered} buffered bytes failed: {source}")]
    Flush {
        buffered: usize,
        #[source]
        source: io::Error,
    },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Encoding error: payload of {len} bytes does not fit a 32-bit length field")]
    Encoding { len: usize },

    #[error("Record too large: encoded size {size} exceeds buffer size {limit}")]
    RecordTooLarge { size: usize, limit: u32 },

    #[error("Invalid LSN range: first {first} is after last {last}")]
    InvalidRange { first: Lsn, last: Lsn },

    // -------------------------------------------------------------------------
    // Corruption Errors
    // -------------------------------------------------------------------------
    #[error("Truncated record at offset {offset}: expected {expected} bytes, found {found}")]
    TruncatedRecord { offset: u64, expected: u64, found: u64 },

    #[error(
        "Checksum mismatch at offset {offset} (lsn {lsn}): stored {stored:#010x}, computed {computed:#010x}"
    )]
    ChecksumMismatch {
        offset: u64,
        lsn: Lsn,
        stored: u32,
        computed: u32,
    },
}

/// Coarse classification of a [`WalError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad options or an unrepresentable request. Never retried.
    Configuration,
    /// The filesystem failed. Buffered data is retained, safe to retry.
    Io,
    /// A segment failed validation. The scan stops here.
    Corruption,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Io => write!(f, "io"),
            ErrorCategory::Corruption => write!(f, "corruption"),
        }
    }
}

impl WalError {
    /// Wrap an I/O error with the segment path it happened on
    pub(crate) fn segment(path: impl Into<PathBuf>, source: io::Error) -> Self {
        WalError::Segment {
            path: path.into(),
            source,
        }
    }

    /// Category this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            WalError::Io(_) | WalError::Segment { .. } | WalError::Flush { .. } => {
                ErrorCategory::Io
            }
            WalError::Config(_)
            | WalError::Encoding { .. }
            | WalError::RecordTooLarge { .. }
            | WalError::InvalidRange { .. } => ErrorCategory::Configuration,
            WalError::TruncatedRecord { .. } | WalError::ChecksumMismatch { .. } => {
                ErrorCategory::Corruption
            }
        }
    }

    /// Whether a segment failed validation
    pub fn is_corruption(&self) -> bool {
        self.category() == ErrorCategory::Corruption
    }

    /// Whether the same call may succeed if issued again
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Io
    }
}
