//! Error types for the `unanimate` crate.
//!
//! This module defines [`UnanimateError`], the unified error type returned by
//! all fallible operations in the crate. Errors carry enough context (paths,
//! frame ordinals, upstream messages) for a caller to build a useful message
//! without additional logging at the call site.

use std::{io::Error as IoError, path::PathBuf};

use thiserror::Error;

/// The unified error type for all `unanimate` operations.
///
/// Every public method that can fail returns `Result<T, UnanimateError>`.
/// None of these errors is retried internally; a corrupt frame or an
/// unreadable container will fail the same way on every attempt.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UnanimateError {
    /// The input container or the output directory does not exist.
    #[error("Not found: {path}")]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// The container header could not be read or its format is unknown.
    #[error("Failed to decode container at {path}: {reason}")]
    DecodeError {
        /// Path (or label) of the container.
        path: PathBuf,
        /// Underlying reason the header was rejected.
        reason: String,
    },

    /// A frame inside an otherwise readable container failed to decode.
    #[error("Failed to decode frame {ordinal}: {reason}")]
    FrameDecodeError {
        /// Zero-based ordinal of the frame that failed.
        ordinal: u64,
        /// Upstream decoder message.
        reason: String,
    },

    /// A decoded frame could not be encoded to the output format.
    #[error("Failed to encode frame {ordinal}: {reason}")]
    EncodeError {
        /// Zero-based ordinal of the frame that failed.
        ordinal: u64,
        /// Upstream encoder message.
        reason: String,
    },

    /// An I/O error occurred while reading or writing a file.
    #[error("I/O error at {path}: {source}")]
    IoError {
        /// The path being read or written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: IoError,
    },

    /// The ZIP writer rejected an entry or failed to finalize the archive.
    #[error("Archive error: {0}")]
    ArchiveError(String),

    /// The run was stopped through a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled after {completed} frame(s)")]
    Cancelled {
        /// Frames written before cancellation was observed.
        completed: u64,
    },
}

/// Flat discriminant of [`UnanimateError`], for callers that only need to
/// branch on the category (e.g. to pick an HTTP status code).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    NotFound,
    DecodeError,
    FrameDecodeError,
    EncodeError,
    IoError,
    ArchiveError,
    Cancelled,
}

impl UnanimateError {
    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            UnanimateError::NotFound { .. } => ErrorKind::NotFound,
            UnanimateError::DecodeError { .. } => ErrorKind::DecodeError,
            UnanimateError::FrameDecodeError { .. } => ErrorKind::FrameDecodeError,
            UnanimateError::EncodeError { .. } => ErrorKind::EncodeError,
            UnanimateError::IoError { .. } => ErrorKind::IoError,
            UnanimateError::ArchiveError(_) => ErrorKind::ArchiveError,
            UnanimateError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Frame ordinal the error is attached to, if any.
    pub fn ordinal(&self) -> Option<u64> {
        match self {
            UnanimateError::FrameDecodeError { ordinal, .. }
            | UnanimateError::EncodeError { ordinal, .. } => Some(*ordinal),
            _ => None,
        }
    }

    /// Wrap an I/O error, turning `ErrorKind::NotFound` into [`UnanimateError::NotFound`].
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: IoError) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            UnanimateError::NotFound { path }
        } else {
            UnanimateError::IoError { path, source }
        }
    }
}

impl From<zip::result::ZipError> for UnanimateError {
    fn from(error: zip::result::ZipError) -> Self {
        UnanimateError::ArchiveError(error.to_string())
    }
}
