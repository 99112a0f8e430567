//! Unified error type.
//!
//! One error type for the whole crate, with a coarse [`ErrorKind`] split
//! callers can match on without caring which operation failed:
//!
//! - [`ErrorKind::InvalidArgument`] — the caller handed over something the
//!   request contract rejects (a malformed method, a non-structured parsed
//!   body, an unusable move destination).
//! - [`ErrorKind::InvalidState`] — the value itself refuses the operation
//!   (a failed upload's stream, a stream that was already consumed).
//! - [`ErrorKind::Io`] — the filesystem said no.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::upload_error::UploadError;

/// Any failure this crate can report.
#[derive(Debug)]
pub enum Error {
    /// A method, URI, or header fragment the `http` types reject.
    Http(http::Error),
    /// A parsed body that is neither a JSON object nor an array.
    ParsedBody,
    /// A move destination whose directory does not exist or is not writable.
    TargetDirectory(PathBuf),
    /// Stream access on a file whose upload already failed at the gateway.
    Upload(UploadError),
    /// Stream access after the stream was taken or the file was moved.
    Consumed,
    /// An underlying filesystem failure.
    Io(io::Error),
}

/// Coarse failure category, for callers that branch rather than report.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidState,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(_) | Self::ParsedBody | Self::TargetDirectory(_) => ErrorKind::InvalidArgument,
            Self::Upload(_) | Self::Consumed => ErrorKind::InvalidState,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(error) => write!(f, "{error}"),
            Self::ParsedBody => write!(f, "invalid parsed body"),
            Self::TargetDirectory(dir) => {
                write!(f, "the directory \"{}\" is not available", dir.display())
            }
            Self::Upload(error) => {
                write!(f, "the uploaded file has no stream due to upload error #{}: {error}", error.code())
            }
            Self::Consumed => write!(f, "the uploaded file stream was already consumed"),
            Self::Io(error) => write!(f, "io: {error}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(error) => Some(error),
            Self::Io(error) => Some(error),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<http::Error> for Error {
    fn from(error: http::Error) -> Self {
        Self::Http(error)
    }
}
