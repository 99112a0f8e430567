//! Upload error codes as a typed enum.
//!
//! Gateways report the outcome of each file upload as a small integer code
//! alongside the file's temporary path. The codes cross the host boundary
//! unchanged, so their numeric values are fixed by the gateway convention:
//! `0` through `8`, with `5` reserved and unused.
//!
//! A non-[`Ok`](UploadError::Ok) code means the gateway never produced a
//! usable temporary file; [`UploadedFile`](crate::UploadedFile) enforces that
//! by refusing stream access for such slots.

use std::fmt;

/// Per-file upload outcome reported by the host gateway.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum UploadError {
    Ok,              // 0 — upload succeeded
    ServerSizeLimit, // 1 — exceeds the server's configured size limit
    FormSizeLimit,   // 2 — exceeds the size limit declared by the form
    Partial,         // 3 — only partially received
    NoFile,          // 4 — the form slot was submitted empty
    NoTmpDir,        // 6 — no temporary directory to write into
    CantWrite,       // 7 — writing the temporary file failed
    ExtensionBlocked, // 8 — a server extension stopped the upload
}

impl UploadError {
    /// Returns the gateway wire code for this outcome.
    pub fn code(self) -> u8 {
        match self {
            Self::Ok               => 0,
            Self::ServerSizeLimit  => 1,
            Self::FormSizeLimit    => 2,
            Self::Partial          => 3,
            Self::NoFile           => 4,
            Self::NoTmpDir         => 6,
            Self::CantWrite        => 7,
            Self::ExtensionBlocked => 8,
        }
    }

    /// Parses a gateway wire code. `5` is reserved; it and anything above
    /// `8` return `None`.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::ServerSizeLimit),
            2 => Some(Self::FormSizeLimit),
            3 => Some(Self::Partial),
            4 => Some(Self::NoFile),
            6 => Some(Self::NoTmpDir),
            7 => Some(Self::CantWrite),
            8 => Some(Self::ExtensionBlocked),
            _ => None,
        }
    }

    /// The fixed human-readable message for this outcome.
    pub fn message(self) -> &'static str {
        match self {
            Self::Ok               => "the upload succeeded",
            Self::ServerSizeLimit  => "the uploaded file exceeds the size limit configured on the server",
            Self::FormSizeLimit    => "the uploaded file exceeds the size limit declared by the form",
            Self::Partial          => "the file was only partially uploaded",
            Self::NoFile           => "no file was submitted",
            Self::NoTmpDir         => "the server is missing a temporary directory",
            Self::CantWrite        => "the server failed to write the file to disk",
            Self::ExtensionBlocked => "a server extension stopped the file upload",
        }
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
