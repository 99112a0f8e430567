//! Uploaded files as single-use resources.
//!
//! An [`UploadedFile`] couples gateway metadata (size, outcome code, the
//! client's filename and media type) with at most one consumable stream.
//! The stream can leave exactly once, through [`take_stream`] or [`move_to`];
//! every later attempt fails. Clones share the same stream slot, so consuming
//! through one clone consumes for all of them.
//!
//! [`take_stream`]: UploadedFile::take_stream
//! [`move_to`]: UploadedFile::move_to

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Error;
use crate::stream::UploadStream;
use crate::upload_error::UploadError;

/// Copy buffer size for [`UploadedFile::move_to`].
const MOVE_CHUNK: usize = 4096;

/// One file received by the gateway, with single-use stream semantics.
///
/// ```rust
/// use std::io::Read;
/// use genkan::{UploadStream, UploadedFile};
///
/// let file = UploadedFile::new(UploadStream::from_bytes("hi"))
///     .with_client_filename("greeting.txt");
///
/// let mut stream = file.take_stream().unwrap();
/// let mut contents = String::new();
/// stream.read_to_string(&mut contents).unwrap();
/// assert_eq!(contents, "hi");
///
/// // The stream is single-use.
/// assert!(file.take_stream().is_err());
/// ```
#[derive(Clone, Debug)]
pub struct UploadedFile {
    stream: Arc<Mutex<Option<UploadStream>>>,
    size: Option<u64>,
    error: UploadError,
    client_filename: Option<String>,
    client_media_type: Option<String>,
}

impl UploadedFile {
    /// Wraps an open stream as a successfully uploaded file. The size
    /// defaults to whatever the stream reports.
    pub fn new(stream: UploadStream) -> Self {
        let size = stream.size();
        Self {
            stream: Arc::new(Mutex::new(Some(stream))),
            size,
            error: UploadError::Ok,
            client_filename: None,
            client_media_type: None,
        }
    }

    /// Opens the file at `path` and wraps it as a successfully uploaded file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Ok(Self::new(UploadStream::open(path)?))
    }

    /// A slot whose upload failed at the gateway. Carries no stream; `error`
    /// must not be [`UploadError::Ok`].
    pub fn failed(error: UploadError) -> Self {
        debug_assert!(error != UploadError::Ok, "failed() takes a non-Ok code");
        Self {
            stream: Arc::new(Mutex::new(None)),
            size: None,
            error,
            client_filename: None,
            client_media_type: None,
        }
    }

    /// Overrides the reported size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Attaches the filename the client claimed. Untrusted input.
    pub fn with_client_filename(mut self, filename: impl Into<String>) -> Self {
        self.client_filename = Some(filename.into());
        self
    }

    /// Attaches the media type the client claimed. Untrusted input.
    pub fn with_client_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.client_media_type = Some(media_type.into());
        self
    }

    // ── Metadata ────────────────────────────────────────────────────────────
    // Always readable, before and after the stream is gone.

    pub fn size(&self) -> Option<u64> { self.size }
    pub fn error(&self) -> UploadError { self.error }
    pub fn client_filename(&self) -> Option<&str> { self.client_filename.as_deref() }
    pub fn client_media_type(&self) -> Option<&str> { self.client_media_type.as_deref() }

    // ── Stream lifecycle ────────────────────────────────────────────────────

    /// Detaches and returns the stream.
    ///
    /// Fails with [`Error::Upload`] if the upload itself failed, and with
    /// [`Error::Consumed`] if the stream already left through an earlier
    /// `take_stream` or [`move_to`](Self::move_to).
    pub fn take_stream(&self) -> Result<UploadStream, Error> {
        if self.error != UploadError::Ok {
            return Err(Error::Upload(self.error));
        }
        self.slot().take().ok_or(Error::Consumed)
    }

    /// Copies the stream's contents to `target` and consumes the stream.
    ///
    /// The destination directory is checked first; a missing or unwritable
    /// directory fails with [`Error::TargetDirectory`] and leaves the stream
    /// untouched, so the upload stays usable. State failures mirror
    /// [`take_stream`](Self::take_stream).
    pub fn move_to(&self, target: impl AsRef<Path>) -> Result<(), Error> {
        let target = target.as_ref();
        if self.error != UploadError::Ok {
            return Err(Error::Upload(self.error));
        }
        let mut slot = self.slot();
        let Some(stream) = slot.as_mut() else {
            return Err(Error::Consumed);
        };

        let dir = match target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_owned(),
            Some(_) => PathBuf::from("."),
            None => return Err(Error::TargetDirectory(target.to_owned())),
        };
        if !dir.is_dir() {
            return Err(Error::TargetDirectory(dir));
        }
        let mut out = match File::create(target) {
            Ok(file) => file,
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
                ) =>
            {
                return Err(Error::TargetDirectory(dir));
            }
            Err(error) => return Err(Error::Io(error)),
        };

        stream.rewind()?;
        let mut buf = [0u8; MOVE_CHUNK];
        loop {
            let read = stream.read(&mut buf)?;
            if read == 0 {
                break;
            }
            out.write_all(&buf[..read])?;
        }

        *slot = None;
        Ok(())
    }

    fn slot(&self) -> MutexGuard<'_, Option<UploadStream>> {
        self.stream.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
