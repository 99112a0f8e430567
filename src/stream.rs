//! Byte streams backing uploaded files.
//!
//! A gateway hands uploads over either as a temporary file on disk or, for
//! in-process hosts and tests, as bytes already in memory. [`UploadStream`]
//! wraps both behind one readable handle so the rest of the crate never has
//! to care which one it got.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::Bytes;

/// An owned, readable, rewindable stream for one uploaded file.
#[derive(Debug)]
pub struct UploadStream {
    inner: Inner,
    path: Option<PathBuf>,
}

#[derive(Debug)]
enum Inner {
    File(File),
    Memory(Cursor<Bytes>),
}

impl UploadStream {
    /// Opens the file at `path` for reading.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self {
            inner: Inner::File(file),
            path: Some(path.to_owned()),
        })
    }

    /// Adopts an in-memory payload as a stream.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            inner: Inner::Memory(Cursor::new(bytes.into())),
            path: None,
        }
    }

    /// Total size in bytes, if the backing store can report one.
    pub fn size(&self) -> Option<u64> {
        match &self.inner {
            Inner::File(file) => file.metadata().ok().map(|meta| meta.len()),
            Inner::Memory(cursor) => Some(cursor.get_ref().len() as u64),
        }
    }

    /// Resets the read position to the start of the stream.
    pub fn rewind(&mut self) -> io::Result<()> {
        match &mut self.inner {
            Inner::File(file) => file.seek(SeekFrom::Start(0)).map(|_| ()),
            Inner::Memory(cursor) => {
                cursor.set_position(0);
                Ok(())
            }
        }
    }

    /// The on-disk file backing this stream, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Read for UploadStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::File(file) => file.read(buf),
            Inner::Memory(cursor) => cursor.read(buf),
        }
    }
}
