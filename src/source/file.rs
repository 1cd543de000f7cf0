//! # File Source
//!
//! Reads an AMR file from disk. In follow mode the file is treated as a
//! recording that the encoder is still appending to: reaching the current
//! end of the file reports `Pending`, and the session waits for more data
//! instead of ending.

use super::{ByteSource, ReadStatus, SourceConnector};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A [`ByteSource`] backed by a file.
#[derive(Debug)]
pub struct FileSource {
    file: Option<File>,
    follow: bool,
}

impl FileSource {
    /// Open `path`. With `follow` set, end of file means "wait for more".
    pub fn open(path: impl AsRef<Path>, follow: bool) -> io::Result<Self> {
        let file = File::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), follow, "Opened file source");
        Ok(Self {
            file: Some(file),
            follow,
        })
    }
}

impl ByteSource for FileSource {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        let Some(file) = self.file.as_mut() else {
            return Ok(ReadStatus::Closed);
        };

        loop {
            match file.read(buf) {
                Ok(0) if self.follow => return Ok(ReadStatus::Pending),
                Ok(0) => return Ok(ReadStatus::Closed),
                Ok(count) => return Ok(ReadStatus::Ready(count)),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(ReadStatus::Pending)
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn close(&mut self) -> io::Result<()> {
        self.file = None;
        Ok(())
    }
}

/// Opens the configured file for each session.
#[derive(Debug, Clone)]
pub struct FileConnector {
    path: PathBuf,
    follow: bool,
}

impl FileConnector {
    /// Connector that opens `path` afresh on every `connect()`.
    pub fn new(path: impl Into<PathBuf>, follow: bool) -> Self {
        Self {
            path: path.into(),
            follow,
        }
    }
}

impl SourceConnector for FileConnector {
    type Source = FileSource;

    fn connect(&mut self) -> io::Result<FileSource> {
        FileSource::open(&self.path, self.follow)
    }
}
