//! # In-Process Pipe
//!
//! A byte pipe between the encoder (writer side) and the framer (reader
//! side), replacing a local socket pair. The writer implements
//! [`std::io::Write`] so any encoder that writes to an `io::Write` can feed
//! it directly.
//!
//! ## Closing:
//! - Dropping or closing the [`PipeWriter`] marks end-of-stream. The reader
//!   still drains whatever was written before reporting `Closed`.
//! - Closing the [`PipeReader`] discards buffered bytes and makes further
//!   writes fail with `BrokenPipe`.

use super::{ByteSource, ReadStatus, SourceConnector};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Shared {
    buffer: VecDeque<u8>,
    writer_closed: bool,
    reader_closed: bool,
}

type SharedPipe = Arc<Mutex<Shared>>;

fn lock(shared: &SharedPipe) -> io::Result<MutexGuard<'_, Shared>> {
    shared
        .lock()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "pipe lock poisoned"))
}

/// Create a connected writer/reader pair.
pub fn pipe() -> (PipeWriter, PipeReader) {
    let shared = SharedPipe::default();
    (
        PipeWriter {
            shared: Arc::clone(&shared),
        },
        PipeReader { shared },
    )
}

/// Producer end of the pipe.
#[derive(Debug)]
pub struct PipeWriter {
    shared: SharedPipe,
}

impl PipeWriter {
    /// Mark end-of-stream. Idempotent.
    pub fn close(&self) -> io::Result<()> {
        lock(&self.shared)?.writer_closed = true;
        Ok(())
    }

    /// Bytes written but not read yet.
    pub fn pending_len(&self) -> usize {
        lock(&self.shared).map(|shared| shared.buffer.len()).unwrap_or(0)
    }
}

impl io::Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut shared = lock(&self.shared)?;
        if shared.reader_closed || shared.writer_closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        }
        shared.buffer.extend(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.writer_closed = true;
        }
    }
}

/// Consumer end of the pipe.
#[derive(Debug)]
pub struct PipeReader {
    shared: SharedPipe,
}

impl PipeReader {
    /// Bytes available to read right now.
    pub fn available(&self) -> usize {
        lock(&self.shared).map(|shared| shared.buffer.len()).unwrap_or(0)
    }
}

impl ByteSource for PipeReader {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        let mut shared = lock(&self.shared)?;

        if shared.reader_closed {
            return Ok(ReadStatus::Closed);
        }

        if shared.buffer.is_empty() || buf.is_empty() {
            return Ok(if shared.writer_closed {
                ReadStatus::Closed
            } else {
                ReadStatus::Pending
            });
        }

        let count = buf.len().min(shared.buffer.len());
        for (slot, byte) in buf.iter_mut().zip(shared.buffer.drain(..count)) {
            *slot = byte;
        }
        Ok(ReadStatus::Ready(count))
    }

    fn close(&mut self) -> io::Result<()> {
        let mut shared = lock(&self.shared)?;
        shared.reader_closed = true;
        shared.buffer.clear();
        Ok(())
    }
}

/// Hands out a pre-connected [`PipeReader`] exactly once.
///
/// A second `connect()` fails: a restarted session needs a new pipe, the
/// same way it needs a new recording.
#[derive(Debug)]
pub struct PipeConnector {
    reader: Option<PipeReader>,
}

impl PipeConnector {
    /// Connector that hands out `reader` on the first `connect()`.
    pub fn new(reader: PipeReader) -> Self {
        Self {
            reader: Some(reader),
        }
    }

    /// A connector whose `connect()` always fails.
    pub fn disconnected() -> Self {
        Self { reader: None }
    }

    /// Replace the reader handed out by the next `connect()`.
    pub fn replace(&mut self, reader: PipeReader) {
        self.reader = Some(reader);
    }
}

impl SourceConnector for PipeConnector {
    type Source = PipeReader;

    fn connect(&mut self) -> io::Result<PipeReader> {
        self.reader.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "no pipe reader available")
        })
    }
}
