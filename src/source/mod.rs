//! # Byte Sources
//!
//! The framer never talks to the audio encoder directly. It reads encoded
//! bytes through [`ByteSource`], a non-blocking "give me what you have"
//! channel with an explicit end-of-stream signal, and obtains a fresh source
//! for each session from a [`SourceConnector`].
//!
//! ## Implementations:
//! - **pipe**: in-process pipe; the encoder writes into a `PipeWriter`
//! - **file**: a file on disk, optionally followed while the encoder appends to it

pub mod file;
pub mod pipe;

#[cfg(test)]
pub(crate) mod testing;

use std::io;

pub use file::{FileConnector, FileSource};
pub use pipe::{pipe, PipeConnector, PipeReader, PipeWriter};

/// Result of a single non-blocking read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// This many bytes (always > 0) were copied into the buffer.
    Ready(usize),
    /// Nothing available right now; the producer may still write more.
    Pending,
    /// The producer is gone and everything it wrote has been read.
    Closed,
}

/// Readable end of the encoder's output.
pub trait ByteSource: Send {
    /// Copy up to `buf.len()` currently available bytes into `buf`.
    ///
    /// Must return promptly: `Pending` when no data is ready, never block
    /// waiting for the producer.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus>;

    /// Release the underlying channel. Reads afterwards report `Closed`.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        (**self).read_available(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Opens a new [`ByteSource`] for every streaming session.
pub trait SourceConnector: Send {
    type Source: ByteSource + 'static;

    fn connect(&mut self) -> io::Result<Self::Source>;
}
