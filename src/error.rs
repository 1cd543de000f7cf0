//! # Error Handling
//!
//! Error types for the relay, grouped by where they stop the pipeline:
//!
//! - [`RelayError`]: returned synchronously from `start()`. The session never
//!   begins and anything already allocated is released.
//! - [`StreamError`]: raised while reading the byte source. Ends the current
//!   session (transition to `Stopping`), never crosses the session boundary.
//! - [`TransportError`]: one datagram could not be sent. Logged and counted,
//!   the session keeps going.
//!
//! Zero-payload frames (mode indices 9-15) are deliberately absent from this
//! list: they are valid input, not errors.

use std::io;
use thiserror::Error;

/// Errors surfaced to the owner of a `StreamingController`.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The byte-source collaborator could not be connected or opened.
    #[error("byte source unavailable: {0}")]
    SourceUnavailable(#[source] io::Error),

    /// Configuration values that would break framing or addressing.
    #[error("configuration error: {0}")]
    Config(String),

    /// The local UDP socket could not be set up.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors raised while pulling bytes out of a `ByteSource`.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The source was closed before the requested bytes arrived.
    #[error("byte source reached end of stream")]
    EndOfStream,

    /// The source reported an I/O failure.
    #[error("byte source read failed: {0}")]
    Io(#[from] io::Error),

    /// The running flag was cleared while waiting for the producer.
    #[error("read cancelled by stop request")]
    Cancelled,
}

/// Errors from the UDP side of the pipeline.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Binding the local datagram socket failed.
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Host name lookup failed.
    #[error("failed to resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// Lookup succeeded but produced no usable address.
    #[error("no address found for {host}:{port}")]
    NoAddress { host: String, port: u16 },

    /// The datagram could not be handed to the OS.
    #[error("failed to send datagram: {0}")]
    Send(#[source] io::Error),
}

/// Shorthand for results carrying a [`RelayError`].
pub type RelayResult<T> = Result<T, RelayError>;
