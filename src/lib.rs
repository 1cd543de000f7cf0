//! # AMR Relay
//!
//! Streams a live AMR-NB bitstream to a remote endpoint over UDP while the
//! encoder is still producing it.
//!
//! ## Pipeline:
//! 1. **Synchronize**: discard bytes until the `#!AMR\n` header
//! 2. **Frame**: read a mode byte, look up the payload length, read the payload
//! 3. **Batch**: collect up to 10 frames into one buffer
//! 4. **Send**: one batch per UDP datagram
//!
//! ## Modules:
//! - **amr**: header matching, frame-size table, polling frame reader
//! - **source**: the `ByteSource` boundary and its pipe/file implementations
//! - **relay**: batching, sending, the session worker and its controller
//! - **state**: running flag, session state and counters
//! - **config**: settings loaded from file and environment
//! - **error**: error types

pub mod amr;
pub mod config;
pub mod error;
pub mod relay;
pub mod source;
pub mod state;

pub use config::RelayConfig;
pub use error::{RelayError, StreamError, TransportError};
pub use relay::{SessionEnd, SessionReport, StartOutcome, StreamingController};
pub use source::{ByteSource, ReadStatus, SourceConnector};
pub use state::{RunningFlag, StreamState};
