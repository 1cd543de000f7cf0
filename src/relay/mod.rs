//! # AMR Relay Pipeline
//!
//! Batching, sending and session orchestration on top of the parsers in
//! [`crate::amr`]:
//! - **batch**: groups frames into datagram-sized batches
//! - **sender**: one batch, one UDP datagram
//! - **session**: the `Synchronizing → Streaming → Stopping` worker
//! - **controller**: `start()` / `stop()` for the owner of the relay

pub mod batch;
pub mod controller;
pub mod sender;
pub mod session;

pub use batch::{Batch, BatchAccumulator, FillEnd};
pub use controller::{StartOutcome, StreamingController};
pub use sender::DatagramSender;
pub use session::{SessionEnd, SessionReport, StreamingSession};
