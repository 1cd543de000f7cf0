//! # Streaming Session
//!
//! One session is one pass through the state machine:
//!
//! ```text
//! Idle → Synchronizing → Streaming → Stopping → Idle
//!              │                        ▲
//!              └────────────────────────┘  (source ended or stop requested before the header)
//! ```
//!
//! `Stopping` is only published once frames have started flowing. A session
//! that never finds the header releases its source and goes straight back to
//! `Idle`.
//!
//! The session owns the byte source, the batch buffer and the UDP socket
//! for its whole lifetime and releases all of them before reporting `Idle`.
//! It is driven by a single task, so batches leave in the order their frames
//! were produced and there is never more than one send in flight.

use crate::amr::header::synchronize;
use crate::amr::reader::PollPolicy;
use crate::error::StreamError;
use crate::relay::batch::{BatchAccumulator, FillEnd};
use crate::relay::sender::DatagramSender;
use crate::source::ByteSource;
use crate::state::{RunningFlag, SessionStats, StatsSnapshot, StreamState};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SessionEnd {
    /// The running flag was cleared.
    Stopped,
    /// The source closed after the header was found.
    SourceEnded,
    /// Reading the source failed.
    SourceFailed(String),
    /// The source ended or failed before the header was found.
    SyncFailed(String),
}

/// Final summary returned when a session's worker finishes.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub end: SessionEnd,
    pub stats: StatsSnapshot,
}

/// Everything one session needs, moved into the worker task.
pub struct StreamingSession<S: ByteSource> {
    source: S,
    sender: DatagramSender,
    batcher: BatchAccumulator,
    policy: PollPolicy,
    state: Arc<watch::Sender<StreamState>>,
    stats: SessionStats,
}

impl<S: ByteSource> StreamingSession<S> {
    pub fn new(
        source: S,
        sender: DatagramSender,
        batcher: BatchAccumulator,
        policy: PollPolicy,
        state: Arc<watch::Sender<StreamState>>,
    ) -> Self {
        Self {
            source,
            sender,
            batcher,
            policy,
            state,
            stats: SessionStats::new(),
        }
    }

    fn running(&self) -> &RunningFlag {
        self.policy.running()
    }

    fn enter(&self, next: StreamState) {
        debug!(state = next.as_str(), "Session state change");
        self.state.send_replace(next);
    }

    /// Run the session to completion.
    pub async fn run(self) -> SessionReport {
        let span = info_span!("session", id = %self.stats.session_id);
        self.run_inner().instrument(span).await
    }

    async fn run_inner(mut self) -> SessionReport {
        self.enter(StreamState::Synchronizing);
        info!(
            frames_per_batch = self.batcher.frames_per_batch(),
            capacity = self.batcher.capacity(),
            poll_interval_ms = self.policy.interval().as_millis() as u64,
            "Waiting for AMR header"
        );

        let end = match synchronize(&mut self.source, &self.policy).await {
            Ok(skipped) => {
                info!(skipped, "Synchronized, streaming frames");
                self.enter(StreamState::Streaming);
                let end = self.stream().await;
                self.enter(StreamState::Stopping);
                end
            }
            Err(StreamError::Cancelled) => {
                info!("Stopped before AMR header was found");
                SessionEnd::Stopped
            }
            Err(err) => {
                error!(error = %err, "Failed to find AMR header");
                SessionEnd::SyncFailed(err.to_string())
            }
        };

        self.release();

        self.stats.mark_ended();
        let report = SessionReport {
            end,
            stats: self.stats.snapshot(),
        };
        info!(
            end = ?report.end,
            frames = report.stats.frames_read,
            batches = report.stats.batches_sent,
            send_failures = report.stats.send_failures,
            "Session finished"
        );

        self.running().clear();
        self.enter(StreamState::Idle);
        report
    }

    async fn stream(&mut self) -> SessionEnd {
        loop {
            if !self.running().is_running() {
                return SessionEnd::Stopped;
            }

            let batch = self
                .batcher
                .fill(&mut self.source, &self.policy, &self.stats)
                .await;

            if !batch.is_empty() {
                match self.sender.send(batch.bytes).await {
                    Ok(sent) => {
                        debug!(frames = batch.frames, bytes = sent, "Sent batch");
                        self.stats.record_batch_sent(sent);
                    }
                    Err(err) => {
                        warn!(error = %err, frames = batch.frames, "Failed to send batch");
                        self.stats.record_send_failure();
                    }
                }
            }

            match batch.end {
                FillEnd::Complete => {}
                FillEnd::Stopped => return SessionEnd::Stopped,
                FillEnd::Failed(StreamError::EndOfStream) => {
                    info!("Byte source closed");
                    return SessionEnd::SourceEnded;
                }
                FillEnd::Failed(err) => {
                    error!(error = %err, "Byte source failed");
                    return SessionEnd::SourceFailed(err.to_string());
                }
            }
        }
    }

    /// Release the source. The socket and buffer are dropped with the session.
    fn release(&mut self) {
        if let Err(err) = self.source.close() {
            warn!(error = %err, "Failed to close byte source");
        }
    }
}
