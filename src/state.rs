//! # Shared Session State
//!
//! State shared between the owner of a relay and its streaming worker:
//!
//! - [`RunningFlag`]: the single cancellation signal. Set by `start()`,
//!   cleared by `stop()` or by the worker when the session ends.
//! - [`StreamState`]: the worker's current position in the
//!   `Idle → Synchronizing → Streaming → Stopping → Idle` cycle.
//! - [`SessionStats`]: counters the worker bumps and the owner reads.
//!
//! ## Thread Safety:
//! The flag is a `tokio::sync::watch` channel so that waiting code can be
//! woken the moment it is cleared, instead of noticing on its next poll.
//! Counters are plain atomics; they are only ever incremented.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

/// Boolean gate for continued frame production.
///
/// Cloning yields another handle to the same flag.
#[derive(Debug, Clone)]
pub struct RunningFlag {
    tx: Arc<watch::Sender<bool>>,
}

impl RunningFlag {
    /// Create a flag in the given state.
    pub fn new(running: bool) -> Self {
        let (tx, _rx) = watch::channel(running);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_running(&self) -> bool {
        *self.tx.borrow()
    }

    /// Mark a session as running.
    pub fn set(&self) {
        self.tx.send_replace(true);
    }

    /// Request a stop; wakes every polling wait.
    pub fn clear(&self) {
        self.tx.send_replace(false);
    }

    /// Sleep for `interval`, waking early if the flag is cleared.
    ///
    /// Returns `true` if the flag is still set afterwards.
    pub async fn sleep_while_running(&self, interval: Duration) -> bool {
        let mut rx = self.tx.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(interval) => self.is_running(),
            _ = rx.wait_for(|running| !*running) => false,
        }
    }
}

impl Default for RunningFlag {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Lifecycle state of a streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    /// No session; initial and terminal state
    Idle,
    /// Discarding bytes until the `#!AMR\n` header has been seen
    Synchronizing,
    /// Reading frames and sending batches
    Streaming,
    /// Releasing the source and socket
    Stopping,
}

impl StreamState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamState::Idle => "idle",
            StreamState::Synchronizing => "synchronizing",
            StreamState::Streaming => "streaming",
            StreamState::Stopping => "stopping",
        }
    }
}

/// Counters for one streaming session.
#[derive(Debug)]
pub struct SessionStats {
    pub session_id: Uuid,
    started_at: DateTime<Utc>,
    ended_at: RwLock<Option<DateTime<Utc>>>,
    frames_read: AtomicU64,
    no_payload_frames: AtomicU64,
    batches_sent: AtomicU64,
    bytes_sent: AtomicU64,
    send_failures: AtomicU64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            ended_at: RwLock::new(None),
            frames_read: AtomicU64::new(0),
            no_payload_frames: AtomicU64::new(0),
            batches_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
        }
    }

    /// Record a frame that was appended to a batch.
    pub fn record_frame(&self, has_payload: bool) {
        self.frames_read.fetch_add(1, Ordering::Relaxed);
        if !has_payload {
            self.no_payload_frames.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count one datagram of `bytes` bytes handed to the OS.
    pub fn record_batch_sent(&self, bytes: usize) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Count one batch lost to a send or resolve failure.
    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Stamp the end time. Later calls overwrite it.
    pub fn mark_ended(&self) {
        if let Ok(mut ended_at) = self.ended_at.write() {
            ended_at.get_or_insert_with(Utc::now);
        }
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        let ended_at = self.ended_at.read().ok().and_then(|ended| *ended);
        let duration = ended_at
            .unwrap_or_else(Utc::now)
            .signed_duration_since(self.started_at);

        StatsSnapshot {
            session_id: self.session_id,
            started_at: self.started_at,
            ended_at,
            duration_seconds: duration.num_milliseconds() as f64 / 1000.0,
            frames_read: self.frames_read.load(Ordering::Relaxed),
            no_payload_frames: self.no_payload_frames.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable view of [`SessionStats`].
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: f64,
    pub frames_read: u64,
    pub no_payload_frames: u64,
    pub batches_sent: u64,
    pub bytes_sent: u64,
    pub send_failures: u64,
}
