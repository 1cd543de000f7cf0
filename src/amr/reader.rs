//! # Frame Reader
//!
//! Pulls exact byte counts out of a [`ByteSource`] that may momentarily have
//! nothing to give. When the source reports `Pending` the reader sleeps for a
//! fixed interval and tries again; there is no retry limit, because an empty
//! source just means the encoder has not produced the next 20ms of audio yet.
//!
//! The sleep is tied to the [`RunningFlag`]: clearing the flag wakes the
//! reader immediately and the read fails with [`StreamError::Cancelled`].
//! A source that goes quiet mid-frame with the flag still set stalls the
//! reader indefinitely.

use super::frame::Frame;
use crate::error::StreamError;
use crate::source::{ByteSource, ReadStatus};
use crate::state::RunningFlag;
use std::time::Duration;
use tracing::trace;

/// Fixed-interval polling used whenever the source has no data ready.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    interval: Duration,
    running: RunningFlag,
}

impl PollPolicy {
    pub fn new(interval: Duration, running: RunningFlag) -> Self {
        Self { interval, running }
    }

    /// Sleep between empty polls.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Flag that cancels the wait when cleared.
    pub fn running(&self) -> &RunningFlag {
        &self.running
    }

    /// Wait one interval. `false` means a stop was requested meanwhile.
    async fn wait(&self) -> bool {
        self.running.sleep_while_running(self.interval).await
    }
}

/// Fill `buf` completely, polling while the source is empty.
pub async fn read_exact<S>(source: &mut S, buf: &mut [u8], policy: &PollPolicy) -> Result<(), StreamError>
where
    S: ByteSource + ?Sized,
{
    let mut filled = 0;

    while filled < buf.len() {
        match source.read_available(&mut buf[filled..])? {
            ReadStatus::Ready(count) if count > 0 => filled += count,
            ReadStatus::Ready(_) | ReadStatus::Pending => {
                trace!(filled, wanted = buf.len(), "No AMR data yet, waiting for encoder");
                if !policy.wait().await {
                    return Err(StreamError::Cancelled);
                }
            }
            ReadStatus::Closed => return Err(StreamError::EndOfStream),
        }
    }

    Ok(())
}

/// Read one frame: a mode byte, then the payload length it announces.
///
/// Reserved frame types come back as frames with an empty payload.
pub async fn read_frame<S>(source: &mut S, policy: &PollPolicy) -> Result<Frame, StreamError>
where
    S: ByteSource + ?Sized,
{
    let mut mode = [0u8; 1];
    read_exact(source, &mut mode, policy).await?;

    let mut frame = Frame::new(mode[0]);
    read_exact(source, frame.payload_mut(), policy).await?;

    Ok(frame)
}
