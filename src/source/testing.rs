//! Scripted [`ByteSource`] for unit tests.

use super::{ByteSource, ReadStatus};
use crate::state::{RunningFlag, StreamState};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

#[derive(Debug)]
pub(crate) enum Step {
    /// Hand out these bytes, possibly across several reads.
    Data(Vec<u8>),
    /// Report `Pending` once.
    Empty,
    /// Fail the read once.
    Fail(io::ErrorKind),
}

/// Replays a fixed script of reads, then reports `Closed`.
#[derive(Debug, Default)]
pub(crate) struct ScriptedSource {
    steps: VecDeque<Step>,
    pub(crate) pending_polls: usize,
    pub(crate) bytes_read: usize,
    /// Clear this flag once `bytes_read` reaches the threshold.
    stop_after: Option<(usize, RunningFlag)>,
    pub(crate) closed: bool,
    /// Bytes handed out per read at most.
    chunk_limit: Option<usize>,
    /// Make `close()` report an error after marking the source closed.
    fail_close: bool,
    /// Record the published session state whenever `close()` runs.
    close_observer: Option<(watch::Receiver<StreamState>, Arc<Mutex<Vec<StreamState>>>)>,
}

impl ScriptedSource {
    pub(crate) fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            ..Self::default()
        }
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        Self::new([Step::Data(bytes.to_vec())])
    }

    pub(crate) fn with_chunk_limit(mut self, limit: usize) -> Self {
        self.chunk_limit = Some(limit);
        self
    }

    pub(crate) fn clear_flag_after(mut self, bytes: usize, flag: RunningFlag) -> Self {
        self.stop_after = Some((bytes, flag));
        self
    }

    pub(crate) fn with_failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub(crate) fn record_state_on_close(
        mut self,
        state: watch::Receiver<StreamState>,
        seen: Arc<Mutex<Vec<StreamState>>>,
    ) -> Self {
        self.close_observer = Some((state, seen));
        self
    }

    /// Bytes still queued in the script.
    pub(crate) fn remaining(&self) -> usize {
        self.steps
            .iter()
            .map(|step| match step {
                Step::Data(bytes) => bytes.len(),
                _ => 0,
            })
            .sum()
    }
}

impl ByteSource for ScriptedSource {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        if self.closed {
            return Ok(ReadStatus::Closed);
        }

        let status = match self.steps.front_mut() {
            None => ReadStatus::Closed,
            Some(Step::Empty) => {
                self.steps.pop_front();
                self.pending_polls += 1;
                ReadStatus::Pending
            }
            Some(Step::Fail(kind)) => {
                let kind = *kind;
                self.steps.pop_front();
                return Err(io::Error::new(kind, "scripted failure"));
            }
            Some(Step::Data(bytes)) => {
                let limit = self.chunk_limit.unwrap_or(usize::MAX);
                let count = buf.len().min(bytes.len()).min(limit);
                buf[..count].copy_from_slice(&bytes[..count]);
                bytes.drain(..count);
                if bytes.is_empty() {
                    self.steps.pop_front();
                }
                self.bytes_read += count;
                if count == 0 {
                    ReadStatus::Pending
                } else {
                    ReadStatus::Ready(count)
                }
            }
        };

        if let Some((threshold, flag)) = &self.stop_after {
            if self.bytes_read >= *threshold {
                flag.clear();
            }
        }

        Ok(status)
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        if let Some((state, seen)) = &self.close_observer {
            let current = *state.borrow();
            if let Ok(mut seen) = seen.lock() {
                seen.push(current);
            }
        }
        if self.fail_close {
            return Err(io::Error::new(io::ErrorKind::Other, "scripted close failure"));
        }
        Ok(())
    }
}
