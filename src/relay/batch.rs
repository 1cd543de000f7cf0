//! # Batch Accumulator
//!
//! Packs consecutive frames into one contiguous buffer that becomes one
//! datagram. With the default sizing a batch holds 10 frames (200ms of
//! speech) in a 1024-byte buffer.
//!
//! ## Guarantees:
//! - The buffer never grows past its capacity; the capacity is checked
//!   against `frames_per_batch × 32` when the accumulator is built.
//! - Frames are appended whole. A frame whose read fails part-way is not
//!   included.
//! - The running flag is checked before every frame, so a stop request
//!   ends the batch at the next frame boundary.

use crate::amr::reader::{read_frame, PollPolicy};
use crate::config::FramingConfig;
use crate::error::{RelayResult, StreamError};
use crate::source::ByteSource;
use crate::state::SessionStats;

/// Why a fill returned.
#[derive(Debug)]
pub enum FillEnd {
    /// The batch holds `frames_per_batch` frames.
    Complete,
    /// The running flag was cleared.
    Stopped,
    /// The source closed or failed; no more frames will follow.
    Failed(StreamError),
}

/// Result of one [`BatchAccumulator::fill`] pass.
#[derive(Debug)]
pub struct Batch<'a> {
    /// Concatenated frames, ready to send.
    pub bytes: &'a [u8],
    /// Number of frames in `bytes`.
    pub frames: usize,
    pub end: FillEnd,
}

impl Batch<'_> {
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }
}

/// Reusable buffer that collects frames for one datagram at a time.
#[derive(Debug)]
pub struct BatchAccumulator {
    buffer: Vec<u8>,
    capacity: usize,
    frames_per_batch: usize,
}

impl BatchAccumulator {
    /// Allocate the buffer once. Fails if `framing` cannot hold a full batch.
    pub fn new(framing: &FramingConfig) -> RelayResult<Self> {
        framing.validate()?;
        Ok(Self {
            buffer: Vec::with_capacity(framing.buffer_capacity),
            capacity: framing.buffer_capacity,
            frames_per_batch: framing.frames_per_batch,
        })
    }

    /// Buffer size in bytes (1024 by default).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames per datagram (10 by default).
    pub fn frames_per_batch(&self) -> usize {
        self.frames_per_batch
    }

    /// Read up to `frames_per_batch` frames from `source` into the buffer.
    ///
    /// The previous batch is discarded. Frames that made it into the buffer
    /// are returned even when the fill ends early.
    pub async fn fill<S>(&mut self, source: &mut S, policy: &PollPolicy, stats: &SessionStats) -> Batch<'_>
    where
        S: ByteSource + ?Sized,
    {
        self.buffer.clear();
        let mut frames = 0;
        let mut end = FillEnd::Complete;

        while frames < self.frames_per_batch {
            if !policy.running().is_running() {
                end = FillEnd::Stopped;
                break;
            }

            match read_frame(source, policy).await {
                Ok(frame) => {
                    debug_assert!(self.buffer.len() + frame.encoded_len() <= self.capacity);
                    frame.write_to(&mut self.buffer);
                    stats.record_frame(!frame.is_no_payload());
                    frames += 1;
                }
                Err(StreamError::Cancelled) => {
                    end = FillEnd::Stopped;
                    break;
                }
                Err(err) => {
                    end = FillEnd::Failed(err);
                    break;
                }
            }
        }

        Batch {
            bytes: &self.buffer,
            frames,
            end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amr::frame::FRAME_SIZES;
    use crate::source::testing::ScriptedSource;
    use crate::state::RunningFlag;
    use std::time::Duration;

    fn policy(running: &RunningFlag) -> PollPolicy {
        PollPolicy::new(Duration::from_millis(1), running.clone())
    }

    /// Frames with mode indices cycling through all 16 frame types.
    fn mixed_frames(count: usize) -> (Vec<u8>, Vec<usize>) {
        let mut bytes = Vec::new();
        let mut lens = Vec::new();
        for n in 0..count {
            let index = (n * 7) % 16;
            bytes.push(((index as u8) << 3) | 0x04);
            bytes.extend(std::iter::repeat(n as u8).take(FRAME_SIZES[index]));
            lens.push(1 + FRAME_SIZES[index]);
        }
        (bytes, lens)
    }

    #[test]
    fn test_rejects_undersized_buffer() {
        let framing = FramingConfig {
            frames_per_batch: 10,
            buffer_capacity: 200,
            poll_interval_ms: 100,
        };
        assert!(BatchAccumulator::new(&framing).is_err());
    }

    #[tokio::test]
    async fn test_twenty_five_frames_make_three_batches() {
        let (bytes, lens) = mixed_frames(25);
        let mut source = ScriptedSource::from_bytes(&bytes);
        let running = RunningFlag::new(true);
        let policy = policy(&running);
        let stats = SessionStats::new();
        let mut accumulator = BatchAccumulator::new(&FramingConfig::default()).unwrap();

        let mut batches = Vec::new();
        let mut offset = 0;
        loop {
            let batch = accumulator.fill(&mut source, &policy, &stats).await;
            let start: usize = lens[..offset].iter().sum();
            let expected_len: usize = lens[offset..offset + batch.frames].iter().sum();
            assert_eq!(batch.bytes.len(), expected_len);
            assert_eq!(batch.bytes, &bytes[start..start + expected_len]);
            offset += batch.frames;
            batches.push(batch.frames);

            match batch.end {
                FillEnd::Complete => continue,
                FillEnd::Failed(StreamError::EndOfStream) => break,
                other => panic!("unexpected end: {:?}", other),
            }
        }

        assert_eq!(batches, vec![10, 10, 5]);
        assert_eq!(stats.snapshot().frames_read, 25);
    }

    #[tokio::test]
    async fn test_stop_after_k_frames_gives_short_batch() {
        let (bytes, lens) = mixed_frames(10);
        let k = 4;
        let threshold: usize = lens[..k].iter().sum();
        let running = RunningFlag::new(true);
        let mut source =
            ScriptedSource::from_bytes(&bytes).clear_flag_after(threshold, running.clone());
        let policy = policy(&running);
        let stats = SessionStats::new();
        let mut accumulator = BatchAccumulator::new(&FramingConfig::default()).unwrap();

        let batch = accumulator.fill(&mut source, &policy, &stats).await;
        assert_eq!(batch.frames, k);
        assert_eq!(batch.bytes, &bytes[..threshold]);
        assert!(matches!(batch.end, FillEnd::Stopped));

        // Nothing past the k-th frame was consumed.
        assert_eq!(source.remaining(), bytes.len() - threshold);
    }

    #[tokio::test]
    async fn test_stop_before_first_frame_gives_empty_batch() {
        let (bytes, _) = mixed_frames(3);
        let mut source = ScriptedSource::from_bytes(&bytes);
        let running = RunningFlag::new(false);
        let policy = policy(&running);
        let stats = SessionStats::new();
        let mut accumulator = BatchAccumulator::new(&FramingConfig::default()).unwrap();

        let batch = accumulator.fill(&mut source, &policy, &stats).await;
        assert!(batch.is_empty());
        assert!(batch.bytes.is_empty());
        assert!(matches!(batch.end, FillEnd::Stopped));
        assert_eq!(source.bytes_read, 0);
    }

    #[tokio::test]
    async fn test_max_size_frames_fit_minimum_capacity() {
        let mut bytes = Vec::new();
        for _ in 0..10 {
            bytes.push(0x3C);
            bytes.extend([0x5A; 31]);
        }
        let framing = FramingConfig {
            frames_per_batch: 10,
            buffer_capacity: 320,
            poll_interval_ms: 1,
        };
        let mut source = ScriptedSource::from_bytes(&bytes);
        let running = RunningFlag::new(true);
        let stats = SessionStats::new();
        let mut accumulator = BatchAccumulator::new(&framing).unwrap();

        let batch = accumulator.fill(&mut source, &policy(&running), &stats).await;
        assert_eq!(batch.frames, 10);
        assert_eq!(batch.bytes.len(), 320);
        assert!(matches!(batch.end, FillEnd::Complete));
    }
}
