//! # Header Synchronization
//!
//! An AMR stream starts with the magic `#!AMR\n`. When the framer attaches
//! to a live encoder it discards everything up to and including that marker
//! so that the next byte it reads is the first frame's mode byte.
//!
//! ## Matching rule:
//! The matcher keeps a progress counter from 0 to 6. A marker byte advances
//! the counter when it is the next expected byte and resets it to 0
//! otherwise; a byte that is not part of the marker at all leaves the
//! counter where it was. Note that `#` only advances from 0, so a second `#`
//! while a match is in progress resets it, and `#!AM\x00R\n` still counts as
//! a match. This is not a general substring search.

use super::reader::{read_exact, PollPolicy};
use crate::error::StreamError;
use crate::source::ByteSource;
use tracing::debug;

/// The AMR-NB single-channel file header.
pub const AMR_MAGIC: [u8; 6] = *b"#!AMR\n";

/// Incremental matcher for [`AMR_MAGIC`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeaderMatcher {
    state: usize,
}

impl HeaderMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of marker bytes currently matched.
    pub fn progress(&self) -> usize {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == AMR_MAGIC.len()
    }

    /// Feed one byte; returns `true` once the marker is complete.
    pub fn push(&mut self, byte: u8) -> bool {
        if let Some(position) = AMR_MAGIC.iter().position(|&m| m == byte) {
            self.state = if self.state == position { position + 1 } else { 0 };
        }
        self.is_complete()
    }
}

/// Consume bytes from `source` until the AMR header has been seen.
///
/// Returns the number of bytes consumed, marker included.
pub async fn synchronize<S>(source: &mut S, policy: &PollPolicy) -> Result<usize, StreamError>
where
    S: ByteSource + ?Sized,
{
    let mut matcher = HeaderMatcher::new();
    let mut consumed = 0usize;
    let mut byte = [0u8; 1];

    loop {
        read_exact(source, &mut byte, policy).await?;
        consumed += 1;

        if matcher.push(byte[0]) {
            debug!(consumed, "AMR header found");
            return Ok(consumed);
        }
    }
}
