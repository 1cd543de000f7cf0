//! # AMR Bitstream Parsing
//!
//! Everything needed to turn a raw AMR-NB byte stream into frames:
//! - **header**: skip to the end of the `#!AMR\n` file header
//! - **frame**: frame-type table and the inline [`Frame`] value
//! - **reader**: exact reads with fixed-interval polling, one frame at a time

pub mod frame;
pub mod header;
pub mod reader;

pub use frame::{Frame, FRAME_SIZES, MAX_ENCODED_FRAME_LEN};
pub use header::{synchronize, HeaderMatcher, AMR_MAGIC};
pub use reader::{read_exact, read_frame, PollPolicy};
