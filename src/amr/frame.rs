//! # AMR Frames
//!
//! An AMR storage-format frame is one header byte followed by a payload
//! whose length is implied by the frame type. The frame type lives in bits
//! 3-6 of the header byte:
//!
//! ```text
//!  7   6   5   4   3   2   1   0
//! +---+---------------+---+---+---+
//! | P |  frame type   | Q | P | P |
//! +---+---------------+---+---+---+
//! ```
//!
//! Frame types 0-7 are the AMR-NB speech modes (4.75 to 12.2 kbit/s), 8 is
//! comfort noise (SID). Types 9-15 are reserved or "no data" and carry no
//! payload; they are passed through as single-byte frames.

/// Payload length in bytes for each frame type.
pub const FRAME_SIZES: [usize; 16] = [12, 13, 15, 17, 19, 20, 26, 31, 5, 0, 0, 0, 0, 0, 0, 0];

/// Largest payload any frame type can carry.
pub const MAX_PAYLOAD_LEN: usize = 31;

/// Largest frame including its mode byte.
pub const MAX_ENCODED_FRAME_LEN: usize = 1 + MAX_PAYLOAD_LEN;

const _: () = {
    let mut index = 0;
    while index < FRAME_SIZES.len() {
        assert!(FRAME_SIZES[index] <= MAX_PAYLOAD_LEN);
        index += 1;
    }
};

/// Frame type selected by a mode byte.
pub fn mode_index(mode_byte: u8) -> usize {
    ((mode_byte >> 3) & 0x0F) as usize
}

/// Payload length announced by a mode byte.
pub fn payload_len(mode_byte: u8) -> usize {
    FRAME_SIZES[mode_index(mode_byte)]
}

/// One frame: mode byte plus its payload, stored inline.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    mode_byte: u8,
    payload: [u8; MAX_PAYLOAD_LEN],
}

impl Frame {
    /// An empty frame for `mode_byte`, with room for its payload.
    pub fn new(mode_byte: u8) -> Self {
        Self {
            mode_byte,
            payload: [0; MAX_PAYLOAD_LEN],
        }
    }

    /// The frame header byte exactly as read.
    pub fn mode_byte(&self) -> u8 {
        self.mode_byte
    }

    /// Frame type, bits 3-6 of the header byte.
    pub fn mode_index(&self) -> usize {
        mode_index(self.mode_byte)
    }

    /// Payload bytes, empty for mode indices 9-15.
    pub fn payload(&self) -> &[u8] {
        &self.payload[..payload_len(self.mode_byte)]
    }

    pub(crate) fn payload_mut(&mut self) -> &mut [u8] {
        let len = payload_len(self.mode_byte);
        &mut self.payload[..len]
    }

    /// Bytes this frame occupies in a batch: mode byte plus payload.
    pub fn encoded_len(&self) -> usize {
        1 + payload_len(self.mode_byte)
    }

    /// Reserved and "no data" frame types (9-15).
    pub fn is_no_payload(&self) -> bool {
        payload_len(self.mode_byte) == 0
    }

    /// Append the mode byte and payload to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.mode_byte);
        out.extend_from_slice(self.payload());
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("mode_byte", &format_args!("{:#04x}", self.mode_byte))
            .field("mode_index", &self.mode_index())
            .field("payload", &self.payload())
            .finish()
    }
}
