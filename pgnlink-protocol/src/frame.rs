//! Frame encoding and decoding for the PGN bridge protocol.
//!
//! Frame format:
//! - MARKER (2 bytes): 0x80 0x81
//! - SOURCE (1 byte): sending node/role
//! - PGN (1 byte): message type identifier
//! - LENGTH (1 byte): payload length (0-250)
//! - PAYLOAD (0-250 bytes): opaque to this layer
//! - CHECKSUM (1 byte): XOR of SOURCE, PGN, LENGTH and all PAYLOAD bytes

use heapless::Vec;

/// Two-byte sequence that opens every frame
pub const MARKER: [u8; 2] = [0x80, 0x81];

/// MARKER + SOURCE + PGN + LENGTH
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 250;

/// Smallest complete frame (empty payload)
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + 1;

/// Largest complete frame
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE + 1;

const SOURCE_OFFSET: usize = 2;
const PGN_OFFSET: usize = 3;
const LENGTH_OFFSET: usize = 4;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
    /// Frame is incomplete (need more bytes)
    Incomplete,
    /// Checksum byte does not match the frame contents
    ChecksumMismatch { expected: u8, found: u8 },
    /// The candidate position does not hold the marker pair
    NotAFrameStart,
    /// LENGTH byte is above [`MAX_PAYLOAD_SIZE`]
    LengthOutOfRange,
}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Sending node/role
    pub source: u8,
    /// Message type identifier
    pub pgn: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Frame {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Frame {{ source: {=u8:#x}, pgn: {=u8:#x}, len: {} }}",
            self.source,
            self.pgn,
            self.payload.len()
        )
    }
}

impl Frame {
    /// Create a new frame
    ///
    /// Oversized payloads are rejected, never truncated.
    pub fn new(source: u8, pgn: u8, payload: &[u8]) -> Result<Self, FrameError> {
        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            source,
            pgn,
            payload: payload_vec,
        })
    }

    /// Create a frame with no payload
    pub fn empty(source: u8, pgn: u8) -> Self {
        Self {
            source,
            pgn,
            payload: Vec::new(),
        }
    }

    /// Number of bytes this frame occupies on the wire
    pub fn wire_len(&self) -> usize {
        MIN_FRAME_SIZE + self.payload.len()
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        encode_into(self.source, self.pgn, &self.payload, buffer)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }
}

/// 8-bit running XOR over `bytes`
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, &byte| acc ^ byte)
}

/// Serialize `(source, pgn, payload)` into `buffer`
///
/// Returns the number of bytes written (`6 + payload.len()`).
pub fn encode_into(
    source: u8,
    pgn: u8,
    payload: &[u8],
    buffer: &mut [u8],
) -> Result<usize, FrameError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLarge);
    }

    let frame_len = MIN_FRAME_SIZE + payload.len();
    if buffer.len() < frame_len {
        return Err(FrameError::BufferTooSmall);
    }

    let end = HEADER_SIZE + payload.len();
    buffer[..2].copy_from_slice(&MARKER);
    buffer[SOURCE_OFFSET] = source;
    buffer[PGN_OFFSET] = pgn;
    buffer[LENGTH_OFFSET] = payload.len() as u8;
    buffer[HEADER_SIZE..end].copy_from_slice(payload);
    buffer[end] = checksum(&buffer[SOURCE_OFFSET..end]);

    Ok(frame_len)
}

/// Validate and decode the frame starting at `buffer[offset]`
///
/// On success returns the frame and the exact number of bytes it occupies.
/// [`FrameError::Incomplete`] means "not yet": the caller keeps the bytes
/// and retries once more data has arrived. [`FrameError::ChecksumMismatch`]
/// and [`FrameError::LengthOutOfRange`] only condemn this candidate
/// position, not the stream.
pub fn try_parse(buffer: &[u8], offset: usize) -> Result<(Frame, usize), FrameError> {
    let candidate = buffer.get(offset..).unwrap_or(&[]);

    match candidate {
        [first, ..] if *first != MARKER[0] => return Err(FrameError::NotAFrameStart),
        [_, second, ..] if *second != MARKER[1] => return Err(FrameError::NotAFrameStart),
        _ => {}
    }

    if candidate.len() < HEADER_SIZE {
        return Err(FrameError::Incomplete);
    }

    let length = candidate[LENGTH_OFFSET] as usize;
    if length > MAX_PAYLOAD_SIZE {
        return Err(FrameError::LengthOutOfRange);
    }

    let frame_len = MIN_FRAME_SIZE + length;
    if candidate.len() < frame_len {
        return Err(FrameError::Incomplete);
    }

    let end = HEADER_SIZE + length;
    let expected = checksum(&candidate[SOURCE_OFFSET..end]);
    let found = candidate[end];
    if expected != found {
        return Err(FrameError::ChecksumMismatch { expected, found });
    }

    let frame = Frame::new(
        candidate[SOURCE_OFFSET],
        candidate[PGN_OFFSET],
        &candidate[HEADER_SIZE..end],
    )?;

    Ok((frame, frame_len))
}
