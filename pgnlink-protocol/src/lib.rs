//! PGN Serial Bridge Protocol
//!
//! This crate defines the byte-level protocol between the primary control
//! unit and a bridging microcontroller connected over a raw UART. The link
//! carries discrete, typed messages ("PGNs") across a transport that has no
//! message boundaries of its own and may corrupt or drop bytes.
//!
//! # Frame Format
//!
//! ```text
//! ┌──────┬──────┬────────┬─────┬────────┬─────────────┬──────────┐
//! │ 0x80 │ 0x81 │ SOURCE │ PGN │ LENGTH │ PAYLOAD     │ CHECKSUM │
//! │ 1B   │ 1B   │ 1B     │ 1B  │ 1B     │ 0–250B      │ 1B       │
//! └──────┴──────┴────────┴─────┴────────┴─────────────┴──────────┘
//! ```
//!
//! The checksum is the XOR of SOURCE, PGN, LENGTH and every payload byte.
//! Payload bytes are not escaped.
//!
//! The one unframed message on the link is the presence announcement, a
//! plain ASCII literal `<NODE>-hello` (see [`hello`]).

#![no_std]
#![deny(unsafe_code)]

pub mod frame;
pub mod hello;
pub mod pgn;
pub mod reassembler;

pub use frame::{
    checksum, encode_into, try_parse, Frame, FrameError, MARKER, MAX_FRAME_SIZE,
    MAX_PAYLOAD_SIZE, MIN_FRAME_SIZE,
};
pub use hello::{announcement, Announcement, HELLO_SUFFIX, MAX_ANNOUNCEMENT_LEN};
pub use pgn::KnownPgn;
pub use reassembler::{
    PushSummary, Reassembler, ReassemblerStats, Received, OVERFLOW_MARGIN, RX_BUFFER_CAPACITY,
};
