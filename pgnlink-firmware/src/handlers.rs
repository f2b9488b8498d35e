//! Dispatcher handlers
//!
//! Handlers run inside the link poll, so they only queue frames for the
//! application task.

use pgnlink_core::dispatch::{HandlerError, PgnHandler};
use pgnlink_protocol::{Frame, KnownPgn};

use crate::channels::INBOUND;

/// PGNs the bridge forwards to the application
pub const FORWARDED: [KnownPgn; 5] = [
    KnownPgn::SteerSettings,
    KnownPgn::SteerData,
    KnownPgn::GpsData,
    KnownPgn::MachineData,
    KnownPgn::MachineConfig,
];

/// Queues each frame on [`INBOUND`], failing when the queue is full
#[derive(Debug, Clone, Copy, Default)]
pub struct Forward;

impl PgnHandler for Forward {
    fn handle(&mut self, frame: &Frame) -> Result<(), HandlerError> {
        INBOUND
            .try_send(frame.clone())
            .map_err(|_| HandlerError::QueueFull)
    }
}
