//! PGN dispatch
//!
//! Routes each checksum-valid frame to the handler registered for its PGN.
//! Frames with no handler are counted and dropped; a failing handler is
//! counted and never stops the link.

pub mod handler;
pub mod registry;

pub use handler::{HandlerError, PgnHandler};
pub use registry::{DispatchError, DispatchOutcome, DispatchStats, Dispatcher, MAX_ROUTES};
