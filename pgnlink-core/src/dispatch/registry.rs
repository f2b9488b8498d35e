//! Registry mapping PGNs to handlers
//!
//! The table is a fixed-capacity list of `(pgn, handler)` routes. Lookup is
//! linear; with a handful of routes that beats any hashing on a Cortex-M0+.
//!
//! ```ignore
//! let mut on_gps = |frame: &Frame| -> Result<(), HandlerError> {
//!     // forward frame.payload
//!     Ok(())
//! };
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.register(0xFE, &mut on_gps)?;
//! ```

use heapless::Vec;

use pgnlink_protocol::{Frame, KnownPgn};

use super::handler::{HandlerError, PgnHandler};

/// Default number of routes a dispatcher can hold
pub const MAX_ROUTES: usize = 8;

/// Registration error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchError {
    /// A handler is already registered for this PGN
    AlreadyRegistered(u8),
    /// Route table is full
    RegistryFull,
}

/// What happened to one dispatched frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchOutcome {
    /// The registered handler accepted the frame
    Handled,
    /// No handler for this PGN; frame dropped
    Unrouted,
    /// The registered handler returned an error
    Failed(HandlerError),
}

/// Dispatch counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DispatchStats {
    /// Frames accepted by a handler
    pub handled: u32,
    /// Frames with no registered handler
    pub unrouted: u32,
    /// Frames a handler returned an error for
    pub handler_failures: u32,
}

struct Route<'h> {
    pgn: u8,
    handler: &'h mut dyn PgnHandler,
}

/// PGN → handler registry
pub struct Dispatcher<'h, const N: usize = MAX_ROUTES> {
    routes: Vec<Route<'h>, N>,
    stats: DispatchStats,
}

impl<'h> Default for Dispatcher<'h> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'h> Dispatcher<'h> {
    /// Create an empty dispatcher with [`MAX_ROUTES`] slots
    pub fn new() -> Self {
        Self::with_capacity()
    }
}

impl<'h, const N: usize> Dispatcher<'h, N> {
    /// Create an empty dispatcher with `N` slots
    pub fn with_capacity() -> Self {
        Self {
            routes: Vec::new(),
            stats: DispatchStats::default(),
        }
    }

    /// Register `handler` for frames of type `pgn`
    pub fn register(
        &mut self,
        pgn: u8,
        handler: &'h mut dyn PgnHandler,
    ) -> Result<(), DispatchError> {
        if self.is_registered(pgn) {
            return Err(DispatchError::AlreadyRegistered(pgn));
        }
        self.routes
            .push(Route { pgn, handler })
            .map_err(|_| DispatchError::RegistryFull)
    }

    /// Remove the handler for `pgn`, returning whether one was registered
    pub fn unregister(&mut self, pgn: u8) -> bool {
        match self.routes.iter().position(|r| r.pgn == pgn) {
            Some(index) => {
                self.routes.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Check whether a handler is registered for `pgn`
    pub fn is_registered(&self, pgn: u8) -> bool {
        self.routes.iter().any(|r| r.pgn == pgn)
    }

    /// Number of registered routes
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if no routes are registered
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Counters since creation
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Route one frame to its handler
    pub fn dispatch(&mut self, frame: &Frame) -> DispatchOutcome {
        let Some(route) = self.routes.iter_mut().find(|r| r.pgn == frame.pgn) else {
            self.stats.unrouted = self.stats.unrouted.saturating_add(1);
            debug!(
                "no handler for pgn {=u8:#x} ({})",
                frame.pgn,
                KnownPgn::from_byte(frame.pgn).map_or("unknown", KnownPgn::name)
            );
            return DispatchOutcome::Unrouted;
        };

        match route.handler.handle(frame) {
            Ok(()) => {
                self.stats.handled = self.stats.handled.saturating_add(1);
                DispatchOutcome::Handled
            }
            Err(e) => {
                self.stats.handler_failures = self.stats.handler_failures.saturating_add(1);
                warn!("handler for pgn {=u8:#x} failed: {}", frame.pgn, e);
                DispatchOutcome::Failed(e)
            }
        }
    }
}
