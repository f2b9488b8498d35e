//! Handler trait for routed frames

use pgnlink_protocol::Frame;

/// Error a handler reports for a frame it could not process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HandlerError {
    /// Payload does not have the layout this PGN requires
    Malformed,
    /// Frame is well formed but refused in the current state
    Rejected,
    /// Downstream queue has no room for the frame
    QueueFull,
    /// Application-specific failure code
    Application(u8),
}

/// Receiver for frames of one PGN
///
/// Handlers run synchronously inside the link poll, so they should hand work
/// off (e.g. into a channel) rather than block.
pub trait PgnHandler {
    /// Process one frame
    fn handle(&mut self, frame: &Frame) -> Result<(), HandlerError>;
}

impl<F> PgnHandler for F
where
    F: FnMut(&Frame) -> Result<(), HandlerError>,
{
    fn handle(&mut self, frame: &Frame) -> Result<(), HandlerError> {
        self(frame)
    }
}
