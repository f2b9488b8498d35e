//! Link counters
//!
//! All counters saturate rather than wrap.

use pgnlink_protocol::ReassemblerStats;

use crate::dispatch::DispatchStats;

/// Snapshot of every counter the link keeps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    /// Receive-side stream counters
    pub reassembler: ReassemblerStats,
    /// Routing counters
    pub dispatch: DispatchStats,
    /// UART read errors
    pub rx_errors: u32,
    /// UART write or flush errors
    pub tx_errors: u32,
    /// Presence announcements written
    pub announcements_sent: u32,
    /// Status frames written
    pub status_sent: u32,
    /// Application frames written
    pub frames_sent: u32,
    /// Application frames refused because the peer is absent
    pub outbound_dropped: u32,
}

/// Saturating increment
pub(crate) fn bump(counter: &mut u32) {
    *counter = counter.saturating_add(1);
}
