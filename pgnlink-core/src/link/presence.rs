//! Peer presence tracking for the listening side
//!
//! The host first learns its bridge is alive from the `<NAME>-hello`
//! announcement or from any valid frame. A bridge stops announcing once it
//! sees the host, so both refresh the timer; the peer counts as detected
//! until neither has arrived for the presence timeout.

use super::elapsed_ms;

/// Change in peer presence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PresenceChange {
    /// First announcement or frame after absence
    Detected,
    /// Nothing heard within the timeout
    Lost,
}

/// Traffic-based presence tracker
#[derive(Debug, Clone)]
pub struct PeerPresence {
    timeout_ms: u32,
    last_seen_ms: Option<u64>,
    detected: bool,
}

impl PeerPresence {
    /// Create a tracker with the peer absent
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            timeout_ms,
            last_seen_ms: None,
            detected: false,
        }
    }

    /// Check if the peer is currently considered present
    pub fn is_detected(&self) -> bool {
        self.detected
    }

    /// Time of the most recent announcement or frame
    pub fn last_seen_ms(&self) -> Option<u64> {
        self.last_seen_ms
    }

    /// Record an announcement
    pub fn announcement_seen(&mut self, now_ms: u64) -> Option<PresenceChange> {
        self.activity_seen(now_ms)
    }

    /// Record a valid frame or any other proof the peer is alive
    pub fn activity_seen(&mut self, now_ms: u64) -> Option<PresenceChange> {
        self.last_seen_ms = Some(now_ms);
        if self.detected {
            None
        } else {
            self.detected = true;
            Some(PresenceChange::Detected)
        }
    }

    /// Expire the peer if it has gone quiet
    pub fn poll(&mut self, now_ms: u64) -> Option<PresenceChange> {
        let last = self.last_seen_ms?;
        if self.detected && elapsed_ms(now_ms, last) >= u64::from(self.timeout_ms) {
            self.detected = false;
            return Some(PresenceChange::Lost);
        }
        None
    }
}
