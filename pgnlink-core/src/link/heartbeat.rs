//! Heartbeat state machine
//!
//! ```text
//!            valid frame received
//!   ┌──────┐ ───────────────────▶ ┌─────────────┐
//!   │ Idle │                      │ PeerPresent │
//!   └──────┘ ◀─────────────────── └─────────────┘
//!             peer timeout (optional)
//! ```
//!
//! - **Idle**: announce every `announce_interval_ms`, starting with the
//!   first poll and again right after a peer timeout.
//! - **PeerPresent**: send status every `status_interval_ms`, starting with
//!   the first poll after the transition. Announcements stop unless
//!   `keep_announcing` is set.

use super::elapsed_ms;

/// Link state as seen by the announcing side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// No valid frame seen yet
    #[default]
    Idle,
    /// At least one valid frame seen
    PeerPresent,
}

/// State change reported by the heartbeat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    /// Idle → PeerPresent
    PeerDetected,
    /// PeerPresent → Idle after the peer timeout
    PeerTimedOut,
}

/// Heartbeat timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeartbeatConfig {
    /// Time between presence announcements
    pub announce_interval_ms: u32,
    /// Time between status frames
    pub status_interval_ms: u32,
    /// Keep announcing while the peer is present
    pub keep_announcing: bool,
    /// Return to idle after this long without a valid frame
    pub peer_timeout_ms: Option<u32>,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            announce_interval_ms: 5_000,
            status_interval_ms: 1_000,
            keep_announcing: false,
            peer_timeout_ms: None,
        }
    }
}

/// Emissions due at one poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeartbeatDue {
    /// Send the presence announcement
    pub announce: bool,
    /// Send a status frame
    pub status: bool,
    /// State change made during this poll
    pub transition: Option<Transition>,
}

impl HeartbeatDue {
    /// Check whether nothing is due
    pub fn is_empty(&self) -> bool {
        !self.announce && !self.status && self.transition.is_none()
    }
}

/// Heartbeat state machine
#[derive(Debug, Clone)]
pub struct Heartbeat {
    config: HeartbeatConfig,
    state: LinkState,
    last_announce_ms: Option<u64>,
    last_status_ms: Option<u64>,
    last_frame_ms: Option<u64>,
}

impl Heartbeat {
    /// Create a heartbeat in the idle state
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            config,
            state: LinkState::Idle,
            last_announce_ms: None,
            last_status_ms: None,
            last_frame_ms: None,
        }
    }

    /// Current state
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Check if the peer has been seen
    pub fn is_peer_present(&self) -> bool {
        self.state == LinkState::PeerPresent
    }

    /// Timing in use
    pub fn config(&self) -> &HeartbeatConfig {
        &self.config
    }

    /// Time of the last valid frame, if any
    pub fn last_frame_ms(&self) -> Option<u64> {
        self.last_frame_ms
    }

    /// Record a checksum-valid frame from the peer
    ///
    /// Returns [`Transition::PeerDetected`] on the first frame after idle.
    pub fn frame_received(&mut self, now_ms: u64) -> Option<Transition> {
        self.last_frame_ms = Some(now_ms);
        match self.state {
            LinkState::Idle => {
                self.state = LinkState::PeerPresent;
                self.last_status_ms = None;
                Some(Transition::PeerDetected)
            }
            LinkState::PeerPresent => None,
        }
    }

    /// Evaluate timers and report what is due
    ///
    /// Each emission reported here is considered sent at `now_ms`.
    pub fn poll(&mut self, now_ms: u64) -> HeartbeatDue {
        let mut due = HeartbeatDue::default();

        if let (LinkState::PeerPresent, Some(timeout), Some(last)) = (
            self.state,
            self.config.peer_timeout_ms,
            self.last_frame_ms,
        ) {
            if elapsed_ms(now_ms, last) >= u64::from(timeout) {
                self.state = LinkState::Idle;
                self.last_announce_ms = None;
                due.transition = Some(Transition::PeerTimedOut);
            }
        }

        let announcing = self.state == LinkState::Idle || self.config.keep_announcing;
        if announcing && is_due(self.last_announce_ms, now_ms, self.config.announce_interval_ms) {
            self.last_announce_ms = Some(now_ms);
            due.announce = true;
        }

        if self.state == LinkState::PeerPresent
            && is_due(self.last_status_ms, now_ms, self.config.status_interval_ms)
        {
            self.last_status_ms = Some(now_ms);
            due.status = true;
        }

        due
    }

    /// Return to idle, forgetting all timers
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }
}

fn is_due(last_ms: Option<u64>, now_ms: u64, interval_ms: u32) -> bool {
    match last_ms {
        None => true,
        Some(last) => elapsed_ms(now_ms, last) >= u64::from(interval_ms),
    }
}
