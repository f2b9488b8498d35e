//! Link liveness
//!
//! Two small state machines driven by a caller-supplied millisecond clock:
//!
//! - [`Heartbeat`]: the announcing side. Announces itself while idle, then
//!   switches to periodic status once a valid frame proves the peer is there.
//! - [`PeerPresence`]: the listening side. Tracks whether the peer has
//!   announced itself or sent a valid frame recently.
//!
//! Neither touches a clock or a UART; the engine feeds them timestamps and
//! acts on what they report.

pub mod heartbeat;
pub mod presence;

pub use heartbeat::{Heartbeat, HeartbeatConfig, HeartbeatDue, LinkState, Transition};
pub use presence::{PeerPresence, PresenceChange};

/// Milliseconds from `since` to `now`, zero if the clock went backwards
fn elapsed_ms(now_ms: u64, since_ms: u64) -> u64 {
    now_ms.saturating_sub(since_ms)
}
