//! Application task
//!
//! Consumes frames routed by the link task and reflects activity in the
//! status payload:
//!
//! | Byte | Meaning                                        |
//! |------|------------------------------------------------|
//! | 0    | 1 = bridge running                             |
//! | 1-2  | frames forwarded so far (u16 LE, wrapping)     |
//! | 3    | PGN of the most recent frame                   |
//! | 4-7  | reserved, 0                                    |

use defmt::*;
use heapless::Vec;

use pgnlink_protocol::KnownPgn;

use crate::channels::{INBOUND, STATUS_PAYLOAD};

/// Application task - logs routed frames and updates the status payload
#[embassy_executor::task]
pub async fn app_task() {
    info!("App task started");

    let mut forwarded: u16 = 0;

    loop {
        let frame = INBOUND.receive().await;
        forwarded = forwarded.wrapping_add(1);

        match KnownPgn::from_byte(frame.pgn) {
            Some(pgn) => debug!(
                "{} from {=u8:#x}: {} bytes",
                pgn.name(),
                frame.source,
                frame.payload.len()
            ),
            None => debug!("pgn {=u8:#x} from {=u8:#x}", frame.pgn, frame.source),
        }

        let count = forwarded.to_le_bytes();
        let status = [0x01, count[0], count[1], frame.pgn, 0, 0, 0, 0];
        if let Ok(payload) = Vec::from_slice(&status) {
            STATUS_PAYLOAD.signal(payload);
        }
    }
}
