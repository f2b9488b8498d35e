//! Link task
//!
//! Owns the bridge UART and drives the link engine from a 1 ms ticker.

use defmt::*;
use embassy_time::{Duration, Instant, Ticker};

use pgnlink_core::dispatch::Dispatcher;
use pgnlink_core::{LinkConfig, LinkEngine};
use pgnlink_hal_rp2040::{BridgeUartRx, BridgeUartTx};

use crate::channels::STATUS_PAYLOAD;
use crate::handlers::{Forward, FORWARDED};

/// Engine poll interval in milliseconds
pub const POLL_INTERVAL_MS: u64 = 1;

/// Interval between counter dumps in milliseconds
const STATS_INTERVAL_MS: u64 = 10_000;

/// Link task - runs the engine until the device resets
#[embassy_executor::task]
pub async fn link_task(rx: BridgeUartRx, tx: BridgeUartTx, config: LinkConfig) {
    info!("Link task started");

    let mut forwarders = [Forward; FORWARDED.len()];
    let mut dispatcher = Dispatcher::new();
    for (pgn, handler) in FORWARDED.iter().zip(forwarders.iter_mut()) {
        if let Err(e) = dispatcher.register(pgn.to_byte(), handler) {
            warn!("Cannot route {}: {}", pgn.name(), e);
        }
    }

    let mut engine = match LinkEngine::new(rx, tx, config, dispatcher) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Link config invalid: {}", e);
            return;
        }
    };

    let mut ticker = Ticker::every(Duration::from_millis(POLL_INTERVAL_MS));
    let start = Instant::now();
    let mut next_stats_ms = STATS_INTERVAL_MS;

    loop {
        ticker.next().await;

        if let Some(payload) = STATUS_PAYLOAD.try_take() {
            if let Err(e) = engine.set_status_payload(&payload) {
                warn!("Status payload rejected: {}", e);
            }
        }

        let now_ms = start.elapsed().as_millis();
        let report = engine.poll(now_ms);

        if let Some(transition) = report.link {
            info!("Link: {} (state {})", transition, engine.state());
        }

        if now_ms >= next_stats_ms {
            next_stats_ms = now_ms + STATS_INTERVAL_MS;
            debug!("Link stats: {}", engine.stats());
        }
    }
}
