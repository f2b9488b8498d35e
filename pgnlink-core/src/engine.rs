//! Link engine
//!
//! Owns both halves of the UART and every piece of link state, and runs them
//! from one execution context. Each [`LinkEngine::poll`]:
//!
//! 1. Drains whatever the UART has buffered into the reassembler
//! 2. Dispatches every completed frame and notes it with the heartbeat
//! 3. Records announcements and frames with the presence tracker (host role)
//! 4. Evaluates timers and writes announcements / status frames (bridge role)
//!
//! The caller supplies the clock, so tests can drive time directly.

use heapless::Vec;

use pgnlink_hal::{UartRx, UartTx};
use pgnlink_protocol::{
    encode_into, Announcement, FrameError, Reassembler, Received, MAX_FRAME_SIZE,
    MAX_PAYLOAD_SIZE,
};

use crate::config::{ConfigError, LinkConfig, LinkRole};
use crate::dispatch::{Dispatcher, MAX_ROUTES};
use crate::link::{Heartbeat, LinkState, PeerPresence, PresenceChange, Transition};
use crate::stats::{bump, LinkStats};

/// Bytes read from the UART per read call
pub const RX_CHUNK_SIZE: usize = 64;

/// Status payload sent until the application sets one
pub const DEFAULT_STATUS_PAYLOAD: [u8; 8] = [0x01, 0, 0, 0, 0, 0, 0, 0];

/// Failure to send an application frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError<E> {
    /// Frame could not be encoded
    Frame(FrameError),
    /// Host role and no announcement seen recently
    PeerAbsent,
    /// UART write failed
    Transport(E),
}

impl<E> From<FrameError> for SendError<E> {
    fn from(e: FrameError) -> Self {
        SendError::Frame(e)
    }
}

/// What one poll did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollReport {
    /// Bytes read from the UART
    pub bytes_read: usize,
    /// Valid frames received
    pub frames: usize,
    /// Announcements received
    pub announcements: usize,
    /// An announcement was written
    pub announced: bool,
    /// A status frame was written
    pub status_sent: bool,
    /// Heartbeat state change
    pub link: Option<Transition>,
    /// Peer presence change
    pub presence: Option<PresenceChange>,
}

/// Single-context link driver
pub struct LinkEngine<'h, Rx, Tx, const H: usize = MAX_ROUTES> {
    rx: Rx,
    tx: Tx,
    config: LinkConfig,
    announcement: Announcement,
    reassembler: Reassembler,
    dispatcher: Dispatcher<'h, H>,
    heartbeat: Heartbeat,
    presence: PeerPresence,
    status_payload: Vec<u8, MAX_PAYLOAD_SIZE>,
    stats: LinkStats,
}

impl<'h, Rx, Tx, const H: usize> LinkEngine<'h, Rx, Tx, H>
where
    Rx: UartRx,
    Tx: UartTx,
{
    /// Create an engine after validating `config`
    pub fn new(
        rx: Rx,
        tx: Tx,
        config: LinkConfig,
        dispatcher: Dispatcher<'h, H>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let announcement = config.announcement()?;

        let mut reassembler = Reassembler::with_margin(usize::from(config.overflow_margin));
        if config.role == LinkRole::Host {
            reassembler.set_announcement(Some(announcement.clone()));
        }

        let mut status_payload = Vec::new();
        // Cannot fail: 8 bytes into a 250-byte vec
        let _ = status_payload.extend_from_slice(&DEFAULT_STATUS_PAYLOAD);

        Ok(Self {
            rx,
            tx,
            heartbeat: Heartbeat::new(config.heartbeat()),
            presence: PeerPresence::new(config.presence_timeout_ms),
            config,
            announcement,
            reassembler,
            dispatcher,
            status_payload,
            stats: LinkStats::default(),
        })
    }

    /// Run one iteration of the link loop
    pub fn poll(&mut self, now_ms: u64) -> PollReport {
        let mut report = PollReport::default();
        self.drain_rx(now_ms, &mut report);

        match self.config.role {
            LinkRole::Bridge => self.run_heartbeat(now_ms, &mut report),
            LinkRole::Host => {
                if let Some(change) = self.presence.poll(now_ms) {
                    info!("peer {=str} lost", self.announcement.node_name());
                    report.presence = Some(change);
                }
            }
        }

        report
    }

    /// Send an application frame to the peer
    ///
    /// In the host role the frame is dropped while nothing has been heard
    /// from the peer within the presence timeout, measured at `now_ms`.
    pub fn send(
        &mut self,
        now_ms: u64,
        source: u8,
        pgn: u8,
        payload: &[u8],
    ) -> Result<(), SendError<Tx::Error>> {
        if self.config.role == LinkRole::Host {
            if self.presence.poll(now_ms).is_some() {
                info!("peer {=str} lost", self.announcement.node_name());
            }
            if !self.presence.is_detected() {
                bump(&mut self.stats.outbound_dropped);
                debug!("peer absent, dropping pgn {=u8:#x}", pgn);
                return Err(SendError::PeerAbsent);
            }
        }

        let mut buf = [0u8; MAX_FRAME_SIZE];
        let len = encode_into(source, pgn, payload, &mut buf)?;
        self.write(&buf[..len]).map_err(SendError::Transport)?;
        bump(&mut self.stats.frames_sent);
        trace!("sent pgn {=u8:#x}, {} bytes", pgn, len);
        Ok(())
    }

    /// Replace the payload of the periodic status frame
    pub fn set_status_payload(&mut self, payload: &[u8]) -> Result<(), FrameError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }
        self.status_payload.clear();
        let _ = self.status_payload.extend_from_slice(payload);
        Ok(())
    }

    /// Current status payload
    pub fn status_payload(&self) -> &[u8] {
        &self.status_payload
    }

    /// Heartbeat state
    pub fn state(&self) -> LinkState {
        self.heartbeat.state()
    }

    /// Check if a peer announcement has been seen recently (host role)
    pub fn peer_detected(&self) -> bool {
        self.presence.is_detected()
    }

    /// Configuration in use
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Routing table
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<'h, H> {
        &mut self.dispatcher
    }

    /// Snapshot of all counters
    pub fn stats(&self) -> LinkStats {
        LinkStats {
            reassembler: self.reassembler.stats(),
            dispatch: self.dispatcher.stats(),
            ..self.stats
        }
    }

    /// Release the UART halves
    pub fn into_parts(self) -> (Rx, Tx) {
        (self.rx, self.tx)
    }

    fn drain_rx(&mut self, now_ms: u64, report: &mut PollReport) {
        let mut chunk = [0u8; RX_CHUNK_SIZE];

        loop {
            let n = match self.rx.read_available(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(_) => {
                    bump(&mut self.stats.rx_errors);
                    warn!("uart read error");
                    break;
                }
            };
            report.bytes_read += n;

            let host = self.config.role == LinkRole::Host;
            let Self {
                reassembler,
                dispatcher,
                heartbeat,
                presence,
                announcement,
                ..
            } = self;

            let summary = reassembler.push(&chunk[..n], |item| match item {
                Received::Frame(frame) => {
                    trace!("rx {}", frame);
                    if let Some(t) = heartbeat.frame_received(now_ms) {
                        info!("peer present");
                        report.link = Some(t);
                    }
                    if host {
                        if let Some(change) = presence.activity_seen(now_ms) {
                            info!("peer {=str} detected", announcement.node_name());
                            report.presence = Some(change);
                        }
                    }
                    dispatcher.dispatch(&frame);
                }
                Received::Announcement => {
                    if let Some(change) = presence.announcement_seen(now_ms) {
                        info!("peer {=str} detected", announcement.node_name());
                        report.presence = Some(change);
                    }
                }
            });

            report.frames += summary.frames;
            report.announcements += summary.announcements;
            if summary.checksum_errors > 0 {
                warn!("{} frames failed checksum", summary.checksum_errors);
            }
            if summary.overflowed {
                warn!("rx buffer overflow, discarded");
            }
        }
    }

    fn run_heartbeat(&mut self, now_ms: u64, report: &mut PollReport) {
        let due = self.heartbeat.poll(now_ms);

        if let Some(t) = due.transition {
            info!("peer timed out, back to idle");
            report.link = Some(t);
        }

        if due.announce {
            let Self {
                tx,
                announcement,
                stats,
                ..
            } = self;
            match write_all_flush(tx, announcement.as_bytes()) {
                Ok(()) => {
                    bump(&mut stats.announcements_sent);
                    report.announced = true;
                    debug!("announced {=str}", announcement.as_str());
                }
                Err(_) => {
                    bump(&mut stats.tx_errors);
                    warn!("uart write error");
                }
            }
        }

        if due.status {
            let mut buf = [0u8; MAX_FRAME_SIZE];
            let encoded = encode_into(
                self.config.source_id,
                self.config.status_pgn,
                &self.status_payload,
                &mut buf,
            );
            match encoded {
                Ok(len) => {
                    if self.write(&buf[..len]).is_ok() {
                        bump(&mut self.stats.status_sent);
                        report.status_sent = true;
                    }
                }
                Err(e) => warn!("status encode failed: {}", e),
            }
        }
    }

    /// Write and flush, counting failures
    fn write(&mut self, bytes: &[u8]) -> Result<(), Tx::Error> {
        write_all_flush(&mut self.tx, bytes).inspect_err(|_| {
            bump(&mut self.stats.tx_errors);
            warn!("uart write error");
        })
    }
}

fn write_all_flush<T: UartTx>(tx: &mut T, bytes: &[u8]) -> Result<(), T::Error> {
    tx.write_all(bytes)?;
    tx.flush()
}
