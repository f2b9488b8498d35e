//! Board-agnostic core logic for the pgnlink serial bridge
//!
//! This crate contains everything above the byte codec that does not depend
//! on a specific microcontroller:
//!
//! - PGN dispatcher (type identifier → handler registry)
//! - Link heartbeat state machine (presence announcement, periodic status)
//! - Peer presence tracking for the receiving end of announcements
//! - Link configuration (types, TOML text form, binary form)
//! - The single-context [`engine::LinkEngine`] loop tying them to a UART

#![no_std]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod link;
pub mod stats;

pub use config::{LinkConfig, LinkRole};
pub use dispatch::{Dispatcher, HandlerError, PgnHandler};
pub use engine::{LinkEngine, PollReport, SendError};
pub use link::{Heartbeat, LinkState, PeerPresence};
pub use stats::LinkStats;
