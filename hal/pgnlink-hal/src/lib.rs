//! pgnlink Hardware Abstraction Layer
//!
//! This crate defines the transport boundary of the link: an ordered byte
//! stream in each direction with no framing of its own. Chip-specific
//! firmware implements these traits on top of its UART driver, and host
//! tests implement them on in-memory buffers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  pgnlink-core (LinkEngine)              │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  pgnlink-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ RP2040 UART   │       │ test loopback │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::UartTx`], [`uart::UartRx`] - Serial communication

#![no_std]
#![deny(unsafe_code)]

pub mod uart;

pub use uart::{Uart, UartConfig, UartRx, UartTx};
