//! RP2040-specific HAL for the pgnlink serial bridge
//!
//! Implements the shared `pgnlink-hal` UART traits on top of embassy-rp's
//! interrupt-driven buffered UART, so the link engine can poll it without
//! blocking.

#![no_std]
#![deny(unsafe_code)]

pub mod uart;

pub use uart::{rp_uart_config, BridgeUartRx, BridgeUartTx};
