//! Inter-task communication channels
//!
//! The link task owns the UART; everything else reaches the link through
//! these statics.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use heapless::Vec;

use pgnlink_protocol::{Frame, MAX_PAYLOAD_SIZE};

/// Channel capacity for routed frames
const INBOUND_CHANNEL_SIZE: usize = 8;

/// Frames routed by the dispatcher, for the application task
pub static INBOUND: Channel<CriticalSectionRawMutex, Frame, INBOUND_CHANNEL_SIZE> = Channel::new();

/// New payload for the periodic status frame (set by the application task)
pub static STATUS_PAYLOAD: Signal<CriticalSectionRawMutex, Vec<u8, MAX_PAYLOAD_SIZE>> =
    Signal::new();
