//! Configuration type definitions

use heapless::String;
use serde::{Deserialize, Serialize};

use pgnlink_protocol::hello::MAX_NODE_NAME_LEN;
use pgnlink_protocol::pgn::SOURCE_BRIDGE;
use pgnlink_protocol::{Announcement, KnownPgn, MAX_FRAME_SIZE, RX_BUFFER_CAPACITY};

use crate::link::HeartbeatConfig;

/// Binary layout version written by [`LinkConfig::to_slice`]
pub const CONFIG_VERSION: u8 = 1;

/// Upper bound on the postcard-encoded size of a [`LinkConfig`]
pub const MAX_CONFIG_SIZE: usize = 64;

/// Node name announced by a bridge unless configured otherwise
pub const DEFAULT_NODE_NAME: &str = "ESP32";

/// Default time between presence announcements
pub const DEFAULT_ANNOUNCE_INTERVAL_MS: u32 = 5_000;

/// Default time between status frames while the peer is present
pub const DEFAULT_STATUS_INTERVAL_MS: u32 = 1_000;

/// Default time after the last announcement before a host forgets its peer
pub const DEFAULT_PRESENCE_TIMEOUT_MS: u32 = 10_000;

/// Which end of the link this node is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkRole {
    /// Bridging MCU: announces itself and sends periodic status
    #[default]
    Bridge,
    /// Primary control unit: listens for announcements and gates outbound
    /// traffic on peer presence
    Host,
}

/// Configuration error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Node name is empty, too long or not printable ASCII
    InvalidNodeName,
    /// An interval or timeout that must be positive is zero
    ZeroInterval,
    /// Overflow margin would leave no room for a maximum-size frame
    MarginTooLarge,
    /// Binary encoding failed
    Encode,
    /// Binary decoding failed
    Decode,
    /// Binary form was written by an incompatible layout version
    VersionMismatch { found: u8 },
}

/// Link configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkConfig {
    /// Layout version
    pub version: u8,
    /// Which end of the link this node is
    pub role: LinkRole,
    /// Bridge: name announced as `<NAME>-hello`. Host: name expected from
    /// the bridge
    pub node_name: String<MAX_NODE_NAME_LEN>,
    /// Source byte stamped on frames this node originates
    pub source_id: u8,
    /// PGN of the periodic status frame
    pub status_pgn: u8,
    /// Time between presence announcements
    pub announce_interval_ms: u32,
    /// Time between status frames
    pub status_interval_ms: u32,
    /// Keep announcing after the peer has been seen
    pub keep_announcing: bool,
    /// Return to idle after this long without a valid frame
    pub peer_timeout_ms: Option<u32>,
    /// Host role: forget the peer after this long without an announcement
    pub presence_timeout_ms: u32,
    /// Free space the reassembler keeps before discarding its buffer
    pub overflow_margin: u16,
}

impl Default for LinkConfig {
    fn default() -> Self {
        let mut node_name = String::new();
        let _ = node_name.push_str(DEFAULT_NODE_NAME);
        Self {
            version: CONFIG_VERSION,
            role: LinkRole::Bridge,
            node_name,
            source_id: SOURCE_BRIDGE,
            status_pgn: KnownPgn::Status.to_byte(),
            announce_interval_ms: DEFAULT_ANNOUNCE_INTERVAL_MS,
            status_interval_ms: DEFAULT_STATUS_INTERVAL_MS,
            keep_announcing: false,
            peer_timeout_ms: None,
            presence_timeout_ms: DEFAULT_PRESENCE_TIMEOUT_MS,
            overflow_margin: pgnlink_protocol::OVERFLOW_MARGIN as u16,
        }
    }
}

impl LinkConfig {
    /// Create a configuration with bridge defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration for the host end of the link
    pub fn host() -> Self {
        Self {
            role: LinkRole::Host,
            ..Self::default()
        }
    }

    /// Check the configuration for values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.announcement()?;

        if self.announce_interval_ms == 0
            || self.status_interval_ms == 0
            || self.presence_timeout_ms == 0
            || self.peer_timeout_ms == Some(0)
        {
            return Err(ConfigError::ZeroInterval);
        }

        if self.overflow_margin as usize + MAX_FRAME_SIZE > RX_BUFFER_CAPACITY {
            return Err(ConfigError::MarginTooLarge);
        }

        Ok(())
    }

    /// Presence announcement for the configured node name
    pub fn announcement(&self) -> Result<Announcement, ConfigError> {
        Announcement::for_node(&self.node_name).ok_or(ConfigError::InvalidNodeName)
    }

    /// Timer settings for the link heartbeat
    pub fn heartbeat(&self) -> HeartbeatConfig {
        HeartbeatConfig {
            announce_interval_ms: self.announce_interval_ms,
            status_interval_ms: self.status_interval_ms,
            keep_announcing: self.keep_announcing,
            peer_timeout_ms: self.peer_timeout_ms,
        }
    }

    /// Serialize to postcard binary, returning the used part of `buffer`
    pub fn to_slice<'a>(&self, buffer: &'a mut [u8]) -> Result<&'a mut [u8], ConfigError> {
        postcard::to_slice(self, buffer).map_err(|_| ConfigError::Encode)
    }

    /// Deserialize from postcard binary and validate
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: LinkConfig = postcard::from_bytes(bytes).map_err(|_| ConfigError::Decode)?;
        if config.version != CONFIG_VERSION {
            return Err(ConfigError::VersionMismatch {
                found: config.version,
            });
        }
        config.validate()?;
        Ok(config)
    }
}
