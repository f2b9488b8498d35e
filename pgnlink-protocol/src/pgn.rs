//! Well-known PGN and source identifiers
//!
//! The framing layer treats these as opaque bytes; the table exists so
//! applications and logs can name the messages they route.

// Source IDs
pub const SOURCE_AGIO: u8 = 0x7F;
pub const SOURCE_STEER: u8 = 0x7E;
pub const SOURCE_BRIDGE: u8 = 0x50;

// PGN IDs
const PGN_STEER_SETTINGS: u8 = 0xFC;
const PGN_STEER_DATA: u8 = 0xFD;
const PGN_GPS_DATA: u8 = 0xFE;
const PGN_MACHINE_DATA: u8 = 0xEF;
const PGN_MACHINE_CONFIG: u8 = 0xEE;
const PGN_STATUS: u8 = 0xFA;

/// Message types observed on the bridge link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KnownPgn {
    /// Steering controller settings
    SteerSettings,
    /// Steering set-points and switches
    SteerData,
    /// Position fix from the guidance application
    GpsData,
    /// Section and hydraulic state
    MachineData,
    /// Machine module configuration
    MachineConfig,
    /// Periodic bridge status
    Status,
}

impl KnownPgn {
    /// All known PGNs
    pub const ALL: [KnownPgn; 6] = [
        KnownPgn::SteerSettings,
        KnownPgn::SteerData,
        KnownPgn::GpsData,
        KnownPgn::MachineData,
        KnownPgn::MachineConfig,
        KnownPgn::Status,
    ];

    /// Parse a PGN from its wire byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            PGN_STEER_SETTINGS => Some(KnownPgn::SteerSettings),
            PGN_STEER_DATA => Some(KnownPgn::SteerData),
            PGN_GPS_DATA => Some(KnownPgn::GpsData),
            PGN_MACHINE_DATA => Some(KnownPgn::MachineData),
            PGN_MACHINE_CONFIG => Some(KnownPgn::MachineConfig),
            PGN_STATUS => Some(KnownPgn::Status),
            _ => None,
        }
    }

    /// Convert to wire byte
    pub fn to_byte(self) -> u8 {
        match self {
            KnownPgn::SteerSettings => PGN_STEER_SETTINGS,
            KnownPgn::SteerData => PGN_STEER_DATA,
            KnownPgn::GpsData => PGN_GPS_DATA,
            KnownPgn::MachineData => PGN_MACHINE_DATA,
            KnownPgn::MachineConfig => PGN_MACHINE_CONFIG,
            KnownPgn::Status => PGN_STATUS,
        }
    }

    /// Short name for logs
    pub fn name(self) -> &'static str {
        match self {
            KnownPgn::SteerSettings => "steer-settings",
            KnownPgn::SteerData => "steer-data",
            KnownPgn::GpsData => "gps-data",
            KnownPgn::MachineData => "machine-data",
            KnownPgn::MachineConfig => "machine-config",
            KnownPgn::Status => "status",
        }
    }
}
