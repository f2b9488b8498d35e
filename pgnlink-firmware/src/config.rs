//! Link configuration loading
//!
//! Parses the embedded link.toml; any problem falls back to defaults so the
//! bridge still comes up and announces itself.

use defmt::*;

use pgnlink_core::config::{parse_config, LinkConfig};

/// Parse and validate `toml`, falling back to defaults
pub fn load(toml: &str) -> LinkConfig {
    let config = match parse_config(toml) {
        Ok(config) => config,
        Err(e) => {
            warn!("link.toml parse error: {}, using defaults", e);
            return LinkConfig::default();
        }
    };

    if let Err(e) = config.validate() {
        warn!("link.toml rejected: {}, using defaults", e);
        return LinkConfig::default();
    }

    info!(
        "Link config: role={}, node={=str}, source={=u8:#x}, status_pgn={=u8:#x}",
        config.role,
        config.node_name.as_str(),
        config.source_id,
        config.status_pgn
    );
    config
}
