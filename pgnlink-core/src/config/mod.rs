//! Link configuration
//!
//! [`LinkConfig`] is the single source of tunables for the engine. It has two
//! external forms: a `[link]` TOML section for humans and postcard binary for
//! storage alongside other board data.

pub mod toml;
pub mod types;

pub use self::toml::{parse_config, ParseError};
pub use types::*;
