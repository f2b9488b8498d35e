//! Minimal TOML reader for the `[link]` section
//!
//! Handles the subset needed for link settings and nothing more:
//!
//! - `key = value` pairs (string, integer, boolean)
//! - the `[link]` section header
//! - `#` comments, whole-line or trailing
//! - integers in decimal or `0x` hex
//!
//! The result is not validated; call [`LinkConfig::validate`] on it.

use super::types::{LinkConfig, LinkRole};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Section other than `[link]`, or a key outside any section
    InvalidSection,
    /// Value has the wrong type or is out of range
    InvalidValue,
    /// Key not recognised in `[link]`
    UnknownKey,
    /// String longer than its field
    ValueTooLong,
}

/// Parse TOML text into a [`LinkConfig`], starting from defaults
pub fn parse_config(input: &str) -> Result<LinkConfig, ParseError> {
    let mut config = LinkConfig::default();
    let mut in_link = false;

    for line in input.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            let header = strip_comment(line);
            if !header.ends_with(']') || header[1..header.len() - 1].trim() != "link" {
                return Err(ParseError::InvalidSection);
            }
            in_link = true;
            continue;
        }

        let Some((key, value)) = parse_key_value(line) else {
            return Err(ParseError::InvalidValue);
        };
        if !in_link {
            return Err(ParseError::InvalidSection);
        }
        apply_value(&mut config, key, value)?;
    }

    Ok(config)
}

fn apply_value(config: &mut LinkConfig, key: &str, value: &str) -> Result<(), ParseError> {
    match key {
        "role" => {
            config.role = match parse_string(value)? {
                "bridge" => LinkRole::Bridge,
                "host" => LinkRole::Host,
                _ => return Err(ParseError::InvalidValue),
            };
        }
        "node_name" => {
            config.node_name.clear();
            config
                .node_name
                .push_str(parse_string(value)?)
                .map_err(|_| ParseError::ValueTooLong)?;
        }
        "source_id" => config.source_id = parse_int(value)?,
        "status_pgn" => config.status_pgn = parse_int(value)?,
        "announce_interval_ms" => config.announce_interval_ms = parse_int(value)?,
        "status_interval_ms" => config.status_interval_ms = parse_int(value)?,
        "keep_announcing" => config.keep_announcing = parse_bool(value)?,
        "peer_timeout_ms" => {
            // 0 disables the timeout
            let ms: u32 = parse_int(value)?;
            config.peer_timeout_ms = (ms > 0).then_some(ms);
        }
        "presence_timeout_ms" => config.presence_timeout_ms = parse_int(value)?,
        "overflow_margin" => config.overflow_margin = parse_int(value)?,
        _ => return Err(ParseError::UnknownKey),
    }
    Ok(())
}

/// Drop a trailing `# comment` that is not inside a string
fn strip_comment(text: &str) -> &str {
    match text.find('#') {
        Some(hash_pos) if text[..hash_pos].matches('"').count() % 2 == 0 => {
            text[..hash_pos].trim()
        }
        _ => text,
    }
}

/// Split a `key = value` line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = strip_comment(line[eq_pos + 1..].trim());

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a string value (removes quotes)
fn parse_string(value: &str) -> Result<&str, ParseError> {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        Ok(&value[1..value.len() - 1])
    } else {
        // Allow unquoted strings for simple values
        Ok(value)
    }
}

/// Parse an integer value, decimal or `0x` hex
fn parse_int<T: TryFrom<u32>>(value: &str) -> Result<T, ParseError> {
    let value = strip_underscores(value);
    let parsed = match value.as_str().strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.as_str().parse(),
    }
    .map_err(|_| ParseError::InvalidValue)?;
    T::try_from(parsed).map_err(|_| ParseError::InvalidValue)
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Copy of an integer literal without `_` digit separators
fn strip_underscores(value: &str) -> heapless::String<16> {
    let mut out = heapless::String::new();
    for c in value.chars().filter(|c| *c != '_') {
        // Overlong literals become an unparsable empty string
        if out.push(c).is_err() {
            out.clear();
            break;
        }
    }
    out
}
