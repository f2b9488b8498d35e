//! Build script for pgnlink-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates link.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Keys accepted in the [link] section
const KNOWN_KEYS: &[&str] = &[
    "role",
    "node_name",
    "source_id",
    "status_pgn",
    "announce_interval_ms",
    "status_interval_ms",
    "keep_announcing",
    "peer_timeout_ms",
    "presence_timeout_ms",
    "overflow_margin",
];

/// Longest node name that fits the announcement buffer
const MAX_NODE_NAME_LEN: usize = 16;

/// Largest margin that still leaves room for a 256-byte frame in 512 bytes
const MAX_OVERFLOW_MARGIN: i64 = 256;

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate link.toml at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=link.toml");

    let config_path = Path::new("link.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: link.toml not found!                                     ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds link.toml from the pgnlink-firmware         ║\n\
            ║  directory. Create one with a [link] section.                    ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read link.toml                                 ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in link.toml                         ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let errors = validate_link(&config);
    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid link configuration                               ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=link.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check the [link] section, returning one message per problem
fn validate_link(config: &toml::Value) -> Vec<String> {
    let mut errors = Vec::new();

    let root = match config.as_table() {
        Some(t) => t,
        None => return vec!["link.toml must be a table".to_string()],
    };

    for key in root.keys() {
        if key != "link" {
            errors.push(format!("unknown section [{}]", key));
        }
    }

    let link = match root.get("link") {
        Some(toml::Value::Table(t)) => t,
        Some(_) => {
            errors.push("[link] must be a table".to_string());
            return errors;
        }
        None => {
            errors.push("missing [link] section".to_string());
            return errors;
        }
    };

    for key in link.keys() {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            errors.push(format!("[link] unknown key '{}'", key));
        }
    }

    if let Some(role) = link.get("role") {
        match role.as_str() {
            Some("bridge") | Some("host") => {}
            _ => errors.push("[link] role must be 'bridge' or 'host'".to_string()),
        }
    }

    if let Some(name) = link.get("node_name") {
        match name.as_str() {
            Some(n)
                if !n.is_empty()
                    && n.len() <= MAX_NODE_NAME_LEN
                    && n.bytes().all(|b| b.is_ascii_graphic()) => {}
            _ => errors.push(format!(
                "[link] node_name must be 1-{} printable ASCII chars",
                MAX_NODE_NAME_LEN
            )),
        }
    }

    for key in ["source_id", "status_pgn"] {
        check_int(link, key, 0, 255, &mut errors);
    }

    for key in [
        "announce_interval_ms",
        "status_interval_ms",
        "presence_timeout_ms",
    ] {
        check_int(link, key, 1, u32::MAX as i64, &mut errors);
    }

    // 0 disables the peer timeout
    check_int(link, "peer_timeout_ms", 0, u32::MAX as i64, &mut errors);
    check_int(link, "overflow_margin", 0, MAX_OVERFLOW_MARGIN, &mut errors);

    if let Some(value) = link.get("keep_announcing") {
        if !value.is_bool() {
            errors.push("[link] keep_announcing must be true or false".to_string());
        }
    }

    errors
}

/// Check that an optional integer key lies in `min..=max`
fn check_int(table: &toml::Table, key: &str, min: i64, max: i64, errors: &mut Vec<String>) {
    match table.get(key) {
        None => {}
        Some(toml::Value::Integer(v)) if (min..=max).contains(v) => {}
        Some(_) => errors.push(format!("[link] {} must be an integer {}-{}", key, min, max)),
    }
}
