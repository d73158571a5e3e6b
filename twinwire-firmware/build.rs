//! Build script for twinwire-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates board.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// GPIOs with a fixed function on the board
const RESERVED_PINS: [(u8, &str); 3] = [(0, "UART0 TX"), (1, "UART0 RX"), (25, "LED")];

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR not set by cargo"));

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).expect("cannot create memory.x");
    f.write_all(memory_x).expect("cannot write memory.x");

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");

    // defmt and cortex-m-rt linker scripts
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}

/// Validate board.toml configuration at compile time
///
/// The firmware parses the same file again at boot with its own no_std
/// reader; catching mistakes here gives a readable error instead of a
/// board that silently falls back to defaults.
fn validate_config() {
    println!("cargo:rerun-if-changed=board.toml");

    let config_path = Path::new("board.toml");
    if !config_path.exists() {
        fail("board.toml not found", &["The firmware embeds board.toml from the crate root."]);
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read board.toml", &[e.to_string()]),
    };

    let config: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            let lines: Vec<String> = e.to_string().lines().map(str::to_string).collect();
            fail("Invalid TOML syntax in board.toml", &lines);
        }
    };

    let mut errors = Vec::new();
    check_sections(&config, &mut errors);
    validate_bus(&config, &mut errors);
    validate_sensor(&config, &mut errors);
    validate_console(&config, &mut errors);

    if !errors.is_empty() {
        fail("Invalid board configuration", &errors);
    }

    println!("cargo:warning=board.toml validated successfully");
}

/// Print a boxed error and stop the build
fn fail<S: AsRef<str>>(title: &str, lines: &[S]) -> ! {
    let body = lines
        .iter()
        .map(|line| {
            let line = line.as_ref();
            let truncated = if line.len() > 62 {
                format!("{}...", &line[..59])
            } else {
                line.to_string()
            };
            format!("║  • {:<62} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n");
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title, body
    );
}

/// Only the sections the firmware reads are allowed
fn check_sections(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(table) = config.as_table() else {
        errors.push("top level must be a table".to_string());
        return;
    };
    for (name, value) in table {
        if !["bus", "sensor", "console"].contains(&name.as_str()) {
            errors.push(format!("unknown section [{}]", name));
        } else if !value.is_table() {
            errors.push(format!("[{}] must be a table", name));
        }
    }
}

/// Check that every key of a section is known
fn check_keys(section: &str, table: &toml::Table, known: &[&str], errors: &mut Vec<String>) {
    for key in table.keys() {
        if !known.contains(&key.as_str()) {
            errors.push(format!("[{}] unknown key '{}'", section, key));
        }
    }
}

/// Integer value of a key, if present and in range
fn int_in(
    section: &str,
    table: &toml::Table,
    key: &str,
    range: std::ops::RangeInclusive<i64>,
    errors: &mut Vec<String>,
) -> Option<i64> {
    match table.get(key) {
        None => None,
        Some(toml::Value::Integer(v)) if range.contains(v) => Some(*v),
        Some(toml::Value::Integer(_)) => {
            errors.push(format!(
                "[{}] {} must be {}-{}",
                section,
                key,
                range.start(),
                range.end()
            ));
            None
        }
        Some(_) => {
            errors.push(format!("[{}] {} must be an integer", section, key));
            None
        }
    }
}

fn check_bool(section: &str, table: &toml::Table, key: &str, errors: &mut Vec<String>) {
    if let Some(value) = table.get(key) {
        if !value.is_bool() {
            errors.push(format!("[{}] {} must be true or false", section, key));
        }
    }
}

/// Parse "gpioN" or "^gpioN"
fn parse_pin(s: &str) -> Option<u8> {
    let s = s.strip_prefix('^').unwrap_or(s);
    let n: u8 = s.strip_prefix("gpio")?.parse().ok()?;
    (n < 30).then_some(n)
}

fn validate_pin(table: &toml::Table, key: &str, errors: &mut Vec<String>) -> Option<u8> {
    let pin = match table.get(key) {
        None => return None,
        Some(toml::Value::String(s)) => match parse_pin(s) {
            Some(pin) => pin,
            None => {
                errors.push(format!("[bus] {} = \"{}\" is not gpio0-gpio29", key, s));
                return None;
            }
        },
        Some(_) => {
            errors.push(format!("[bus] {} must be a string like \"gpio5\"", key));
            return None;
        }
    };
    if let Some((_, use_)) = RESERVED_PINS.iter().find(|(p, _)| *p == pin) {
        errors.push(format!("[bus] {} = gpio{} is used by the {}", key, pin, use_));
    }
    Some(pin)
}

fn validate_bus(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(bus) = config.get("bus").and_then(|b| b.as_table()) else {
        return;
    };
    check_keys(
        "bus",
        bus,
        &[
            "scl",
            "sda",
            "half_cycle_ns",
            "frequency_hz",
            "wait_iterations",
            "scan_first",
            "scan_last",
        ],
        errors,
    );

    let scl = validate_pin(bus, "scl", errors);
    let sda = validate_pin(bus, "sda", errors);
    if scl.is_some() && scl == sda {
        errors.push("[bus] scl and sda must be different pins".to_string());
    }

    if bus.contains_key("half_cycle_ns") && bus.contains_key("frequency_hz") {
        errors.push("[bus] set either half_cycle_ns or frequency_hz, not both".to_string());
    }
    int_in("bus", bus, "half_cycle_ns", 1..=u32::MAX as i64, errors);
    int_in("bus", bus, "frequency_hz", 1..=1_000_000, errors);
    int_in("bus", bus, "wait_iterations", 1..=u32::MAX as i64, errors);

    let first = int_in("bus", bus, "scan_first", 0..=0x7F, errors).unwrap_or(0x03);
    let last = int_in("bus", bus, "scan_last", 0..=0x7F, errors).unwrap_or(0x77);
    if first > last {
        errors.push(format!(
            "[bus] scan_first 0x{:02X} is above scan_last 0x{:02X}",
            first, last
        ));
    }
}

fn validate_sensor(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(sensor) = config.get("sensor").and_then(|s| s.as_table()) else {
        return;
    };
    check_keys(
        "sensor",
        sensor,
        &[
            "address",
            "init_command",
            "fallback_init_command",
            "poll_attempts",
            "poll_interval_ms",
            "settle_ms",
            "verify_crc",
        ],
        errors,
    );
    int_in("sensor", sensor, "address", 0..=0x7F, errors);
    int_in("sensor", sensor, "init_command", 0..=0xFF, errors);
    int_in("sensor", sensor, "fallback_init_command", 0..=0xFF, errors);
    int_in("sensor", sensor, "poll_attempts", 1..=u8::MAX as i64, errors);
    int_in("sensor", sensor, "poll_interval_ms", 0..=u16::MAX as i64, errors);
    int_in("sensor", sensor, "settle_ms", 0..=u16::MAX as i64, errors);
    check_bool("sensor", sensor, "verify_crc", errors);
}

fn validate_console(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(console) = config.get("console").and_then(|c| c.as_table()) else {
        return;
    };
    check_keys("console", console, &["baudrate", "prompt", "echo"], errors);
    int_in("console", console, "baudrate", 1_200..=921_600, errors);
    check_bool("console", console, "echo", errors);
    match console.get("prompt") {
        None => {}
        Some(toml::Value::String(s)) if s.len() <= 16 && s.is_ascii() => {}
        Some(_) => errors.push("[console] prompt must be an ASCII string of at most 16 characters".to_string()),
    }
}
