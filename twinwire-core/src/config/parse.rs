//! Board configuration parser
//!
//! A minimal reader for the TOML subset used by `board.toml`. It does NOT
//! support the full TOML spec.
//!
//! Supported:
//! - `[bus]`, `[sensor]` and `[console]` section headers
//! - `key = value` with decimal or `0x` hex integers, booleans and strings
//! - Comments (`# ...`), whole-line or trailing
//!
//! Unknown sections and keys are rejected so typos do not silently fall
//! back to defaults.

use heapless::String;
use twinwire_hal::Address;

use super::types::{BoardConfig, PinConfig, MAX_PROMPT_LEN};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Unknown or malformed section header (line number)
    InvalidSection(u16),
    /// Key not valid in its section (line number)
    UnknownKey(u16),
    /// Line is not `key = value` (line number)
    Syntax(u16),
    /// Value has the wrong type or is out of range (line number)
    InvalidValue(u16),
    /// Pin is not `gpioN` or `^gpioN` (line number)
    InvalidPin(u16),
    /// Scan range is empty or reaches past 0x7F
    InvalidScanRange,
    /// Clock and data share a pin
    PinConflict,
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Bus,
    Sensor,
    Console,
}

/// Parse `board.toml` contents, starting from the defaults
pub fn parse_config(input: &str) -> Result<BoardConfig, ConfigError> {
    let mut config = BoardConfig::default();
    let mut section = Section::Root;

    for (index, line) in input.lines().enumerate() {
        let number = (index + 1).min(u16::MAX as usize) as u16;
        let line = strip_comment(line).trim();

        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') {
            if !line.ends_with(']') {
                return Err(ConfigError::InvalidSection(number));
            }
            section = parse_section_header(&line[1..line.len() - 1])
                .ok_or(ConfigError::InvalidSection(number))?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ConfigError::Syntax(number))?;
        apply_value(&mut config, section, key, value, number)?;
    }

    validate(&config)?;
    Ok(config)
}

fn parse_section_header(header: &str) -> Option<Section> {
    match header.trim() {
        "bus" => Some(Section::Bus),
        "sensor" => Some(Section::Sensor),
        "console" => Some(Section::Console),
        _ => None,
    }
}

/// Drop a trailing comment, leaving `#` inside quotes alone
fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '#' if !quoted => return &line[..i],
            _ => {}
        }
    }
    line
}

fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

fn apply_value(
    config: &mut BoardConfig,
    section: Section,
    key: &str,
    value: &str,
    line: u16,
) -> Result<(), ConfigError> {
    let bad = ConfigError::InvalidValue(line);

    match section {
        Section::Bus => {
            let bus = &mut config.bus;
            match key {
                "scl" => bus.scl = parse_pin(value).ok_or(ConfigError::InvalidPin(line))?,
                "sda" => bus.sda = parse_pin(value).ok_or(ConfigError::InvalidPin(line))?,
                "half_cycle_ns" => bus.half_cycle_ns = nonzero(parse_int(value), bad)?,
                "frequency_hz" => {
                    let hz: u32 = nonzero(parse_int(value), bad)?;
                    // round up so the bus never runs faster than asked
                    bus.half_cycle_ns = 1_000_000_000u32.div_ceil(hz.saturating_mul(2));
                }
                "wait_iterations" => bus.wait_iterations = nonzero(parse_int(value), bad)?,
                "scan_first" => bus.scan_first = parse_int(value).ok_or(bad)?,
                "scan_last" => bus.scan_last = parse_int(value).ok_or(bad)?,
                _ => return Err(ConfigError::UnknownKey(line)),
            }
        }
        Section::Sensor => {
            let sensor = &mut config.sensor;
            match key {
                "address" => {
                    let raw = parse_int(value).ok_or(bad)?;
                    sensor.address = Address::new(raw).ok_or(bad)?.get();
                }
                "init_command" => sensor.init_command = parse_int(value).ok_or(bad)?,
                "fallback_init_command" => {
                    sensor.fallback_init_command = parse_int(value).ok_or(bad)?
                }
                "poll_attempts" => sensor.poll_attempts = nonzero(parse_int(value), bad)?,
                "poll_interval_ms" => sensor.poll_interval_ms = parse_int(value).ok_or(bad)?,
                "settle_ms" => sensor.settle_ms = parse_int(value).ok_or(bad)?,
                "verify_crc" => sensor.verify_crc = parse_bool(value).ok_or(bad)?,
                _ => return Err(ConfigError::UnknownKey(line)),
            }
        }
        Section::Console => {
            let console = &mut config.console;
            match key {
                "baudrate" => console.baudrate = nonzero(parse_int(value), bad)?,
                "prompt" => {
                    let text = parse_string(value).ok_or(bad)?;
                    let mut prompt = String::<MAX_PROMPT_LEN>::new();
                    prompt.push_str(text).map_err(|_| bad)?;
                    console.prompt = prompt;
                }
                "echo" => console.echo = parse_bool(value).ok_or(bad)?,
                _ => return Err(ConfigError::UnknownKey(line)),
            }
        }
        Section::Root => return Err(ConfigError::UnknownKey(line)),
    }

    Ok(())
}

fn validate(config: &BoardConfig) -> Result<(), ConfigError> {
    let bus = &config.bus;
    if bus.scan_first > bus.scan_last || bus.scan_last > 0x7F {
        return Err(ConfigError::InvalidScanRange);
    }
    if bus.scl.pin == bus.sda.pin {
        return Err(ConfigError::PinConflict);
    }
    Ok(())
}

/// Integer types accepted by the parser
trait ConfigInt: Sized + PartialEq + Default {
    fn from_str_radix(src: &str, radix: u32) -> Option<Self>;
}

macro_rules! config_int {
    ($($t:ty),*) => {
        $(impl ConfigInt for $t {
            fn from_str_radix(src: &str, radix: u32) -> Option<Self> {
                <$t>::from_str_radix(src, radix).ok()
            }
        })*
    };
}

config_int!(u8, u16, u32);

/// Parse a decimal or `0x` hex integer; `_` separators are allowed
fn parse_int<T: ConfigInt>(value: &str) -> Option<T> {
    let mut digits = String::<16>::new();
    for c in value.chars().filter(|&c| c != '_') {
        digits.push(c).ok()?;
    }
    match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => T::from_str_radix(hex, 16),
        None => T::from_str_radix(&digits, 10),
    }
}

fn nonzero<T: ConfigInt>(value: Option<T>, err: ConfigError) -> Result<T, ConfigError> {
    match value {
        Some(v) if v != T::default() => Ok(v),
        _ => Err(err),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Strings must be quoted
fn parse_string(value: &str) -> Option<&str> {
    value.strip_prefix('"')?.strip_suffix('"')
}

/// Parse a pin like "gpio5" or "^gpio5" (internal pull-up)
fn parse_pin(value: &str) -> Option<PinConfig> {
    let value = parse_string(value).unwrap_or(value);
    let (pull_up, name) = match value.strip_prefix('^') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let pin: u8 = name.strip_prefix("gpio")?.parse().ok()?;
    Some(PinConfig { pin, pull_up })
}
