//! Configuration type definitions

use heapless::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use twinwire_hal::Address;

use crate::bus::BusTiming;

/// Maximum console prompt length
pub const MAX_PROMPT_LEN: usize = 16;

/// Open-drain pin assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinConfig {
    /// GPIO number
    pub pin: u8,
    /// Enable the internal pull-up (weak, only good for short buses)
    pub pull_up: bool,
}

impl PinConfig {
    /// Pin relying on external pull-ups
    pub const fn new(pin: u8) -> Self {
        Self {
            pin,
            pull_up: false,
        }
    }

    /// Pin with the internal pull-up enabled
    pub const fn with_pullup(pin: u8) -> Self {
        Self { pin, pull_up: true }
    }
}

/// Bus wiring and timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusConfig {
    /// Clock pin
    pub scl: PinConfig,
    /// Data pin
    pub sda: PinConfig,
    /// Half clock period in nanoseconds
    pub half_cycle_ns: u32,
    /// Polls allowed for a released line to read high
    pub wait_iterations: u32,
    /// First address probed by a scan
    pub scan_first: u8,
    /// Last address probed by a scan
    pub scan_last: u8,
}

impl Default for BusConfig {
    fn default() -> Self {
        let timing = BusTiming::CONSERVATIVE;
        Self {
            scl: PinConfig::new(5),
            sda: PinConfig::new(4),
            half_cycle_ns: timing.half_cycle_ns(),
            wait_iterations: timing.wait_iterations(),
            scan_first: Address::SCAN_FIRST,
            scan_last: Address::SCAN_LAST,
        }
    }
}

impl BusConfig {
    /// Timing for the line driver
    pub const fn timing(&self) -> BusTiming {
        BusTiming::new(self.half_cycle_ns, self.wait_iterations)
    }

    /// Scan range as addresses
    pub const fn scan_range(&self) -> (Address, Address) {
        (Address::masked(self.scan_first), Address::masked(self.scan_last))
    }
}

/// AHT10/AHT20 session settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorConfig {
    /// 7-bit device address
    pub address: u8,
    /// Calibration command tried first (AHT10)
    pub init_command: u8,
    /// Calibration command tried when the first is refused (AHT20)
    pub fallback_init_command: u8,
    /// Status polls before a measurement times out
    pub poll_attempts: u8,
    /// Delay between status polls
    pub poll_interval_ms: u16,
    /// Settle time after soft reset and after calibration
    pub settle_ms: u16,
    /// Read and check the CRC byte sent by AHT20 parts
    pub verify_crc: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            address: 0x38,
            init_command: 0xE1,
            fallback_init_command: 0xBE,
            poll_attempts: 20,
            poll_interval_ms: 10,
            settle_ms: 20,
            verify_crc: false,
        }
    }
}

/// Serial console settings
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConsoleConfig {
    /// UART baud rate
    pub baudrate: u32,
    /// Prompt printed before each command line
    pub prompt: String<MAX_PROMPT_LEN>,
    /// Echo typed characters back
    pub echo: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        let mut prompt = String::new();
        let _ = prompt.push_str("RUNTIME>");
        Self {
            baudrate: 115_200,
            prompt,
            echo: true,
        }
    }
}

/// Complete board configuration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoardConfig {
    pub bus: BusConfig,
    pub sensor: SensorConfig,
    pub console: ConsoleConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BoardConfig::default();
        assert_eq!(config.bus.timing(), BusTiming::CONSERVATIVE);
        assert_eq!(config.sensor.address, 0x38);
        assert_eq!(config.sensor.poll_attempts, 20);
        assert_eq!(config.console.prompt.as_str(), "RUNTIME>");
    }

    #[test]
    fn test_scan_range() {
        let (first, last) = BusConfig::default().scan_range();
        assert_eq!(first.get(), 0x03);
        assert_eq!(last.get(), 0x77);
    }
}
