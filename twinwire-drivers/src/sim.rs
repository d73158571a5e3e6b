//! Simulated devices
//!
//! Device models that plug into [`twinwire_core::sim::SimBus`] for host
//! tests of code built on these drivers.

use heapless::Vec;
use twinwire_core::sim::SimTarget;

use crate::sensor::aht::{crc8, CMD_RESET, CMD_TRIGGER};

/// AHT10/AHT20 part at address 0x38
///
/// Accepts one calibration command (0xE1 for an AHT10, 0xBE for an
/// AHT20), reports busy for a set number of status reads after each
/// trigger, and always sends a CRC byte after the six-byte frame.
#[derive(Debug, Clone)]
pub struct AhtModel {
    init_command: u8,
    refuse_params: bool,
    raw_humidity: u32,
    raw_temperature: u32,
    busy_polls: u8,
    busy_remaining: u8,
    calibrated: bool,
    bad_crc: bool,
    resets: u8,
    triggers: u8,
    rx: Vec<u8, 4>,
    tx: [u8; 7],
    tx_index: usize,
}

impl AhtModel {
    /// Part accepting `init_command`; reads 50 %RH and 25 C
    pub fn new(init_command: u8) -> Self {
        Self {
            init_command,
            refuse_params: false,
            raw_humidity: 0x80000,
            raw_temperature: 0x60000,
            busy_polls: 0,
            busy_remaining: 0,
            calibrated: false,
            bad_crc: false,
            resets: 0,
            triggers: 0,
            rx: Vec::new(),
            tx: [0xFF; 7],
            tx_index: 0,
        }
    }

    /// Set the raw 20-bit readings
    pub fn with_raw(mut self, humidity: u32, temperature: u32) -> Self {
        self.raw_humidity = humidity & 0xF_FFFF;
        self.raw_temperature = temperature & 0xF_FFFF;
        self
    }

    /// Report busy for `polls` status reads after each trigger
    pub fn with_busy_polls(mut self, polls: u8) -> Self {
        self.busy_polls = polls;
        self
    }

    /// NACK every byte after the command byte
    pub fn refusing_params(mut self) -> Self {
        self.refuse_params = true;
        self
    }

    /// Send a CRC byte that does not match the frame
    pub fn with_bad_crc(mut self) -> Self {
        self.bad_crc = true;
        self
    }

    /// Calibration has been loaded since the last reset
    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// Soft resets received
    pub fn resets(&self) -> u8 {
        self.resets
    }

    /// Measurements triggered
    pub fn triggers(&self) -> u8 {
        self.triggers
    }

    fn load_frame(&mut self) {
        let busy = self.busy_remaining > 0;
        self.busy_remaining = self.busy_remaining.saturating_sub(1);

        let mut status = 0u8;
        if busy {
            status |= 0x80;
        }
        if self.calibrated {
            status |= 0x08;
        }

        let h = self.raw_humidity;
        let t = self.raw_temperature;
        self.tx = [
            status,
            (h >> 12) as u8,
            (h >> 4) as u8,
            ((h << 4) as u8 & 0xF0) | ((t >> 16) as u8 & 0x0F),
            (t >> 8) as u8,
            t as u8,
            0,
        ];
        let crc = crc8(&self.tx[..6]);
        self.tx[6] = if self.bad_crc { !crc } else { crc };
        self.tx_index = 0;
    }
}

impl SimTarget for AhtModel {
    fn address(&self) -> u8 {
        0x38
    }

    fn select(&mut self, read: bool) -> bool {
        if read {
            self.load_frame();
        }
        true
    }

    fn write(&mut self, byte: u8) -> bool {
        let accept = if self.rx.is_empty() {
            byte == CMD_RESET || byte == CMD_TRIGGER || byte == self.init_command
        } else {
            !self.refuse_params
        };
        if accept {
            let _ = self.rx.push(byte);
        }
        accept
    }

    fn read(&mut self) -> u8 {
        let byte = self.tx.get(self.tx_index).copied().unwrap_or(0xFF);
        self.tx_index += 1;
        byte
    }

    fn finish(&mut self) {
        match self.rx.as_slice() {
            [CMD_RESET] => {
                self.resets += 1;
                self.calibrated = false;
            }
            [CMD_TRIGGER, 0x33, 0x00] => {
                self.triggers += 1;
                self.busy_remaining = self.busy_polls;
            }
            [cmd, 0x08, 0x00] if *cmd == self.init_command => self.calibrated = true,
            _ => {}
        }
        self.rx.clear();
    }
}
