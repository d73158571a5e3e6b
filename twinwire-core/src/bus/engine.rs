//! Transaction engine
//!
//! Builds START/STOP conditions and 9-clock byte frames on top of the
//! [`LineDriver`]. Every byte, in either direction, is eight data bits
//! MSB-first plus one acknowledgment bit, and the master drives the clock
//! for all nine.
//!
//! # Failure discipline
//!
//! A line fault inside a frame is returned to the caller, never masked. A
//! refused byte and a clock that never rose are equally terminal for the
//! transfer, and the bus must see a STOP before the next one. The
//! composite operations here ([`BitBangI2c::probe`], [`BitBangI2c::scan`]
//! and the `embedded_hal` transfers) issue that STOP themselves.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorType, I2c, Operation, SevenBitAddress};
use twinwire_hal::{Address, I2cPrimitives, LineLevels, LineMask, LinePort, NackSource};

use super::error::BusError;
use super::line::LineDriver;
use super::scan::{scan_range, AddressSet};
use super::timing::BusTiming;

/// Clock pulses tried by [`BitBangI2c::recover`] before giving up
const RECOVERY_PULSES: u8 = 9;

/// Bit-banged I2C master
pub struct BitBangI2c<P, D> {
    lines: LineDriver<P, D>,
}

impl<P: LinePort, D: DelayNs> BitBangI2c<P, D> {
    /// Create an engine on a line port; both lines start released
    pub fn new(port: P, delay: D, timing: BusTiming) -> Self {
        Self {
            lines: LineDriver::new(port, delay, timing),
        }
    }

    /// Release both lines and confirm they read high
    ///
    /// Fails with a line fault if a pull-up is missing or a slave is
    /// holding a line. Calling it again on a healthy bus changes nothing.
    pub fn bus_idle(&mut self) -> Result<(), BusError> {
        self.lines.release_sda();
        self.lines.release_scl();
        self.lines.wait_high(LineMask::BOTH)?;
        self.lines.delay_half_cycle();
        Ok(())
    }

    /// Generate a START condition: data falls while the clock is high
    ///
    /// Expects an idle bus; call [`BitBangI2c::bus_idle`] first.
    pub fn start(&mut self) -> Result<(), BusError> {
        self.start_condition()
    }

    /// Generate a repeated START in the middle of a transfer
    ///
    /// Used to turn a register-pointer write into a read without letting
    /// go of the bus.
    pub fn restart(&mut self) -> Result<(), BusError> {
        self.start_condition()
    }

    fn start_condition(&mut self) -> Result<(), BusError> {
        // data goes high while the clock is still low, so no STOP/START yet
        self.lines.release_sda();
        self.lines.release_scl();
        self.lines.wait_high(LineMask::BOTH)?;
        self.lines.pull_sda_low();
        self.lines.pull_scl_low();
        Ok(())
    }

    /// Generate a STOP condition: data rises while the clock is high
    ///
    /// The clock is brought low before data is pulled low, so calling this
    /// from any state never produces a spurious START. Both lines are
    /// released on return even if the clock never rose.
    pub fn stop(&mut self) -> Result<(), BusError> {
        self.lines.pull_scl_low();
        self.lines.pull_sda_low();
        self.lines.release_scl();
        let clock = self.lines.wait_high(LineMask::SCL);
        self.lines.delay_half_cycle();
        self.lines.release_sda();
        clock?;
        self.lines.wait_high(LineMask::SDA)
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), BusError> {
        self.lines.set_sda(bit);
        self.lines.release_scl();
        self.lines.wait_high(LineMask::SCL)?;
        self.lines.pull_scl_low();
        Ok(())
    }

    /// Clock one bit in; data must already be released
    fn read_bit(&mut self) -> Result<bool, BusError> {
        self.lines.release_scl();
        self.lines.wait_high(LineMask::SCL)?;
        let bit = self.lines.read_lines().sda;
        self.lines.pull_scl_low();
        Ok(bit)
    }

    /// Clock out a byte MSB-first and sample the acknowledgment
    ///
    /// Returns `Ok(true)` if the receiver held data low on the ninth clock.
    pub fn write_byte(&mut self, byte: u8) -> Result<bool, BusError> {
        for i in (0..8).rev() {
            self.write_bit(byte & (1 << i) != 0)?;
        }
        self.lines.release_sda();
        let nack = self.read_bit()?;
        Ok(!nack)
    }

    /// Clock in a byte MSB-first, then drive the acknowledgment
    ///
    /// `ack = false` (NACK) must be used on the last byte of a read.
    pub fn read_byte(&mut self, ack: bool) -> Result<u8, BusError> {
        self.lines.release_sda();
        let mut value = 0u8;
        for _ in 0..8 {
            value = (value << 1) | self.read_bit()? as u8;
        }
        self.write_bit(!ack)?;
        Ok(value)
    }

    /// Check whether a device acknowledges its write address
    ///
    /// Idle check, START, address byte, STOP. Device state is untouched.
    pub fn probe(&mut self, address: Address) -> Result<bool, BusError> {
        I2cPrimitives::probe(self, address)
    }

    /// Probe every non-reserved address (0x03 to 0x77)
    ///
    /// A line fault ends the scan early since no later probe can succeed.
    pub fn scan(&mut self) -> Result<AddressSet, BusError> {
        let mut found = AddressSet::new();
        for address in scan_range() {
            if self.probe(address)? {
                found.insert(address);
            }
        }
        Ok(found)
    }

    /// Probe an inclusive address range
    pub fn scan_between(&mut self, first: Address, last: Address) -> Result<AddressSet, BusError> {
        let mut found = AddressSet::new();
        for raw in first.get()..=last.get() {
            let address = Address::masked(raw);
            if self.probe(address)? {
                found.insert(address);
            }
        }
        Ok(found)
    }

    /// Release both lines and report what they read after half a cycle
    ///
    /// Both high means the pull-ups are fitted and nobody holds the bus.
    pub fn check_lines(&mut self) -> LineLevels {
        self.lines.release_sda();
        self.lines.release_scl();
        self.lines.read_lines()
    }

    /// Free a slave that is holding data low mid-byte
    ///
    /// Clocks up to nine pulses until data reads high, then issues STOP.
    pub fn recover(&mut self) -> Result<(), BusError> {
        self.lines.release_sda();
        for _ in 0..RECOVERY_PULSES {
            if self.lines.read_lines().sda {
                break;
            }
            self.lines.pull_scl_low();
            self.lines.release_scl();
            self.lines.wait_high(LineMask::SCL)?;
        }
        self.stop()
    }

    fn send_address(&mut self, byte: u8) -> Result<(), BusError> {
        if self.write_byte(byte)? {
            Ok(())
        } else {
            Err(BusError::Nack(NackSource::Address))
        }
    }

    fn run_operations(
        &mut self,
        address: Address,
        operations: &mut [Operation<'_>],
    ) -> Result<(), BusError> {
        let mut previous: Option<bool> = None;

        for index in 0..operations.len() {
            let is_read = matches!(operations[index], Operation::Read(_));
            let next_is_read = operations
                .get(index + 1)
                .map(|op| matches!(op, Operation::Read(_)));

            // direction changes need a (repeated) START and a fresh address byte
            if previous != Some(is_read) {
                if previous.is_none() {
                    self.start()?;
                } else {
                    self.restart()?;
                }
                let byte = if is_read {
                    address.read_byte()
                } else {
                    address.write_byte()
                };
                self.send_address(byte)?;
            }

            match &mut operations[index] {
                Operation::Write(bytes) => {
                    for &byte in bytes.iter() {
                        if !self.write_byte(byte)? {
                            return Err(BusError::Nack(NackSource::Data));
                        }
                    }
                }
                Operation::Read(buffer) => {
                    let continues = next_is_read == Some(true);
                    if buffer.is_empty() && !continues {
                        // the device is already driving a byte; NACK it so
                        // data is free for the STOP
                        self.read_byte(false)?;
                    }
                    let last = buffer.len().saturating_sub(1);
                    for (i, byte) in buffer.iter_mut().enumerate() {
                        *byte = self.read_byte(i != last || continues)?;
                    }
                }
            }

            previous = Some(is_read);
        }

        Ok(())
    }

    /// Borrow the line driver
    pub fn lines(&self) -> &LineDriver<P, D> {
        &self.lines
    }

    /// Borrow the line port
    pub fn port(&self) -> &P {
        self.lines.port()
    }

    /// Mutably borrow the line port
    pub fn port_mut(&mut self) -> &mut P {
        self.lines.port_mut()
    }

    /// Timing in use
    pub fn timing(&self) -> BusTiming {
        self.lines.timing()
    }

    /// Give back the port and delay
    pub fn release(self) -> (P, D) {
        self.lines.release()
    }
}

impl<P: LinePort, D: DelayNs> I2cPrimitives for BitBangI2c<P, D> {
    type Error = BusError;

    fn bus_idle(&mut self) -> Result<(), BusError> {
        BitBangI2c::bus_idle(self)
    }

    fn start(&mut self) -> Result<(), BusError> {
        BitBangI2c::start(self)
    }

    fn restart(&mut self) -> Result<(), BusError> {
        BitBangI2c::restart(self)
    }

    fn stop(&mut self) -> Result<(), BusError> {
        BitBangI2c::stop(self)
    }

    fn write_byte(&mut self, byte: u8) -> Result<bool, BusError> {
        BitBangI2c::write_byte(self, byte)
    }

    fn read_byte(&mut self, ack: bool) -> Result<u8, BusError> {
        BitBangI2c::read_byte(self, ack)
    }
}

impl<P, D> ErrorType for BitBangI2c<P, D> {
    type Error = BusError;
}

impl<P: LinePort, D: DelayNs> I2c<SevenBitAddress> for BitBangI2c<P, D> {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.bus_idle()?;
        let result = self.run_operations(Address::masked(address), operations);
        self.finish(result)
    }
}
