//! I2C master abstractions
//!
//! Byte-level primitives of an I2C master. Device drivers are written
//! against [`I2cPrimitives`] rather than a block-transfer API because
//! sensor command sequences need to know which byte of a sequence was
//! refused, and some reads end with a NACK after a single status byte.

/// 7-bit I2C device address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address(u8);

impl Address {
    /// First address probed by a bus scan (0x00-0x02 are reserved)
    pub const SCAN_FIRST: u8 = 0x03;
    /// Last address probed by a bus scan (0x78-0x7F are reserved)
    pub const SCAN_LAST: u8 = 0x77;

    /// Create an address, rejecting values above 0x7F
    pub const fn new(raw: u8) -> Option<Self> {
        if raw <= 0x7F {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// Create an address by dropping the eighth bit
    pub const fn masked(raw: u8) -> Self {
        Self(raw & 0x7F)
    }

    /// Raw 7-bit value
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Address byte for a write transfer (R/W bit clear)
    pub const fn write_byte(self) -> u8 {
        self.0 << 1
    }

    /// Address byte for a read transfer (R/W bit set)
    pub const fn read_byte(self) -> u8 {
        (self.0 << 1) | 0x01
    }

    /// Reserved addresses are skipped by a bus scan
    pub const fn is_reserved(self) -> bool {
        self.0 < Self::SCAN_FIRST || self.0 > Self::SCAN_LAST
    }
}

impl From<Address> for u8 {
    fn from(address: Address) -> u8 {
        address.0
    }
}

/// Which byte of a transfer was not acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NackSource {
    /// The address byte was refused (no device, or device busy)
    Address,
    /// A data byte was refused
    Data,
    /// The caller did not say which byte it was
    Unknown,
}

/// I2C bus master primitives
///
/// Every method runs to completion or failure; nothing blocks without a
/// bound. After any error the caller must issue [`I2cPrimitives::stop`]
/// before starting another transfer so the bus returns to idle.
pub trait I2cPrimitives {
    /// Error type for bus operations
    type Error;

    /// Release both lines and confirm both read high
    fn bus_idle(&mut self) -> Result<(), Self::Error>;

    /// Generate a START condition
    fn start(&mut self) -> Result<(), Self::Error>;

    /// Generate a repeated START without releasing the bus
    fn restart(&mut self) -> Result<(), Self::Error>;

    /// Generate a STOP condition
    fn stop(&mut self) -> Result<(), Self::Error>;

    /// Clock out one byte MSB-first and sample the acknowledgment
    ///
    /// Returns `Ok(true)` if the receiver pulled data low on the ninth clock.
    fn write_byte(&mut self, byte: u8) -> Result<bool, Self::Error>;

    /// Clock in one byte MSB-first, then acknowledge it
    ///
    /// # Arguments
    /// * `ack` - `true` to ask for another byte, `false` to NACK the last one
    fn read_byte(&mut self, ack: bool) -> Result<u8, Self::Error>;

    /// Check whether a device acknowledges its write address
    ///
    /// Always ends with a STOP, whatever happened before it.
    fn probe(&mut self, address: Address) -> Result<bool, Self::Error> {
        self.bus_idle()?;
        let acked = self
            .start()
            .and_then(|()| self.write_byte(address.write_byte()));
        self.finish(acked)
    }

    /// Check whether a device acknowledges its read address
    ///
    /// An acknowledging device starts driving its first byte straight away,
    /// so that byte is clocked in and NACKed before the STOP; otherwise a
    /// zero bit would hold data low through the STOP.
    fn probe_read(&mut self, address: Address) -> Result<bool, Self::Error> {
        self.bus_idle()?;
        let acked = self.start().and_then(|()| {
            let acked = self.write_byte(address.read_byte())?;
            if acked {
                self.read_byte(false)?;
            }
            Ok(acked)
        });
        self.finish(acked)
    }

    /// Issue the closing STOP and merge its result with the transfer's
    ///
    /// The STOP is sent even when `result` is an error, and the transfer's
    /// own error wins over a STOP failure.
    fn finish<T>(&mut self, result: Result<T, Self::Error>) -> Result<T, Self::Error> {
        let stopped = self.stop();
        let value = result?;
        stopped?;
        Ok(value)
    }
}
