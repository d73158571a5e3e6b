//! AHT10/AHT20 temperature and humidity sensor
//!
//! The session holds only what belongs to the device conversation: the
//! address, its settings and which calibration command the part accepted.
//! The bus and the delay are borrowed per call, so one engine can serve
//! several devices.
//!
//! Every multi-byte command is sent as one transfer, and a refused byte is
//! reported with the phase it was refused in. The transfer always ends with
//! a STOP, whatever went wrong.

use embedded_hal::delay::DelayNs;
use twinwire_core::config::SensorConfig;
use twinwire_core::{Address, I2cPrimitives};

/// Soft reset
pub(crate) const CMD_RESET: u8 = 0xBA;
/// Start a conversion
pub(crate) const CMD_TRIGGER: u8 = 0xAC;
/// Parameters for [`CMD_TRIGGER`]
const TRIGGER_PARAMS: [u8; 2] = [0x33, 0x00];
/// Parameters for the calibration command: calibration enable, normal mode
const INIT_PARAMS: [u8; 2] = [0x08, 0x00];

/// Full scale of the 20-bit raw fields
const RAW_SCALE: u64 = 1 << 20;

/// Which command set the part accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Variant {
    /// Not initialized yet
    #[default]
    Unknown,
    /// Accepted the primary calibration command (0xE1)
    Aht10,
    /// Refused the primary command but accepted the fallback (0xBE)
    Aht20,
}

impl Variant {
    /// Part name for display
    pub const fn name(self) -> &'static str {
        match self {
            Variant::Unknown => "unknown",
            Variant::Aht10 => "AHT10",
            Variant::Aht20 => "AHT20",
        }
    }
}

/// Byte of a command transfer that was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Write address
    Address,
    /// Command byte
    Command,
    /// First parameter byte
    FirstParam,
    /// Second parameter byte
    SecondParam,
    /// Read address
    ReadAddress,
}

impl Phase {
    /// Phases of the bytes following the write address
    const COMMAND_BYTES: [Phase; 3] = [Phase::Command, Phase::FirstParam, Phase::SecondParam];
}

/// Sensor errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AhtError<E> {
    /// A line did not rise; the bus itself is faulty
    Line(E),
    /// The device refused a byte
    Nack(Phase),
    /// The conversion was still running when the result was read
    Busy,
    /// The device stayed busy for every status poll
    Timeout,
    /// The CRC byte did not match the frame
    Checksum,
}

impl<E> AhtError<E> {
    /// Stable numeric code for console diagnostics
    ///
    /// | code | meaning |
    /// |------|---------|
    /// | -1 | write address refused |
    /// | -2 | command refused |
    /// | -3 | first parameter refused |
    /// | -4 | second parameter refused |
    /// | -5 | read address refused |
    /// | -6 | busy timeout |
    /// | -7 | read while busy |
    /// | -8 | checksum mismatch |
    /// | -10 | line fault |
    pub const fn code(&self) -> i32 {
        match self {
            AhtError::Nack(Phase::Address) => -1,
            AhtError::Nack(Phase::Command) => -2,
            AhtError::Nack(Phase::FirstParam) => -3,
            AhtError::Nack(Phase::SecondParam) => -4,
            AhtError::Nack(Phase::ReadAddress) => -5,
            AhtError::Timeout => -6,
            AhtError::Busy => -7,
            AhtError::Checksum => -8,
            AhtError::Line(_) => -10,
        }
    }

    /// Worth retrying without touching the bus setup
    pub const fn is_retryable(&self) -> bool {
        matches!(self, AhtError::Busy | AhtError::Checksum)
    }
}

/// Status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status(pub u8);

impl Status {
    const BUSY: u8 = 0x80;
    const CALIBRATED: u8 = 0x08;

    /// A conversion is running
    pub const fn is_busy(self) -> bool {
        self.0 & Self::BUSY != 0
    }

    /// Calibration coefficients are loaded
    pub const fn is_calibrated(self) -> bool {
        self.0 & Self::CALIBRATED != 0
    }
}

/// One conversion result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// Relative humidity in hundredths of a percent (0 to 10000)
    pub humidity_centi: u16,
    /// Temperature in hundredths of a degree Celsius (-5000 to 15000)
    pub temperature_centi: i16,
}

impl Measurement {
    /// Decode the five data bytes that follow the status byte
    ///
    /// Humidity is the top 20 bits, temperature the bottom 20. Both are
    /// scaled with rounding: `rh = raw * 100 / 2^20` and
    /// `t = raw * 200 / 2^20 - 50`.
    pub fn decode(data: [u8; 5]) -> Self {
        let [d1, d2, d3, d4, d5] = data.map(u32::from);
        let raw_humidity = (d1 << 12) | (d2 << 4) | (d3 >> 4);
        let raw_temperature = ((d3 & 0x0F) << 16) | (d4 << 8) | d5;
        Self::from_raw(raw_humidity, raw_temperature)
    }

    /// Scale raw 20-bit readings
    pub fn from_raw(raw_humidity: u32, raw_temperature: u32) -> Self {
        let humidity = scale(raw_humidity, 10_000).min(10_000);
        let temperature = scale(raw_temperature, 20_000) as i32 - 5_000;
        Self {
            humidity_centi: humidity as u16,
            temperature_centi: temperature as i16,
        }
    }
}

/// `raw * full / 2^20`, rounded to nearest
fn scale(raw: u32, full: u64) -> u64 {
    let raw = u64::from(raw).min(RAW_SCALE - 1);
    (raw * full + RAW_SCALE / 2) / RAW_SCALE
}

/// CRC-8, polynomial 0x31, initial value 0xFF
pub(crate) fn crc8(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0xFF, |crc, &byte| {
        (0..8).fold(crc ^ byte, |crc, _| {
            if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            }
        })
    })
}

/// Conversation with one AHT10/AHT20 part
#[derive(Debug, Clone)]
pub struct AhtSession {
    address: Address,
    config: SensorConfig,
    variant: Variant,
}

impl AhtSession {
    /// Create a session; nothing is sent until the first call
    pub fn new(config: SensorConfig) -> Self {
        Self {
            address: Address::masked(config.address),
            config,
            variant: Variant::Unknown,
        }
    }

    /// Device address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Command set recorded by [`AhtSession::init`]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Settings in use
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Soft reset, then wait for the part to settle
    pub fn reset<B, D>(&mut self, bus: &mut B, delay: &mut D) -> Result<(), AhtError<B::Error>>
    where
        B: I2cPrimitives,
        D: DelayNs,
    {
        self.write_command(bus, &[CMD_RESET])?;
        delay.delay_ms(u32::from(self.config.settle_ms));
        Ok(())
    }

    /// Load calibration, falling back to the alternate command
    ///
    /// The primary command is tried first. If the part acknowledges its
    /// address but refuses that command byte, the fallback command is tried
    /// and the variant that succeeded is recorded.
    pub fn init<B, D>(&mut self, bus: &mut B, delay: &mut D) -> Result<Variant, AhtError<B::Error>>
    where
        B: I2cPrimitives,
        D: DelayNs,
    {
        let [p1, p2] = INIT_PARAMS;
        let variant = match self.write_command(bus, &[self.config.init_command, p1, p2]) {
            Ok(()) => Variant::Aht10,
            Err(AhtError::Nack(Phase::Command)) => {
                self.write_command(bus, &[self.config.fallback_init_command, p1, p2])?;
                Variant::Aht20
            }
            Err(e) => return Err(e),
        };
        self.variant = variant;
        delay.delay_ms(u32::from(self.config.settle_ms));
        Ok(variant)
    }

    /// Check that the part answers on both its write and read address
    ///
    /// Returns the status byte fetched by the read probe.
    pub fn probe<B: I2cPrimitives>(&self, bus: &mut B) -> Result<Status, AhtError<B::Error>> {
        if !bus.probe(self.address).map_err(AhtError::Line)? {
            return Err(AhtError::Nack(Phase::Address));
        }
        self.read_status(bus)
    }

    /// Start a conversion
    pub fn trigger_measurement<B: I2cPrimitives>(
        &self,
        bus: &mut B,
    ) -> Result<(), AhtError<B::Error>> {
        let [p1, p2] = TRIGGER_PARAMS;
        self.write_command(bus, &[CMD_TRIGGER, p1, p2])
    }

    /// Read only the status byte
    pub fn read_status<B: I2cPrimitives>(&self, bus: &mut B) -> Result<Status, AhtError<B::Error>> {
        let mut status = [0u8; 1];
        self.read_frame(bus, &mut status)?;
        Ok(Status(status[0]))
    }

    /// Read and decode the result of the last conversion
    ///
    /// Fails with [`AhtError::Busy`] if the conversion has not finished.
    pub fn read_measurement<B: I2cPrimitives>(
        &self,
        bus: &mut B,
    ) -> Result<Measurement, AhtError<B::Error>> {
        let mut frame = [0u8; 7];
        let len = if self.config.verify_crc { 7 } else { 6 };
        self.read_frame(bus, &mut frame[..len])?;

        if Status(frame[0]).is_busy() {
            return Err(AhtError::Busy);
        }
        if self.config.verify_crc && crc8(&frame[..6]) != frame[6] {
            return Err(AhtError::Checksum);
        }
        Ok(Measurement::decode([
            frame[1], frame[2], frame[3], frame[4], frame[5],
        ]))
    }

    /// Trigger, poll the status until the conversion ends, then read
    ///
    /// A refused read address during polling counts as "still busy".
    pub fn measure<B, D>(&self, bus: &mut B, delay: &mut D) -> Result<Measurement, AhtError<B::Error>>
    where
        B: I2cPrimitives,
        D: DelayNs,
    {
        self.trigger_measurement(bus)?;

        for _ in 0..self.config.poll_attempts {
            delay.delay_ms(u32::from(self.config.poll_interval_ms));
            match self.read_status(bus) {
                Ok(status) if !status.is_busy() => return self.read_measurement(bus),
                Ok(_) | Err(AhtError::Nack(Phase::ReadAddress)) => {}
                Err(e) => return Err(e),
            }
        }

        Err(AhtError::Timeout)
    }

    /// Write address followed by up to three command bytes, then STOP
    fn write_command<B: I2cPrimitives>(
        &self,
        bus: &mut B,
        bytes: &[u8],
    ) -> Result<(), AhtError<B::Error>> {
        bus.bus_idle().map_err(AhtError::Line)?;
        let sent = self.send(bus, bytes);
        let stopped = bus.stop().map_err(AhtError::Line);
        sent?;
        stopped
    }

    fn send<B: I2cPrimitives>(&self, bus: &mut B, bytes: &[u8]) -> Result<(), AhtError<B::Error>> {
        bus.start().map_err(AhtError::Line)?;
        expect_ack(bus, self.address.write_byte(), Phase::Address)?;
        for (&byte, phase) in bytes.iter().zip(Phase::COMMAND_BYTES) {
            expect_ack(bus, byte, phase)?;
        }
        Ok(())
    }

    /// Read address followed by `buf.len()` bytes, the last one NACKed
    fn read_frame<B: I2cPrimitives>(
        &self,
        bus: &mut B,
        buf: &mut [u8],
    ) -> Result<(), AhtError<B::Error>> {
        bus.bus_idle().map_err(AhtError::Line)?;
        let received = self.receive(bus, buf);
        let stopped = bus.stop().map_err(AhtError::Line);
        received?;
        stopped
    }

    fn receive<B: I2cPrimitives>(
        &self,
        bus: &mut B,
        buf: &mut [u8],
    ) -> Result<(), AhtError<B::Error>> {
        bus.start().map_err(AhtError::Line)?;
        expect_ack(bus, self.address.read_byte(), Phase::ReadAddress)?;
        let last = buf.len().saturating_sub(1);
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = bus.read_byte(i < last).map_err(AhtError::Line)?;
        }
        Ok(())
    }
}

fn expect_ack<B: I2cPrimitives>(
    bus: &mut B,
    byte: u8,
    phase: Phase,
) -> Result<(), AhtError<B::Error>> {
    if bus.write_byte(byte).map_err(AhtError::Line)? {
        Ok(())
    } else {
        Err(AhtError::Nack(phase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::AhtModel;
    use proptest::prelude::*;
    use twinwire_core::bus::{BitBangI2c, BusError, BusTiming};
    use twinwire_core::sim::{SimBus, SimDelay};
    use twinwire_core::Line;

    const MAX_RAW: u32 = (1 << 20) - 1;

    type Bus = BitBangI2c<SimBus<AhtModel>, SimDelay>;

    fn bus_with(model: AhtModel) -> Bus {
        BitBangI2c::new(SimBus::with_target(model), SimDelay::new(), BusTiming::new(1_000, 50))
    }

    fn model(bus: &Bus) -> &AhtModel {
        &bus.port().targets()[0]
    }

    fn session() -> AhtSession {
        AhtSession::new(SensorConfig::default())
    }

    #[test]
    fn test_init_primary_command() {
        let mut bus = bus_with(AhtModel::new(0xE1));
        let mut delay = SimDelay::new();
        let mut aht = session();

        assert_eq!(aht.variant(), Variant::Unknown);
        assert_eq!(aht.init(&mut bus, &mut delay), Ok(Variant::Aht10));
        assert_eq!(aht.variant(), Variant::Aht10);
        assert!(model(&bus).is_calibrated());
        assert_eq!(delay.elapsed_ms(), 20);
        assert!(bus.port().is_idle());
    }

    #[test]
    fn test_init_falls_back_to_alternate_command() {
        let mut bus = bus_with(AhtModel::new(0xBE));
        let mut delay = SimDelay::new();
        let mut aht = session();

        assert_eq!(aht.init(&mut bus, &mut delay), Ok(Variant::Aht20));
        assert_eq!(aht.variant(), Variant::Aht20);
        assert!(model(&bus).is_calibrated());
        assert!(bus.port().is_idle());
    }

    #[test]
    fn test_init_refused_by_both_commands() {
        let mut bus = bus_with(AhtModel::new(0x00));
        let mut aht = session();

        let err = aht.init(&mut bus, &mut SimDelay::new()).unwrap_err();
        assert_eq!(err, AhtError::Nack(Phase::Command));
        assert_eq!(err.code(), -2);
        assert_eq!(aht.variant(), Variant::Unknown);
        assert!(bus.port().is_idle());
    }

    #[test]
    fn test_param_refused() {
        let mut bus = bus_with(AhtModel::new(0xE1).refusing_params());
        let mut aht = session();

        let err = aht.init(&mut bus, &mut SimDelay::new()).unwrap_err();
        assert_eq!(err, AhtError::Nack(Phase::FirstParam));
        assert_eq!(err.code(), -3);
        assert_eq!(aht.trigger_measurement(&mut bus).unwrap_err().code(), -3);
        assert!(bus.port().is_idle());
    }

    #[test]
    fn test_reset_settles() {
        let mut bus = bus_with(AhtModel::new(0xE1));
        let mut delay = SimDelay::new();
        let mut aht = session();

        aht.reset(&mut bus, &mut delay).unwrap();
        assert_eq!(model(&bus).resets(), 1);
        assert_eq!(delay.elapsed_ms(), 20);
    }

    #[test]
    fn test_absent_device_reports_address_phase() {
        let mut bus = bus_with(AhtModel::new(0xE1));
        let mut config = SensorConfig::default();
        config.address = 0x39;
        let mut aht = AhtSession::new(config);
        let mut delay = SimDelay::new();

        let err = aht.reset(&mut bus, &mut delay).unwrap_err();
        assert_eq!(err.code(), -1);
        assert_eq!(aht.probe(&mut bus).unwrap_err().code(), -1);
        assert_eq!(aht.measure(&mut bus, &mut delay).unwrap_err().code(), -1);
        // no settle time spent on a failed reset
        assert_eq!(delay.elapsed_ns(), 0);
        assert!(bus.port().is_idle());
    }

    #[test]
    fn test_line_fault_is_code_minus_ten() {
        let mut sim: SimBus<AhtModel> = SimBus::with_target(AhtModel::new(0xE1));
        sim.hold_scl(true);
        let mut bus = BitBangI2c::new(sim, SimDelay::new(), BusTiming::new(1_000, 20));
        let mut aht = session();

        let err = aht.init(&mut bus, &mut SimDelay::new()).unwrap_err();
        assert_eq!(err, AhtError::Line(BusError::LineFault(Line::Scl)));
        assert_eq!(err.code(), -10);
        assert_eq!(aht.measure(&mut bus, &mut SimDelay::new()).unwrap_err().code(), -10);
    }

    #[test]
    fn test_probe_returns_status() {
        let mut bus = bus_with(AhtModel::new(0xE1));
        let mut aht = session();

        let status = aht.probe(&mut bus).unwrap();
        assert!(!status.is_calibrated());
        aht.init(&mut bus, &mut SimDelay::new()).unwrap();
        let status = aht.probe(&mut bus).unwrap();
        assert!(status.is_calibrated());
        assert!(!status.is_busy());
        assert!(bus.port().is_idle());
    }

    #[test]
    fn test_measure_decodes_frame() {
        let mut bus = bus_with(AhtModel::new(0xE1));
        let mut delay = SimDelay::new();
        let aht = session();

        let m = aht.measure(&mut bus, &mut delay).unwrap();
        assert_eq!(m.humidity_centi, 5000);
        assert_eq!(m.temperature_centi, 2500);
        assert_eq!(model(&bus).triggers(), 1);
        assert_eq!(delay.elapsed_ms(), 10);
        assert!(bus.port().is_idle());
    }

    #[test]
    fn test_measure_boundaries() {
        let aht = session();

        let mut bus = bus_with(AhtModel::new(0xE1).with_raw(0, 0));
        let m = aht.measure(&mut bus, &mut SimDelay::new()).unwrap();
        assert_eq!(m.humidity_centi, 0);
        assert_eq!(m.temperature_centi, -5000);

        let mut bus = bus_with(AhtModel::new(0xE1).with_raw(MAX_RAW, MAX_RAW));
        let m = aht.measure(&mut bus, &mut SimDelay::new()).unwrap();
        assert_eq!(m.humidity_centi, 10000);
        assert_eq!(m.temperature_centi, 15000);
    }

    #[test]
    fn test_measure_polls_until_ready() {
        let mut bus = bus_with(AhtModel::new(0xE1).with_busy_polls(3));
        let mut delay = SimDelay::new();

        let m = session().measure(&mut bus, &mut delay).unwrap();
        assert_eq!(m.humidity_centi, 5000);
        assert_eq!(delay.elapsed_ms(), 40);
    }

    #[test]
    fn test_measure_times_out() {
        let mut bus = bus_with(AhtModel::new(0xE1).with_busy_polls(50));
        let mut delay = SimDelay::new();

        let err = session().measure(&mut bus, &mut delay).unwrap_err();
        assert_eq!(err, AhtError::Timeout);
        assert_eq!(err.code(), -6);
        assert_eq!(delay.elapsed_ms(), 200);
        assert!(bus.port().is_idle());
    }

    #[test]
    fn test_read_while_busy_is_rejected() {
        let mut bus = bus_with(AhtModel::new(0xE1).with_busy_polls(1));
        let aht = session();

        aht.trigger_measurement(&mut bus).unwrap();
        let err = aht.read_measurement(&mut bus).unwrap_err();
        assert_eq!(err, AhtError::Busy);
        assert!(err.is_retryable());
        // the busy read counted as the one busy poll
        assert!(aht.read_measurement(&mut bus).is_ok());
    }

    #[test]
    fn test_crc_checked_when_enabled() {
        let mut config = SensorConfig::default();
        config.verify_crc = true;
        let aht = AhtSession::new(config);

        let mut bus = bus_with(AhtModel::new(0xBE));
        assert!(aht.measure(&mut bus, &mut SimDelay::new()).is_ok());

        let mut bus = bus_with(AhtModel::new(0xBE).with_bad_crc());
        let err = aht.measure(&mut bus, &mut SimDelay::new()).unwrap_err();
        assert_eq!(err, AhtError::Checksum);
        assert_eq!(err.code(), -8);
        assert!(bus.port().is_idle());
    }

    #[test]
    fn test_crc8_vectors() {
        assert_eq!(crc8(b"123456789"), 0xF7);
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
    }

    #[test]
    fn test_decode_splits_shared_byte() {
        let m = Measurement::decode([0x80, 0x00, 0x06, 0x00, 0x00]);
        assert_eq!(m.humidity_centi, 5000);
        assert_eq!(m.temperature_centi, 2500);
    }

    proptest! {
        #[test]
        fn decoded_values_stay_in_range(h in 0u32..=MAX_RAW, t in 0u32..=MAX_RAW) {
            let m = Measurement::from_raw(h, t);
            prop_assert!(m.humidity_centi <= 10_000);
            prop_assert!((-5_000..=15_000).contains(&m.temperature_centi));
        }

        #[test]
        fn decoding_is_monotonic(h in 0u32..MAX_RAW, t in 0u32..MAX_RAW) {
            let a = Measurement::from_raw(h, t);
            let b = Measurement::from_raw(h + 1, t + 1);
            prop_assert!(b.humidity_centi >= a.humidity_centi);
            prop_assert!(b.temperature_centi >= a.temperature_centi);
        }
    }
}
