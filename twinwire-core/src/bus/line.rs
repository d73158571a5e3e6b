//! Line driver
//!
//! Owns the two open-drain lines and the shadow of what is being driven on
//! them. Some targets cannot read back their output register, so the
//! intent for both lines is kept here and every change rewrites both.

use embedded_hal::delay::DelayNs;
use twinwire_hal::{LineLevels, LineMask, LinePort, LineState};

use super::error::BusError;
use super::timing::BusTiming;

/// Open-drain line driver
///
/// All mutation of the lines passes through [`LineDriver::set_lines`], so
/// the register always reflects both current intents.
pub struct LineDriver<P, D> {
    port: P,
    delay: D,
    timing: BusTiming,
    /// Last state written to the port
    state: LineState,
}

impl<P: LinePort, D: DelayNs> LineDriver<P, D> {
    /// Create a line driver and release both lines
    pub fn new(mut port: P, delay: D, timing: BusTiming) -> Self {
        port.write_lines(LineState::IDLE);
        Self {
            port,
            delay,
            timing,
            state: LineState::IDLE,
        }
    }

    /// Write both intents in one register access
    ///
    /// Callers follow this with [`LineDriver::delay_half_cycle`]; the
    /// `release_*`/`pull_*` helpers do so themselves.
    pub fn set_lines(&mut self, scl_released: bool, sda_released: bool) {
        self.write_state(LineState::new(scl_released, sda_released));
    }

    fn write_state(&mut self, state: LineState) {
        self.state = state;
        self.port.write_lines(state);
    }

    /// Sample both lines
    pub fn read_lines(&mut self) -> LineLevels {
        self.port.read_lines()
    }

    /// Busy-wait for half a clock period
    pub fn delay_half_cycle(&mut self) {
        self.delay.delay_ns(self.timing.half_cycle_ns());
    }

    /// Poll until every masked line reads high
    ///
    /// Gives up after `max_iterations` polls, one half cycle apart, and
    /// reports the first line still low (clock before data).
    pub fn wait_for_high(&mut self, mask: LineMask, max_iterations: u32) -> Result<(), BusError> {
        let mut levels = self.read_lines();
        for _ in 0..max_iterations {
            if levels.all_high(mask) {
                return Ok(());
            }
            self.delay_half_cycle();
            levels = self.read_lines();
        }
        match levels.first_low(mask) {
            Some(line) => Err(BusError::LineFault(line)),
            None => Ok(()),
        }
    }

    /// [`LineDriver::wait_for_high`] with the configured budget
    pub fn wait_high(&mut self, mask: LineMask) -> Result<(), BusError> {
        self.wait_for_high(mask, self.timing.wait_iterations())
    }

    /// Release the clock line and wait half a cycle
    pub fn release_scl(&mut self) {
        self.write_state(self.state.with_scl(true));
        self.delay_half_cycle();
    }

    /// Pull the clock line low and wait half a cycle
    pub fn pull_scl_low(&mut self) {
        self.write_state(self.state.with_scl(false));
        self.delay_half_cycle();
    }

    /// Release the data line and wait half a cycle
    pub fn release_sda(&mut self) {
        self.write_state(self.state.with_sda(true));
        self.delay_half_cycle();
    }

    /// Pull the data line low and wait half a cycle
    pub fn pull_sda_low(&mut self) {
        self.write_state(self.state.with_sda(false));
        self.delay_half_cycle();
    }

    /// Put a data bit on the line (release for 1, pull low for 0)
    pub fn set_sda(&mut self, released: bool) {
        self.write_state(self.state.with_sda(released));
        self.delay_half_cycle();
    }

    /// Current output intent
    pub fn state(&self) -> LineState {
        self.state
    }

    /// Timing in use
    pub fn timing(&self) -> BusTiming {
        self.timing
    }

    /// Borrow the underlying port
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Mutably borrow the underlying port
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Give back the port and delay
    pub fn release(self) -> (P, D) {
        (self.port, self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimBus, SimDelay, SimTarget};
    use twinwire_hal::Line;

    struct Nobody;

    impl SimTarget for Nobody {
        fn address(&self) -> u8 {
            0x7F
        }
        fn write(&mut self, _byte: u8) -> bool {
            false
        }
        fn read(&mut self) -> u8 {
            0xFF
        }
    }

    fn driver(bus: SimBus<Nobody>) -> LineDriver<SimBus<Nobody>, SimDelay> {
        LineDriver::new(bus, SimDelay::new(), BusTiming::new(1_000, 10))
    }

    #[test]
    fn test_new_releases_both_lines() {
        let mut d = driver(SimBus::new());
        assert_eq!(d.state(), LineState::IDLE);
        let levels = d.read_lines();
        assert!(levels.scl && levels.sda);
    }

    #[test]
    fn test_set_lines_writes_both_intents() {
        let mut d = driver(SimBus::new());
        d.pull_sda_low();
        d.pull_scl_low();
        assert_eq!(d.port().master_state(), LineState::new(false, false));
        d.release_sda();
        assert_eq!(d.port().master_state(), LineState::new(false, true));
        assert_eq!(d.port().writes(), 4); // including the idle write in new()
    }

    #[test]
    fn test_clock_moves_keep_data_intent() {
        let mut d = driver(SimBus::new());
        d.set_sda(false);
        d.pull_scl_low();
        assert_eq!(d.state(), LineState::new(false, false));
        d.release_scl();
        assert_eq!(d.state(), LineState::new(true, false));
        d.set_sda(true);
        assert_eq!(d.state(), LineState::IDLE);
        assert_eq!(d.port().master_state(), d.state());
    }

    #[test]
    fn test_wait_for_high_succeeds_immediately() {
        let mut d = driver(SimBus::new());
        assert_eq!(d.wait_for_high(LineMask::BOTH, 10), Ok(()));
        assert_eq!(d.port().reads(), 1);
    }

    #[test]
    fn test_wait_for_high_is_bounded() {
        let mut bus = SimBus::new();
        bus.set_pullups(false);
        let mut d = driver(bus);

        assert_eq!(
            d.wait_for_high(LineMask::BOTH, 25),
            Err(BusError::LineFault(Line::Scl))
        );
        assert_eq!(d.port().reads(), 26);
        assert_eq!(
            d.wait_for_high(LineMask::SDA, 3),
            Err(BusError::LineFault(Line::Sda))
        );
    }

    #[test]
    fn test_half_cycle_uses_timing() {
        let mut d = driver(SimBus::new());
        d.delay_half_cycle();
        d.delay_half_cycle();
        let (_, delay) = d.release();
        assert_eq!(delay.elapsed_ns(), 2_000);
    }
}
