//! Open-drain emulation on RP2040 flex pins

use embassy_rp::gpio::{AnyPin, Flex, Pull};
use embassy_rp::Peri;
use twinwire_hal::{LineLevels, LinePort, LineState};

/// Bus lines on two RP2040 GPIOs
///
/// A released line is an input, so the external pull-up (or the internal
/// one when requested) brings it high and the level can be sampled. A
/// pulled line is an output driving the latch, which is fixed at low.
pub struct FlexLines<'d> {
    scl: Flex<'d>,
    sda: Flex<'d>,
}

impl<'d> FlexLines<'d> {
    /// Claim two pins for the bus and release both
    ///
    /// `internal_pullup` enables the ~50 kOhm on-chip pull-ups. They are
    /// too weak for anything above a few kHz with real wiring; fit external
    /// resistors where possible.
    pub fn new(scl: Peri<'d, AnyPin>, sda: Peri<'d, AnyPin>, internal_pullup: bool) -> Self {
        let pull = if internal_pullup { Pull::Up } else { Pull::None };
        let mut scl = Flex::new(scl);
        let mut sda = Flex::new(sda);
        for pin in [&mut scl, &mut sda] {
            pin.set_pull(pull);
            pin.set_low();
            pin.set_as_input();
        }
        Self { scl, sda }
    }

    fn apply(pin: &mut Flex<'d>, released: bool) {
        if released {
            pin.set_as_input();
        } else {
            pin.set_as_output();
        }
    }
}

impl LinePort for FlexLines<'_> {
    // The two pins live in one SIO bank but output-enable is set per pin,
    // so this is two writes. The engine only ever changes one line per
    // call, which keeps the wires from passing through a third state.
    fn write_lines(&mut self, state: LineState) {
        Self::apply(&mut self.scl, state.scl_released);
        Self::apply(&mut self.sda, state.sda_released);
    }

    fn read_lines(&mut self) -> LineLevels {
        LineLevels {
            scl: self.scl.is_high(),
            sda: self.sda.is_high(),
        }
    }
}
