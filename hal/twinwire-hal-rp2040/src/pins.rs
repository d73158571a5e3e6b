//! Pin allocation by number
//!
//! The board config names the bus pins as `gpioN`, so they are taken from
//! a bank at runtime instead of being fixed in the firmware source.

use embassy_rp::gpio::AnyPin;
use embassy_rp::peripherals::{
    PIN_0, PIN_1, PIN_10, PIN_11, PIN_12, PIN_13, PIN_14, PIN_15, PIN_16, PIN_17, PIN_18, PIN_19,
    PIN_2, PIN_20, PIN_21, PIN_22, PIN_23, PIN_24, PIN_25, PIN_26, PIN_27, PIN_28, PIN_29, PIN_3,
    PIN_4, PIN_5, PIN_6, PIN_7, PIN_8, PIN_9, UART0,
};
use embassy_rp::{Peri, Peripherals};

/// Number of user GPIOs on the RP2040
pub const PIN_COUNT: u8 = 30;

/// Error when requesting a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError {
    /// Pin number out of range (0-29 valid)
    InvalidPin,
    /// Pin already taken
    AlreadyTaken,
}

macro_rules! pin_bank_peripherals {
    ($($field:ident: $pin:ident),* $(,)?) => {
        /// GPIO pins split off the embassy peripherals
        ///
        /// Fields are public so pins with a fixed function (UART, LED) can
        /// be taken with their concrete type before the rest go into a
        /// [`PinBank`].
        pub struct PinBankPeripherals {
            $(pub $field: Option<Peri<'static, $pin>>,)*
        }

        impl PinBankPeripherals {
            /// Split the GPIOs from the other peripherals
            pub fn from_peripherals(p: Peripherals) -> (Self, RemainingPeripherals) {
                let pins = Self { $($field: Some(p.$pin),)* };
                let remaining = RemainingPeripherals { uart0: p.UART0 };
                (pins, remaining)
            }
        }

        impl PinBank {
            /// Move every pin still present into a bank
            pub fn new(p: &mut PinBankPeripherals) -> Self {
                Self {
                    pins: [$(p.$field.take().map(Into::into),)*],
                }
            }
        }
    };
}

pin_bank_peripherals! {
    pin0: PIN_0, pin1: PIN_1, pin2: PIN_2, pin3: PIN_3, pin4: PIN_4,
    pin5: PIN_5, pin6: PIN_6, pin7: PIN_7, pin8: PIN_8, pin9: PIN_9,
    pin10: PIN_10, pin11: PIN_11, pin12: PIN_12, pin13: PIN_13, pin14: PIN_14,
    pin15: PIN_15, pin16: PIN_16, pin17: PIN_17, pin18: PIN_18, pin19: PIN_19,
    pin20: PIN_20, pin21: PIN_21, pin22: PIN_22, pin23: PIN_23, pin24: PIN_24,
    pin25: PIN_25, pin26: PIN_26, pin27: PIN_27, pin28: PIN_28, pin29: PIN_29,
}

/// Non-GPIO peripherals the firmware still needs
pub struct RemainingPeripherals {
    pub uart0: Peri<'static, UART0>,
}

/// Pins available for config-driven assignment
pub struct PinBank {
    pins: [Option<Peri<'static, AnyPin>>; PIN_COUNT as usize],
}

impl PinBank {
    /// Take a pin by number
    pub fn take(&mut self, pin_num: u8) -> Result<Peri<'static, AnyPin>, PinError> {
        self.pins
            .get_mut(pin_num as usize)
            .ok_or(PinError::InvalidPin)?
            .take()
            .ok_or(PinError::AlreadyTaken)
    }
}
