//! RP2040 adapter for the Twinwire I2C engine
//!
//! The RP2040 GPIO block has no open-drain output mode. [`FlexLines`]
//! emulates it by keeping both output latches low and switching each pin
//! between input (released) and output (pulled low). [`pins::PinBank`]
//! hands out pins by the numbers found in the board config.

#![no_std]

pub mod lines;
pub mod pins;

pub use lines::FlexLines;
pub use pins::{PinBank, PinBankPeripherals, PinError, RemainingPeripherals};
