//! Board-agnostic core of the twinwire firmware
//!
//! This crate contains everything above the pin level that does not depend
//! on a particular chip:
//!
//! - Line driver (open-drain emulation with a shadow of the driven state)
//! - Transaction engine (START/STOP, byte frames, probe, scan, recovery)
//! - Board configuration types and parser
//! - A simulated bus for host tests (`sim` feature)

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod bus;
pub mod config;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use bus::{BitBangI2c, BusError, BusTiming};
pub use twinwire_hal::{Address, I2cPrimitives, Line, LinePort};
