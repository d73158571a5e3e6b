//! Device drivers
//!
//! Drivers here talk to devices through the [`twinwire_core::I2cPrimitives`]
//! trait, so they run on any line port the engine runs on:
//!
//! - Sensors (AHT10/AHT20 temperature and humidity)

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod sensor;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
