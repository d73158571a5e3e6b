//! Serial console for the twinwire I2C master
//!
//! A byte-at-a-time line editor and a small command set for poking at the
//! bus and the AHT sensor from a terminal:
//!
//! ```text
//! RUNTIME>i2c_scan
//! I2C scan:
//!   Found device at 0x38
//! RUNTIME>aht10
//! AHT10: RH = 48.21 %, Temp = 22.87 C
//! ```
//!
//! Everything here is hardware independent; the firmware supplies a line
//! port, a delay, a [`Board`] and a UART, wrapped in a [`CrlfWriter`].

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod command;
pub mod console;
pub mod line;
pub mod serial;

pub use command::{Command, COMMANDS};
pub use console::{Board, Centi, Console};
pub use line::{LineEditor, MAX_LINE_LEN};
pub use serial::CrlfWriter;
