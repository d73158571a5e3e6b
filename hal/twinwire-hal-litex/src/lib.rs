//! LiteX soft-core adapters for the Twinwire I2C engine
//!
//! LiteX SoCs expose the bus wires as bits of control/status registers
//! (CSRs) rather than as GPIO peripherals. Two register layouts are in
//! use across gateware builds:
//!
//! - [`CombinedCsrLines`] - one write register and one read register,
//!   bit 0 SCL and bit 1 SDA in both
//! - [`OeCsrLines`] - a write register holding SCL, an output-enable bit
//!   and SDA, and a read register holding only SDA
//!
//! Both implement [`twinwire_hal::LinePort`] over any [`CsrRegister`], so
//! they can be exercised on the host with a plain in-memory register.
//! [`SpinDelay`] provides the half-cycle wait on cores without a timer.

#![no_std]
#![deny(unsafe_code)]

pub mod csr;
pub mod delay;
pub mod lines;

pub use csr::{CsrRegister, MmioCsr};
pub use delay::SpinDelay;
pub use lines::{CombinedCsrLines, OeCsrLines};
