//! Twinwire Hardware Abstraction Layer
//!
//! This crate defines the traits that separate the bit-banged I2C engine
//! from the register layout of a particular chip. A chip adapter only has
//! to turn two "released" intents into one register write and report the
//! sampled line levels back; everything else lives in `twinwire-core`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  twinwire-drivers / twinwire-console    │
//! └─────────────────────────────────────────┘
//!                     │  I2cPrimitives
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  twinwire-core (line driver + engine)   │
//! └─────────────────────────────────────────┘
//!                     │  LinePort
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ twinwire-hal- │       │ twinwire-hal- │
//! │    rp2040     │       │     litex     │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`lines::LinePort`] - Raw access to the clock and data lines
//! - [`i2c::I2cPrimitives`] - Byte-level bus conditions and transfers

#![no_std]
#![deny(unsafe_code)]

pub mod i2c;
pub mod lines;

// Re-export key traits at crate root for convenience
pub use i2c::{Address, I2cPrimitives, NackSource};
pub use lines::{Line, LineLevels, LineMask, LinePort, LineState};
