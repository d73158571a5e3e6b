//! Bit-banged I2C master
//!
//! Two layers: the [`LineDriver`] owns the pins and knows only "release",
//! "pull low" and "wait until high"; the [`BitBangI2c`] engine builds the
//! protocol on top of it.

mod engine;
mod error;
mod line;
mod scan;
mod timing;

pub use engine::BitBangI2c;
pub use error::BusError;
pub use line::LineDriver;
pub use scan::{scan_range, AddressSet};
pub use timing::BusTiming;
