//! Sensor drivers

pub mod aht;

pub use aht::{AhtError, AhtSession, Measurement, Phase, Status, Variant};
