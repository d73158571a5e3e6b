//! Bus timing parameters
//!
//! A bit-banged bus has no clock generator: its rate is whatever the
//! half-cycle delay makes it. Both numbers are supplied at construction so
//! the engine can run against a simulated bus without real time passing.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Timing for the line driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "RawTiming"))]
pub struct BusTiming {
    /// Duration of half a clock period in nanoseconds (never zero)
    half_cycle_ns: u32,
    /// Polls of a released line before it is declared stuck
    wait_iterations: u32,
}

/// Field-for-field image of [`BusTiming`] that deserializes without the
/// zero clamps; converted through [`BusTiming::new`]
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawTiming {
    half_cycle_ns: u32,
    wait_iterations: u32,
}

#[cfg(feature = "serde")]
impl From<RawTiming> for BusTiming {
    fn from(raw: RawTiming) -> Self {
        Self::new(raw.half_cycle_ns, raw.wait_iterations)
    }
}

impl Default for BusTiming {
    fn default() -> Self {
        Self::CONSERVATIVE
    }
}

impl BusTiming {
    /// Standard mode (100 kHz), for short on-board traces
    pub const STANDARD: Self = Self {
        half_cycle_ns: 5_000,
        wait_iterations: 1_000,
    };

    /// 10 kHz, for flying leads and weak pull-ups
    ///
    /// With the default wait budget a stuck line is reported after ~50 ms.
    pub const CONSERVATIVE: Self = Self {
        half_cycle_ns: 50_000,
        wait_iterations: 1_000,
    };

    /// Create a timing; a zero half cycle is raised to 1 ns and a zero wait
    /// budget to a single poll
    pub const fn new(half_cycle_ns: u32, wait_iterations: u32) -> Self {
        Self {
            half_cycle_ns: if half_cycle_ns == 0 { 1 } else { half_cycle_ns },
            wait_iterations: if wait_iterations == 0 { 1 } else { wait_iterations },
        }
    }

    /// Timing for a target bus frequency in Hz
    pub const fn from_frequency(frequency_hz: u32, wait_iterations: u32) -> Self {
        let hz = if frequency_hz == 0 { 1 } else { frequency_hz as u64 };
        Self::new((1_000_000_000 / (2 * hz)) as u32, wait_iterations)
    }

    /// Half-cycle duration in nanoseconds
    pub const fn half_cycle_ns(&self) -> u32 {
        self.half_cycle_ns
    }

    /// Poll budget for a line to rise
    pub const fn wait_iterations(&self) -> u32 {
        self.wait_iterations
    }

    /// Effective bus frequency in Hz
    pub const fn frequency_hz(&self) -> u32 {
        (1_000_000_000 / (2 * self.half_cycle_ns as u64)) as u32
    }

    /// Upper bound on the time a single wait may take, in microseconds
    pub const fn max_wait_us(&self) -> u64 {
        self.wait_iterations as u64 * self.half_cycle_ns as u64 / 1_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(BusTiming::STANDARD.frequency_hz(), 100_000);
        assert_eq!(BusTiming::CONSERVATIVE.frequency_hz(), 10_000);
        assert_eq!(BusTiming::CONSERVATIVE.max_wait_us(), 50_000);
    }

    #[test]
    fn test_from_frequency() {
        let t = BusTiming::from_frequency(20_000, 500);
        assert_eq!(t.half_cycle_ns(), 25_000);
        assert_eq!(t.wait_iterations(), 500);
    }

    #[test]
    fn test_zero_is_raised() {
        let t = BusTiming::new(0, 0);
        assert_eq!(t.half_cycle_ns(), 1);
        assert_eq!(t.wait_iterations(), 1);

        let t = BusTiming::from_frequency(0, 10);
        assert!(t.half_cycle_ns() > 0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialized_zeros_are_clamped() {
        use serde::de::value::{Error, MapDeserializer};

        let fields = [("half_cycle_ns", 0u32), ("wait_iterations", 0u32)];
        let t = BusTiming::deserialize(MapDeserializer::<_, Error>::new(fields.into_iter()))
            .unwrap();
        assert_eq!(t, BusTiming::new(1, 1));
        assert_eq!(t.half_cycle_ns(), 1);

        let fields = [("half_cycle_ns", 2_500u32), ("wait_iterations", 40u32)];
        let t = BusTiming::deserialize(MapDeserializer::<_, Error>::new(fields.into_iter()))
            .unwrap();
        assert_eq!(t, BusTiming::new(2_500, 40));
    }
}
