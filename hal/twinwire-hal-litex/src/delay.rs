//! Calibrated busy-wait delay

use embedded_hal::delay::DelayNs;

/// Busy-wait delay counted in CPU cycles
///
/// Soft cores often run without a timer peripheral, so the half cycle is
/// burned in a spin loop. `cycles_per_us` is the number of loop iterations
/// that take one microsecond on the target clock and must be measured per
/// gateware build.
#[derive(Debug, Clone, Copy)]
pub struct SpinDelay {
    cycles_per_us: u32,
}

impl SpinDelay {
    /// Create a delay; zero is raised to one iteration per microsecond
    pub const fn new(cycles_per_us: u32) -> Self {
        Self {
            cycles_per_us: if cycles_per_us == 0 { 1 } else { cycles_per_us },
        }
    }

    /// Loop iterations per microsecond
    pub const fn cycles_per_us(&self) -> u32 {
        self.cycles_per_us
    }

    /// Iterations needed for `ns` nanoseconds, never fewer than one
    pub const fn iterations(&self, ns: u32) -> u64 {
        let n = (ns as u64 * self.cycles_per_us as u64).div_ceil(1_000);
        if n == 0 {
            1
        } else {
            n
        }
    }
}

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        for _ in 0..self.iterations(ns) {
            core::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iterations_round_up() {
        let d = SpinDelay::new(50);
        assert_eq!(d.iterations(1_000), 50);
        assert_eq!(d.iterations(5_000), 250);
        assert_eq!(d.iterations(1), 1);
        assert_eq!(d.iterations(0), 1);
    }

    #[test]
    fn test_zero_rate_clamped() {
        assert_eq!(SpinDelay::new(0).cycles_per_us(), 1);
    }

    #[test]
    fn test_large_delay_does_not_overflow() {
        let d = SpinDelay::new(1_000);
        assert_eq!(d.iterations(u32::MAX), u32::MAX as u64);
    }
}
