//! Open-drain line abstractions
//!
//! Both bus wires are open-drain: the master either pulls a line low or
//! releases it and lets the external pull-up bring it high. A chip adapter
//! implements [`LinePort`] to map these intents onto its registers.

/// One of the two bus wires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Line {
    /// Clock line
    Scl,
    /// Data line
    Sda,
}

/// Set of lines to observe in a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineMask(u8);

impl LineMask {
    /// Clock line only
    pub const SCL: Self = Self(0x01);
    /// Data line only
    pub const SDA: Self = Self(0x02);
    /// Both lines
    pub const BOTH: Self = Self(0x03);

    /// Check whether the mask covers a line
    pub const fn contains(self, line: Line) -> bool {
        let bit = match line {
            Line::Scl => 0x01,
            Line::Sda => 0x02,
        };
        self.0 & bit != 0
    }
}

/// Output intent for both lines
///
/// `true` means released (high via pull-up), `false` means driven low.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineState {
    /// Clock line released
    pub scl_released: bool,
    /// Data line released
    pub sda_released: bool,
}

impl LineState {
    /// Both lines released
    pub const IDLE: Self = Self {
        scl_released: true,
        sda_released: true,
    };

    /// Create a line state from the two intents
    pub const fn new(scl_released: bool, sda_released: bool) -> Self {
        Self {
            scl_released,
            sda_released,
        }
    }

    /// Copy with a different clock intent
    pub const fn with_scl(self, released: bool) -> Self {
        Self {
            scl_released: released,
            sda_released: self.sda_released,
        }
    }

    /// Copy with a different data intent
    pub const fn with_sda(self, released: bool) -> Self {
        Self {
            scl_released: self.scl_released,
            sda_released: released,
        }
    }
}

impl Default for LineState {
    fn default() -> Self {
        Self::IDLE
    }
}

/// Sampled logic levels of both lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineLevels {
    /// Clock line reads high
    pub scl: bool,
    /// Data line reads high
    pub sda: bool,
}

impl LineLevels {
    /// Level of a single line
    pub const fn level(self, line: Line) -> bool {
        match line {
            Line::Scl => self.scl,
            Line::Sda => self.sda,
        }
    }

    /// Check that every line in the mask reads high
    pub const fn all_high(self, mask: LineMask) -> bool {
        (!mask.contains(Line::Scl) || self.scl) && (!mask.contains(Line::Sda) || self.sda)
    }

    /// First line in the mask that reads low, clock first
    pub const fn first_low(self, mask: LineMask) -> Option<Line> {
        if mask.contains(Line::Scl) && !self.scl {
            Some(Line::Scl)
        } else if mask.contains(Line::Sda) && !self.sda {
            Some(Line::Sda)
        } else {
            None
        }
    }
}

/// Raw access to the two bus lines
///
/// Implementations must apply both intents of a [`LineState`] in a single
/// register write so the wires never pass through a state neither intent
/// describes. Reading is pure observation and must not change what is
/// driven.
pub trait LinePort {
    /// Drive both lines according to `state`
    fn write_lines(&mut self, state: LineState);

    /// Sample the current levels of both lines
    ///
    /// Takes `&mut self` because sampling may require a register access
    /// through a mutable handle.
    fn read_lines(&mut self) -> LineLevels;
}

impl<T: LinePort + ?Sized> LinePort for &mut T {
    fn write_lines(&mut self, state: LineState) {
        (**self).write_lines(state)
    }

    fn read_lines(&mut self) -> LineLevels {
        (**self).read_lines()
    }
}
