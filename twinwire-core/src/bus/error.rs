//! Bus error taxonomy

use embedded_hal::i2c::{Error as HalError, ErrorKind, NoAcknowledgeSource};
use twinwire_hal::{Line, NackSource};

/// Errors reported by the line driver and transaction engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// A released line did not read high within the wait budget
    ///
    /// On the clock line this is either a missing pull-up or a slave that
    /// stretches the clock for longer than allowed. On the data line it
    /// is a missing pull-up or a slave stuck mid-byte.
    LineFault(Line),
    /// The addressed device did not acknowledge
    Nack(NackSource),
}

impl BusError {
    /// Check for a line fault ("no bus") as opposed to a NACK ("no device")
    pub const fn is_line_fault(&self) -> bool {
        matches!(self, BusError::LineFault(_))
    }

    /// Check for a refused byte
    pub const fn is_nack(&self) -> bool {
        matches!(self, BusError::Nack(_))
    }
}

impl core::fmt::Display for BusError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BusError::LineFault(Line::Scl) => f.write_str("SCL did not rise"),
            BusError::LineFault(Line::Sda) => f.write_str("SDA did not rise"),
            BusError::Nack(NackSource::Address) => f.write_str("address not acknowledged"),
            BusError::Nack(NackSource::Data) => f.write_str("data not acknowledged"),
            BusError::Nack(NackSource::Unknown) => f.write_str("not acknowledged"),
        }
    }
}

impl HalError for BusError {
    fn kind(&self) -> ErrorKind {
        match self {
            BusError::LineFault(_) => ErrorKind::Bus,
            BusError::Nack(NackSource::Address) => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
            }
            BusError::Nack(NackSource::Data) => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data),
            BusError::Nack(NackSource::Unknown) => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(BusError::LineFault(Line::Scl).is_line_fault());
        assert!(!BusError::LineFault(Line::Sda).is_nack());
        assert!(BusError::Nack(NackSource::Address).is_nack());
    }

    #[test]
    fn test_hal_kind() {
        assert_eq!(BusError::LineFault(Line::Scl).kind(), ErrorKind::Bus);
        assert_eq!(
            BusError::Nack(NackSource::Address).kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        );
    }
}
