//! Line ports over LiteX CSR layouts

use twinwire_hal::{LineLevels, LinePort, LineState};

use crate::csr::CsrRegister;

/// Clock bit in the combined layout
const COMBINED_SCL: u32 = 0x01;
/// Data bit in the combined layout
const COMBINED_SDA: u32 = 0x02;

/// Combined layout: bit 0 SCL, bit 1 SDA in both registers
///
/// Writing 1 releases a line, writing 0 pulls it low. The write register
/// cannot be read back on every build, so only the bits written by
/// [`LinePort::write_lines`] ever reach it.
pub struct CombinedCsrLines<W, R> {
    out: W,
    input: R,
}

impl<W: CsrRegister, R: CsrRegister> CombinedCsrLines<W, R> {
    /// Create the port from the gateware's write and read registers
    pub fn new(out: W, input: R) -> Self {
        Self { out, input }
    }

    /// Give back the registers
    pub fn release(self) -> (W, R) {
        (self.out, self.input)
    }
}

impl<W: CsrRegister, R: CsrRegister> LinePort for CombinedCsrLines<W, R> {
    fn write_lines(&mut self, state: LineState) {
        let mut value = 0;
        if state.scl_released {
            value |= COMBINED_SCL;
        }
        if state.sda_released {
            value |= COMBINED_SDA;
        }
        self.out.write(value);
    }

    fn read_lines(&mut self) -> LineLevels {
        let value = self.input.read();
        LineLevels {
            scl: value & COMBINED_SCL != 0,
            sda: value & COMBINED_SDA != 0,
        }
    }
}

/// Clock output bit in the output-enable layout
const OE_SCL: u32 = 0x01;
/// Data output-enable bit
const OE_ENABLE: u32 = 0x02;
/// Data output bit
const OE_SDA: u32 = 0x04;
/// Data input bit in the read register
const OE_SDA_IN: u32 = 0x01;

/// Output-enable layout: write bit 0 SCL, bit 1 OE, bit 2 SDA; read bit 0 SDA
///
/// Data is released by clearing OE (with the data bit set, matching the
/// register's reset value) and pulled low by setting OE with the data bit
/// clear. The clock cannot be sampled on this layout, so its
/// reported level is the last value written and clock stretching by a
/// slave goes unnoticed.
pub struct OeCsrLines<W, R> {
    out: W,
    input: R,
    scl_released: bool,
}

impl<W: CsrRegister, R: CsrRegister> OeCsrLines<W, R> {
    /// Create the port from the gateware's write and read registers
    pub fn new(out: W, input: R) -> Self {
        Self {
            out,
            input,
            scl_released: true,
        }
    }

    /// Give back the registers
    pub fn release(self) -> (W, R) {
        (self.out, self.input)
    }
}

impl<W: CsrRegister, R: CsrRegister> LinePort for OeCsrLines<W, R> {
    fn write_lines(&mut self, state: LineState) {
        let mut value = 0;
        if state.scl_released {
            value |= OE_SCL;
        }
        if state.sda_released {
            value |= OE_SDA;
        } else {
            value |= OE_ENABLE;
        }
        self.out.write(value);
        self.scl_released = state.scl_released;
    }

    fn read_lines(&mut self) -> LineLevels {
        LineLevels {
            scl: self.scl_released,
            sda: self.input.read() & OE_SDA_IN != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory register that counts writes
    #[derive(Default)]
    struct FakeCsr {
        value: u32,
        writes: usize,
    }

    impl CsrRegister for FakeCsr {
        fn read(&mut self) -> u32 {
            self.value
        }

        fn write(&mut self, value: u32) {
            self.value = value;
            self.writes += 1;
        }
    }

    #[test]
    fn test_combined_write_encoding() {
        let mut port = CombinedCsrLines::new(FakeCsr::default(), FakeCsr::default());

        port.write_lines(LineState::IDLE);
        port.write_lines(LineState::new(true, false));
        assert_eq!(port.out.value, COMBINED_SCL);
        assert_eq!(port.out.writes, 2);

        port.write_lines(LineState::new(false, true));
        assert_eq!(port.out.value, COMBINED_SDA);

        port.write_lines(LineState::new(false, false));
        assert_eq!(port.out.value, 0);
        assert_eq!(port.input.writes, 0);
    }

    #[test]
    fn test_combined_read_decoding() {
        let mut port = CombinedCsrLines::new(FakeCsr::default(), FakeCsr { value: 0x02, writes: 0 });
        assert_eq!(port.read_lines(), LineLevels { scl: false, sda: true });

        let (_, mut input) = port.release();
        input.value = 0xFF;
        let mut port = CombinedCsrLines::new(FakeCsr::default(), input);
        assert_eq!(port.read_lines(), LineLevels { scl: true, sda: true });
    }

    #[test]
    fn test_oe_release_clears_enable() {
        let mut port = OeCsrLines::new(FakeCsr::default(), FakeCsr::default());
        port.write_lines(LineState::IDLE);
        let (out, _) = port.release();
        assert_eq!(out.value, OE_SCL | OE_SDA);
        assert_eq!(out.value & OE_ENABLE, 0);
    }

    #[test]
    fn test_oe_pull_sets_enable_with_data_low() {
        let mut port = OeCsrLines::new(FakeCsr::default(), FakeCsr::default());
        port.write_lines(LineState::new(false, false));
        let (out, _) = port.release();
        assert_eq!(out.value, OE_ENABLE);
    }

    #[test]
    fn test_oe_clock_level_follows_last_write() {
        let mut port = OeCsrLines::new(FakeCsr::default(), FakeCsr { value: OE_SDA_IN, writes: 0 });
        assert!(port.read_lines().scl);

        port.write_lines(LineState::new(false, true));
        assert_eq!(port.read_lines(), LineLevels { scl: false, sda: true });

        port.write_lines(LineState::IDLE);
        assert_eq!(port.read_lines(), LineLevels { scl: true, sda: true });
    }

    #[test]
    fn test_oe_data_sampled_from_input() {
        let mut port = OeCsrLines::new(FakeCsr::default(), FakeCsr { value: 0x06, writes: 0 });
        assert!(!port.read_lines().sda);
    }
}
