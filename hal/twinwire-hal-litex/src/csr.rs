//! Control/status register access

/// A 32-bit control/status register
pub trait CsrRegister {
    /// Read the register
    fn read(&mut self) -> u32;

    /// Write the register
    fn write(&mut self, value: u32);
}

/// Memory-mapped CSR at a fixed address
///
/// Every access is volatile, so the compiler never merges or drops a
/// line change.
pub struct MmioCsr {
    addr: *mut u32,
}

impl MmioCsr {
    /// Wrap a register address from the SoC's generated CSR map
    ///
    /// # Safety
    ///
    /// `addr` must be the aligned address of a CSR that stays mapped for
    /// the life of the program, and no other handle may write it.
    #[allow(unsafe_code)]
    pub const unsafe fn new(addr: usize) -> Self {
        Self {
            addr: addr as *mut u32,
        }
    }
}

#[allow(unsafe_code)]
impl CsrRegister for MmioCsr {
    fn read(&mut self) -> u32 {
        // SAFETY: `new` requires a valid, mapped, exclusively owned register
        unsafe { core::ptr::read_volatile(self.addr) }
    }

    fn write(&mut self, value: u32) {
        // SAFETY: as above
        unsafe { core::ptr::write_volatile(self.addr, value) }
    }
}

impl<R: CsrRegister + ?Sized> CsrRegister for &mut R {
    fn read(&mut self) -> u32 {
        (**self).read()
    }

    fn write(&mut self, value: u32) {
        (**self).write(value)
    }
}
