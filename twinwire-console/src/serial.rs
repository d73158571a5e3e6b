//! Text output over a byte stream

use core::fmt;

use embedded_io::Write;

/// [`fmt::Write`] adapter that turns `\n` into `\r\n`
///
/// Serial terminals need the carriage return; the console itself only
/// ever writes bare newlines.
pub struct CrlfWriter<'a, T> {
    inner: &'a mut T,
}

impl<'a, T: Write> CrlfWriter<'a, T> {
    /// Wrap a byte sink
    pub fn new(inner: &'a mut T) -> Self {
        Self { inner }
    }
}

impl<T: Write> fmt::Write for CrlfWriter<'_, T> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut parts = s.split('\n');
        if let Some(first) = parts.next() {
            self.inner.write_all(first.as_bytes()).map_err(|_| fmt::Error)?;
        }
        for part in parts {
            self.inner.write_all(b"\r\n").map_err(|_| fmt::Error)?;
            self.inner.write_all(part.as_bytes()).map_err(|_| fmt::Error)?;
        }
        Ok(())
    }
}
