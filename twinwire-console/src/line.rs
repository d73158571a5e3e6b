//! Line editor for the serial console
//!
//! Bytes arrive one at a time from the UART. The editor echoes what it
//! accepts and hands back a complete line on CR or LF.
//!
//! - 0x08 / 0x7F: erase the last character (echo `"\x08 \x08"`)
//! - 0x07: ignored
//! - CR / LF: submit
//! - anything else printable: append, up to [`MAX_LINE_LEN`] characters

use core::fmt::Write;

use heapless::String;

/// Longest line accepted; further characters are dropped
pub const MAX_LINE_LEN: usize = 63;

/// A complete input line
pub type Line = String<MAX_LINE_LEN>;

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7F;
const BELL: u8 = 0x07;

/// Byte-at-a-time line editor
#[derive(Debug, Clone, Default)]
pub struct LineEditor {
    buffer: Line,
    echo: bool,
}

impl LineEditor {
    /// Create an editor
    ///
    /// # Arguments
    /// * `echo` - write accepted characters and erasures back to the terminal
    pub fn new(echo: bool) -> Self {
        Self {
            buffer: String::new(),
            echo,
        }
    }

    /// Feed one received byte
    ///
    /// Returns the finished line when `byte` is CR or LF; the editor is
    /// empty again afterwards.
    pub fn feed<W: Write>(&mut self, byte: u8, out: &mut W) -> Result<Option<Line>, core::fmt::Error> {
        match byte {
            BACKSPACE | DELETE => {
                if self.buffer.pop().is_some() && self.echo {
                    out.write_str("\x08 \x08")?;
                }
            }
            BELL => {}
            b'\r' | b'\n' => {
                if self.echo {
                    out.write_char('\n')?;
                }
                return Ok(Some(core::mem::take(&mut self.buffer)));
            }
            b if b.is_ascii_graphic() || b == b' ' => {
                if self.buffer.push(b as char).is_ok() && self.echo {
                    out.write_char(b as char)?;
                }
            }
            _ => {}
        }
        Ok(None)
    }

    /// Characters typed so far
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Drop the partial line
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn feed_all(editor: &mut LineEditor, bytes: &[u8], out: &mut String<256>) -> Option<Line> {
        let mut line = None;
        for &b in bytes {
            if let Some(l) = editor.feed(b, out).unwrap() {
                line = Some(l);
            }
        }
        line
    }

    #[test]
    fn test_submit_on_cr_and_lf() {
        let mut editor = LineEditor::new(true);
        let mut out = String::<256>::new();

        let line = feed_all(&mut editor, b"help\r", &mut out).unwrap();
        assert_eq!(line.as_str(), "help");
        assert_eq!(out.as_str(), "help\n");
        assert_eq!(editor.pending(), "");

        let line = feed_all(&mut editor, b"led\n", &mut out).unwrap();
        assert_eq!(line.as_str(), "led");
    }

    #[test]
    fn test_backspace_erases_and_echoes() {
        let mut editor = LineEditor::new(true);
        let mut out = String::<256>::new();

        let line = feed_all(&mut editor, b"lex\x08d\x7f\x7fed\r", &mut out).unwrap();
        assert_eq!(line.as_str(), "led");
        assert_eq!(out.as_str(), "lex\x08 \x08d\x08 \x08\x08 \x08ed\n");
    }

    #[test]
    fn test_backspace_on_empty_line_is_silent() {
        let mut editor = LineEditor::new(true);
        let mut out = String::<256>::new();
        assert!(feed_all(&mut editor, b"\x08\x7f", &mut out).is_none());
        assert_eq!(out.as_str(), "");
    }

    #[test]
    fn test_bell_and_control_bytes_ignored() {
        let mut editor = LineEditor::new(true);
        let mut out = String::<256>::new();
        let line = feed_all(&mut editor, b"a\x07\x1bb\r", &mut out).unwrap();
        assert_eq!(line.as_str(), "ab");
        assert_eq!(out.as_str(), "ab\n");
    }

    #[test]
    fn test_no_echo() {
        let mut editor = LineEditor::new(false);
        let mut out = String::<256>::new();
        let line = feed_all(&mut editor, b"ab\x08c\r", &mut out).unwrap();
        assert_eq!(line.as_str(), "ac");
        assert_eq!(out.as_str(), "");
    }

    #[test]
    fn test_long_line_truncated() {
        let mut editor = LineEditor::new(true);
        let mut out = String::<256>::new();
        let bytes = [b'x'; 80];
        assert!(feed_all(&mut editor, &bytes, &mut out).is_none());
        assert_eq!(editor.pending().len(), MAX_LINE_LEN);
        assert_eq!(out.len(), MAX_LINE_LEN);
        let line = feed_all(&mut editor, b"\r", &mut out).unwrap();
        assert_eq!(line.len(), MAX_LINE_LEN);
    }

    proptest! {
        #[test]
        fn arbitrary_input_stays_bounded(bytes in proptest::collection::vec(any::<u8>(), 0..300)) {
            let mut editor = LineEditor::new(false);
            let mut out = String::<256>::new();
            for b in bytes {
                let line = editor.feed(b, &mut out).unwrap();
                prop_assert!(editor.pending().len() <= MAX_LINE_LEN);
                if let Some(line) = line {
                    prop_assert!(line.is_ascii());
                    prop_assert_eq!(editor.pending().len(), 0);
                }
            }
        }
    }
}
