//! RAM-backed character framebuffer with change detection.
//!
//! Screens draw into this grid instead of the LCD. The grid keeps a copy of
//! the last flushed frame, so a host can push frames to the real device (or a
//! terminal) only when the content actually differs, even if a screen clears
//! and redraws identical text every loop.

use core::convert::Infallible;

use log::debug;

use super::{BLOCK_GLYPH, CharDisplay};

/// Character grid implementing [`CharDisplay`].
///
/// Writes past the right edge or below the last row are clipped, matching
/// how an HD44780-style panel drops characters outside its visible window.
#[derive(Debug, Clone)]
pub struct CharFrameBuffer<const COLS: usize, const ROWS: usize> {
    cells: [[u8; COLS]; ROWS],
    /// Frame as of the last [`CharFrameBuffer::take_dirty`]
    flushed: [[u8; COLS]; ROWS],
    col: usize,
    row: usize,
}

impl<const COLS: usize, const ROWS: usize> Default for CharFrameBuffer<COLS, ROWS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const COLS: usize, const ROWS: usize> CharFrameBuffer<COLS, ROWS> {
    pub const fn new() -> Self {
        Self {
            cells: [[b' '; COLS]; ROWS],
            // Never matches a drawn frame, so the first flush always happens
            flushed: [[0; COLS]; ROWS],
            col: 0,
            row: 0,
        }
    }

    /// Write a single cell at the cursor and advance it.
    #[inline]
    fn put(&mut self, code: u8) {
        if self.row < ROWS && self.col < COLS {
            self.cells[self.row][self.col] = code;
        }
        self.col = self.col.saturating_add(1);
    }

    /// Raw character codes of one row, empty past the last row
    pub fn row(&self, row: usize) -> &[u8] {
        self.cells.get(row).map(|cells| cells.as_slice()).unwrap_or(&[])
    }

    /// One row as text, trailing blanks removed. Block glyphs become `█`.
    /// Rows past the last one read as empty.
    pub fn row_text(&self, row: usize) -> heapless::String<{ 4 * 64 }> {
        let mut text = heapless::String::new();
        let cells = self.row(row);
        for &code in &cells[..cells.len().min(64)] {
            let ch = match code {
                BLOCK_GLYPH => '█',
                0x20..=0x7e => code as char,
                _ => '?',
            };
            let _ = text.push(ch);
        }
        while text.ends_with(' ') {
            text.pop();
        }
        text
    }

    /// Whether the frame differs from the last flushed one
    pub fn is_dirty(&self) -> bool {
        self.cells != self.flushed
    }

    /// Return whether a flush is needed and mark the current frame flushed.
    pub fn take_dirty(&mut self) -> bool {
        if !self.is_dirty() {
            return false;
        }
        self.flushed = self.cells;
        true
    }
}

impl<const COLS: usize, const ROWS: usize> CharDisplay for CharFrameBuffer<COLS, ROWS> {
    type Error = Infallible;

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.cells = [[b' '; COLS]; ROWS];
        self.col = 0;
        self.row = 0;
        Ok(())
    }

    fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), Self::Error> {
        if row as usize >= ROWS {
            debug!("Cursor row {} outside {}-row display", row, ROWS);
        }
        self.col = col as usize;
        self.row = row as usize;
        Ok(())
    }

    fn print(&mut self, text: &str) -> Result<(), Self::Error> {
        for ch in text.chars() {
            self.put(if ch.is_ascii() { ch as u8 } else { b'?' });
        }
        Ok(())
    }

    fn write_glyph(&mut self, code: u8) -> Result<(), Self::Error> {
        self.put(code);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_and_read_back() {
        let mut fb = CharFrameBuffer::<16, 2>::new();
        fb.print("Glucose").unwrap();
        fb.set_cursor(0, 1).unwrap();
        fb.write_glyph(BLOCK_GLYPH).unwrap();
        fb.write_glyph(BLOCK_GLYPH).unwrap();

        assert_eq!(fb.row_text(0).as_str(), "Glucose");
        assert_eq!(fb.row_text(1).as_str(), "██");
        assert_eq!(&fb.row(1)[..3], &[255, 255, b' ']);
    }

    #[test]
    fn test_clipping() {
        let mut fb = CharFrameBuffer::<4, 2>::new();
        fb.print("overflow").unwrap();
        fb.set_cursor(0, 2).unwrap();
        fb.print("hidden").unwrap();

        assert_eq!(fb.row_text(0).as_str(), "over");
        assert_eq!(fb.row_text(1).as_str(), "");
    }

    #[test]
    fn test_dirty_only_on_change() {
        let mut fb = CharFrameBuffer::<16, 2>::new();
        fb.print("1h avg:130").unwrap();
        assert!(fb.take_dirty());

        // Clearing and redrawing identical content leaves the frame clean
        fb.clear().unwrap();
        assert!(fb.is_dirty());
        fb.print("1h avg:130").unwrap();
        assert!(!fb.take_dirty());

        fb.set_cursor(7, 0).unwrap();
        fb.print("131").unwrap();
        assert!(fb.take_dirty());
        assert!(!fb.is_dirty());
    }

    #[test]
    fn test_rows_past_the_end_read_empty() {
        let mut fb = CharFrameBuffer::<4, 2>::new();
        fb.print("abcd").unwrap();

        assert!(fb.row(2).is_empty());
        assert_eq!(fb.row_text(2).as_str(), "");
        assert_eq!(fb.row_text(usize::MAX).as_str(), "");
        assert_eq!(fb.row(0), b"abcd");
    }
}
