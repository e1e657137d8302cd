//! Character display abstraction and the two monitor screens
//!
//! The display is a small character LCD addressed by column and row. Two
//! screens share it:
//! - **Live**: the last reading, its severity, and a proportional bar.
//! - **Statistics**: 1-minute and 1-hour rolling averages from the log.

pub mod framebuffer;
pub mod manager;

pub use framebuffer::CharFrameBuffer;
pub use manager::{DisplayManager, DisplayMode};

/// Character code of the solid block used for the live-mode bar
pub const BLOCK_GLYPH: u8 = 255;

/// Character LCD driver.
pub trait CharDisplay {
    type Error: core::fmt::Debug;

    /// Blank the screen and home the cursor.
    fn clear(&mut self) -> Result<(), Self::Error>;

    fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), Self::Error>;

    /// Print text at the cursor, advancing it.
    fn print(&mut self, text: &str) -> Result<(), Self::Error>;

    /// Write one raw character code (e.g. [`BLOCK_GLYPH`]) at the cursor.
    fn write_glyph(&mut self, code: u8) -> Result<(), Self::Error>;
}

impl<T: CharDisplay + ?Sized> CharDisplay for &mut T {
    type Error = T::Error;

    fn clear(&mut self) -> Result<(), Self::Error> {
        (**self).clear()
    }

    fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), Self::Error> {
        (**self).set_cursor(col, row)
    }

    fn print(&mut self, text: &str) -> Result<(), Self::Error> {
        (**self).print(text)
    }

    fn write_glyph(&mut self, code: u8) -> Result<(), Self::Error> {
        (**self).write_glyph(code)
    }
}
