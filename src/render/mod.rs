pub mod hud;
pub mod quadrant;

use crossterm::{
    style::{Color, ResetColor, SetForegroundColor},
    Command,
};
use std::io;

use crate::error::{PlayerError, PlayerResult};

pub type Rgb = [u8; 3];

// Indexed by quadrant mask: bit0 top-left, bit1 top-right, bit2 bottom-left, bit3 bottom-right.
pub const QUADRANT_GLYPHS: [char; 16] = [
    ' ', '\u{2598}', '\u{259D}', '\u{2580}', '\u{2596}', '\u{258C}', '\u{259E}', '\u{259B}',
    '\u{2597}', '\u{259A}', '\u{2590}', '\u{259C}', '\u{2584}', '\u{2599}', '\u{259F}', '\u{2588}',
];

pub const BLANK_MASK: u8 = 0;
pub const FULL_MASK: u8 = 0x0F;

pub fn glyph_for_mask(mask: u8) -> char {
    QUADRANT_GLYPHS[(mask & FULL_MASK) as usize]
}

/// A decoded RGB frame, 8 bits per channel, row-major from the top-left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterFrame {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl RasterFrame {
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<Rgb>) -> PlayerResult<Self> {
        if width == 0 || height == 0 {
            return Err(PlayerError::malformed(
                width,
                height,
                "frame dimensions must be at least 1x1",
            ));
        }
        let expected = width.checked_mul(height).ok_or_else(|| {
            PlayerError::malformed(width, height, "pixel count overflows usize")
        })?;
        if pixels.len() != expected {
            return Err(PlayerError::malformed(
                width,
                height,
                format!("expected {expected} pixels, got {}", pixels.len()),
            ));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    #[cfg(test)]
    pub fn from_fn(
        width: usize,
        height: usize,
        mut pixel_at: impl FnMut(usize, usize) -> Rgb,
    ) -> PlayerResult<Self> {
        let mut pixels = Vec::with_capacity(width.saturating_mul(height));
        for y in 0..height {
            for x in 0..width {
                pixels.push(pixel_at(x, y));
            }
        }
        Self::from_pixels(width, height, pixels)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Callers keep `x < width` and `y < height`.
    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        self.pixels[y * self.width + x]
    }
}

impl TryFrom<image::RgbImage> for RasterFrame {
    type Error = PlayerError;

    fn try_from(img: image::RgbImage) -> PlayerResult<Self> {
        let (width, height) = img.dimensions();
        let pixels = img.pixels().map(|p| p.0).collect();
        Self::from_pixels(width as usize, height as usize, pixels)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub glyph: char,
    /// `None` for monochrome output and for blank cells.
    pub color: Option<Rgb>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedFrame {
    rows: Vec<Vec<Cell>>,
}

impl RenderedFrame {
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    #[cfg(test)]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[cfg(test)]
    pub fn glyph_lines(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.glyph).collect())
            .collect()
    }

    /// Appends the escape-encoded frame: one line per row, each closed by a color reset.
    pub fn write_ansi(&self, buf: &mut String) -> io::Result<()> {
        for row in &self.rows {
            for cell in row {
                if let Some([r, g, b]) = cell.color {
                    write_ansi_command(buf, SetForegroundColor(Color::Rgb { r, g, b }))?;
                }
                buf.push(cell.glyph);
            }
            write_ansi_command(buf, ResetColor)?;
            buf.push('\n');
        }
        Ok(())
    }
}

pub fn write_ansi_command(buf: &mut String, command: impl Command) -> io::Result<()> {
    command
        .write_ansi(buf)
        .map_err(|_| io::Error::other("failed to encode ANSI command"))
}
