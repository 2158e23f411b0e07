use rayon::prelude::*;

use super::{glyph_for_mask, Cell, RasterFrame, RenderedFrame, Rgb, BLANK_MASK};

// --- Quadrant rasterizer ---

/// Fraction of a block's mean luminance a quadrant must exceed to count as lit.
pub const THRESHOLD_BIAS: f64 = 0.9;

pub fn luminance(pixel: Rgb) -> f64 {
    let [r, g, b] = pixel;
    (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64) / 255.0
}

/// Reads the 2x2 block whose top-left pixel is `(x, y)`, in mask bit order.
/// The second column and row repeat the last valid one at the frame edge.
pub fn sample_block(frame: &RasterFrame, x: usize, y: usize) -> [Rgb; 4] {
    let x1 = (x + 1).min(frame.width() - 1);
    let y1 = (y + 1).min(frame.height() - 1);
    [
        frame.pixel(x, y),
        frame.pixel(x1, y),
        frame.pixel(x, y1),
        frame.pixel(x1, y1),
    ]
}

pub fn quadrant_mask(levels: [f64; 4]) -> u8 {
    let avg_brightness = (levels[0] + levels[1] + levels[2] + levels[3]) / 4.0;
    let threshold = avg_brightness * THRESHOLD_BIAS;
    let mut mask = 0u8;
    for (bit, level) in levels.into_iter().enumerate() {
        if level > threshold {
            mask |= 1 << bit;
        }
    }
    mask
}

pub fn cell_color(block: &[Rgb; 4]) -> Rgb {
    let mut sums = [0u32; 3];
    for pixel in block {
        for (sum, channel) in sums.iter_mut().zip(pixel) {
            *sum += *channel as u32;
        }
    }
    sums.map(|sum| (sum / 4) as u8)
}

pub fn rasterize_block(block: &[Rgb; 4], color_enabled: bool) -> Cell {
    let mask = quadrant_mask(block.map(luminance));
    let color = if color_enabled && mask != BLANK_MASK {
        Some(cell_color(block))
    } else {
        None
    };
    Cell {
        glyph: glyph_for_mask(mask),
        color,
    }
}

/// Converts a frame sampled at two pixels per cell on each axis into quadrant glyphs.
///
/// The grid always follows the frame: `ceil(height / 2)` rows of `ceil(width / 2)` cells.
/// `output_width` and `output_height` describe the grid the frame was scaled for; a
/// mismatch is logged and otherwise ignored, since this function never resamples.
pub fn render_quadrants(
    frame: &RasterFrame,
    output_width: usize,
    output_height: usize,
    color_enabled: bool,
) -> RenderedFrame {
    let cols = frame.width().div_ceil(2);
    let rows = frame.height().div_ceil(2);
    if cols != output_width || rows != output_height {
        tracing::debug!(
            frame_width = frame.width(),
            frame_height = frame.height(),
            output_width,
            output_height,
            "frame size does not match the requested character grid"
        );
    }

    let cells: Vec<Vec<Cell>> = (0..rows)
        .into_par_iter()
        .map(|row| {
            let y = row * 2;
            (0..cols)
                .map(|col| rasterize_block(&sample_block(frame, col * 2, y), color_enabled))
                .collect()
        })
        .collect();

    RenderedFrame::from_rows(cells)
}
