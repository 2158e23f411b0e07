use std::time::Duration;

use crate::error::{PlayerError, PlayerResult};
use crate::source::frame_pixel_size;

pub const DEFAULT_WIDTH: usize = 80;
pub const DEFAULT_HEIGHT: usize = 24;
pub const DEFAULT_FPS: f64 = 15.0;

// truecolor escape (up to 19 bytes) plus a 3-byte glyph, rounded up
const ANSI_BYTES_PER_CELL: usize = 25;
const MAX_PREALLOCATED_FRAME: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    /// Character columns; frames are expected at twice this many pixels.
    pub width: usize,
    /// Character rows; frames are expected at twice this many pixels.
    pub height: usize,
    pub fps: f64,
    pub color: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fps: DEFAULT_FPS,
            color: true,
        }
    }
}

impl PlaybackConfig {
    pub fn validate(&self) -> PlayerResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PlayerError::config("output width/height must be non-zero"));
        }
        let cells_fit = self
            .width
            .checked_mul(self.height)
            .and_then(|cells| cells.checked_mul(ANSI_BYTES_PER_CELL))
            .is_some();
        if !cells_fit || frame_pixel_size(self.width, self.height).is_none() {
            return Err(PlayerError::config(format!(
                "output grid {}x{} is too large",
                self.width, self.height
            )));
        }
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(PlayerError::config(format!(
                "fps must be a positive number, got {}",
                self.fps
            )));
        }
        if Duration::try_from_secs_f64(1.0 / self.fps).is_err() {
            return Err(PlayerError::config(format!(
                "fps {} gives an unrepresentable frame interval",
                self.fps
            )));
        }
        Ok(())
    }

    /// Initial size for the per-frame output buffer; the buffer grows past it if needed.
    pub fn frame_buffer_capacity(&self) -> usize {
        self.width
            .saturating_mul(self.height)
            .saturating_mul(ANSI_BYTES_PER_CELL)
            .min(MAX_PREALLOCATED_FRAME)
    }

    /// Wall-clock budget per frame, `1 / fps` seconds.
    pub fn frame_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.fps).unwrap_or(Duration::MAX)
    }
}
