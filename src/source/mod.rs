pub mod directory;
pub mod ffmpeg;

use std::path::Path;

use crate::error::{FrameUnavailable, PlayerError, PlayerResult};
use crate::render::RasterFrame;

pub use directory::FrameDirectory;
pub use ffmpeg::FfmpegSource;

/// Ordered provider of decoded frames, addressed from index 1.
///
/// `frame` is called on the playback thread and is not cancellable: a source
/// that blocks here stalls playback until it returns.
pub trait FrameSource {
    /// One-time setup. Frames must come out at `2 * output_width` by
    /// `2 * output_height` pixels so each character cell covers a 2x2 block.
    fn prepare(
        &mut self,
        source_path: &Path,
        output_width: usize,
        output_height: usize,
        fps: f64,
    ) -> PlayerResult<()>;

    fn frame(&mut self, index: u64) -> Result<RasterFrame, FrameUnavailable>;

    /// Releases temporary storage. Safe to call more than once.
    fn cleanup(&mut self);
}

pub fn frame_file_name(index: u64) -> String {
    format!("frame_{index:04}.png")
}

/// Pixel size of a frame scaled for an `output_width` x `output_height` grid,
/// or `None` when the frame's pixel count does not fit in `usize`.
pub fn frame_pixel_size(output_width: usize, output_height: usize) -> Option<(usize, usize)> {
    let width = output_width.checked_mul(2)?;
    let height = output_height.checked_mul(2)?;
    width.checked_mul(height)?;
    Some((width, height))
}

pub(crate) fn require_frame_pixel_size(
    output_width: usize,
    output_height: usize,
) -> PlayerResult<(usize, usize)> {
    frame_pixel_size(output_width, output_height).ok_or_else(|| {
        PlayerError::preparation(format!(
            "output grid {output_width}x{output_height} is too large to scale frames for"
        ))
    })
}
