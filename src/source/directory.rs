use std::io;
use std::path::{Path, PathBuf};

use super::{frame_file_name, require_frame_pixel_size, FrameSource};
use crate::error::{FrameUnavailable, PlayerError, PlayerResult};
use crate::render::RasterFrame;

/// Reads `frame_0001.png`, `frame_0002.png`, ... from a directory it does not own.
#[derive(Debug, Clone)]
pub struct FrameDirectory {
    dir: PathBuf,
}

impl FrameDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[cfg(test)]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(frame_file_name(index))
    }

    pub fn decode(&self, index: u64) -> Result<RasterFrame, FrameUnavailable> {
        let path = self.frame_path(index);
        let decoded = match image::open(&path) {
            Ok(img) => img,
            Err(image::ImageError::IoError(err)) if err.kind() == io::ErrorKind::NotFound => {
                return Err(FrameUnavailable::EndOfStream { index });
            }
            Err(err) => {
                return Err(FrameUnavailable::Unreadable {
                    index,
                    reason: format!("{}: {err}", path.display()),
                });
            }
        };
        RasterFrame::try_from(decoded.to_rgb8()).map_err(|err| FrameUnavailable::Unreadable {
            index,
            reason: err.to_string(),
        })
    }
}

impl FrameSource for FrameDirectory {
    fn prepare(
        &mut self,
        _source_path: &Path,
        output_width: usize,
        output_height: usize,
        _fps: f64,
    ) -> PlayerResult<()> {
        let (expected_width, expected_height) =
            require_frame_pixel_size(output_width, output_height)?;
        if !self.dir.is_dir() {
            return Err(PlayerError::preparation(format!(
                "frame directory '{}' does not exist",
                self.dir.display()
            )));
        }
        tracing::info!(
            dir = %self.dir.display(),
            expected_width,
            expected_height,
            "reading pre-extracted frames"
        );
        Ok(())
    }

    fn frame(&mut self, index: u64) -> Result<RasterFrame, FrameUnavailable> {
        self.decode(index)
    }

    fn cleanup(&mut self) {}
}
