use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};

use tempfile::TempDir;

use super::{require_frame_pixel_size, FrameDirectory, FrameSource};
use crate::terminal_setup::ExitCleanup;
use crate::error::{FrameUnavailable, PlayerError, PlayerResult};
use crate::render::RasterFrame;

pub fn is_ffmpeg_on_path() -> bool {
    is_tool_on_path("ffmpeg")
}

pub fn is_ffprobe_on_path() -> bool {
    is_tool_on_path("ffprobe")
}

fn is_tool_on_path(program: &str) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Arguments that dump `input` as numbered PNGs into `out_dir`, resampled to
/// `fps` and scaled to `frame_size` pixels.
pub fn extraction_args(
    input: &Path,
    out_dir: &Path,
    frame_size: (usize, usize),
    fps: f64,
) -> Vec<OsString> {
    let (frame_width, frame_height) = frame_size;
    let mut args: Vec<OsString> = vec!["-loglevel".into(), "error".into(), "-i".into()];
    args.push(input.as_os_str().to_owned());
    args.push("-vf".into());
    args.push(format!("fps={fps},scale={frame_width}:{frame_height}").into());
    args.push("-y".into());
    args.push(out_dir.join("frame_%04d.png").into_os_string());
    args
}

/// Stream and format metadata as reported by `ffprobe`, in JSON.
pub fn probe(input: &Path) -> PlayerResult<String> {
    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(input)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            PlayerError::preparation(format!(
                "failed to spawn ffprobe (is it installed and on PATH?): {e}"
            ))
        })?;
    if !output.status.success() {
        return Err(PlayerError::preparation(format!(
            "ffprobe could not read '{}' ({})",
            input.display(),
            output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn run_extraction(
    input: &Path,
    out_dir: &Path,
    frame_size: (usize, usize),
    fps: f64,
) -> PlayerResult<()> {
    let output = Command::new("ffmpeg")
        .args(extraction_args(input, out_dir, frame_size, fps))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            PlayerError::preparation(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr.lines().last().unwrap_or("no diagnostic output");
        return Err(PlayerError::preparation(format!(
            "ffmpeg exited with {}: {detail}",
            output.status
        )));
    }
    Ok(())
}

/// Extracts every frame up front with the system `ffmpeg` binary into a
/// private temporary directory, then serves them as decoded PNGs.
#[derive(Debug, Default)]
pub struct FfmpegSource {
    workdir: Option<TempDir>,
    frames: Option<FrameDirectory>,
    exit_cleanup: Option<ExitCleanup>,
}

impl FfmpegSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the extraction directory so it can be removed even when the
    /// process exits without dropping this source.
    pub fn with_exit_cleanup(mut self, cleanup: ExitCleanup) -> Self {
        self.exit_cleanup = Some(cleanup);
        self
    }
}

impl FrameSource for FfmpegSource {
    fn prepare(
        &mut self,
        source_path: &Path,
        output_width: usize,
        output_height: usize,
        fps: f64,
    ) -> PlayerResult<()> {
        if !is_ffmpeg_on_path() {
            return Err(PlayerError::preparation(
                "ffmpeg is required for frame extraction, but was not found on PATH",
            ));
        }
        let frame_size = require_frame_pixel_size(output_width, output_height)?;
        self.cleanup();

        let workdir = tempfile::Builder::new()
            .prefix("quadplay-frames-")
            .tempdir()
            .map_err(|e| {
                PlayerError::preparation(format!("failed to create frame directory: {e}"))
            })?;
        if let Some(cleanup) = &self.exit_cleanup {
            cleanup.register_scratch_dir(workdir.path());
        }

        tracing::info!(
            input = %source_path.display(),
            dir = %workdir.path().display(),
            width = frame_size.0,
            height = frame_size.1,
            fps,
            "extracting frames"
        );

        if let Err(err) = run_extraction(source_path, workdir.path(), frame_size, fps) {
            if let Some(cleanup) = &self.exit_cleanup {
                cleanup.forget_scratch_dir();
            }
            return Err(err);
        }

        self.frames = Some(FrameDirectory::new(workdir.path()));
        self.workdir = Some(workdir);
        Ok(())
    }

    fn frame(&mut self, index: u64) -> Result<RasterFrame, FrameUnavailable> {
        match self.frames.as_ref() {
            Some(frames) => frames.decode(index),
            None => Err(FrameUnavailable::Unreadable {
                index,
                reason: "frames have not been extracted".into(),
            }),
        }
    }

    fn cleanup(&mut self) {
        self.frames = None;
        if let Some(cleanup) = &self.exit_cleanup {
            cleanup.forget_scratch_dir();
        }
        if let Some(workdir) = self.workdir.take() {
            let path = workdir.path().to_path_buf();
            if let Err(err) = workdir.close() {
                tracing::warn!(dir = %path.display(), %err, "failed to remove extracted frames");
            }
        }
    }
}
