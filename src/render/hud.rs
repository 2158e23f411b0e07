use crossterm::{
    style::ResetColor,
    terminal::{Clear, ClearType},
};
use std::fmt::Write as _;
use std::io;
use std::time::Duration;

use super::write_ansi_command;

/// Appends the playback status line that sits below each frame.
pub fn write_status_line(
    buf: &mut String,
    frame_index: u64,
    fps: f64,
    load_time: Duration,
) -> io::Result<()> {
    write_ansi_command(buf, ResetColor)?;
    write!(buf, "Frame: {frame_index} | FPS: {fps:.1} | Load: {load_time:?}")
        .map_err(|_| io::Error::other("failed to format status line"))?;
    write_ansi_command(buf, Clear(ClearType::UntilNewLine))
}
