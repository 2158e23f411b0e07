use crossterm::{
    cursor, execute, queue,
    style::ResetColor,
    terminal::{self, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{self, BufWriter, Write};

use crate::terminal_setup::ExitCleanup;

/// Where rendered frames go. Every call is best effort; errors are reported
/// but the caller decides whether they end playback.
pub trait TerminalSink {
    fn clear(&mut self) -> io::Result<()>;
    fn hide_cursor(&mut self) -> io::Result<()>;
    fn show_cursor(&mut self) -> io::Result<()>;
    fn move_to_home(&mut self) -> io::Result<()>;
    fn write(&mut self, text: &str) -> io::Result<()>;
}

/// Crossterm-backed sink. Hiding the cursor also enters the alternate screen
/// and showing it leaves again, so the shell's scrollback survives playback.
/// `move_to_home` is only queued; the following `write` flushes both at once.
#[derive(Debug)]
pub struct CrosstermSink<W: Write> {
    out: W,
    exit_cleanup: Option<ExitCleanup>,
}

impl CrosstermSink<BufWriter<io::Stdout>> {
    pub fn stdout() -> Self {
        Self::new(BufWriter::with_capacity(1024 * 1024, io::stdout()))
    }
}

impl<W: Write> CrosstermSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            exit_cleanup: None,
        }
    }

    /// Reports alternate-screen transitions so an abrupt exit knows what to undo.
    pub fn with_exit_cleanup(mut self, cleanup: ExitCleanup) -> Self {
        self.exit_cleanup = Some(cleanup);
        self
    }

    fn mark_alternate_screen(&self, active: bool) {
        if let Some(cleanup) = &self.exit_cleanup {
            cleanup.set_alternate_screen(active);
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TerminalSink for CrosstermSink<W> {
    fn clear(&mut self) -> io::Result<()> {
        execute!(
            self.out,
            terminal::Clear(ClearType::All),
            cursor::MoveTo(0, 0)
        )
    }

    fn hide_cursor(&mut self) -> io::Result<()> {
        self.mark_alternate_screen(true);
        execute!(self.out, EnterAlternateScreen, cursor::Hide)
    }

    fn show_cursor(&mut self) -> io::Result<()> {
        execute!(self.out, ResetColor, cursor::Show, LeaveAlternateScreen)?;
        self.mark_alternate_screen(false);
        Ok(())
    }

    fn move_to_home(&mut self) -> io::Result<()> {
        queue!(self.out, cursor::MoveTo(0, 0))
    }

    fn write(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }
}
