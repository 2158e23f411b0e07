use crossterm::{
    cursor, execute,
    style::ResetColor,
    terminal::{self, ClearType, LeaveAlternateScreen},
};
use std::io::{self, Write};
use std::panic;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::PlayerResult;
use crate::player::StopSignal;

pub const INTERRUPTED_EXIT_CODE: i32 = 130;

// cursor shown, color reset
const RESET_ESCAPES: &[u8] = b"\x1b[?25h\x1b[0m";
const LEAVE_ALTERNATE_ESCAPE: &[u8] = b"\x1b[?1049l";

/// State that has to be undone when the process exits without unwinding:
/// the alternate screen, if it was entered, and the frame scratch directory.
#[derive(Debug, Default, Clone)]
pub struct ExitCleanup {
    scratch_dir: Arc<Mutex<Option<PathBuf>>>,
    alternate_screen: Arc<AtomicBool>,
}

impl ExitCleanup {
    fn slot(&self) -> MutexGuard<'_, Option<PathBuf>> {
        self.scratch_dir
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register_scratch_dir(&self, dir: impl Into<PathBuf>) {
        *self.slot() = Some(dir.into());
    }

    pub fn forget_scratch_dir(&self) {
        self.slot().take();
    }

    pub fn scratch_dir(&self) -> Option<PathBuf> {
        self.slot().clone()
    }

    pub fn set_alternate_screen(&self, active: bool) {
        self.alternate_screen.store(active, Ordering::SeqCst);
    }

    pub fn in_alternate_screen(&self) -> bool {
        self.alternate_screen.load(Ordering::SeqCst)
    }

    /// Deletes the registered scratch directory, if any. Returns whether
    /// something was removed.
    pub fn remove_scratch_dir(&self) -> bool {
        let Some(dir) = self.slot().take() else {
            return false;
        };
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => true,
            Err(err) if err.kind() == io::ErrorKind::NotFound => false,
            Err(err) => {
                tracing::warn!(dir = %dir.display(), %err, "failed to remove extracted frames");
                false
            }
        }
    }

    /// Everything the normal drain would have done, for a process about to exit.
    pub fn run_before_exit(&self) {
        restore_terminal(self.in_alternate_screen());
        self.set_alternate_screen(false);
        self.remove_scratch_dir();
    }
}

/// Puts the terminal back the way the shell expects: color reset and cursor
/// visible, plus leaving and clearing the alternate screen when playback had
/// entered it. Falls back to raw escapes on stderr.
pub fn restore_terminal(alternate_screen: bool) {
    let mut stdout = io::stdout();
    let cleanup_result = if alternate_screen {
        execute!(
            stdout,
            ResetColor,
            cursor::Show,
            LeaveAlternateScreen,
            terminal::Clear(ClearType::All),
            cursor::MoveTo(0, 0)
        )
    } else {
        execute!(stdout, ResetColor, cursor::Show)
    };
    if let Err(err) = cleanup_result {
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "quadplay: stdout restore failed ({err}), resetting via stderr");
        if alternate_screen {
            let _ = stderr.write_all(LEAVE_ALTERNATE_ESCAPE);
        }
        let _ = stderr.write_all(RESET_ESCAPES);
        let _ = stderr.flush();
    }
}

pub fn install_panic_hook(cleanup: ExitCleanup) {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        restore_terminal(cleanup.in_alternate_screen());
        cleanup.set_alternate_screen(false);
        default_hook(panic_info);
    }));
}

/// The first Ctrl+C asks the player to stop after the current frame. A second
/// one, for a player stuck fetching a frame, restores the terminal, removes
/// extracted frames and exits.
pub fn install_interrupt_handler(stop: StopSignal, cleanup: ExitCleanup) -> PlayerResult<()> {
    ctrlc::set_handler(move || {
        if stop.request() {
            cleanup.run_before_exit();
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
        tracing::debug!("interrupt received, stopping after the current frame");
    })?;
    Ok(())
}
