pub mod config;
pub mod pacing;
pub mod state;

use std::io;
use std::thread;
use std::time::Instant;

use crate::error::{FrameUnavailable, PlayerError, PlayerResult};
use crate::render::{hud, quadrant::render_quadrants};
use crate::sink::TerminalSink;
use crate::source::FrameSource;

pub use config::PlaybackConfig;
pub use state::{PlaybackReport, PlaybackState, StopReason, StopSignal};

pub const COMPLETION_MESSAGE: &str = "Playback finished!\n";

/// Holds the cursor hidden for its lifetime. Dropping it without `release`
/// (an early return or a panic unwinding through the loop) still restores it.
struct CursorGuard<'a, T: TerminalSink> {
    sink: &'a mut T,
    hidden: bool,
}

impl<'a, T: TerminalSink> CursorGuard<'a, T> {
    fn new(sink: &'a mut T) -> Self {
        Self {
            sink,
            hidden: false,
        }
    }

    fn hide(&mut self) -> io::Result<()> {
        self.hidden = true;
        self.sink.hide_cursor()?;
        self.sink.clear()
    }

    fn sink(&mut self) -> &mut T {
        &mut *self.sink
    }

    fn release(mut self) -> io::Result<()> {
        self.hidden = false;
        let shown = self.sink.show_cursor();
        let cleared = self.sink.clear();
        shown.and(cleared)
    }
}

impl<T: TerminalSink> Drop for CursorGuard<'_, T> {
    fn drop(&mut self) {
        if self.hidden {
            let _ = self.sink.show_cursor();
            let _ = self.sink.clear();
        }
    }
}

fn advance(state: &mut PlaybackState, next: PlaybackState) {
    debug_assert!(
        state.can_advance_to(next),
        "illegal playback transition {} -> {}",
        state.name(),
        next.name()
    );
    tracing::debug!(from = state.name(), to = next.name(), "playback state change");
    *state = next;
}

/// Drives a prepared [`FrameSource`] into a [`TerminalSink`] at the configured rate.
pub struct Player<S, T> {
    source: S,
    sink: T,
    config: PlaybackConfig,
    state: PlaybackState,
    stop: StopSignal,
}

impl<S: FrameSource, T: TerminalSink> Player<S, T> {
    pub fn new(source: S, sink: T, config: PlaybackConfig) -> PlayerResult<Self> {
        config.validate()?;
        Ok(Self {
            source,
            sink,
            config,
            state: PlaybackState::Idle,
            stop: StopSignal::default(),
        })
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn into_parts(self) -> (S, T) {
        (self.source, self.sink)
    }

    /// Plays from frame 1 until the source runs out or a stop is requested.
    ///
    /// Terminal restoration, the completion message and source cleanup run on
    /// every exit path, including a failed write; the first error is returned
    /// afterwards.
    pub fn start(&mut self) -> PlayerResult<PlaybackReport> {
        if self.state != PlaybackState::Idle {
            return Err(PlayerError::AlreadyStarted(self.state));
        }
        advance(&mut self.state, PlaybackState::Running);

        let mut guard = CursorGuard::new(&mut self.sink);
        let outcome = match guard.hide() {
            Ok(()) => run_frames(&mut self.source, guard.sink(), &self.config, &self.stop),
            Err(err) => Err(err.into()),
        };

        advance(&mut self.state, PlaybackState::Draining);
        let restored = guard.release();
        let farewell = self.sink.write(COMPLETION_MESSAGE);
        self.source.cleanup();
        advance(&mut self.state, PlaybackState::Stopped);

        let report = outcome?;
        restored?;
        farewell?;
        tracing::info!(
            frames = report.frames_rendered,
            reason = ?report.stop_reason,
            "playback stopped"
        );
        Ok(report)
    }
}

fn run_frames<S: FrameSource, T: TerminalSink>(
    source: &mut S,
    sink: &mut T,
    config: &PlaybackConfig,
    stop: &StopSignal,
) -> PlayerResult<PlaybackReport> {
    let interval = config.frame_interval();
    let mut buffer = String::with_capacity(config.frame_buffer_capacity());
    let mut index: u64 = 1;

    let stop_reason = loop {
        if stop.is_requested() {
            break StopReason::Interrupted;
        }

        let start = Instant::now();
        let frame = match source.frame(index) {
            Ok(frame) => frame,
            Err(FrameUnavailable::EndOfStream { .. }) => break StopReason::EndOfStream,
            Err(FrameUnavailable::Unreadable { reason, .. }) => {
                tracing::warn!(index, %reason, "frame unreadable, ending playback");
                break StopReason::FrameUnreadable(reason);
            }
        };
        let rendered = render_quadrants(&frame, config.width, config.height, config.color);
        let load_time = start.elapsed();

        buffer.clear();
        rendered.write_ansi(&mut buffer)?;
        hud::write_status_line(&mut buffer, index, config.fps, load_time)?;
        sink.move_to_home()?;
        sink.write(&buffer)?;

        let elapsed = start.elapsed();
        match pacing::remaining_budget(elapsed, interval) {
            Some(pause) => thread::sleep(pause),
            None => tracing::debug!(index, ?elapsed, ?interval, "frame over budget"),
        }
        index += 1;
    };

    Ok(PlaybackReport {
        frames_rendered: index - 1,
        last_index: index,
        stop_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RasterFrame;
    use std::path::Path;
    use std::time::Duration;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum SinkEvent {
        Clear,
        HideCursor,
        ShowCursor,
        Home,
        Write,
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<(SinkEvent, Instant)>,
        writes: Vec<String>,
        fail_writes: bool,
        stop_after: Option<(usize, StopSignal)>,
    }

    impl RecordingSink {
        fn record(&mut self, event: SinkEvent) {
            self.events.push((event, Instant::now()));
        }

        fn count(&self, event: SinkEvent) -> usize {
            self.events.iter().filter(|(e, _)| *e == event).count()
        }

        fn frame_writes(&self) -> Vec<&String> {
            self.writes
                .iter()
                .filter(|w| w.as_str() != COMPLETION_MESSAGE)
                .collect()
        }

        fn write_instants(&self) -> Vec<Instant> {
            self.events
                .iter()
                .filter(|(e, _)| *e == SinkEvent::Write)
                .map(|(_, at)| *at)
                .collect()
        }
    }

    impl TerminalSink for RecordingSink {
        fn clear(&mut self) -> io::Result<()> {
            self.record(SinkEvent::Clear);
            Ok(())
        }

        fn hide_cursor(&mut self) -> io::Result<()> {
            self.record(SinkEvent::HideCursor);
            Ok(())
        }

        fn show_cursor(&mut self) -> io::Result<()> {
            self.record(SinkEvent::ShowCursor);
            Ok(())
        }

        fn move_to_home(&mut self) -> io::Result<()> {
            self.record(SinkEvent::Home);
            Ok(())
        }

        fn write(&mut self, text: &str) -> io::Result<()> {
            self.record(SinkEvent::Write);
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"));
            }
            self.writes.push(text.to_string());
            if let Some((after, signal)) = &self.stop_after {
                if self.frame_writes().len() >= *after {
                    signal.request();
                }
            }
            Ok(())
        }
    }

    /// Serves a 4x4 frame with only column 0 lit until `end_at`.
    #[derive(Default)]
    struct ScriptedSource {
        end_at: u64,
        unreadable_at: Option<u64>,
        fetched: Vec<u64>,
        cleanups: usize,
    }

    impl ScriptedSource {
        fn ending_at(end_at: u64) -> Self {
            Self {
                end_at,
                ..Self::default()
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn prepare(&mut self, _: &Path, _: usize, _: usize, _: f64) -> PlayerResult<()> {
            Ok(())
        }

        fn frame(&mut self, index: u64) -> Result<RasterFrame, FrameUnavailable> {
            self.fetched.push(index);
            if self.unreadable_at == Some(index) {
                return Err(FrameUnavailable::Unreadable {
                    index,
                    reason: "bad crc".into(),
                });
            }
            if index >= self.end_at {
                return Err(FrameUnavailable::EndOfStream { index });
            }
            Ok(RasterFrame::from_fn(4, 4, |x, _| {
                if x == 0 {
                    [255, 255, 255]
                } else {
                    [0, 0, 0]
                }
            })
            .expect("4x4 fixture"))
        }

        fn cleanup(&mut self) {
            self.cleanups += 1;
        }
    }

    fn fast_config() -> PlaybackConfig {
        PlaybackConfig {
            width: 2,
            height: 2,
            fps: 1000.0,
            color: false,
        }
    }

    fn play(
        source: ScriptedSource,
        sink: RecordingSink,
        config: PlaybackConfig,
    ) -> (PlayerResult<PlaybackReport>, PlaybackState, ScriptedSource, RecordingSink) {
        let mut player = Player::new(source, sink, config).expect("valid config");
        let result = player.start();
        let state = player.state();
        let (source, sink) = player.into_parts();
        (result, state, source, sink)
    }

    #[test]
    fn processes_frames_until_source_runs_out() {
        let (result, state, source, sink) =
            play(ScriptedSource::ending_at(5), RecordingSink::default(), fast_config());
        let report = result.expect("playback succeeds");

        assert_eq!(report.frames_rendered, 4);
        assert_eq!(report.last_index, 5);
        assert_eq!(report.stop_reason, StopReason::EndOfStream);
        assert_eq!(source.fetched, vec![1, 2, 3, 4, 5]);
        assert_eq!(source.cleanups, 1);
        assert_eq!(sink.frame_writes().len(), 4);
        assert_eq!(sink.count(SinkEvent::HideCursor), 1);
        assert_eq!(sink.count(SinkEvent::ShowCursor), 1);
        assert_eq!(sink.writes.last().map(String::as_str), Some(COMPLETION_MESSAGE));
        assert_eq!(state, PlaybackState::Stopped);
    }

    #[test]
    fn frame_is_written_once_right_after_cursor_home() {
        let (result, _, _, sink) =
            play(ScriptedSource::ending_at(2), RecordingSink::default(), fast_config());
        result.expect("playback succeeds");

        let kinds: Vec<SinkEvent> = sink.events.iter().map(|(e, _)| *e).collect();
        assert_eq!(
            kinds,
            vec![
                SinkEvent::HideCursor,
                SinkEvent::Clear,
                SinkEvent::Home,
                SinkEvent::Write,
                SinkEvent::ShowCursor,
                SinkEvent::Clear,
                SinkEvent::Write,
            ]
        );
        let frame = &sink.writes[0];
        assert!(
            frame.starts_with("▌ \x1b[0m\n▌ \x1b[0m\n\x1b[0mFrame: 1 | FPS: 1000.0 | Load: "),
            "unexpected frame output {frame:?}"
        );
        assert!(frame.ends_with("\x1b[K"));
    }

    #[test]
    fn empty_source_still_restores_terminal() {
        let (result, state, source, sink) =
            play(ScriptedSource::ending_at(1), RecordingSink::default(), fast_config());
        let report = result.expect("playback succeeds");
        assert_eq!(report.frames_rendered, 0);
        assert_eq!(source.cleanups, 1);
        assert_eq!(sink.count(SinkEvent::ShowCursor), 1);
        assert!(sink.frame_writes().is_empty());
        assert_eq!(state, PlaybackState::Stopped);
    }

    #[test]
    fn unreadable_frame_ends_playback_without_retry() {
        let source = ScriptedSource {
            end_at: 10,
            unreadable_at: Some(3),
            ..ScriptedSource::default()
        };
        let (result, _, source, _) = play(source, RecordingSink::default(), fast_config());
        let report = result.expect("unreadable frames are not errors");
        assert_eq!(report.frames_rendered, 2);
        assert_eq!(report.stop_reason, StopReason::FrameUnreadable("bad crc".into()));
        assert_eq!(source.fetched, vec![1, 2, 3]);
    }

    #[test]
    fn stop_request_ends_at_next_frame_boundary() {
        let signal = StopSignal::default();
        let sink = RecordingSink {
            stop_after: Some((2, signal.clone())),
            ..RecordingSink::default()
        };
        let mut player = Player::new(ScriptedSource::ending_at(100), sink, fast_config())
            .expect("valid config")
            .with_stop_signal(signal);
        let report = player.start().expect("interrupted playback still succeeds");
        let (source, sink) = player.into_parts();

        assert_eq!(report.frames_rendered, 2);
        assert_eq!(report.stop_reason, StopReason::Interrupted);
        assert_eq!(source.fetched, vec![1, 2]);
        assert_eq!(source.cleanups, 1);
        assert_eq!(sink.count(SinkEvent::ShowCursor), 1);
    }

    #[test]
    fn stop_requested_before_start_renders_nothing() {
        let signal = StopSignal::default();
        signal.request();
        let mut player =
            Player::new(ScriptedSource::ending_at(5), RecordingSink::default(), fast_config())
                .expect("valid config")
                .with_stop_signal(signal);
        let report = player.start().expect("playback succeeds");
        assert_eq!(report.frames_rendered, 0);
        assert_eq!(report.stop_reason, StopReason::Interrupted);
        let (source, _) = player.into_parts();
        assert!(source.fetched.is_empty());
        assert_eq!(source.cleanups, 1);
    }

    #[test]
    fn write_failure_still_drains() {
        let sink = RecordingSink {
            fail_writes: true,
            ..RecordingSink::default()
        };
        let (result, state, source, sink) = play(ScriptedSource::ending_at(5), sink, fast_config());
        let err = result.expect_err("broken sink fails playback");
        assert!(matches!(err, PlayerError::Terminal(_)));
        assert_eq!(source.fetched, vec![1]);
        assert_eq!(source.cleanups, 1);
        assert_eq!(sink.count(SinkEvent::ShowCursor), 1);
        assert_eq!(state, PlaybackState::Stopped);
    }

    #[test]
    fn player_cannot_start_twice() {
        let mut player =
            Player::new(ScriptedSource::ending_at(1), RecordingSink::default(), fast_config())
                .expect("valid config");
        player.start().expect("first run");
        let err = player.start().expect_err("second run is rejected");
        assert!(matches!(
            err,
            PlayerError::AlreadyStarted(PlaybackState::Stopped)
        ));
        let (source, _) = player.into_parts();
        assert_eq!(source.cleanups, 1);
    }

    #[test]
    fn invalid_config_is_rejected_before_playback() {
        let config = PlaybackConfig {
            fps: 0.0,
            ..fast_config()
        };
        let result = Player::new(ScriptedSource::ending_at(2), RecordingSink::default(), config);
        assert!(matches!(result, Err(PlayerError::InvalidConfig(_))));
    }

    #[test]
    fn oversized_grid_is_rejected_before_playback() {
        let config = PlaybackConfig {
            width: usize::MAX / 4,
            height: 8,
            fps: 10.0,
            color: false,
        };
        let result = Player::new(ScriptedSource::ending_at(2), RecordingSink::default(), config);
        assert!(matches!(result, Err(PlayerError::InvalidConfig(_))));
    }

    #[test]
    fn pacing_holds_each_frame_for_the_interval() {
        let config = PlaybackConfig {
            fps: 10.0,
            ..fast_config()
        };
        let started = Instant::now();
        let (result, _, _, sink) = play(ScriptedSource::ending_at(4), RecordingSink::default(), config);
        let total = started.elapsed();
        assert_eq!(result.expect("playback succeeds").frames_rendered, 3);

        let writes = sink.write_instants();
        // three frames plus the completion message
        assert_eq!(writes.len(), 4);
        for pair in writes[..3].windows(2) {
            let gap = pair[1].duration_since(pair[0]);
            assert!(gap >= Duration::from_millis(95), "gap {gap:?} shorter than interval");
        }
        assert!(total >= Duration::from_millis(300), "total {total:?}");
        assert!(total < Duration::from_millis(600), "total {total:?}");
    }
}
