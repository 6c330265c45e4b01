//! The run sequence: read, switch, chord, wait, chord, restore.
//!
//! `run()` drives the fixed step order against the platform traits:
//! read the original source, switch when it differs from the target, send
//! the start chord, optionally wait and send the stop chord, restore. Any
//! step error aborts the run; later steps are not attempted.
//!
//! The active input source is OS-wide state that outlives the process, so
//! restoration is owned by a scoped guard armed the moment the switch
//! lands: a failure in any later step still puts the original source back
//! before the error propagates. A zero restore delay never arms the guard;
//! leaving the target source active is then the requested behavior.

use std::thread;
use std::time::Duration;

use crate::cli::RunOptions;
use crate::error::TriggerError;
use crate::platform::{InputSources, KeyInjector};

// ---------------------------------------------------------------------------
// Timed waits
// ---------------------------------------------------------------------------

/// The blocking waits between steps, behind a seam so tests can observe
/// them instead of serving them.
pub trait Sleep {
    fn sleep(&self, duration: Duration);
}

/// Blocks the single thread. The only implementation outside of tests.
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

// ---------------------------------------------------------------------------
// Restore guard
// ---------------------------------------------------------------------------

/// Scoped ownership of the "switched away from the user's source" state.
///
/// Armed after a successful switch (when restoration is wanted at all).
/// The happy path restores through `restore()` so a failure surfaces as a
/// typed error; every other exit path restores best-effort on drop.
struct RestoreGuard<'a> {
    sources: &'a dyn InputSources,
    original: &'a str,
    armed: bool,
}

impl<'a> RestoreGuard<'a> {
    fn new(sources: &'a dyn InputSources, original: &'a str) -> Self {
        Self {
            sources,
            original,
            armed: false,
        }
    }

    fn arm(&mut self) {
        self.armed = true;
    }

    /// Switches back to the original source. No-op when never armed.
    fn restore(&mut self) -> Result<(), TriggerError> {
        if !self.armed {
            return Ok(());
        }
        self.armed = false;
        log::debug!("restoring input source {}", self.original);
        self.sources.select(self.original).map_err(TriggerError::from)
    }
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            log::debug!("restoring input source {} after failure", self.original);
            if let Err(err) = self.sources.select(self.original) {
                log::warn!("could not restore input source {}: {err}", self.original);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Run sequence
// ---------------------------------------------------------------------------

/// Executes one full trigger run.
pub fn run(
    opts: &RunOptions,
    sources: &dyn InputSources,
    injector: &dyn KeyInjector,
    sleep: &dyn Sleep,
) -> Result<(), TriggerError> {
    // Nothing has been mutated yet, so a missing id aborts cleanly. The
    // message is deliberately distinct from key-resolution errors.
    let original = sources.current().ok_or_else(|| {
        TriggerError::InvalidArgument(
            "could not read the current input source; grant this terminal Accessibility \
             permission in System Settings > Privacy & Security > Accessibility"
                .into(),
        )
    })?;

    log::debug!("current input source: {original}");
    log::debug!("target input source: {}", opts.target_id);

    let mut restore = RestoreGuard::new(sources, &original);

    if original != opts.target_id {
        log::debug!("switching to {}", opts.target_id);
        sources.select(&opts.target_id)?;
        // Restoration responsibility begins here, unless a zero restore
        // delay asked for the target to stay active.
        if opts.restore_delay > Duration::ZERO {
            restore.arm();
        }
        sleep.sleep(opts.switch_delay);
    }

    log::debug!("sending start chord");
    injector.send(&opts.start)?;

    if opts.restore_delay > Duration::ZERO {
        log::debug!("waiting {:?} before restoring", opts.restore_delay);
        sleep.sleep(opts.restore_delay);
        if let Some(stop) = &opts.stop {
            log::debug!("sending stop chord");
            injector.send(stop)?;
        }
        restore.restore()?;
    } else {
        log::debug!("restore delay is zero; leaving {} active", opts.target_id);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use crate::cli::{self, Command, DEFAULT_TARGET_ID};
    use crate::keys::{self, Hotkey, KeyCode};
    use crate::platform::PlatformError;

    /// One observable side effect, in global order across all mocks.
    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Select(String),
        Send(KeyCode, u64, Duration),
        Sleep(Duration),
    }

    type CallLog = Rc<RefCell<Vec<Call>>>;

    struct MockSources {
        current: Option<String>,
        /// Selecting this id fails with `SourceNotFound`.
        fail_select_id: Option<String>,
        log: CallLog,
    }

    impl InputSources for MockSources {
        fn current(&self) -> Option<String> {
            self.current.clone()
        }

        fn list(&self) -> Result<Vec<String>, PlatformError> {
            Ok(Vec::new())
        }

        fn select(&self, id: &str) -> Result<(), PlatformError> {
            self.log.borrow_mut().push(Call::Select(id.to_string()));
            if self.fail_select_id.as_deref() == Some(id) {
                return Err(PlatformError::SourceNotFound(id.to_string()));
            }
            Ok(())
        }
    }

    struct MockInjector {
        /// Zero-based index of the send that fails, if any.
        fail_on: Option<usize>,
        sends: Cell<usize>,
        log: CallLog,
    }

    impl KeyInjector for MockInjector {
        fn send(&self, hotkey: &Hotkey) -> Result<(), PlatformError> {
            let index = self.sends.get();
            self.sends.set(index + 1);
            self.log.borrow_mut().push(Call::Send(
                hotkey.key_code,
                hotkey.modifiers.flags(),
                hotkey.hold,
            ));
            if self.fail_on == Some(index) {
                return Err(PlatformError::Other("injection failed".into()));
            }
            Ok(())
        }
    }

    struct MockSleep {
        log: CallLog,
    }

    impl Sleep for MockSleep {
        fn sleep(&self, duration: Duration) {
            self.log.borrow_mut().push(Call::Sleep(duration));
        }
    }

    struct Harness {
        log: CallLog,
        sources: MockSources,
        injector: MockInjector,
        sleep: MockSleep,
    }

    impl Harness {
        fn new(current: &str) -> Self {
            let log: CallLog = Rc::new(RefCell::new(Vec::new()));
            Harness {
                sources: MockSources {
                    current: Some(current.to_string()),
                    fail_select_id: None,
                    log: Rc::clone(&log),
                },
                injector: MockInjector {
                    fail_on: None,
                    sends: Cell::new(0),
                    log: Rc::clone(&log),
                },
                sleep: MockSleep {
                    log: Rc::clone(&log),
                },
                log,
            }
        }

        fn run(&self, opts: &RunOptions) -> Result<(), TriggerError> {
            run(opts, &self.sources, &self.injector, &self.sleep)
        }

        fn calls(&self) -> Vec<Call> {
            self.log.borrow().clone()
        }
    }

    fn options(tokens: &[&str]) -> RunOptions {
        let args: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        match cli::parse(&args).unwrap() {
            Command::Run(opts) => opts,
            other => panic!("expected Run, got {other:?}"),
        }
    }

    #[test]
    fn matching_source_skips_switch_and_switch_delay() {
        let harness = Harness::new("target.source");
        let opts = options(&[
            "--target-id",
            "target.source",
            "--start-key",
            "a",
            "--modifiers",
            "command",
        ]);

        harness.run(&opts).unwrap();

        let calls = harness.calls();
        assert!(!calls.iter().any(|c| matches!(c, Call::Select(_))));
        // The only sleep is the restore wait; the switch delay never runs.
        assert_eq!(
            calls,
            vec![
                Call::Send(0x00, opts.start.modifiers.flags(), opts.start.hold),
                Call::Sleep(opts.restore_delay),
            ]
        );
    }

    #[test]
    fn differing_source_switches_then_waits() {
        let harness = Harness::new("original.source");
        let opts = options(&["--start-key", "a", "--modifiers", "command"]);

        harness.run(&opts).unwrap();

        let calls = harness.calls();
        assert_eq!(calls[0], Call::Select(DEFAULT_TARGET_ID.to_string()));
        assert_eq!(calls[1], Call::Sleep(opts.switch_delay));
        assert_eq!(*calls.last().unwrap(), Call::Select("original.source".to_string()));
    }

    #[test]
    fn zero_restore_delay_leaves_target_active() {
        let harness = Harness::new("original.source");
        let opts = options(&[
            "--start-key",
            "a",
            "--modifiers",
            "command",
            "--restore-delay",
            "0",
            "--stop-key",
            "a",
        ]);

        harness.run(&opts).unwrap();

        // Switch, switch delay, start chord. No stop chord, no restore.
        let calls = harness.calls();
        assert_eq!(
            calls,
            vec![
                Call::Select(DEFAULT_TARGET_ID.to_string()),
                Call::Sleep(opts.switch_delay),
                Call::Send(0x00, opts.start.modifiers.flags(), opts.start.hold),
            ]
        );
    }

    #[test]
    fn stop_chord_and_restore_run_in_order() {
        let harness = Harness::new("original.source");
        let opts = options(&[
            "--start-key",
            "a",
            "--modifiers",
            "command",
            "--stop-key",
            "s",
            "--stop-modifiers",
            "shift",
        ]);

        harness.run(&opts).unwrap();

        let stop = opts.stop.as_ref().unwrap();
        assert_eq!(
            harness.calls(),
            vec![
                Call::Select(DEFAULT_TARGET_ID.to_string()),
                Call::Sleep(opts.switch_delay),
                Call::Send(opts.start.key_code, opts.start.modifiers.flags(), opts.start.hold),
                Call::Sleep(opts.restore_delay),
                Call::Send(stop.key_code, stop.modifiers.flags(), stop.hold),
                Call::Select("original.source".to_string()),
            ]
        );
    }

    #[test]
    fn end_to_end_sequence_with_default_target() {
        let harness = Harness::new("com.apple.keylayout.US");
        let opts = options(&[
            "--start-key",
            "a",
            "--modifiers",
            "command,option",
            "--restore-delay",
            "1",
            "--stop-key",
            "a",
            "--stop-modifiers",
            "command,option",
        ]);

        harness.run(&opts).unwrap();

        let cmd_opt = keys::resolve_modifiers("command,option").unwrap().flags();
        let hold = Duration::from_secs_f64(0.08);
        assert_eq!(
            harness.calls(),
            vec![
                Call::Select(DEFAULT_TARGET_ID.to_string()),
                Call::Sleep(Duration::from_secs_f64(0.3)),
                Call::Send(0x00, cmd_opt, hold),
                Call::Sleep(Duration::from_secs_f64(1.0)),
                Call::Send(0x00, cmd_opt, hold),
                Call::Select("com.apple.keylayout.US".to_string()),
            ]
        );
    }

    #[test]
    fn missing_current_source_aborts_before_any_mutation() {
        let mut harness = Harness::new("unused");
        harness.sources.current = None;
        let opts = options(&["--start-key", "a", "--modifiers", "command"]);

        let err = harness.run(&opts).unwrap_err();

        assert_eq!(err.exit_code(), 1);
        // Distinguishable from key-resolution InvalidArgument messages.
        assert!(err.to_string().contains("Accessibility"));
        assert!(harness.calls().is_empty());
    }

    #[test]
    fn failed_target_select_sends_nothing_and_exits_2() {
        let mut harness = Harness::new("original.source");
        harness.sources.fail_select_id = Some(DEFAULT_TARGET_ID.to_string());
        let opts = options(&["--start-key", "a", "--modifiers", "command"]);

        let err = harness.run(&opts).unwrap_err();

        assert_eq!(err.exit_code(), 2);
        assert!(!harness.calls().iter().any(|c| matches!(c, Call::Send(..))));
        // Nothing was switched, so nothing is restored.
        assert_eq!(
            harness.calls(),
            vec![Call::Select(DEFAULT_TARGET_ID.to_string())]
        );
    }

    #[test]
    fn failed_start_send_still_restores_the_original_source() {
        let mut harness = Harness::new("original.source");
        harness.injector.fail_on = Some(0);
        let opts = options(&["--start-key", "a", "--modifiers", "command"]);

        let err = harness.run(&opts).unwrap_err();

        assert_eq!(err.exit_code(), 99);
        assert_eq!(
            *harness.calls().last().unwrap(),
            Call::Select("original.source".to_string())
        );
    }

    #[test]
    fn failed_stop_send_still_restores_the_original_source() {
        let mut harness = Harness::new("original.source");
        harness.injector.fail_on = Some(1);
        let opts = options(&[
            "--start-key",
            "a",
            "--modifiers",
            "command",
            "--stop-key",
            "a",
        ]);

        let err = harness.run(&opts).unwrap_err();

        assert_eq!(err.exit_code(), 99);
        assert_eq!(
            *harness.calls().last().unwrap(),
            Call::Select("original.source".to_string())
        );
    }

    #[test]
    fn failed_start_send_without_switch_restores_nothing() {
        let mut harness = Harness::new("target.source");
        harness.injector.fail_on = Some(0);
        let opts = options(&[
            "--target-id",
            "target.source",
            "--start-key",
            "a",
            "--modifiers",
            "command",
        ]);

        harness.run(&opts).unwrap_err();

        assert!(!harness.calls().iter().any(|c| matches!(c, Call::Select(_))));
    }

    #[test]
    fn restore_failure_surfaces_as_source_error() {
        let mut harness = Harness::new("original.source");
        harness.sources.fail_select_id = Some("original.source".to_string());
        let opts = options(&["--start-key", "a", "--modifiers", "command"]);

        let err = harness.run(&opts).unwrap_err();

        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("original.source"));
    }
}
