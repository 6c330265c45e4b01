//! Command-line option parsing.
//!
//! `parse` is a pure fold over the argument tokens: it performs no OS calls
//! and either yields a complete validated `Command` or the first error
//! encountered. `--help`, `--version`, and `--list-sources` short-circuit
//! every validation rule, so they work even with an otherwise broken
//! command line.

use std::slice::Iter;
use std::time::Duration;

use crate::error::TriggerError;
use crate::keys::{self, Hotkey, KeyCode, ModifierSet};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Input source switched to when `--target-id` is not given: the iFlytek
/// IME pinyin layout whose voice mode the stock hotkeys drive.
pub const DEFAULT_TARGET_ID: &str = "com.iflytek.inputmethod.iFlytekIME.pinyin";

const DEFAULT_HOLD_SECS: f64 = 0.08;
const DEFAULT_SWITCH_DELAY_SECS: f64 = 0.3;
const DEFAULT_RESTORE_DELAY_SECS: f64 = 2.0;

/// Usage text printed for `--help` and after argument errors.
pub const USAGE: &str = "\
Usage: voxtrigger --start-key <key> --modifiers <mods> [options]

Switches to the target keyboard input source, synthesizes the hotkey chord
that starts voice input, then restores the original source.

Options:
  --start-key <key>          Key of the start chord: a name (space, return,
                             esc, arrow keys, letters, digits, punctuation),
                             a decimal key code, or a 0x-prefixed hex code.
  --start-keycode <code>     Raw virtual key code for the start chord.
  --modifiers <list>         Comma-separated modifiers for the start chord
                             (command, option, control, shift, fn).
                             Required; pass \"none\" for no modifiers.
  --start-hold <seconds>     How long the start key is held (default 0.08).
  --target-id <id>           Input source to switch to (default
                             com.iflytek.inputmethod.iFlytekIME.pinyin).
  --switch-delay <seconds>   Pause after switching the input source, before
                             the start chord (default 0.3).
  --restore-delay <seconds>  Pause after the start chord before the stop
                             chord and restoration (default 2.0). 0 skips
                             both and leaves the target source active.
  --stop-key <key>           Key of the stop chord.
  --stop-keycode <code>      Raw virtual key code for the stop chord.
  --stop-modifiers <list>    Modifiers for the stop chord (default: same as
                             the start chord).
  --stop-hold <seconds>      How long the stop key is held (default 0.08).
  --list-sources             Print installed input source ids and exit.
  --debug                    Trace progress on stderr.
  --version                  Print the version and exit.
  --help, -h                 Show this help.
";

// ---------------------------------------------------------------------------
// Parsed command
// ---------------------------------------------------------------------------

/// What one invocation should do.
#[derive(Debug, PartialEq)]
pub enum Command {
    /// Run the switch-trigger-restore sequence.
    Run(RunOptions),
    /// Print usage and exit 0.
    Help,
    /// Print the version banner and exit 0.
    Version,
    /// Print installed input source identifiers and exit 0.
    ListSources,
}

/// Validated configuration for one run. Built once from argv, never
/// mutated afterwards.
#[derive(Debug, PartialEq)]
pub struct RunOptions {
    pub target_id: String,
    pub start: Hotkey,
    pub stop: Option<Hotkey>,
    pub switch_delay: Duration,
    pub restore_delay: Duration,
    pub debug: bool,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parses the argument tokens (without the program name).
pub fn parse(args: &[String]) -> Result<Command, TriggerError> {
    // The informational modes win anywhere in the stream, before any
    // validation, so a broken command line still gets help.
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        return Ok(Command::Help);
    }
    if args.iter().any(|arg| arg == "--version") {
        return Ok(Command::Version);
    }
    if args.iter().any(|arg| arg == "--list-sources") {
        return Ok(Command::ListSources);
    }

    let mut target_id = DEFAULT_TARGET_ID.to_string();
    let mut start_key: Option<KeyCode> = None;
    let mut start_modifiers: Option<ModifierSet> = None;
    let mut start_hold = Duration::from_secs_f64(DEFAULT_HOLD_SECS);
    let mut stop_key: Option<KeyCode> = None;
    let mut stop_modifiers: Option<ModifierSet> = None;
    let mut stop_hold = Duration::from_secs_f64(DEFAULT_HOLD_SECS);
    let mut switch_delay = Duration::from_secs_f64(DEFAULT_SWITCH_DELAY_SECS);
    let mut restore_delay = Duration::from_secs_f64(DEFAULT_RESTORE_DELAY_SECS);
    let mut debug = false;

    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--target-id" => target_id = next_value(flag, &mut iter)?.clone(),
            "--start-key" => start_key = Some(keys::resolve_key(next_value(flag, &mut iter)?)?),
            "--start-keycode" => {
                start_key = Some(parse_keycode(flag, next_value(flag, &mut iter)?)?);
            }
            "--modifiers" => {
                start_modifiers = Some(keys::resolve_modifiers(next_value(flag, &mut iter)?)?);
            }
            "--start-hold" => start_hold = parse_seconds(flag, next_value(flag, &mut iter)?)?,
            "--switch-delay" => switch_delay = parse_seconds(flag, next_value(flag, &mut iter)?)?,
            "--restore-delay" => {
                restore_delay = parse_seconds(flag, next_value(flag, &mut iter)?)?;
            }
            "--stop-key" => stop_key = Some(keys::resolve_key(next_value(flag, &mut iter)?)?),
            "--stop-keycode" => {
                stop_key = Some(parse_keycode(flag, next_value(flag, &mut iter)?)?);
            }
            "--stop-modifiers" => {
                stop_modifiers = Some(keys::resolve_modifiers(next_value(flag, &mut iter)?)?);
            }
            "--stop-hold" => stop_hold = parse_seconds(flag, next_value(flag, &mut iter)?)?,
            "--debug" => debug = true,
            other => {
                return Err(TriggerError::InvalidArgument(format!(
                    "unknown flag: {other}"
                )));
            }
        }
    }

    let Some(start_code) = start_key else {
        return Err(TriggerError::MissingArgument(
            "--start-key or --start-keycode must be given".into(),
        ));
    };
    let Some(start_mods) = start_modifiers else {
        return Err(TriggerError::MissingArgument(
            "--modifiers must be given (pass \"none\" if the chord has no modifiers)".into(),
        ));
    };

    let stop = match (stop_key, stop_modifiers) {
        (Some(code), mods) => Some(Hotkey {
            key_code: code,
            modifiers: mods.unwrap_or(start_mods),
            hold: stop_hold,
        }),
        (None, Some(_)) => {
            return Err(TriggerError::InvalidArgument(
                "--stop-modifiers was given without --stop-key or --stop-keycode".into(),
            ));
        }
        (None, None) => None,
    };

    Ok(Command::Run(RunOptions {
        target_id,
        start: Hotkey {
            key_code: start_code,
            modifiers: start_mods,
            hold: start_hold,
        },
        stop,
        switch_delay,
        restore_delay,
        debug,
    }))
}

/// Consumes the value token following a flag.
fn next_value<'a>(flag: &str, iter: &mut Iter<'a, String>) -> Result<&'a String, TriggerError> {
    iter.next()
        .ok_or_else(|| TriggerError::MissingArgument(format!("{flag} requires a value")))
}

/// Parses a raw virtual key code given as a decimal integer.
fn parse_keycode(flag: &str, raw: &str) -> Result<KeyCode, TriggerError> {
    raw.trim().parse::<KeyCode>().map_err(|_| {
        TriggerError::InvalidArgument(format!("{flag} expects an integer key code, got \"{raw}\""))
    })
}

/// Parses a duration given as fractional seconds.
///
/// Rejects negatives and non-finite values up front; `Duration` cannot
/// represent them and the run would otherwise panic mid-flight.
fn parse_seconds(flag: &str, raw: &str) -> Result<Duration, TriggerError> {
    let seconds: f64 = raw.trim().parse().map_err(|_| {
        TriggerError::InvalidArgument(format!("{flag} expects a number of seconds, got \"{raw}\""))
    })?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(TriggerError::InvalidArgument(format!(
            "{flag} expects a non-negative number of seconds, got \"{raw}\""
        )));
    }
    Ok(Duration::from_secs_f64(seconds))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
