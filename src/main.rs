//! voxtrigger -- one-shot voice dictation trigger.
//!
//! Switches the active keyboard input source to a target (an IME with a
//! voice mode), synthesizes the hotkey chord that starts dictation, waits,
//! optionally synthesizes the stop chord, and restores the original source.
//! Entry point and error boundary; everything else lives in the modules.

mod cli;
mod error;
mod keys;
// Each target builds only its own backend, so some error variants exist
// solely for the other configuration.
#[allow(dead_code)]
mod platform;
mod trigger;

use std::env;
use std::process;

use cli::Command;
use error::TriggerError;
use trigger::ThreadSleep;

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    let command = match cli::parse(&args) {
        Ok(command) => command,
        Err(err) => fail(err),
    };

    match command {
        Command::Help => print!("{}", cli::USAGE),
        Command::Version => println!("voxtrigger v{}", env!("CARGO_PKG_VERSION")),
        Command::ListSources => {
            init_logger(false);
            if let Err(err) = list_sources() {
                fail(err);
            }
        }
        Command::Run(opts) => {
            init_logger(opts.debug);
            if let Err(err) = run(&opts) {
                fail(err);
            }
        }
    }
}

/// Builds the platform backends and drives the run sequence.
fn run(opts: &cli::RunOptions) -> Result<(), TriggerError> {
    let sources = platform::create_input_sources()?;
    let injector = platform::create_key_injector()?;
    trigger::run(opts, sources.as_ref(), injector.as_ref(), &ThreadSleep)
}

/// Prints one installed input source identifier per line.
fn list_sources() -> Result<(), TriggerError> {
    let sources = platform::create_input_sources()?;
    for id in sources.list()? {
        println!("{id}");
    }
    Ok(())
}

/// Logger backend: writes to stderr. `--debug` raises the filter to debug;
/// otherwise only warnings surface. No environment variables are consulted.
fn init_logger(debug: bool) {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

/// Single translation point: error variant -> stderr message (+ remediation
/// hint) -> process exit code. Argument errors also reprint the usage text.
fn fail(err: TriggerError) -> ! {
    eprintln!("error: {err}");
    if let Some(hint) = err.remediation() {
        eprintln!("{hint}");
    }
    if matches!(
        err,
        TriggerError::InvalidArgument(_) | TriggerError::MissingArgument(_)
    ) {
        eprint!("\n{}", cli::USAGE);
    }
    process::exit(err.exit_code());
}
