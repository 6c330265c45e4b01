//! Platform abstraction layer.
//!
//! Defines the `InputSources` and `KeyInjector` traits plus the factory
//! functions that pick the backend for the current OS. The only real
//! backend is macOS (Text Input Source Services + CGEvent posting); on
//! other platforms the factories compile but return `Unavailable`, so the
//! crate builds everywhere and the pure logic stays testable.

use thiserror::Error;

use crate::keys::Hotkey;

#[cfg(target_os = "macos")]
mod macos;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures surfaced by the OS backends.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The process lacks the input-injection/accessibility capability.
    /// The message includes where to grant it.
    #[error("{0}")]
    PermissionDenied(String),

    /// No installed input source matches the identifier.
    #[error("no input source matches \"{0}\"")]
    SourceNotFound(String),

    /// The source exists but the OS switch call reported a non-success
    /// status.
    #[error("could not select input source \"{id}\" (OSStatus {status})")]
    SelectFailed { id: String, status: i32 },

    /// This OS has no backend.
    #[error("{0}")]
    Unavailable(String),

    /// Any other structural failure in an OS call.
    #[error("{0}")]
    Other(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Read and change the system-wide active keyboard input source.
///
/// `select` mutates shared OS state that persists beyond process exit, so
/// every caller that switches away from the user's source owns the job of
/// switching back (see the restore guard in `trigger`).
pub trait InputSources {
    /// Identifier of the currently active input source, or `None` when the
    /// OS cannot report one (typically a missing permission).
    fn current(&self) -> Option<String>;

    /// Identifiers of all installed input sources.
    fn list(&self) -> Result<Vec<String>, PlatformError>;

    /// Makes the source matching `id` exactly the active one.
    fn select(&self, id: &str) -> Result<(), PlatformError>;
}

/// Posts one synthetic chord into the OS input event stream.
pub trait KeyInjector {
    /// Posts key-down, blocks for the chord's hold duration, posts the
    /// matching key-up. Both events carry identical key code and modifier
    /// flags.
    fn send(&self, hotkey: &Hotkey) -> Result<(), PlatformError>;
}

// ---------------------------------------------------------------------------
// Factory: input sources
// ---------------------------------------------------------------------------

/// Returns the input source controller for this OS.
#[cfg(target_os = "macos")]
pub fn create_input_sources() -> Result<Box<dyn InputSources>, PlatformError> {
    macos::create_input_sources()
}

/// Input source control requires macOS Text Input Source Services.
#[cfg(not(target_os = "macos"))]
pub fn create_input_sources() -> Result<Box<dyn InputSources>, PlatformError> {
    Err(PlatformError::Unavailable(
        "input source control is only available on macOS".into(),
    ))
}

// ---------------------------------------------------------------------------
// Factory: key injector
// ---------------------------------------------------------------------------

/// Returns the hotkey injector for this OS.
#[cfg(target_os = "macos")]
pub fn create_key_injector() -> Result<Box<dyn KeyInjector>, PlatformError> {
    macos::create_key_injector()
}

/// Hotkey synthesis requires the macOS CGEvent APIs.
#[cfg(not(target_os = "macos"))]
pub fn create_key_injector() -> Result<Box<dyn KeyInjector>, PlatformError> {
    Err(PlatformError::Unavailable(
        "hotkey synthesis is only available on macOS".into(),
    ))
}
