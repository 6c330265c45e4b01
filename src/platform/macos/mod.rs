//! macOS platform backend.
//!
//! Input sources: Text Input Source Services (Carbon/HIToolbox) via
//! `MacOSInputSources`. Injection: CGEventPost (synchronous) via
//! `MacOSInjector`.
//!
//! Event posting requires Accessibility permission. The injector fails with
//! `PlatformError::PermissionDenied` when the event source cannot be
//! created. Guide the user to:
//!   System Settings > Privacy & Security > Accessibility

mod injector;
mod input_source;

use injector::MacOSInjector;
use input_source::MacOSInputSources;

use crate::platform::{InputSources, KeyInjector, PlatformError};

// ---------------------------------------------------------------------------
// Factory: input sources
// ---------------------------------------------------------------------------

/// Returns the Text Input Source Services controller.
pub fn create_input_sources() -> Result<Box<dyn InputSources>, PlatformError> {
    Ok(Box::new(MacOSInputSources::new()))
}

// ---------------------------------------------------------------------------
// Factory: key injector
// ---------------------------------------------------------------------------

/// Returns the CGEventPost-based chord injector.
pub fn create_key_injector() -> Result<Box<dyn KeyInjector>, PlatformError> {
    Ok(Box::new(MacOSInjector::new()))
}
