//! Chord injection via CGEventPost.
//!
//! `MacOSInjector` implements `KeyInjector`. Injection is synchronous:
//! key-down is posted, the calling thread blocks for the hold duration,
//! then the matching key-up is posted. Both events carry the same virtual
//! key and modifier flags; only the down/up transition differs.

use std::ffi::c_void;
use std::thread;

use crate::keys::Hotkey;
use crate::platform::{KeyInjector, PlatformError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// kCGHIDEventTap -- post at the HID level, upstream of event dispatch, so
/// the chord reaches the frontmost application like a physical key press.
const CG_HID_EVENT_TAP: u32 = 0;

/// kCGEventSourceStateCombinedSessionState = 0 -- the per-session event
/// state combined with hardware state. Creating this source is the call
/// that fails when Accessibility permission is missing.
const CG_EVENT_SOURCE_STATE_COMBINED_SESSION_STATE: i32 = 0;

// ---------------------------------------------------------------------------
// Raw FFI
// ---------------------------------------------------------------------------

type CGEventRef = *mut c_void;
type CGEventSourceRef = *mut c_void;

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn CGEventSourceCreate(state_id: i32) -> CGEventSourceRef;
    fn CGEventCreateKeyboardEvent(
        source: CGEventSourceRef,
        virtual_key: u16,
        key_down: bool,
    ) -> CGEventRef;
    fn CGEventSetFlags(event: CGEventRef, flags: u64);
    fn CGEventPost(tap_location: u32, event: CGEventRef);
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFRelease(cf: *const c_void);
}

// ---------------------------------------------------------------------------
// Public struct
// ---------------------------------------------------------------------------

/// Injects hotkey chords via CGEventPost on macOS.
///
/// Stateless: each `send()` call creates an event source, posts the pair,
/// and releases everything before returning.
pub struct MacOSInjector;

impl MacOSInjector {
    pub fn new() -> Self {
        MacOSInjector
    }
}

// ---------------------------------------------------------------------------
// KeyInjector trait impl
// ---------------------------------------------------------------------------

impl KeyInjector for MacOSInjector {
    fn send(&self, hotkey: &Hotkey) -> Result<(), PlatformError> {
        unsafe {
            let source = CGEventSourceCreate(CG_EVENT_SOURCE_STATE_COMBINED_SESSION_STATE);
            if source.is_null() {
                return Err(PlatformError::PermissionDenied(
                    "could not create a CGEventSource; grant this terminal Accessibility \
                     permission in System Settings > Privacy & Security > Accessibility"
                        .into(),
                ));
            }

            let down = CGEventCreateKeyboardEvent(source, hotkey.key_code, true);
            if down.is_null() {
                CFRelease(source.cast_const());
                return Err(PlatformError::Other(
                    "CGEventCreateKeyboardEvent returned null for key-down".into(),
                ));
            }
            CGEventSetFlags(down, hotkey.modifiers.flags());
            CGEventPost(CG_HID_EVENT_TAP, down);
            CFRelease(down.cast_const());

            thread::sleep(hotkey.hold);

            let up = CGEventCreateKeyboardEvent(source, hotkey.key_code, false);
            if up.is_null() {
                CFRelease(source.cast_const());
                return Err(PlatformError::Other(
                    "CGEventCreateKeyboardEvent returned null for key-up".into(),
                ));
            }
            CGEventSetFlags(up, hotkey.modifiers.flags());
            CGEventPost(CG_HID_EVENT_TAP, up);
            CFRelease(up.cast_const());

            CFRelease(source.cast_const());
        }

        log::debug!(
            "injector: sent chord key={:#04x} flags={:#x} hold={:?}",
            hotkey.key_code,
            hotkey.modifiers.flags(),
            hotkey.hold
        );

        Ok(())
    }
}
