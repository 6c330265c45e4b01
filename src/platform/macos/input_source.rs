//! Input source control via Text Input Source Services.
//!
//! `MacOSInputSources` implements `InputSources` on top of the Carbon
//! HIToolbox TIS API. All calls are synchronous and run on the calling
//! thread.
//!
//! Memory ownership follows the Core Foundation naming rules:
//! `TISCopyCurrentKeyboardInputSource` and `TISCreateInputSourceList`
//! transfer ownership (released here); `TISGetInputSourceProperty` does not
//! (the string is owned by the source and is only read).

use std::ffi::c_void;
use std::os::raw::c_char;
use std::ptr;

use crate::platform::{InputSources, PlatformError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// kCFStringEncodingUTF8.
const CF_STRING_ENCODING_UTF8: u32 = 0x0800_0100;

/// Upper bound for an input source identifier in UTF-8 bytes. Identifiers
/// are reverse-DNS strings ("com.apple.keylayout.US"); 256 is generous.
const SOURCE_ID_BUF_LEN: usize = 256;

// ---------------------------------------------------------------------------
// Raw FFI
// ---------------------------------------------------------------------------

type CFIndex = isize;
type CFStringRef = *const c_void;
type CFArrayRef = *const c_void;
type CFDictionaryRef = *const c_void;
type TISInputSourceRef = *mut c_void;
type OSStatus = i32;

#[link(name = "Carbon", kind = "framework")]
extern "C" {
    /// Returns the keyboard input source currently selected (copy rule).
    fn TISCopyCurrentKeyboardInputSource() -> TISInputSourceRef;

    /// Reads a property of an input source (get rule); null when unset.
    fn TISGetInputSourceProperty(source: TISInputSourceRef, key: CFStringRef) -> *const c_void;

    /// Returns the installed input sources matching the property filter
    /// (copy rule). A null filter matches every source.
    fn TISCreateInputSourceList(
        properties: CFDictionaryRef,
        include_all_installed: u8,
    ) -> CFArrayRef;

    /// Makes the given source the active one; non-zero status on failure.
    fn TISSelectInputSource(source: TISInputSourceRef) -> OSStatus;

    /// Property key for the reverse-DNS input source identifier.
    static kTISPropertyInputSourceID: CFStringRef;
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    /// Copies a CFString's contents into a C buffer; false when it does
    /// not fit.
    fn CFStringGetCString(
        string: CFStringRef,
        buffer: *mut c_char,
        buffer_size: CFIndex,
        encoding: u32,
    ) -> u8;

    /// Number of values in a CFArray.
    fn CFArrayGetCount(array: CFArrayRef) -> CFIndex;

    /// Value at an index of a CFArray (get rule).
    fn CFArrayGetValueAtIndex(array: CFArrayRef, idx: CFIndex) -> *const c_void;

    /// Releases a Core Foundation object.
    fn CFRelease(cf: *const c_void);
}

// ---------------------------------------------------------------------------
// CFString helpers
// ---------------------------------------------------------------------------

/// Copies a CFString into an owned Rust string.
///
/// Returns `None` for a null ref or contents that do not fit the fixed
/// buffer (no real identifier comes close to the limit).
unsafe fn cfstring_to_string(string: CFStringRef) -> Option<String> {
    if string.is_null() {
        return None;
    }
    let mut buf = [0 as c_char; SOURCE_ID_BUF_LEN];
    let ok = CFStringGetCString(
        string,
        buf.as_mut_ptr(),
        SOURCE_ID_BUF_LEN as CFIndex,
        CF_STRING_ENCODING_UTF8,
    );
    if ok == 0 {
        return None;
    }
    Some(
        std::ffi::CStr::from_ptr(buf.as_ptr())
            .to_string_lossy()
            .into_owned(),
    )
}

/// Reads the identifier property of an input source.
unsafe fn source_id(source: TISInputSourceRef) -> Option<String> {
    let value = TISGetInputSourceProperty(source, kTISPropertyInputSourceID);
    cfstring_to_string(value)
}

// ---------------------------------------------------------------------------
// Public struct
// ---------------------------------------------------------------------------

/// Controls the active keyboard input source via TIS.
///
/// Stateless: every call re-queries the OS, which is the authority on what
/// is installed and what is active.
pub struct MacOSInputSources;

impl MacOSInputSources {
    pub fn new() -> Self {
        MacOSInputSources
    }
}

// ---------------------------------------------------------------------------
// InputSources trait impl
// ---------------------------------------------------------------------------

impl InputSources for MacOSInputSources {
    fn current(&self) -> Option<String> {
        unsafe {
            let source = TISCopyCurrentKeyboardInputSource();
            if source.is_null() {
                return None;
            }
            let id = source_id(source);
            CFRelease(source.cast_const());
            id
        }
    }

    fn list(&self) -> Result<Vec<String>, PlatformError> {
        unsafe {
            // Null filter + include-all: every installed source, enabled
            // or not, so users can discover ids before enabling them.
            let array = TISCreateInputSourceList(ptr::null(), 1);
            if array.is_null() {
                return Err(PlatformError::Other(
                    "TISCreateInputSourceList returned null".into(),
                ));
            }
            let count = CFArrayGetCount(array);
            let mut ids = Vec::with_capacity(count as usize);
            for idx in 0..count {
                let source = CFArrayGetValueAtIndex(array, idx) as TISInputSourceRef;
                if let Some(id) = source_id(source) {
                    ids.push(id);
                }
            }
            CFRelease(array);
            Ok(ids)
        }
    }

    fn select(&self, id: &str) -> Result<(), PlatformError> {
        unsafe {
            let array = TISCreateInputSourceList(ptr::null(), 1);
            if array.is_null() {
                return Err(PlatformError::SourceNotFound(id.to_string()));
            }
            let count = CFArrayGetCount(array);
            for idx in 0..count {
                let source = CFArrayGetValueAtIndex(array, idx) as TISInputSourceRef;
                if source_id(source).as_deref() != Some(id) {
                    continue;
                }
                let status = TISSelectInputSource(source);
                CFRelease(array);
                return if status == 0 {
                    log::debug!("input source: selected {id}");
                    Ok(())
                } else {
                    Err(PlatformError::SelectFailed {
                        id: id.to_string(),
                        status,
                    })
                };
            }
            CFRelease(array);
            Err(PlatformError::SourceNotFound(id.to_string()))
        }
    }
}
