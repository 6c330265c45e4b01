//! Error taxonomy and process exit-code mapping.
//!
//! Every fallible operation in the tool returns a typed error from the
//! closed set below. `main` is the single translation point: variant ->
//! stderr message (+ remediation hint) -> exit code. Nothing is retried;
//! the first error aborts the run.

use thiserror::Error;

use crate::platform::PlatformError;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Top-level error for the whole run, parse time and execution alike.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// Malformed or unrecognized input at parse time, or an OS call that
    /// structurally failed (no event source, permission missing).
    #[error("{0}")]
    InvalidArgument(String),

    /// A required flag or its value was absent.
    #[error("{0}")]
    MissingArgument(String),

    /// No installed input source matches the identifier, or the OS refused
    /// to select it. The payload names the source (and the OSStatus when
    /// the switch call itself failed).
    #[error("input source not found or not selectable: {0}")]
    InputSourceNotFound(String),

    /// Any other runtime failure.
    #[error("{0}")]
    Runtime(String),
}

impl TriggerError {
    /// Process exit code for this error.
    ///
    /// | code | meaning                                      |
    /// |------|----------------------------------------------|
    /// | 1    | argument error (invalid or missing)          |
    /// | 2    | input source not found / not selectable      |
    /// | 99   | any other runtime failure                    |
    pub fn exit_code(&self) -> i32 {
        match self {
            TriggerError::InvalidArgument(_) | TriggerError::MissingArgument(_) => 1,
            TriggerError::InputSourceNotFound(_) => 2,
            TriggerError::Runtime(_) => 99,
        }
    }

    /// One-line remediation hint printed under the error message, when the
    /// failure has a known manual fix.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            TriggerError::InputSourceNotFound(_) => Some(
                "Enable the input method in System Settings > Keyboard > Input Sources.",
            ),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Platform error conversion
// ---------------------------------------------------------------------------

impl From<PlatformError> for TriggerError {
    /// Folds backend failures into the run-level taxonomy.
    ///
    /// Permission problems surface as argument-class errors (exit 1) with
    /// the remediation text already embedded by the backend; lookup and
    /// select failures keep their own variant so they map to exit 2.
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::PermissionDenied(message) => TriggerError::InvalidArgument(message),
            PlatformError::SourceNotFound(id) => TriggerError::InputSourceNotFound(id),
            PlatformError::SelectFailed { id, status } => {
                TriggerError::InputSourceNotFound(format!("{id} (OSStatus {status})"))
            }
            PlatformError::Unavailable(message) | PlatformError::Other(message) => {
                TriggerError::Runtime(message)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_errors_exit_1() {
        assert_eq!(TriggerError::InvalidArgument("x".into()).exit_code(), 1);
        assert_eq!(TriggerError::MissingArgument("x".into()).exit_code(), 1);
    }

    #[test]
    fn source_not_found_exits_2() {
        assert_eq!(TriggerError::InputSourceNotFound("x".into()).exit_code(), 2);
    }

    #[test]
    fn runtime_failures_exit_99() {
        assert_eq!(TriggerError::Runtime("x".into()).exit_code(), 99);
    }

    #[test]
    fn permission_denied_becomes_invalid_argument() {
        let err: TriggerError =
            PlatformError::PermissionDenied("no accessibility".into()).into();
        assert!(matches!(err, TriggerError::InvalidArgument(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn select_failures_keep_exit_2() {
        let not_found: TriggerError = PlatformError::SourceNotFound("a.b.c".into()).into();
        assert_eq!(not_found.exit_code(), 2);

        let refused: TriggerError = PlatformError::SelectFailed {
            id: "a.b.c".into(),
            status: -50,
        }
        .into();
        assert_eq!(refused.exit_code(), 2);
        assert!(refused.to_string().contains("OSStatus -50"));
    }

    #[test]
    fn source_not_found_has_remediation_hint() {
        let err = TriggerError::InputSourceNotFound("a.b.c".into());
        assert!(err.remediation().is_some());
        assert!(TriggerError::Runtime("x".into()).remediation().is_none());
    }
}
