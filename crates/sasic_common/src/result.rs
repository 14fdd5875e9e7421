//! Common result and error types for the flow.

/// The standard result type for fallible internal operations.
///
/// `Ok` carries the (possibly degraded) stage output. `Err` means an
/// internal invariant was broken, which is a bug rather than bad input.
/// Data-quality problems are reported through a `DiagnosticSink` and the
/// stage still returns `Ok`.
pub type SasicResult<T> = Result<T, InternalError>;

/// An internal error indicating a logic bug, not a user input problem.
#[derive(Debug, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the broken invariant.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = InternalError::new("site claimed twice");
        assert_eq!(format!("{err}"), "internal error: site claimed twice");
    }

    #[test]
    fn from_string() {
        let err: InternalError = "lost a cell".to_string().into();
        assert_eq!(err.message, "lost a cell");
    }

    #[test]
    fn question_mark_propagates() {
        fn inner() -> SasicResult<u32> {
            Err(InternalError::new("boom"))
        }
        fn outer() -> SasicResult<u32> {
            let v = inner()?;
            Ok(v + 1)
        }
        assert_eq!(outer().unwrap_err().message, "boom");
    }
}
