//! Error types for the smoke runner.

use search_adapter::SearchAdapterError;
use thiserror::Error;

/// Errors that can end a smoke scenario or the whole run.
#[derive(Error, Debug)]
pub enum SmokeError {
    /// An adapter call failed.
    #[error("Adapter error: {0}")]
    Adapter(#[from] SearchAdapterError),

    /// The engine answered, but not with what the scenario expected.
    #[error("Check failed: {0}")]
    CheckFailed(String),

    /// One or more scenarios failed.
    #[error("{failed} of {total} scenarios failed")]
    ScenariosFailed { failed: usize, total: usize },
}

impl SmokeError {
    /// Create a check failure.
    pub fn check(msg: impl Into<String>) -> Self {
        Self::CheckFailed(msg.into())
    }
}

/// Fail the scenario with `msg` unless `condition` holds.
pub fn ensure(condition: bool, msg: impl Into<String>) -> Result<(), SmokeError> {
    if condition {
        Ok(())
    } else {
        Err(SmokeError::check(msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure() {
        assert!(ensure(true, "unused").is_ok());
        let err = ensure(false, "total was 3, expected 4").unwrap_err();
        assert_eq!(err.to_string(), "Check failed: total was 3, expected 4");
    }

    #[test]
    fn test_adapter_error_converts() {
        let err: SmokeError = SearchAdapterError::transport("refused").into();
        assert!(matches!(err, SmokeError::Adapter(_)));
    }
}
