//! Error taxonomy for the translation pipeline.

use std::time::Duration;
use thiserror::Error;

/// Errors raised while batching, translating or reconciling subtitles.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// A setting is unusable (zero batch size, bad env value, ...).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("empty response from model")]
    EmptyResponse,

    #[error("malformed response: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    /// The model returned a different number of entries than it was sent.
    #[error("mismatched number of lines: expected {expected}, got {actual}")]
    BatchSizeMismatch { expected: usize, actual: usize },

    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),

    #[error("remote call failed: {0:#}")]
    Remote(#[from] anyhow::Error),

    /// Input had subtitles but nothing came out of the pipeline.
    #[error("no subtitles to save")]
    NoTranslatableContent,
}

impl TranslateError {
    /// Whether the retry controller may attempt the batch again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::EmptyResponse
                | Self::MalformedResponse(_)
                | Self::BatchSizeMismatch { .. }
                | Self::Timeout(_)
                | Self::Remote(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TranslateError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn per_batch_errors_are_retryable() {
        assert!(TranslateError::EmptyResponse.is_retryable());
        assert!(TranslateError::BatchSizeMismatch {
            expected: 3,
            actual: 2
        }
        .is_retryable());
        assert!(TranslateError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(TranslateError::Remote(anyhow!("503")).is_retryable());
    }

    #[test]
    fn fatal_errors_are_not_retryable() {
        assert!(!TranslateError::InvalidConfiguration("batch size".into()).is_retryable());
        assert!(!TranslateError::NoTranslatableContent.is_retryable());
    }

    #[test]
    fn mismatch_message_names_both_counts() {
        let err = TranslateError::BatchSizeMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "mismatched number of lines: expected 3, got 2"
        );
    }
}
