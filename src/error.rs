//! Unified error type for styles.

use thiserror::Error;

use crate::classify::ErrorState;

/// Errors that can occur outside the generation lifecycle itself.
///
/// Failures of a generation attempt are not represented here while the
/// attempt is running; they become an [`ErrorState`] inside the session. The
/// [`StylesError::Generation`] variant only carries one out to a caller that
/// wants a terminal `Result`.
#[derive(Debug, Error)]
pub enum StylesError {
    /// A network error occurred outside a generation attempt.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Image format conversion error.
    #[error("Image conversion error: {0}")]
    ImageConversion(String),

    /// A generation attempt ended in the error state.
    #[error("{}: {} ({})", .0.code.category(), .0.message, .0.code)]
    Generation(ErrorState),

    /// The attempt was cancelled before it finished.
    #[error("Generation cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ErrorCode;

    #[test]
    fn generation_error_names_category_and_code() {
        let state = ErrorState::new(ErrorCode::RateLimitExceeded, 429, "Slow down.", None);
        assert_eq!(
            StylesError::Generation(state).to_string(),
            "Rate Limit Error: Slow down. (RATE_LIMIT_EXCEEDED)"
        );
        assert_eq!(StylesError::Cancelled.to_string(), "Generation cancelled");
    }
}
