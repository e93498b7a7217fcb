//! Mapping of raw failures onto the closed error taxonomy.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ports::{ProviderSignal, RawError};
use crate::validate::MAX_FILE_SIZE;
use crate::wire::ApiErrorBody;

/// Closed set of error kinds surfaced to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing or invalid inputs.
    ValidationError,
    /// An image exceeds the size ceiling.
    FileTooLarge,
    /// Credentials missing or rejected.
    InvalidApiKey,
    /// Upstream throttling.
    RateLimitExceeded,
    /// Provider account has no credits.
    InsufficientCredits,
    /// Any other generation failure.
    ProcessingError,
    /// Saving or exporting a result failed.
    DownloadError,
    /// A failure outside the known categories.
    UnexpectedError,
}

impl ErrorCode {
    /// All codes, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::ValidationError,
        Self::FileTooLarge,
        Self::InvalidApiKey,
        Self::RateLimitExceeded,
        Self::InsufficientCredits,
        Self::ProcessingError,
        Self::DownloadError,
        Self::UnexpectedError,
    ];

    /// Wire identifier.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::FileTooLarge => "FILE_TOO_LARGE",
            Self::InvalidApiKey => "INVALID_API_KEY",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::InsufficientCredits => "INSUFFICIENT_CREDITS",
            Self::ProcessingError => "PROCESSING_ERROR",
            Self::DownloadError => "DOWNLOAD_ERROR",
            Self::UnexpectedError => "UNEXPECTED_ERROR",
        }
    }

    /// Whether re-submitting the identical request can help.
    ///
    /// Depends on the code alone. The classification table is authoritative:
    /// credential, credit and input problems repeat on every resubmission, so
    /// they stay final even when a remote service reports them.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        !matches!(
            self,
            Self::InvalidApiKey
                | Self::InsufficientCredits
                | Self::ValidationError
                | Self::FileTooLarge
        )
    }

    /// Heading shown above the error message.
    #[must_use]
    pub fn category(self) -> &'static str {
        match self {
            Self::InvalidApiKey | Self::InsufficientCredits => "Configuration Error",
            Self::RateLimitExceeded => "Rate Limit Error",
            Self::ValidationError | Self::FileTooLarge => "Validation Error",
            Self::DownloadError => "Download Error",
            Self::ProcessingError | Self::UnexpectedError => "Processing Error",
        }
    }

    /// Suggested remediation.
    #[must_use]
    pub fn suggestion(self) -> &'static str {
        match self {
            Self::InvalidApiKey => "Check the API key in your config file or environment.",
            Self::InsufficientCredits => "Add credits to your AI provider account.",
            Self::RateLimitExceeded => "Please wait a few minutes before trying again.",
            Self::ValidationError => {
                "Provide a JPEG, PNG, or WebP image for both the person and the clothing item."
            }
            Self::FileTooLarge => "Use images smaller than 10 MB.",
            Self::DownloadError => "Try downloading again or choose a different format.",
            Self::ProcessingError | Self::UnexpectedError => {
                "Please try again. If the problem persists, check your setup."
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|c| c.as_str() == s).ok_or_else(|| format!("unknown error code '{s}'"))
    }
}

/// A classified failure, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorState {
    /// User-facing message.
    pub message: String,
    /// Error kind.
    pub code: ErrorCode,
    /// HTTP-like status, informational only.
    pub status: u16,
    /// Diagnostic text.
    pub details: Option<String>,
    /// Always equal to `code.is_retryable()`.
    pub is_retryable: bool,
    /// When the error was classified.
    pub timestamp: DateTime<Utc>,
}

impl ErrorState {
    /// Build an error state; retryability is derived from `code`.
    pub fn new(code: ErrorCode, status: u16, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            message: message.into(),
            code,
            status,
            details,
            is_retryable: code.is_retryable(),
            timestamp: Utc::now(),
        }
    }

    /// Failure of the local save/export step.
    pub fn download(details: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::DownloadError,
            500,
            "Failed to download the image. Please try again.",
            Some(details.into()),
        )
    }

    /// Convert a failure envelope from a remote service.
    ///
    /// Codes outside the taxonomy become [`ErrorCode::UnexpectedError`].
    #[must_use]
    pub fn from_payload(body: &ApiErrorBody) -> Self {
        let code = body.code.parse().unwrap_or(ErrorCode::UnexpectedError);
        let message = if body.message.is_empty() {
            "An unknown error occurred".to_string()
        } else {
            body.message.clone()
        };
        Self::new(code, body.status, message, body.details.clone())
    }
}

/// Classify the highest-precedence condition among `signals`.
///
/// Precedence: missing credentials, missing or unsupported images, oversized
/// images, rate limiting, rejected credentials, exhausted credits, then
/// everything else. An empty slice yields an unexpected error.
#[must_use]
pub fn classify(signals: &[RawError]) -> ErrorState {
    signals.iter().min_by_key(|s| precedence(s)).map_or_else(
        || ErrorState::new(ErrorCode::UnexpectedError, 500, UNEXPECTED_MESSAGE, None),
        classify_one,
    )
}

const UNEXPECTED_MESSAGE: &str =
    "An unexpected error occurred while generating your outfit. Please try again.";

fn classify_one(signal: &RawError) -> ErrorState {
    match signal {
        RawError::MissingCredentials { env_var } => ErrorState::new(
            ErrorCode::InvalidApiKey,
            500,
            format!("API key not configured. Please add {env_var} to your environment variables."),
            None,
        ),
        RawError::MissingImages => ErrorState::new(
            ErrorCode::ValidationError,
            400,
            "Please upload both a person photo and a clothing item before generating.",
            None,
        ),
        RawError::InvalidFileType { name } => ErrorState::new(
            ErrorCode::ValidationError,
            400,
            "Images must be JPEG, PNG, or WebP.",
            Some(format!("Unsupported type: {name}")),
        ),
        RawError::ImageTooLarge { name, size } => ErrorState::new(
            ErrorCode::FileTooLarge,
            400,
            "Image files must be less than 10MB.",
            Some(format!("{name} is {size} bytes (limit {MAX_FILE_SIZE})")),
        ),
        RawError::Upstream { status, signal, message } => {
            let details = Some(message.clone());
            match upstream_code(*status, *signal) {
                ErrorCode::RateLimitExceeded => ErrorState::new(
                    ErrorCode::RateLimitExceeded,
                    429,
                    "Rate limit exceeded. Please try again later.",
                    details,
                ),
                ErrorCode::InvalidApiKey => {
                    ErrorState::new(ErrorCode::InvalidApiKey, 401, "Invalid API key.", details)
                }
                ErrorCode::InsufficientCredits => ErrorState::new(
                    ErrorCode::InsufficientCredits,
                    402,
                    "Insufficient credits on the AI provider account.",
                    details,
                ),
                _ => ErrorState::new(
                    ErrorCode::ProcessingError,
                    500,
                    "Failed to generate outfit visualization.",
                    details,
                ),
            }
        }
        RawError::Reported(body) => ErrorState::from_payload(body),
        RawError::Cancelled => ErrorState::new(
            ErrorCode::UnexpectedError,
            500,
            UNEXPECTED_MESSAGE,
            Some("the attempt was cancelled".to_string()),
        ),
    }
}

fn upstream_code(status: Option<u16>, signal: Option<ProviderSignal>) -> ErrorCode {
    if signal == Some(ProviderSignal::RateLimited) || status == Some(429) {
        ErrorCode::RateLimitExceeded
    } else if signal == Some(ProviderSignal::Unauthenticated) || status == Some(401) {
        ErrorCode::InvalidApiKey
    } else if signal == Some(ProviderSignal::InsufficientCredits) || status == Some(402) {
        ErrorCode::InsufficientCredits
    } else {
        ErrorCode::ProcessingError
    }
}

fn precedence(signal: &RawError) -> u8 {
    match signal {
        RawError::MissingCredentials { .. } => 1,
        RawError::MissingImages | RawError::InvalidFileType { .. } => 2,
        RawError::ImageTooLarge { .. } => 3,
        RawError::Upstream { status, signal, .. } => code_precedence(upstream_code(*status, *signal)),
        RawError::Reported(body) => {
            code_precedence(body.code.parse().unwrap_or(ErrorCode::UnexpectedError))
        }
        RawError::Cancelled => 8,
    }
}

fn code_precedence(code: ErrorCode) -> u8 {
    match code {
        ErrorCode::ValidationError => 2,
        ErrorCode::FileTooLarge => 3,
        ErrorCode::RateLimitExceeded => 4,
        ErrorCode::InvalidApiKey => 5,
        ErrorCode::InsufficientCredits => 6,
        _ => 7,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(state: &ErrorState) -> (ErrorCode, u16, bool) {
        (state.code, state.status, state.is_retryable)
    }

    #[test]
    fn mapping_table() {
        let cases = [
            (
                RawError::MissingCredentials { env_var: "OPENROUTER_API_KEY".into() },
                (ErrorCode::InvalidApiKey, 500, false),
            ),
            (RawError::MissingImages, (ErrorCode::ValidationError, 400, false)),
            (
                RawError::ImageTooLarge { name: "big.jpg".into(), size: MAX_FILE_SIZE + 1 },
                (ErrorCode::FileTooLarge, 400, false),
            ),
            (RawError::status(429, None, "Too Many Requests"), (ErrorCode::RateLimitExceeded, 429, true)),
            (RawError::status(401, None, "Unauthorized"), (ErrorCode::InvalidApiKey, 401, false)),
            (
                RawError::status(402, Some(ProviderSignal::InsufficientCredits), "Payment Required"),
                (ErrorCode::InsufficientCredits, 402, false),
            ),
            (RawError::transport("connection reset"), (ErrorCode::ProcessingError, 500, true)),
            (RawError::status(503, None, "unavailable"), (ErrorCode::ProcessingError, 500, true)),
        ];
        for (raw, expected) in cases {
            assert_eq!(triple(&classify(std::slice::from_ref(&raw))), expected, "{raw:?}");
        }
    }

    #[test]
    fn provider_signals_win_over_generic_status() {
        let rate = RawError::status(400, Some(ProviderSignal::RateLimited), "RESOURCE_EXHAUSTED");
        assert_eq!(classify(&[rate]).code, ErrorCode::RateLimitExceeded);

        let auth = RawError::status(400, Some(ProviderSignal::Unauthenticated), "API_KEY_INVALID");
        assert_eq!(classify(&[auth]).code, ErrorCode::InvalidApiKey);
    }

    #[test]
    fn message_text_is_never_inspected() {
        let state = classify(&[RawError::transport("HTTP 429 401 rate limit")]);
        assert_eq!(state.code, ErrorCode::ProcessingError);
        assert_eq!(state.details.as_deref(), Some("HTTP 429 401 rate limit"));
    }

    #[test]
    fn precedence_when_conditions_coincide() {
        let missing_key = RawError::MissingCredentials { env_var: "GEMINI_API_KEY".into() };
        let too_large = RawError::ImageTooLarge { name: "a".into(), size: MAX_FILE_SIZE + 1 };

        assert_eq!(
            classify(&[RawError::MissingImages, missing_key.clone()]).code,
            ErrorCode::InvalidApiKey
        );
        assert_eq!(classify(&[too_large.clone(), RawError::MissingImages]).code, ErrorCode::ValidationError);
        assert_eq!(
            classify(&[RawError::status(401, None, ""), RawError::status(429, None, "")]).code,
            ErrorCode::RateLimitExceeded
        );
        assert_eq!(classify(&[too_large, missing_key]).status, 500);
    }

    #[test]
    fn rate_limit_beats_credits_on_one_signal() {
        let raw = RawError::status(429, Some(ProviderSignal::InsufficientCredits), "");
        assert_eq!(classify(&[raw]).code, ErrorCode::RateLimitExceeded);
    }

    #[test]
    fn retryability_is_a_function_of_code() {
        let non_retryable = [
            ErrorCode::InvalidApiKey,
            ErrorCode::InsufficientCredits,
            ErrorCode::ValidationError,
            ErrorCode::FileTooLarge,
        ];
        for code in ErrorCode::ALL {
            assert_eq!(code.is_retryable(), !non_retryable.contains(&code), "{code}");
            assert_eq!(ErrorState::new(code, 999, "x", None).is_retryable, code.is_retryable());
        }
        assert!(ErrorState::download("disk full").is_retryable);
    }

    #[test]
    fn categories_and_suggestions() {
        assert_eq!(ErrorCode::InvalidApiKey.category(), "Configuration Error");
        assert_eq!(ErrorCode::InsufficientCredits.category(), "Configuration Error");
        assert_eq!(ErrorCode::RateLimitExceeded.category(), "Rate Limit Error");
        assert_eq!(ErrorCode::ValidationError.category(), "Validation Error");
        assert_eq!(ErrorCode::ProcessingError.category(), "Processing Error");
        assert_eq!(
            ErrorCode::RateLimitExceeded.suggestion(),
            "Please wait a few minutes before trying again."
        );
        for code in ErrorCode::ALL {
            assert!(!code.suggestion().is_empty());
        }
    }

    #[test]
    fn payload_conversion() {
        let body = ApiErrorBody {
            message: "Rate limit exceeded. Please try again later.".into(),
            code: "RATE_LIMIT_EXCEEDED".into(),
            status: 429,
            details: Some("upstream said 429".into()),
        };
        let state = ErrorState::from_payload(&body);
        assert_eq!(triple(&state), (ErrorCode::RateLimitExceeded, 429, true));
        assert_eq!(state.details.as_deref(), Some("upstream said 429"));

        let unknown = ApiErrorBody { message: String::new(), code: "MODEL_UNAVAILABLE".into(), status: 503, details: None };
        let state = classify(&[RawError::Reported(unknown)]);
        assert_eq!(triple(&state), (ErrorCode::UnexpectedError, 503, true));
        assert_eq!(state.message, "An unknown error occurred");
    }

    #[test]
    fn reported_input_errors_are_final() {
        let body = ApiErrorBody {
            message: "Image files must be less than 10MB.".into(),
            code: "FILE_TOO_LARGE".into(),
            status: 400,
            details: None,
        };
        assert_eq!(triple(&ErrorState::from_payload(&body)), (ErrorCode::FileTooLarge, 400, false));

        let body = ApiErrorBody { code: "VALIDATION_ERROR".into(), ..body };
        assert_eq!(triple(&ErrorState::from_payload(&body)), (ErrorCode::ValidationError, 400, false));
    }

    #[test]
    fn code_round_trips_through_strings() {
        for code in ErrorCode::ALL {
            assert_eq!(code.as_str().parse::<ErrorCode>().unwrap(), code);
            assert_eq!(serde_json::to_value(code).unwrap(), code.as_str());
        }
        assert!("UNKNOWN_ERROR".parse::<ErrorCode>().is_err());
    }

    #[test]
    fn empty_signal_list_is_unexpected() {
        assert_eq!(classify(&[]).code, ErrorCode::UnexpectedError);
    }
}
