//! Outfit generator port for vision-language generation APIs.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::GenerationRequest;
use crate::wire::ApiErrorBody;

/// What a generator can produce besides descriptive text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// The generator returns image bytes or an image URL.
    ///
    /// When set, a response without an image is treated as malformed. When
    /// unset, results are description-only and their image fields stay empty.
    pub image_output: bool,
}

/// A successful raw response from the generation capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutfitResponse {
    /// Hosted image URL, if the provider returned one.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Inline base64 image, if the provider returned one.
    #[serde(default)]
    pub image_base64: Option<String>,
    /// MIME type of `image_base64`.
    #[serde(default)]
    pub image_mime_type: Option<String>,
    /// Descriptive text.
    #[serde(default)]
    pub description: Option<String>,
}

impl OutfitResponse {
    /// True when either image field carries a non-empty value.
    #[must_use]
    pub fn has_image(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.image_url) || present(&self.image_base64)
    }
}

/// A provider-specific condition translated into a closed set by the adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderSignal {
    /// Upstream throttled the request.
    RateLimited,
    /// Upstream rejected the credentials.
    Unauthenticated,
    /// The account has no credits left.
    InsufficientCredits,
}

/// A raw failure, before classification.
///
/// Adapters never inspect message text to decide the kind; they fill in the
/// numeric status and, where the provider body says so, a [`ProviderSignal`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawError {
    /// No credentials are configured for the collaborator.
    #[error("missing credentials ({env_var})")]
    MissingCredentials {
        /// Environment variable that would supply them.
        env_var: String,
    },
    /// One or both images were not supplied.
    #[error("person and clothing images are required")]
    MissingImages,
    /// An image has an unsupported MIME type.
    #[error("unsupported image type: {name}")]
    InvalidFileType {
        /// Offending file name.
        name: String,
    },
    /// An image exceeds the size ceiling.
    #[error("{name} is too large ({size} bytes)")]
    ImageTooLarge {
        /// Offending file name.
        name: String,
        /// Its size in bytes.
        size: u64,
    },
    /// The upstream call failed: error status, transport failure, timeout, or
    /// an unusable body.
    #[error("upstream error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Upstream {
        /// HTTP status, when a response was received.
        #[serde(default)]
        status: Option<u16>,
        /// Structured provider condition, when the body carried one.
        #[serde(default)]
        signal: Option<ProviderSignal>,
        /// Diagnostic text.
        message: String,
    },
    /// A remote service returned an already-classified failure envelope.
    #[error("{} ({})", .0.message, .0.code)]
    Reported(ApiErrorBody),
    /// The attempt was cancelled before the call finished.
    #[error("cancelled")]
    Cancelled,
}

impl RawError {
    /// Upstream failure with only a message (no response received).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Upstream { status: None, signal: None, message: message.into() }
    }

    /// Upstream failure carrying an HTTP status.
    pub fn status(status: u16, signal: Option<ProviderSignal>, message: impl Into<String>) -> Self {
        Self::Upstream { status: Some(status), signal, message: message.into() }
    }
}

impl From<reqwest::Error> for RawError {
    fn from(e: reqwest::Error) -> Self {
        let message = if e.is_timeout() {
            format!("request timed out: {e}")
        } else {
            e.to_string()
        };
        Self::Upstream { status: e.status().map(|s| s.as_u16()), signal: None, message }
    }
}

/// Boxed future type returned by [`OutfitGenerator::generate`].
pub type GenerateFuture<'a> =
    Pin<Box<dyn Future<Output = Result<OutfitResponse, RawError>> + Send + 'a>>;

/// Renders a person wearing a garment via an external API.
///
/// Implementations perform exactly one round trip per call and never retry.
pub trait OutfitGenerator: Send + Sync {
    /// Send the request and await a single response.
    fn generate(&self, request: &GenerationRequest) -> GenerateFuture<'_>;

    /// Output capabilities of this generator.
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Check that credentials are present, without contacting the provider.
    ///
    /// # Errors
    ///
    /// Returns [`RawError::MissingCredentials`] when no key is configured.
    fn credentials(&self) -> Result<(), RawError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_image_ignores_empty_strings() {
        let mut response = OutfitResponse {
            image_url: Some(String::new()),
            image_base64: Some(String::new()),
            description: Some("looks great".into()),
            ..OutfitResponse::default()
        };
        assert!(!response.has_image());

        response.image_base64 = Some("aGk=".into());
        assert!(response.has_image());
    }

    #[test]
    fn raw_error_tagged_serialization() {
        let err = RawError::status(429, Some(ProviderSignal::RateLimited), "slow down");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "upstream");
        assert_eq!(json["status"], 429);
        assert_eq!(json["signal"], "rate_limited");

        let back: RawError = serde_json::from_value(json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn raw_error_display() {
        assert_eq!(RawError::transport("connection reset").to_string(), "upstream error: connection reset");
        assert_eq!(
            RawError::MissingCredentials { env_var: "OPENROUTER_API_KEY".into() }.to_string(),
            "missing credentials (OPENROUTER_API_KEY)"
        );
        assert_eq!(
            RawError::status(429, Some(ProviderSignal::RateLimited), "slow down").to_string(),
            "upstream error (429): slow down"
        );

        let err: Box<dyn std::error::Error> = Box::new(RawError::Cancelled);
        assert_eq!(err.to_string(), "cancelled");
    }
}
