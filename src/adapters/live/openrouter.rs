//! Live adapter for the `OpenRouter` chat completions API.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use super::{excerpt, http_client, split_data_url};
use crate::error::StylesError;
use crate::ports::{GenerateFuture, OutfitGenerator, OutfitResponse, ProviderSignal, RawError};
use crate::request::GenerationRequest;

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Environment variable holding the `OpenRouter` key.
pub const OPENROUTER_KEY_VAR: &str = "OPENROUTER_API_KEY";

/// Vision model behind `OpenRouter`. Answers with a description of the
/// outfit rather than an image.
pub struct OpenRouterGenerator {
    client: Client,
    api_key: Option<String>,
    model: String,
}

impl OpenRouterGenerator {
    /// Create a generator for `model`. A missing key is reported per attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: Option<String>, model: impl Into<String>, timeout: Duration) -> Result<Self, StylesError> {
        Ok(Self { client: http_client(timeout)?, api_key, model: model.into() })
    }
}

impl OutfitGenerator for OpenRouterGenerator {
    fn generate(&self, request: &GenerationRequest) -> GenerateFuture<'_> {
        let request = request.clone();
        Box::pin(async move {
            self.credentials()?;
            let api_key = self.api_key.as_deref().unwrap_or_default();

            let body = serde_json::json!({
                "model": self.model,
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": request.prompt},
                        {"type": "image_url", "image_url": {"url": request.person_image.data_url()}},
                        {"type": "image_url", "image_url": {"url": request.clothing_image.data_url()}},
                    ],
                }],
            });

            let response = self
                .client
                .post(OPENROUTER_API_URL)
                .bearer_auth(api_key)
                .header("X-Title", "styles")
                .json(&body)
                .send()
                .await?;

            let status = response.status().as_u16();
            let text = response.text().await?;
            parse_completion(status, &text)
        })
    }

    fn credentials(&self) -> Result<(), RawError> {
        match self.api_key {
            Some(_) => Ok(()),
            None => Err(RawError::MissingCredentials { env_var: OPENROUTER_KEY_VAR.into() }),
        }
    }
}

/// Interpret a completion response body.
///
/// `OpenRouter` can report errors in-band with a 200 status, so the error
/// object is checked before the choices.
fn parse_completion(status: u16, text: &str) -> Result<OutfitResponse, RawError> {
    if let Ok(ErrorEnvelope { error }) = serde_json::from_str::<ErrorEnvelope>(text) {
        let code = error.code.filter(|c| *c >= 400).unwrap_or(status);
        return Err(RawError::status(code, signal_for(code), error.message));
    }
    if !(200..300).contains(&status) {
        return Err(RawError::status(status, signal_for(status), excerpt(text)));
    }

    let parsed: CompletionResponse = serde_json::from_str(text)
        .map_err(|e| RawError::status(status, None, format!("Failed to parse response: {e}")))?;
    let Some(message) = parsed.choices.into_iter().next().map(|c| c.message) else {
        return Err(RawError::status(status, None, format!("No choices in response. Body: {}", excerpt(text))));
    };

    let mut response = OutfitResponse { description: message.content, ..OutfitResponse::default() };
    if let Some(url) = message.images.into_iter().next().map(|i| i.image_url.url) {
        match split_data_url(&url) {
            Some((mime, payload)) => {
                response.image_mime_type = Some(mime.to_string());
                response.image_base64 = Some(payload.to_string());
            }
            None => response.image_url = Some(url),
        }
    }
    Ok(response)
}

fn signal_for(code: u16) -> Option<ProviderSignal> {
    match code {
        401 => Some(ProviderSignal::Unauthenticated),
        402 => Some(ProviderSignal::InsufficientCredits),
        429 => Some(ProviderSignal::RateLimited),
        _ => None,
    }
}

// --- OpenRouter API response types ---

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorObject,
}

#[derive(Deserialize)]
struct ErrorObject {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    images: Vec<ChoiceImage>,
}

#[derive(Deserialize)]
struct ChoiceImage {
    image_url: ImageUrl,
}

#[derive(Deserialize)]
struct ImageUrl {
    url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_from_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"The shirt fits."}}]}"#;
        let response = parse_completion(200, body).unwrap();
        assert_eq!(response.description.as_deref(), Some("The shirt fits."));
        assert!(!response.has_image());
    }

    #[test]
    fn inline_image_is_split() {
        let body = r#"{"choices":[{"message":{"content":"ok","images":[
            {"type":"image_url","image_url":{"url":"data:image/png;base64,iVBORw0KGgo="}}]}}]}"#;
        let response = parse_completion(200, body).unwrap();
        assert_eq!(response.image_mime_type.as_deref(), Some("image/png"));
        assert_eq!(response.image_base64.as_deref(), Some("iVBORw0KGgo="));
    }

    #[test]
    fn in_band_rate_limit() {
        let body = r#"{"error":{"code":429,"message":"Rate limit exceeded: free-models-per-day"}}"#;
        let err = parse_completion(200, body).unwrap_err();
        assert_eq!(
            err,
            RawError::status(429, Some(ProviderSignal::RateLimited), "Rate limit exceeded: free-models-per-day")
        );
    }

    #[test]
    fn status_codes_carry_signals() {
        let err = parse_completion(402, r#"{"error":{"code":402,"message":"Insufficient credits"}}"#).unwrap_err();
        assert!(matches!(err, RawError::Upstream { signal: Some(ProviderSignal::InsufficientCredits), .. }));

        let err = parse_completion(401, "not json").unwrap_err();
        assert_eq!(err, RawError::status(401, Some(ProviderSignal::Unauthenticated), "not json"));
    }

    #[test]
    fn empty_choices_is_malformed() {
        let err = parse_completion(200, r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, RawError::Upstream { status: Some(200), signal: None, .. }));
    }

    #[test]
    fn missing_key_reported_without_network() {
        let generator = OpenRouterGenerator::new(None, "google/gemini-2.0-flash-exp:free", Duration::from_secs(5)).unwrap();
        assert_eq!(
            generator.credentials(),
            Err(RawError::MissingCredentials { env_var: OPENROUTER_KEY_VAR.into() })
        );
    }
}
