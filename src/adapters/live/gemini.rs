//! Live adapter for the Gemini `generateContent` API.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use super::{excerpt, http_client};
use crate::error::StylesError;
use crate::ports::{Capabilities, GenerateFuture, OutfitGenerator, OutfitResponse, ProviderSignal, RawError};
use crate::request::GenerationRequest;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Environment variable holding the Gemini key.
pub const GEMINI_KEY_VAR: &str = "GEMINI_API_KEY";

/// Gemini model called directly through the Google AI API.
///
/// Image models (names containing `image`) are asked for an image and must
/// return one; other models answer with text only.
pub struct GeminiGenerator {
    client: Client,
    api_key: Option<String>,
    model: String,
}

impl GeminiGenerator {
    /// Create a generator for `model`. A missing key is reported per attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: Option<String>, model: impl Into<String>, timeout: Duration) -> Result<Self, StylesError> {
        Ok(Self { client: http_client(timeout)?, api_key, model: model.into() })
    }

    fn produces_images(&self) -> bool {
        self.model.contains("image")
    }
}

impl OutfitGenerator for GeminiGenerator {
    fn generate(&self, request: &GenerationRequest) -> GenerateFuture<'_> {
        let request = request.clone();
        Box::pin(async move {
            self.credentials()?;
            let api_key = self.api_key.as_deref().unwrap_or_default();
            let url = format!("{GEMINI_API_BASE}/{}:generateContent", self.model);

            let modalities: &[&str] = if self.produces_images() { &["TEXT", "IMAGE"] } else { &["TEXT"] };
            let body = serde_json::json!({
                "contents": [{
                    "parts": [
                        {"text": request.prompt},
                        {"inline_data": {
                            "mime_type": request.person_image.mime_type,
                            "data": request.person_image.to_base64(),
                        }},
                        {"inline_data": {
                            "mime_type": request.clothing_image.mime_type,
                            "data": request.clothing_image.to_base64(),
                        }},
                    ]
                }],
                "generationConfig": {"responseModalities": modalities}
            });

            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", api_key)
                .json(&body)
                .send()
                .await?;

            let status = response.status().as_u16();
            let text = response.text().await?;
            parse_generation(status, &text)
        })
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { image_output: self.produces_images() }
    }

    fn credentials(&self) -> Result<(), RawError> {
        match self.api_key {
            Some(_) => Ok(()),
            None => Err(RawError::MissingCredentials { env_var: GEMINI_KEY_VAR.into() }),
        }
    }
}

fn parse_generation(status: u16, text: &str) -> Result<OutfitResponse, RawError> {
    if !(200..300).contains(&status) {
        return Err(match serde_json::from_str::<GoogleErrorEnvelope>(text) {
            Ok(GoogleErrorEnvelope { error }) => {
                let signal = error.signal();
                RawError::status(status, signal, error.message)
            }
            Err(_) => RawError::status(status, None, excerpt(text)),
        });
    }

    let parsed: GeminiResponse = serde_json::from_str(text)
        .map_err(|e| RawError::status(status, None, format!("Failed to parse response: {e}")))?;

    let mut response = OutfitResponse::default();
    let mut description = Vec::new();
    for part in parsed.candidates.into_iter().flat_map(|c| c.content.parts) {
        if let Some(t) = part.text {
            description.push(t);
        }
        if let Some(inline) = part.inline_data {
            if response.image_base64.is_none() {
                response.image_mime_type = Some(inline.mime_type);
                response.image_base64 = Some(inline.data);
            }
        }
    }
    if !description.is_empty() {
        response.description = Some(description.join("\n"));
    }
    Ok(response)
}

// --- Gemini API response types ---

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
    inline_data: Option<GeminiInlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleError,
}

#[derive(Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<GoogleErrorDetail>,
}

#[derive(Deserialize)]
struct GoogleErrorDetail {
    #[serde(default)]
    reason: Option<String>,
}

impl GoogleError {
    fn signal(&self) -> Option<ProviderSignal> {
        if self.details.iter().any(|d| d.reason.as_deref() == Some("API_KEY_INVALID")) {
            return Some(ProviderSignal::Unauthenticated);
        }
        match self.status.as_deref()? {
            "RESOURCE_EXHAUSTED" => Some(ProviderSignal::RateLimited),
            "UNAUTHENTICATED" | "PERMISSION_DENIED" => Some(ProviderSignal::Unauthenticated),
            _ => None,
        }
    }
}
