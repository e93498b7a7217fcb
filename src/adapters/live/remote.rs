//! Live adapter for a remote `generate-outfit` service.
//!
//! The service takes a multipart form (`personImage`, `clothingImage`,
//! optional `bodyData` JSON) and answers with the envelope from
//! [`crate::wire`]. Its failures arrive already classified.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;

use super::{excerpt, http_client};
use crate::error::StylesError;
use crate::ports::{GenerateFuture, OutfitGenerator, OutfitResponse, RawError};
use crate::request::{GenerationRequest, RequestImage};
use crate::wire::ApiResponse;

/// Generator backed by a remote service speaking the JSON envelope.
pub struct RemoteGenerator {
    client: Client,
    endpoint: String,
}

impl RemoteGenerator {
    /// Create a generator posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, StylesError> {
        Ok(Self { client: http_client(timeout)?, endpoint: endpoint.into() })
    }
}

impl OutfitGenerator for RemoteGenerator {
    fn generate(&self, request: &GenerationRequest) -> GenerateFuture<'_> {
        let request = request.clone();
        Box::pin(async move {
            let mut form = Form::new()
                .part("personImage", file_part(&request.person_image)?)
                .part("clothingImage", file_part(&request.clothing_image)?);
            if let Some(body_data) = &request.body_data {
                let json = serde_json::to_string(body_data)
                    .map_err(|e| RawError::transport(format!("Failed to encode body data: {e}")))?;
                form = form.text("bodyData", json);
            }

            let response = self.client.post(&self.endpoint).multipart(form).send().await?;
            let status = response.status();
            let text = response.text().await?;
            parse_envelope(status, &text)
        })
    }
}

fn file_part(image: &RequestImage) -> Result<Part, RawError> {
    Ok(Part::bytes(image.data.to_vec()).file_name(image.name.clone()).mime_str(&image.mime_type)?)
}

fn parse_envelope(status: reqwest::StatusCode, text: &str) -> Result<OutfitResponse, RawError> {
    match serde_json::from_str::<ApiResponse>(text) {
        Ok(ApiResponse::Success { data, .. }) => Ok(OutfitResponse {
            image_url: Some(data.generated_image_url).filter(|u| !u.is_empty()),
            image_base64: data.generated_image_base64,
            image_mime_type: None,
            description: data.description,
        }),
        Ok(ApiResponse::Failure(body)) => Err(RawError::Reported(body)),
        Err(_) if !status.is_success() => {
            let reason = status.canonical_reason().unwrap_or("Unknown Status");
            Err(RawError::status(status.as_u16(), None, format!("HTTP {}: {reason}", status.as_u16())))
        }
        Err(e) => Err(RawError::status(
            status.as_u16(),
            None,
            format!("Failed to parse response: {e}. Body: {}", excerpt(text)),
        )),
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;
    use crate::wire::ApiErrorBody;

    #[test]
    fn success_envelope_drops_empty_url() {
        let body = r#"{"success":true,"data":{"generatedImageUrl":"","generatedImageBase64":"",
            "description":"Relaxed fit.","processingTime":3100},"message":"ok"}"#;
        let response = parse_envelope(StatusCode::OK, body).unwrap();
        assert!(response.image_url.is_none());
        assert!(!response.has_image());
        assert_eq!(response.description.as_deref(), Some("Relaxed fit."));
    }

    #[test]
    fn failure_envelope_is_reported() {
        let body = r#"{"success":false,"error":{"message":"Rate limit exceeded. Please try again later.",
            "code":"RATE_LIMIT_EXCEEDED","status":429}}"#;
        let err = parse_envelope(StatusCode::TOO_MANY_REQUESTS, body).unwrap_err();
        assert_eq!(
            err,
            RawError::Reported(ApiErrorBody {
                message: "Rate limit exceeded. Please try again later.".into(),
                code: "RATE_LIMIT_EXCEEDED".into(),
                status: 429,
                details: None,
            })
        );
    }

    #[test]
    fn non_json_error_uses_reason_phrase() {
        let err = parse_envelope(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").unwrap_err();
        assert_eq!(err, RawError::status(502, None, "HTTP 502: Bad Gateway"));
    }

    #[test]
    fn non_json_success_is_malformed() {
        let err = parse_envelope(StatusCode::OK, "hello").unwrap_err();
        assert!(matches!(err, RawError::Upstream { status: Some(200), .. }));
    }
}
