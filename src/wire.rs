//! JSON envelopes exchanged with a remote `generate-outfit` service.
//!
//! Success: `{ "success": true, "data": { ... }, "message": "..." }`
//! Failure: `{ "success": false, "error": { "message", "code", "status", "details"? } }`

use serde::{Deserialize, Serialize};

use crate::classify::ErrorState;
use crate::normalize::GeneratedResult;

/// Payload of a successful envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOutfitData {
    /// Hosted image URL; empty when the service produced none.
    #[serde(default)]
    pub generated_image_url: String,
    /// Inline base64 image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_image_base64: Option<String>,
    /// Descriptive text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Server-measured processing time in milliseconds.
    #[serde(default)]
    pub processing_time: u64,
}

/// Error object of a failure envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// User-facing message.
    pub message: String,
    /// Error code, normally one of the closed taxonomy.
    pub code: String,
    /// HTTP-like status.
    pub status: u16,
    /// Diagnostic text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// A parsed envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Envelope", into = "Envelope")]
pub enum ApiResponse {
    /// `success: true`.
    Success {
        /// Result payload.
        data: GenerateOutfitData,
        /// Human-readable status line.
        message: String,
    },
    /// `success: false`.
    Failure(ApiErrorBody),
}

impl ApiResponse {
    /// Envelope describing a finished result.
    #[must_use]
    pub fn from_result(result: &GeneratedResult) -> Self {
        Self::Success {
            data: GenerateOutfitData {
                generated_image_url: result.image_url.clone().unwrap_or_default(),
                generated_image_base64: result.image_base64.clone(),
                description: result.description.clone(),
                processing_time: result.processing_time_ms,
            },
            message: "Outfit visualization generated successfully".to_string(),
        }
    }

    /// Envelope describing a classified failure.
    #[must_use]
    pub fn from_error(error: &ErrorState) -> Self {
        Self::Failure(ApiErrorBody {
            message: error.message.clone(),
            code: error.code.to_string(),
            status: error.status,
            details: error.details.clone(),
        })
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<GenerateOutfitData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ApiErrorBody>,
}

impl TryFrom<Envelope> for ApiResponse {
    type Error = String;

    fn try_from(env: Envelope) -> Result<Self, Self::Error> {
        if env.success {
            let data = env.data.ok_or("success envelope without data")?;
            Ok(Self::Success { data, message: env.message.unwrap_or_default() })
        } else {
            env.error.map(Self::Failure).ok_or_else(|| "failure envelope without error".to_string())
        }
    }
}

impl From<ApiResponse> for Envelope {
    fn from(response: ApiResponse) -> Self {
        match response {
            ApiResponse::Success { data, message } => {
                Self { success: true, data: Some(data), message: Some(message), error: None }
            }
            ApiResponse::Failure(error) => {
                Self { success: false, data: None, message: None, error: Some(error) }
            }
        }
    }
}
