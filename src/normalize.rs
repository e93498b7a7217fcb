//! Conversion of raw responses into presentation-ready results.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ports::OutfitResponse;
use crate::request::{GenerationRequest, PROMPT_VERSION};

/// File names of the two inputs, kept for provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginalImages {
    /// Person photo file name.
    pub person_image_name: String,
    /// Clothing photo file name.
    pub clothing_image_name: String,
}

/// How a result was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    /// Descriptive model identity.
    pub model_used: String,
    /// Prompt template version.
    pub prompt_version: String,
    /// Source file names.
    pub original_images: OriginalImages,
}

/// Outcome of one successful attempt. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedResult {
    /// Hosted image URL, absent for description-only generators.
    pub image_url: Option<String>,
    /// Inline base64 image, absent for description-only generators.
    pub image_base64: Option<String>,
    /// MIME type of `image_base64`.
    pub image_mime_type: Option<String>,
    /// Descriptive text.
    pub description: Option<String>,
    /// Wall-clock duration of the round trip, in milliseconds.
    pub processing_time_ms: u64,
    /// When the result was created.
    pub generated_at: DateTime<Utc>,
    /// Provenance.
    pub metadata: ResultMetadata,
}

impl GeneratedResult {
    /// True when the result carries an image to download.
    #[must_use]
    pub fn has_image(&self) -> bool {
        self.image_url.is_some() || self.image_base64.is_some()
    }
}

/// Stamps results with the provenance constants of this deployment.
#[derive(Debug, Clone)]
pub struct ResultNormalizer {
    model_used: String,
}

impl ResultNormalizer {
    /// Create a normalizer reporting `model_used` as the model identity.
    pub fn new(model_used: impl Into<String>) -> Self {
        Self { model_used: model_used.into() }
    }

    /// Build the result record.
    ///
    /// `elapsed` is the caller's measurement; any timing reported by the
    /// provider is ignored. Empty image fields are dropped.
    #[must_use]
    pub fn normalize(
        &self,
        raw: OutfitResponse,
        request: &GenerationRequest,
        elapsed: Duration,
    ) -> GeneratedResult {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        let image_base64 = non_empty(raw.image_base64);
        GeneratedResult {
            image_url: non_empty(raw.image_url),
            image_mime_type: image_base64.as_ref().and(raw.image_mime_type),
            image_base64,
            description: non_empty(raw.description),
            processing_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            generated_at: Utc::now(),
            metadata: ResultMetadata {
                model_used: self.model_used.clone(),
                prompt_version: PROMPT_VERSION.to_string(),
                original_images: OriginalImages {
                    person_image_name: request.person_image.name.clone(),
                    clothing_image_name: request.clothing_image.name.clone(),
                },
            },
        }
    }
}
