//! Body metadata and construction of generation requests.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::upload::UploadedImage;

/// Version tag of the instruction text produced by [`build_prompt`].
pub const PROMPT_VERSION: &str = "1.0";

/// Placeholder used for body fields the user left empty.
pub const NOT_PROVIDED: &str = "Not provided";

const PROMPT_INTRO: &str = "You are an AI fashion assistant. Given a photo of a person and a photo of a clothing item, generate a realistic image showing what the person would look like wearing that clothing item.

Consider:
- The person's body type, pose, and lighting in the original photo
- The clothing item's style, color, pattern, and fit
- Natural shadows, wrinkles, and fabric behavior
- Realistic proportions and perspective";

const PROMPT_OUTRO: &str =
    "Please generate a photorealistic image of the person wearing the clothing item.";

/// Coarse body shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BodyType {
    /// Slim build.
    Slim,
    /// Average build.
    Average,
    /// Athletic build.
    Athletic,
    /// Plus-size build.
    PlusSize,
}

impl fmt::Display for BodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Slim => "slim",
            Self::Average => "average",
            Self::Athletic => "athletic",
            Self::PlusSize => "plus-size",
        })
    }
}

/// Gender as entered by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
    /// Other or unspecified.
    Other,
}

/// Optional body measurements. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyData {
    /// Height, free text (e.g. `"180cm"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    /// Weight, free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    /// Body shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_type: Option<BodyType>,
    /// Gender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    /// Age, free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
}

impl BodyData {
    /// True when no field carries a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One image payload inside a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestImage {
    /// Original file name, kept for provenance.
    pub name: String,
    /// MIME type of `data`.
    pub mime_type: String,
    /// Raw bytes (base64 when serialized).
    #[serde(with = "base64_bytes")]
    pub data: Arc<[u8]>,
}

impl RequestImage {
    fn from_upload(image: &UploadedImage) -> Self {
        Self {
            name: image.name().to_string(),
            mime_type: image.mime_type().to_string(),
            data: Arc::clone(image.data()),
        }
    }

    /// Standard base64 of the bytes.
    #[must_use]
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// `data:` URL form, as accepted by OpenAI-compatible chat APIs.
    #[must_use]
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

/// Everything needed for one round trip to the generation capability.
///
/// Built fresh for every attempt and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Photo of the person.
    pub person_image: RequestImage,
    /// Photo of the garment.
    pub clothing_image: RequestImage,
    /// Optional body measurements.
    #[serde(default)]
    pub body_data: Option<BodyData>,
    /// Instruction text derived from `body_data`.
    pub prompt: String,
}

/// Assemble a request from two already-validated uploads.
#[must_use]
pub fn build_request(
    person: &UploadedImage,
    clothing: &UploadedImage,
    body_data: Option<&BodyData>,
) -> GenerationRequest {
    GenerationRequest {
        person_image: RequestImage::from_upload(person),
        clothing_image: RequestImage::from_upload(clothing),
        body_data: body_data.cloned(),
        prompt: build_prompt(body_data),
    }
}

/// Synthesize the instruction text.
///
/// With body data present a measurements section is appended in the fixed
/// order height, weight, body type; blank fields read [`NOT_PROVIDED`].
#[must_use]
pub fn build_prompt(body_data: Option<&BodyData>) -> String {
    let mut prompt = String::from(PROMPT_INTRO);

    if let Some(body) = body_data {
        let body_type = body.body_type.map(|t| t.to_string());
        prompt.push_str("\n\nPerson's measurements:");
        prompt.push_str(&format!("\n- Height: {}", or_placeholder(body.height.as_deref())));
        prompt.push_str(&format!("\n- Weight: {}", or_placeholder(body.weight.as_deref())));
        prompt.push_str(&format!("\n- Body type: {}", or_placeholder(body_type.as_deref())));
    }

    prompt.push_str("\n\n");
    prompt.push_str(PROMPT_OUTRO);
    prompt
}

fn or_placeholder(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or(NOT_PROVIDED)
}

/// Serde helper for serializing image bytes as base64 strings in cassettes.
mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as base64 string.
    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
        serializer.serialize_str(&encoded)
    }

    /// Deserialize base64 string to bytes.
    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: From<Vec<u8>>,
    {
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(&s)
            .map(T::from)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploads() -> (UploadedImage, UploadedImage) {
        (
            UploadedImage::from_bytes("me.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF]),
            UploadedImage::from_bytes("shirt.png", "image/png", vec![0x89, 0x50]),
        )
    }

    #[test]
    fn prompt_without_body_data_has_no_measurements() {
        let prompt = build_prompt(None);
        assert!(prompt.starts_with("You are an AI fashion assistant."));
        assert!(!prompt.contains("Person's measurements"));
        assert!(prompt.ends_with(PROMPT_OUTRO));
    }

    #[test]
    fn prompt_lists_fields_in_fixed_order() {
        let body = BodyData {
            height: Some("180cm".into()),
            weight: Some("75kg".into()),
            body_type: Some(BodyType::Athletic),
            gender: Some(Gender::Male),
            age: Some("30".into()),
        };
        let prompt = build_prompt(Some(&body));
        let section = "Person's measurements:\n- Height: 180cm\n- Weight: 75kg\n- Body type: athletic";
        assert!(prompt.contains(section), "{prompt}");
        assert!(!prompt.contains("30"), "age is not part of the prompt");
    }

    #[test]
    fn missing_fields_use_placeholder() {
        let body = BodyData { weight: Some("60kg".into()), ..BodyData::default() };
        let prompt = build_prompt(Some(&body));
        assert!(prompt.contains(
            "- Height: Not provided\n- Weight: 60kg\n- Body type: Not provided"
        ));

        let empty = BodyData { height: Some(String::new()), ..BodyData::default() };
        let prompt = build_prompt(Some(&empty));
        assert_eq!(prompt.matches(NOT_PROVIDED).count(), 3);
    }

    #[test]
    fn plus_size_renders_kebab_case() {
        let body = BodyData { body_type: Some(BodyType::PlusSize), ..BodyData::default() };
        assert!(build_prompt(Some(&body)).contains("- Body type: plus-size"));
    }

    #[test]
    fn build_is_deterministic() {
        let (person, clothing) = uploads();
        let body = BodyData { height: Some("170".into()), ..BodyData::default() };
        let a = build_request(&person, &clothing, Some(&body));
        let b = build_request(&person, &clothing, Some(&body));
        assert_eq!(a, b);
        assert_eq!(a.person_image.name, "me.jpg");
        assert_eq!(a.clothing_image.mime_type, "image/png");
        assert_eq!(a.body_data, Some(body));
    }

    #[test]
    fn data_url_encoding() {
        let (person, _) = uploads();
        let image = RequestImage::from_upload(&person);
        assert_eq!(image.data_url(), "data:image/jpeg;base64,/9j/");
    }

    #[test]
    fn body_data_json_uses_camel_case_and_kebab_values() {
        let body = BodyData { body_type: Some(BodyType::PlusSize), ..BodyData::default() };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"bodyType":"plus-size"}"#);
        assert!(BodyData::default().is_empty());
        assert!(!body.is_empty());
    }

    #[test]
    fn request_bytes_survive_serialization() {
        let (person, clothing) = uploads();
        let request = build_request(&person, &clothing, None);
        let json = serde_json::to_string(&request).unwrap();
        let back: GenerationRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }
}
