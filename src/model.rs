//! Model name resolution and provider detection.

use std::fmt;

use crate::error::StylesError;

/// Services that can generate outfits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// `OpenRouter` chat completions.
    OpenRouter,
    /// Google Gemini API.
    Gemini,
    /// Remote `generate-outfit` service.
    Remote,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OpenRouter => "OpenRouter",
            Self::Gemini => "Gemini",
            Self::Remote => "remote service",
        })
    }
}

/// Model name reserved for the remote service.
pub const REMOTE_MODEL: &str = "remote";

/// Short name aliases for supported models.
const ALIASES: &[(&str, &str)] = &[
    ("gemini-flash", "google/gemini-2.0-flash-exp:free"),
    ("gemini-flash-image", "gemini-2.5-flash-image"),
];

/// Resolve a model name (alias or exact) to the full model identifier.
#[must_use]
pub fn resolve_model(name: &str) -> String {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map_or_else(|| name.to_string(), |(_, full)| (*full).to_string())
}

/// Detect the provider from a resolved model name.
///
/// # Errors
///
/// Returns an error if the name matches no provider.
pub fn detect_provider(model: &str) -> Result<Provider, StylesError> {
    if model == REMOTE_MODEL {
        Ok(Provider::Remote)
    } else if model.starts_with("gemini-") {
        Ok(Provider::Gemini)
    } else if model.split_once('/').is_some_and(|(vendor, name)| !vendor.is_empty() && !name.is_empty()) {
        Ok(Provider::OpenRouter)
    } else {
        Err(StylesError::InvalidArgument(format!(
            "Unknown provider for model '{model}'. Expected 'gemini-*', 'vendor/model' or 'remote'."
        )))
    }
}

/// Model identity recorded in result metadata.
#[must_use]
pub fn model_label(model: &str, provider: Provider) -> String {
    match provider {
        Provider::Remote => "remote generate-outfit service".to_string(),
        other => format!("{model} (via {other})"),
    }
}
