//! Plain-text rendering of session states for the terminal.

use std::fmt::Write as _;

use crate::classify::ErrorState;
use crate::normalize::GeneratedResult;
use crate::orchestrator::{GenerationState, LoadingStatus};
use crate::output::{format_processing_time, format_seconds};

/// Render any state. `show_details` adds diagnostic text to errors.
#[must_use]
pub fn render_state(state: &GenerationState, show_details: bool) -> String {
    match state {
        GenerationState::Idle => render_idle(),
        GenerationState::Loading(status) => render_loading(status),
        GenerationState::Success(result) => render_success(result),
        GenerationState::Error(error) => render_error(error, show_details),
    }
}

/// Idle view.
#[must_use]
pub fn render_idle() -> String {
    "Idle. Provide a person photo and a clothing photo to generate an outfit.".to_string()
}

/// One progress line, e.g. `[ 50%] AI is analyzing your images... (3s)`.
#[must_use]
pub fn render_loading(status: &LoadingStatus) -> String {
    format!(
        "[{:>3}%] {} ({})",
        status.stage.percent(),
        status.stage.message(),
        format_seconds(status.elapsed().as_secs())
    )
}

/// Success view: timing, provenance and description.
#[must_use]
pub fn render_success(result: &GeneratedResult) -> String {
    let mut out = format!("Outfit generated in {}", format_processing_time(result.processing_time_ms));
    let meta = &result.metadata;
    let _ = write!(
        out,
        "\nModel: {}\nPerson: {}  Clothing: {}",
        meta.model_used, meta.original_images.person_image_name, meta.original_images.clothing_image_name
    );
    if let Some(description) = &result.description {
        let _ = write!(out, "\n\n{}", description.trim());
    }
    if !result.has_image() {
        out.push_str("\n\n(This model returns a description only; there is no image to download.)");
    }
    out
}

/// Error view: category, message, suggestion and retry hint.
#[must_use]
pub fn render_error(error: &ErrorState, show_details: bool) -> String {
    let mut out = format!("{}: {}\n{}", error.code.category(), error.message, error.code.suggestion());
    if show_details {
        if let Some(details) = &error.details {
            let _ = write!(out, "\nDetails ({}, status {}): {details}", error.code, error.status);
        }
    }
    if error.is_retryable {
        out.push_str("\nThis error may go away if you try again.");
    }
    out
}
