//! Live adapters that call real generation services.

pub mod gemini;
pub mod openrouter;
pub mod remote;

use std::time::Duration;

use reqwest::Client;

use crate::error::StylesError;

/// Longest response excerpt carried in a diagnostic message.
const EXCERPT_LEN: usize = 500;

/// HTTP client shared by one adapter, with a whole-request timeout.
pub(crate) fn http_client(timeout: Duration) -> Result<Client, StylesError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Cut `body` down to a loggable excerpt without splitting a character.
pub(crate) fn excerpt(body: &str) -> String {
    match body.char_indices().nth(EXCERPT_LEN) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// Split a `data:` URL into MIME type and base64 payload.
pub(crate) fn split_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    Some((mime, payload))
}
