//! Replaying adapters that serve recorded interactions from cassettes.

pub mod outfit_generator;

use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;

use crate::cassette::replayer::CassetteReplayer;
use crate::cassette::CassetteError;

/// Retrieve the next recorded output for a given port and method.
pub(crate) fn next_output(
    replayer: &Arc<Mutex<CassetteReplayer>>,
    port: &str,
    method: &str,
) -> Result<serde_json::Value, CassetteError> {
    let mut guard = replayer.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(guard.next_interaction(port, method)?.output.clone())
}

/// Decode a replayed output as `Result<T, E>`.
///
/// A structured `Err` value decodes as `E`. Plain-text errors and outputs
/// that do not decode are passed to `fallback`.
pub(crate) fn replay_result<T, E>(output: serde_json::Value, fallback: impl FnOnce(String) -> E) -> Result<T, E>
where
    T: DeserializeOwned,
    E: DeserializeOwned,
{
    if let Some(err_val) = output.get("Err").or_else(|| output.get("err")) {
        return Err(match serde_json::from_value::<E>(err_val.clone()) {
            Ok(e) => e,
            Err(_) => fallback(err_val.as_str().unwrap_or("replayed error").to_string()),
        });
    }
    let ok_val = output.get("Ok").or_else(|| output.get("ok")).cloned().unwrap_or(output);
    serde_json::from_value(ok_val).map_err(|e| fallback(format!("malformed recorded output: {e}")))
}
