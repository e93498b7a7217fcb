//! On-disk cassette format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recorded session: every port call made while recording, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cassette {
    /// Human-readable session name.
    pub name: String,
    /// When the recording finished.
    pub recorded_at: DateTime<Utc>,
    /// Source revision the recording was made from.
    pub commit: String,
    /// Calls in the order they were made.
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

/// One call through a port.
///
/// `output` follows the `Result` convention: `{"Ok": value}` or
/// `{"Err": error}`, where `error` is either a structured value or a plain
/// message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    /// Position in the whole cassette.
    pub seq: u64,
    /// Port name, e.g. `outfit_generator`.
    pub port: String,
    /// Method name on the port.
    pub method: String,
    /// Serialized arguments.
    pub input: serde_json::Value,
    /// Serialized result.
    pub output: serde_json::Value,
}
