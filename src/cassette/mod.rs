//! Record/replay of port interactions for deterministic runs without network.

pub mod config;
pub mod format;
pub mod recorder;
pub mod replayer;

use thiserror::Error;

/// Failures loading or consuming a cassette.
#[derive(Debug, Error)]
pub enum CassetteError {
    /// The file could not be read or written.
    #[error("cassette I/O error for {path}: {source}")]
    Io {
        /// Cassette path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not a valid cassette.
    #[error("failed to parse cassette {path}: {source}")]
    Parse {
        /// Cassette path.
        path: String,
        /// Underlying error.
        source: serde_yaml::Error,
    },
    /// Nothing was recorded for this port and method.
    #[error("no interactions recorded for {port}::{method}; available: [{available}]")]
    Unrecorded {
        /// Port name.
        port: String,
        /// Method name.
        method: String,
        /// Recorded `port::method` pairs.
        available: String,
    },
    /// Every recorded interaction has been served.
    #[error("cassette exhausted: all {count} interactions for {port}::{method} have been consumed")]
    Exhausted {
        /// Port name.
        port: String,
        /// Method name.
        method: String,
        /// Number of recorded interactions.
        count: usize,
    },
}
