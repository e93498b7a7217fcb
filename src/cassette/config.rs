//! Loading cassettes for replay.

use std::path::Path;

use super::format::Cassette;
use super::replayer::CassetteReplayer;
use super::CassetteError;

/// Load a cassette file and create a replayer.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_cassette(path: &Path) -> Result<CassetteReplayer, CassetteError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| CassetteError::Io { path: path.display().to_string(), source })?;
    let cassette: Cassette = serde_yaml::from_str(&content)
        .map_err(|source| CassetteError::Parse { path: path.display().to_string(), source })?;
    Ok(CassetteReplayer::new(&cassette))
}
