//! Configuration file loading with environment variable overrides.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::adapters::live::gemini::GEMINI_KEY_VAR;
use crate::adapters::live::openrouter::OPENROUTER_KEY_VAR;
use crate::error::StylesError;
use crate::output::{check_jpeg_quality, ImageFormat, DEFAULT_JPEG_QUALITY};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// API keys.
    #[serde(default)]
    pub keys: KeysConfig,

    /// Defaults used when CLI flags are not given.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Remote `generate-outfit` service.
    #[serde(default)]
    pub remote: RemoteConfig,
}

/// API key configuration.
#[derive(Debug, Default, Deserialize)]
pub struct KeysConfig {
    /// `OpenRouter` API key.
    pub openrouter: Option<String>,
    /// Gemini API key.
    pub gemini: Option<String>,
}

/// Default values from the config file.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Model name or alias.
    pub model: String,
    /// Format used when downloading a result.
    pub download_format: ImageFormat,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
    /// Whole-request timeout for generation calls, in seconds.
    pub timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            model: "gemini-flash".to_string(),
            download_format: ImageFormat::Png,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            timeout_secs: 120,
        }
    }
}

/// Remote service configuration.
#[derive(Debug, Default, Deserialize)]
pub struct RemoteConfig {
    /// URL accepting the multipart generation form.
    pub endpoint: Option<String>,
}

impl Config {
    /// Load configuration from the given path, or return defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if `jpeg_quality` is outside 1-100.
    pub fn load(path: &Path) -> Result<Self, StylesError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| StylesError::Config(format!("Failed to read config {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| StylesError::Config(format!("Failed to parse config {}: {e}", path.display())))?;
        check_jpeg_quality(config.defaults.jpeg_quality)
            .map_err(|e| StylesError::Config(format!("{}: {e}", path.display())))?;
        Ok(config)
    }

    /// `OpenRouter` key, preferring the environment variable.
    #[must_use]
    pub fn openrouter_key(&self) -> Option<String> {
        pick_key(std::env::var(OPENROUTER_KEY_VAR).ok(), self.keys.openrouter.as_deref())
    }

    /// Gemini key, preferring the environment variable.
    #[must_use]
    pub fn gemini_key(&self) -> Option<String> {
        pick_key(std::env::var(GEMINI_KEY_VAR).ok(), self.keys.gemini.as_deref())
    }
}

/// Blank values count as absent so an empty variable cannot mask the file.
fn pick_key(env: Option<String>, file: Option<&str>) -> Option<String> {
    env.filter(|k| !k.trim().is_empty())
        .or_else(|| file.filter(|k| !k.trim().is_empty()).map(str::to_string))
}

/// Discover the config file path using the resolution order:
/// 1. Explicit path (from `--config` flag)
/// 2. `STYLES_CONFIG` environment variable
/// 3. `~/.config/styles/config.toml`
#[must_use]
pub fn discover_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    if let Ok(p) = std::env::var("STYLES_CONFIG") {
        return PathBuf::from(p);
    }

    config_dir().join("config.toml")
}

/// `~/.config/styles`, or the working directory when `HOME` is unset.
#[must_use]
pub fn config_dir() -> PathBuf {
    std::env::var_os("HOME").map_or_else(|| PathBuf::from("."), |home| PathBuf::from(home).join(".config/styles"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.keys.openrouter.is_none());
        assert!(config.remote.endpoint.is_none());
        assert_eq!(config.defaults.model, "gemini-flash");
        assert_eq!(config.defaults.download_format, ImageFormat::Png);
        assert_eq!(config.defaults.jpeg_quality, 90);
        assert_eq!(config.defaults.timeout_secs, 120);
    }

    #[test]
    fn load_nonexistent_returns_defaults() {
        let config = Config::load(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(config.defaults.model, "gemini-flash");
    }

    #[test]
    fn load_partial_toml() {
        let dir = std::env::temp_dir().join("styles_config_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            r#"
[keys]
openrouter = "sk-or-test"

[defaults]
download_format = "jpeg"
jpeg_quality = 75

[remote]
endpoint = "http://localhost:3000/api/generate-outfit"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.keys.openrouter.as_deref(), Some("sk-or-test"));
        assert!(config.keys.gemini.is_none());
        assert_eq!(config.defaults.download_format, ImageFormat::Jpeg);
        assert_eq!(config.defaults.jpeg_quality, 75);
        assert_eq!(config.defaults.model, "gemini-flash");
        assert_eq!(config.remote.endpoint.as_deref(), Some("http://localhost:3000/api/generate-outfit"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_invalid_toml() {
        let dir = std::env::temp_dir().join("styles_config_bad_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();

        assert!(matches!(Config::load(&path), Err(StylesError::Config(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_rejects_out_of_range_jpeg_quality() {
        let dir = std::env::temp_dir().join("styles_config_quality_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[defaults]\njpeg_quality = 0\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("JPEG quality must be 1-100, got 0"), "got {err}");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn environment_beats_file_unless_blank() {
        assert_eq!(pick_key(Some("env".into()), Some("file")).as_deref(), Some("env"));
        assert_eq!(pick_key(Some("  ".into()), Some("file")).as_deref(), Some("file"));
        assert_eq!(pick_key(None, Some("")), None);
        assert_eq!(pick_key(None, None), None);
    }

    #[test]
    fn discover_explicit_path() {
        let path = discover_config_path(Some(Path::new("/tmp/my-config.toml")));
        assert_eq!(path, PathBuf::from("/tmp/my-config.toml"));
    }
}
