//! Service context that selects the generator behind the gateway.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::info;

use crate::adapters::live::gemini::GeminiGenerator;
use crate::adapters::live::openrouter::OpenRouterGenerator;
use crate::adapters::live::remote::RemoteGenerator;
use crate::adapters::recording::outfit_generator::{RecordingOutfitGenerator, PORT};
use crate::adapters::replaying::outfit_generator::ReplayingOutfitGenerator;
use crate::cassette::config::load_cassette;
use crate::cassette::recorder::CassetteRecorder;
use crate::config::Config;
use crate::error::StylesError;
use crate::model::Provider;
use crate::ports::{Capabilities, OutfitGenerator};

/// Environment variable naming a cassette to replay.
pub const REPLAY_VAR: &str = "STYLES_REPLAY";
/// Environment variable enabling recording (`1` or `true`).
pub const RECORD_VAR: &str = "STYLES_REC";

/// Holds the generator for one run.
pub struct ServiceContext {
    /// Outfit generator port.
    pub generator: Box<dyn OutfitGenerator>,
}

/// Handle to a recording session that must be finished after use.
pub struct RecordingSession {
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingSession {
    /// Write the cassette to disk.
    ///
    /// The recording generator keeps a handle on the recorder, so this works
    /// whether or not the context has been dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be written.
    pub fn finish(self) -> Result<PathBuf, StylesError> {
        let recorder = match Arc::try_unwrap(self.recorder) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
            Err(shared) => {
                let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
                let placeholder = CassetteRecorder::new(PathBuf::new(), String::new(), String::new());
                std::mem::replace(&mut *guard, placeholder)
            }
        };
        recorder.finish().map_err(|e| StylesError::Config(format!("Failed to write cassette: {e}")))
    }
}

impl ServiceContext {
    /// Create a live context for `model` served by `provider`.
    ///
    /// Missing API keys are not an error here; they are reported by the
    /// generator when an attempt starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote endpoint is not configured or the HTTP
    /// client cannot be built.
    pub fn live(provider: Provider, model: &str, config: &Config) -> Result<Self, StylesError> {
        let timeout = Duration::from_secs(config.defaults.timeout_secs);
        let generator: Box<dyn OutfitGenerator> = match provider {
            Provider::OpenRouter => Box::new(OpenRouterGenerator::new(config.openrouter_key(), model, timeout)?),
            Provider::Gemini => Box::new(GeminiGenerator::new(config.gemini_key(), model, timeout)?),
            Provider::Remote => {
                let endpoint = config.remote.endpoint.as_deref().ok_or_else(|| {
                    StylesError::Config("No remote endpoint configured. Set [remote] endpoint in the config file.".into())
                })?;
                Box::new(RemoteGenerator::new(endpoint, timeout)?)
            }
        };
        Ok(Self { generator })
    }

    /// Create a recording context that wraps a live generator, writing under
    /// `root/<timestamp>/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the live context cannot be created.
    pub fn recording(
        provider: Provider,
        model: &str,
        config: &Config,
        root: &Path,
    ) -> Result<(Self, RecordingSession), StylesError> {
        let live = Self::live(provider, model, config)?;

        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let path = root.join(&timestamp).join(format!("{PORT}.cassette.yaml"));
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(
            path,
            format!("{timestamp}-{PORT}"),
            commit_hash(),
        )));

        let generator = RecordingOutfitGenerator::new(live.generator, Arc::clone(&recorder));
        Ok((Self { generator: Box::new(generator) }, RecordingSession { recorder }))
    }

    /// Create a replaying context from a cassette file.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be loaded.
    pub fn replaying(path: &Path, capabilities: Capabilities) -> Result<Self, StylesError> {
        let replayer = load_cassette(path).map_err(|e| StylesError::Config(format!("Failed to load cassette: {e}")))?;
        let generator = ReplayingOutfitGenerator::new(Arc::new(Mutex::new(replayer)), capabilities);
        Ok(Self { generator: Box::new(generator) })
    }

    /// Pick live, recording or replaying mode from the environment.
    ///
    /// `STYLES_REPLAY=<path>` wins over `STYLES_REC`.
    ///
    /// # Errors
    ///
    /// Propagates errors from the selected constructor.
    pub fn from_env(
        provider: Provider,
        model: &str,
        config: &Config,
    ) -> Result<(Self, Option<RecordingSession>), StylesError> {
        if let Some(path) = std::env::var_os(REPLAY_VAR) {
            let path = PathBuf::from(path);
            info!(cassette = %path.display(), "replaying generator interactions");
            let capabilities = Self::live(provider, model, config)
                .map(|ctx| ctx.generator.capabilities())
                .unwrap_or_default();
            return Ok((Self::replaying(&path, capabilities)?, None));
        }

        if std::env::var(RECORD_VAR).is_ok_and(|v| v == "1" || v == "true") {
            info!("recording generator interactions");
            let (ctx, session) = Self::recording(provider, model, config, Path::new(".styles/cassettes"))?;
            return Ok((ctx, Some(session)));
        }

        Ok((Self::live(provider, model, config)?, None))
    }
}

/// Current git commit hash, or "unknown" if unavailable.
fn commit_hash() -> String {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map_or_else(|| "unknown".to_string(), |s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteConfig;

    #[test]
    fn live_without_keys_defers_the_failure() {
        let ctx = ServiceContext::live(Provider::OpenRouter, "google/gemini-2.0-flash-exp:free", &Config::default())
            .unwrap();
        assert!(!ctx.generator.capabilities().image_output);
    }

    #[test]
    fn remote_requires_endpoint() {
        let err = ServiceContext::live(Provider::Remote, "remote", &Config::default()).err().unwrap();
        assert!(matches!(err, StylesError::Config(_)));

        let config = Config {
            remote: RemoteConfig { endpoint: Some("http://localhost:3000/api/generate-outfit".into()) },
            ..Config::default()
        };
        assert!(ServiceContext::live(Provider::Remote, "remote", &config).is_ok());
    }

    #[test]
    fn replaying_fixture_carries_capabilities() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("test_fixtures/openrouter_description.cassette.yaml");
        let ctx = ServiceContext::replaying(&path, Capabilities { image_output: true }).unwrap();
        assert!(ctx.generator.capabilities().image_output);
        assert!(ctx.generator.credentials().is_ok());
    }

    #[test]
    fn recording_session_finishes_after_context_dropped() {
        let root = std::env::temp_dir().join("styles_context_recording_test");
        let _ = std::fs::remove_dir_all(&root);
        let (ctx, session) =
            ServiceContext::recording(Provider::OpenRouter, "google/gemini-2.0-flash-exp:free", &Config::default(), &root)
                .unwrap();
        drop(ctx);
        let path = session.finish().unwrap();
        assert!(path.starts_with(&root));
        assert!(path.exists());
        let _ = std::fs::remove_dir_all(&root);
    }
}
