//! Styles - AI outfit visualizer CLI.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::watch;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use styles::cli::Cli;
use styles::config::{self, Config};
use styles::context::ServiceContext;
use styles::error::StylesError;
use styles::gateway::GenerationGateway;
use styles::model::{detect_provider, model_label, resolve_model};
use styles::normalize::ResultNormalizer;
use styles::orchestrator::{GenerationInputs, GenerationState, LoadingStage, Orchestrator};
use styles::output::DownloadOptions;
use styles::render::{render_error, render_loading, render_state, render_success};
use styles::store::{load_body_data, save_body_data, JsonFileStore};
use styles::upload::UploadedImage;
use styles::validate::FileValidationError;
use styles::wire::ApiResponse;

/// Exit status after Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let verbose = cli.verbose;

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(StylesError::Generation(error)) => {
            eprintln!("{}", render_error(&error, verbose));
            ExitCode::FAILURE
        }
        Err(StylesError::Cancelled) => {
            eprintln!("Cancelled.");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "styles=debug,warn" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

async fn run(cli: Cli) -> Result<(), StylesError> {
    let config_path = config::discover_config_path(cli.config.as_deref());
    let config = Config::load(&config_path)?;

    let requested = cli.model.clone().unwrap_or_else(|| config.defaults.model.clone());
    let model = resolve_model(&requested);
    let provider = detect_provider(&model)?;
    info!(%model, %provider, requested = %requested, "model resolved");

    let inputs = GenerationInputs {
        person: Some(open_image(&cli.person)?),
        clothing: Some(open_image(&cli.clothing)?),
        body_data: remembered_body_data(&cli),
    };

    let (ctx, recording) = ServiceContext::from_env(provider, &model, &config)?;
    let orchestrator = Orchestrator::new(
        GenerationGateway::new(ctx.generator),
        ResultNormalizer::new(model_label(&model, provider)),
    );

    debug!(ready = orchestrator.can_generate(&inputs), "inputs collected");
    let mut updates = orchestrator.subscribe();
    let mut state = orchestrator.start(inputs).map_err(|e| StylesError::InvalidArgument(e.to_string()))?;
    if state.is_loading() {
        eprintln!("Generating outfit with {model}. Press Ctrl-C to cancel.");
    }

    let mut retries_left = cli.retries;
    let outcome = loop {
        let Some(settled) = follow(&orchestrator, &mut updates, state).await else {
            finish_recording(recording);
            return Err(StylesError::Cancelled);
        };
        match &settled {
            GenerationState::Error(error) if error.is_retryable && retries_left > 0 => {
                retries_left -= 1;
                eprintln!("{}", render_error(error, cli.verbose));
                eprintln!("Retrying ({retries_left} retries left)...");
                state = orchestrator.retry().map_err(|e| StylesError::InvalidArgument(e.to_string()))?;
            }
            _ => break settled,
        }
    };

    let outcome = match outcome {
        GenerationState::Success(result) => {
            if cli.json {
                print_envelope(&ApiResponse::from_result(&result))?;
            } else {
                println!("{}", render_success(&result));
            }
            if cli.wants_download() {
                let (dir, filename) = cli.download_target();
                let options = DownloadOptions {
                    format: cli.download.unwrap_or(config.defaults.download_format),
                    quality: cli.quality.or(Some(config.defaults.jpeg_quality)),
                    filename,
                };
                orchestrator
                    .download(&options, &dir)
                    .await
                    .map(|path| eprintln!("Saved: {}", path.display()))
                    .map_err(StylesError::Generation)
            } else {
                Ok(())
            }
        }
        GenerationState::Error(error) => {
            if cli.json {
                print_envelope(&ApiResponse::from_error(&error))?;
            }
            Err(StylesError::Generation(error))
        }
        other => {
            debug!(state = other.name(), "generation ended without a result");
            Err(StylesError::Cancelled)
        }
    };

    finish_recording(recording);
    outcome
}

/// Print stage changes until the attempt settles. `None` means the user
/// cancelled with Ctrl-C.
async fn follow(
    orchestrator: &Orchestrator,
    updates: &mut watch::Receiver<GenerationState>,
    mut state: GenerationState,
) -> Option<GenerationState> {
    let mut shown: Option<LoadingStage> = None;
    loop {
        if !state.is_loading() {
            return Some(state);
        }
        if let GenerationState::Loading(status) = &state {
            if shown != Some(status.stage) {
                eprintln!("{}", render_loading(status));
                shown = Some(status.stage);
            }
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return Some(orchestrator.state());
                }
                state = updates.borrow_and_update().clone();
            }
            _ = tokio::signal::ctrl_c() => {
                let state = orchestrator.cancel();
                eprintln!("{}", render_state(&state, false));
                return None;
            }
        }
    }
}

fn open_image(path: &Path) -> Result<UploadedImage, StylesError> {
    UploadedImage::open(path).map_err(|e| {
        StylesError::InvalidArgument(format!("{} ({}): {e}", FileValidationError::UploadFailed, path.display()))
    })
}

/// Body flags are remembered for later runs; without flags the last saved
/// measurements are reused.
fn remembered_body_data(cli: &Cli) -> Option<styles::request::BodyData> {
    let store = JsonFileStore::in_dir(&config::config_dir());
    match cli.body_data() {
        Some(data) => {
            save_body_data(&store, &data);
            Some(data)
        }
        None => load_body_data(&store),
    }
}

fn print_envelope(response: &ApiResponse) -> Result<(), StylesError> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| StylesError::InvalidArgument(format!("Failed to encode response: {e}")))?;
    println!("{json}");
    Ok(())
}

fn finish_recording(session: Option<styles::context::RecordingSession>) {
    if let Some(session) = session {
        match session.finish() {
            Ok(path) => eprintln!("Cassette saved: {}", path.display()),
            Err(e) => eprintln!("Warning: failed to save cassette: {e}"),
        }
    }
}
