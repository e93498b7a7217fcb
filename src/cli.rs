//! CLI argument parsing with clap.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::output::ImageFormat;
use crate::request::{BodyData, BodyType, Gender};

/// AI outfit visualizer: see a person wearing a garment.
#[derive(Parser, Debug)]
#[command(name = "styles", version, about)]
pub struct Cli {
    /// Photo of the person (JPEG, PNG or WebP, up to 10 MB).
    #[arg(long, value_name = "PATH")]
    pub person: PathBuf,

    /// Photo of the clothing item (JPEG, PNG or WebP, up to 10 MB).
    #[arg(long, value_name = "PATH")]
    pub clothing: PathBuf,

    /// Height, e.g. 175cm or 5'9".
    #[arg(long)]
    pub height: Option<String>,

    /// Weight, e.g. 70kg.
    #[arg(long)]
    pub weight: Option<String>,

    /// Body type.
    #[arg(long, value_enum)]
    pub body_type: Option<BodyType>,

    /// Gender.
    #[arg(long, value_enum)]
    pub gender: Option<Gender>,

    /// Age.
    #[arg(long)]
    pub age: Option<String>,

    /// Model name or alias (gemini-flash, gemini-flash-image, remote, vendor/model).
    #[arg(short, long)]
    pub model: Option<String>,

    /// Download the generated image in this format.
    #[arg(short, long, value_enum)]
    pub download: Option<ImageFormat>,

    /// JPEG quality, 1-100.
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// Download destination (implies a download).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Retry retryable failures up to this many times.
    #[arg(short, long, default_value = "0")]
    pub retries: u32,

    /// Print the result as a JSON envelope on stdout.
    #[arg(long)]
    pub json: bool,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbose output and technical error details.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Body data from the flags, or `None` when no body flag was given.
    #[must_use]
    pub fn body_data(&self) -> Option<BodyData> {
        let data = BodyData {
            height: self.height.clone(),
            weight: self.weight.clone(),
            body_type: self.body_type,
            gender: self.gender,
            age: self.age.clone(),
        };
        (!data.is_empty()).then_some(data)
    }

    /// Whether the result should be downloaded.
    #[must_use]
    pub fn wants_download(&self) -> bool {
        self.download.is_some() || self.output.is_some()
    }

    /// Directory and optional file name for the download.
    #[must_use]
    pub fn download_target(&self) -> (PathBuf, Option<String>) {
        match &self.output {
            Some(path) if path.is_dir() => (path.clone(), None),
            Some(path) => {
                let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
                (dir.to_path_buf(), path.file_name().map(|n| n.to_string_lossy().into_owned()))
            }
            None => (PathBuf::from("."), None),
        }
    }
}
