//! Exporting generated images and formatting durations for display.

use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine;
use chrono::NaiveDateTime;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapters::live::split_data_url;
use crate::error::StylesError;
use crate::normalize::GeneratedResult;

/// JPEG quality used when none is given.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Formats a result can be downloaded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless PNG.
    Png,
    /// JPEG with configurable quality.
    Jpeg,
}

impl ImageFormat {
    /// File extension, without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    fn codec(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// How to export a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Target format.
    pub format: ImageFormat,
    /// JPEG quality 1-100; ignored for PNG. Defaults to [`DEFAULT_JPEG_QUALITY`].
    pub quality: Option<u8>,
    /// File name; generated from the current time when absent.
    pub filename: Option<String>,
}

/// Default export file name, e.g. `styles-outfit-2025-01-31-14-05-09.png`.
#[must_use]
pub fn generate_filename(format: ImageFormat, at: NaiveDateTime) -> String {
    format!("styles-outfit-{}.{}", at.format("%Y-%m-%d-%H-%M-%S"), format.extension())
}

/// Human form of a processing time: `850ms`, `4s`, `2m 5s`.
#[must_use]
pub fn format_processing_time(ms: u64) -> String {
    if ms < 1000 {
        return format!("{ms}ms");
    }
    format_seconds((ms + 500) / 1000)
}

/// Human form of whole elapsed seconds: `12s`, `1m 3s`.
#[must_use]
pub fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        format!("{seconds}s")
    } else {
        format!("{}m {}s", seconds / 60, seconds % 60)
    }
}

/// Write the image of `result` into `dir` and return the file path.
///
/// Inline data is decoded locally and hosted URLs are fetched. The bytes are
/// re-encoded when their format differs from the requested one, or when an
/// explicit JPEG quality is given.
///
/// # Errors
///
/// Fails when the result carries no image, when a JPEG quality is out of
/// range, or when fetching, decoding or writing fails. The quality is ignored
/// for PNG.
pub async fn export_result(
    result: &GeneratedResult,
    options: &DownloadOptions,
    dir: &Path,
) -> Result<PathBuf, StylesError> {
    let quality = options.quality.unwrap_or(DEFAULT_JPEG_QUALITY);
    if options.format == ImageFormat::Jpeg {
        check_jpeg_quality(quality)?;
    }

    let source = source_bytes(result).await?;
    let reencode = image::guess_format(&source).ok() != Some(options.format.codec())
        || (options.format == ImageFormat::Jpeg && options.quality.is_some());
    let bytes = if reencode { encode(&source, options.format, quality)? } else { source };

    let filename = options
        .filename
        .clone()
        .unwrap_or_else(|| generate_filename(options.format, chrono::Local::now().naive_local()));
    let path = dir.join(filename);
    std::fs::write(&path, bytes)?;
    debug!(path = %path.display(), format = %options.format, reencode, "result exported");
    Ok(path)
}

/// Reject a JPEG quality outside 1-100.
///
/// # Errors
///
/// Returns [`StylesError::InvalidArgument`] for an out-of-range value.
pub fn check_jpeg_quality(quality: u8) -> Result<(), StylesError> {
    if (1..=100).contains(&quality) {
        Ok(())
    } else {
        Err(StylesError::InvalidArgument(format!("JPEG quality must be 1-100, got {quality}")))
    }
}

async fn source_bytes(result: &GeneratedResult) -> Result<Vec<u8>, StylesError> {
    let decode = |b64: &str| {
        base64::engine::general_purpose::STANDARD
            .decode(b64.trim())
            .map_err(|e| StylesError::ImageConversion(format!("Failed to decode base64 image: {e}")))
    };

    if let Some(b64) = &result.image_base64 {
        return decode(split_data_url(b64).map_or(b64.as_str(), |(_, payload)| payload));
    }
    match result.image_url.as_deref() {
        Some(url) if url.starts_with("data:") => {
            let (_, payload) = split_data_url(url)
                .ok_or_else(|| StylesError::ImageConversion("Unsupported data URL".to_string()))?;
            decode(payload)
        }
        Some(url) => {
            let response = reqwest::get(url).await?.error_for_status()?;
            Ok(response.bytes().await?.to_vec())
        }
        None => Err(StylesError::InvalidArgument("The result has no image to download.".to_string())),
    }
}

fn encode(data: &[u8], format: ImageFormat, quality: u8) -> Result<Vec<u8>, StylesError> {
    let img = image::load_from_memory(data)
        .map_err(|e| StylesError::ImageConversion(format!("Failed to decode image: {e}")))?;

    let mut buf = Cursor::new(Vec::new());
    let written = match format {
        ImageFormat::Png => img.write_to(&mut buf, image::ImageFormat::Png),
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
        }
    };
    written.map_err(|e| StylesError::ImageConversion(format!("Failed to encode as {format}: {e}")))?;
    Ok(buf.into_inner())
}
