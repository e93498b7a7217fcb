//! Uploaded images and their preview resources.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::StylesError;

/// Edge length of generated preview thumbnails, in pixels.
const PREVIEW_EDGE: u32 = 256;

static PREVIEW_COUNTER: AtomicU64 = AtomicU64::new(0);

/// An image supplied by the user, held in memory until a request is built.
///
/// Cloning is cheap: the bytes and the optional preview are shared. The
/// preview file is removed once the last clone is dropped, so replacing an
/// image in a slot releases its preview.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    name: String,
    size: u64,
    mime_type: String,
    data: Arc<[u8]>,
    preview: Option<Arc<PreviewHandle>>,
}

impl UploadedImage {
    /// Wrap in-memory bytes. The byte size is taken from `data`.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size: data.len() as u64,
            mime_type: mime_type.into(),
            data,
            preview: None,
        }
    }

    /// Read an image file from disk.
    ///
    /// The MIME type comes from the file extension, falling back to sniffing
    /// the content. Unknown content yields `application/octet-stream`, which
    /// the validator then rejects.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn open(path: &Path) -> Result<Self, StylesError> {
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let mime_type = detect_mime(path, &data);
        debug!(name = %name, size = data.len(), mime = %mime_type, "loaded image");
        Ok(Self::from_bytes(name, mime_type, data))
    }

    /// Attach a thumbnail preview written into `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be decoded or the thumbnail
    /// cannot be written.
    pub fn with_preview(mut self, dir: &Path) -> Result<Self, StylesError> {
        let handle = PreviewHandle::create(&self.data, dir)?;
        self.preview = Some(Arc::new(handle));
        Ok(self)
    }

    /// Display name (the original file name).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Declared MIME type.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Shared image bytes.
    #[must_use]
    pub fn data(&self) -> &Arc<[u8]> {
        &self.data
    }

    /// Path of the preview thumbnail, if one was attached.
    #[must_use]
    pub fn preview_path(&self) -> Option<&Path> {
        self.preview.as_deref().map(PreviewHandle::path)
    }
}

/// A thumbnail file on disk that is deleted when the handle is dropped.
#[derive(Debug)]
pub struct PreviewHandle {
    path: PathBuf,
}

impl PreviewHandle {
    fn create(data: &[u8], dir: &Path) -> Result<Self, StylesError> {
        let img = image::load_from_memory(data)
            .map_err(|e| StylesError::ImageConversion(format!("Failed to decode image: {e}")))?;
        std::fs::create_dir_all(dir)?;
        let seq = PREVIEW_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!("preview-{}-{seq}.png", std::process::id()));
        img.thumbnail(PREVIEW_EDGE, PREVIEW_EDGE)
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| StylesError::ImageConversion(format!("Failed to write preview: {e}")))?;
        Ok(Self { path })
    }

    /// Location of the thumbnail.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release preview");
        }
    }
}

fn detect_mime(path: &Path, data: &[u8]) -> String {
    let by_extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    match by_extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg".to_string(),
        Some("png") => "image/png".to_string(),
        Some("webp") => "image/webp".to_string(),
        _ => image::guess_format(data)
            .map_or_else(|_| "application/octet-stream".to_string(), |f| f.to_mime_type().to_string()),
    }
}
