//! Upload validation, run before any request is built.

use thiserror::Error;

use crate::upload::UploadedImage;

/// Largest accepted image, in bytes (10 MiB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// MIME types accepted for both the person and the clothing image.
pub const SUPPORTED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Why an upload was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FileValidationError {
    /// No file was supplied.
    #[error("no-file-selected")]
    NoFileSelected,
    /// The MIME type is not one of [`SUPPORTED_IMAGE_TYPES`].
    #[error("invalid-file-type")]
    InvalidFileType,
    /// The file is larger than [`MAX_FILE_SIZE`].
    #[error("file-too-large")]
    FileTooLarge,
    /// The file could not be read.
    #[error("upload-failed")]
    UploadFailed,
}

/// Check a single upload against the type and size constraints.
///
/// # Errors
///
/// Returns the first failed check: absence, then type, then size.
pub fn validate_image(file: Option<&UploadedImage>) -> Result<(), FileValidationError> {
    let Some(file) = file else {
        return Err(FileValidationError::NoFileSelected);
    };
    if !SUPPORTED_IMAGE_TYPES.contains(&file.mime_type()) {
        return Err(FileValidationError::InvalidFileType);
    }
    if file.size() > MAX_FILE_SIZE {
        return Err(FileValidationError::FileTooLarge);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(mime: &str, size: usize) -> UploadedImage {
        UploadedImage::from_bytes("x", mime, vec![0u8; size])
    }

    #[test]
    fn absent_file_rejected() {
        assert_eq!(validate_image(None), Err(FileValidationError::NoFileSelected));
    }

    #[test]
    fn supported_types_accepted() {
        for mime in SUPPORTED_IMAGE_TYPES {
            assert!(validate_image(Some(&image(mime, 10))).is_ok(), "{mime}");
        }
    }

    #[test]
    fn unsupported_types_rejected() {
        for mime in ["image/gif", "image/bmp", "application/pdf", ""] {
            assert_eq!(
                validate_image(Some(&image(mime, 10))),
                Err(FileValidationError::InvalidFileType),
                "{mime}"
            );
        }
    }

    #[test]
    fn size_ceiling_is_inclusive() {
        let at_limit = image("image/png", usize::try_from(MAX_FILE_SIZE).unwrap());
        assert!(validate_image(Some(&at_limit)).is_ok());

        let over = image("image/png", usize::try_from(MAX_FILE_SIZE).unwrap() + 1);
        assert_eq!(validate_image(Some(&over)), Err(FileValidationError::FileTooLarge));
    }

    #[test]
    fn type_checked_before_size() {
        let big_gif = image("image/gif", usize::try_from(MAX_FILE_SIZE).unwrap() + 1);
        assert_eq!(validate_image(Some(&big_gif)), Err(FileValidationError::InvalidFileType));
    }

    #[test]
    fn kebab_identifiers() {
        assert_eq!(FileValidationError::NoFileSelected.to_string(), "no-file-selected");
        assert_eq!(FileValidationError::InvalidFileType.to_string(), "invalid-file-type");
        assert_eq!(FileValidationError::FileTooLarge.to_string(), "file-too-large");
        assert_eq!(FileValidationError::UploadFailed.to_string(), "upload-failed");

        let err: Box<dyn std::error::Error> = Box::new(FileValidationError::FileTooLarge);
        assert_eq!(err.to_string(), "file-too-large");
    }
}
