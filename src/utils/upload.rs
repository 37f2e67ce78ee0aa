//! Reading user images into memory.
//!
//! The media type is sniffed from magic bytes first; a declared `image/*`
//! content type is only trusted when sniffing is inconclusive.
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::ImageFormat;

use crate::error::{AppError, AppResult};

const ACCEPTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::WebP,
    ImageFormat::Bmp,
];

#[derive(Debug, Clone, PartialEq)]
pub struct UploadedImage {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn from_bytes(bytes: Vec<u8>, declared_type: Option<&str>, file_name: impl Into<String>) -> AppResult<Self> {
        let file_name = file_name.into();
        if bytes.is_empty() {
            return Err(AppError::FileRead(format!("{} is empty", file_name)));
        }
        let media_type = detect_media_type(&bytes, declared_type).ok_or_else(|| {
            AppError::FileRead(format!("{} is not a supported image (png, jpeg, gif, webp, bmp)", file_name))
        })?;
        tracing::debug!(file = %file_name, media_type = %media_type, size = bytes.len(), "Image loaded");
        Ok(UploadedImage { file_name, media_type, bytes })
    }

    pub async fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::FileRead(format!("{}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Self::from_bytes(bytes, None, file_name)
    }

    pub fn base64_data(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// Locally displayable reference to the upload.
    pub fn preview_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.base64_data())
    }
}

pub fn detect_media_type(bytes: &[u8], declared_type: Option<&str>) -> Option<String> {
    if let Ok(format) = image::guess_format(bytes) {
        return ACCEPTED_FORMATS
            .contains(&format)
            .then(|| format.to_mime_type().to_string());
    }
    declared_type
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| t.starts_with("image/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn sniffs_png_regardless_of_declared_type() {
        let img = UploadedImage::from_bytes(PNG_HEADER.to_vec(), Some("image/jpeg"), "cat.png").unwrap();
        assert_eq!(img.media_type, "image/png");
        assert!(img.preview_uri().starts_with("data:image/png;base64,iVBORw0K"));
    }

    #[test]
    fn falls_back_to_declared_image_type() {
        let img = UploadedImage::from_bytes(b"not magic".to_vec(), Some("image/heic"), "x.heic").unwrap();
        assert_eq!(img.media_type, "image/heic");
    }

    #[test]
    fn rejects_non_images_and_empty_files() {
        let err = UploadedImage::from_bytes(b"hello".to_vec(), Some("text/plain"), "a.txt").unwrap_err();
        assert!(matches!(err, AppError::FileRead(_)));
        let err = UploadedImage::from_bytes(Vec::new(), None, "empty.png").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let err = UploadedImage::from_path("/definitely/not/here.png").await.unwrap_err();
        assert!(matches!(err, AppError::FileRead(_)));
    }
}
