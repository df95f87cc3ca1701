//! Selected or captured images.

use std::path::Path;

use tokio::fs;
use tracing::debug;

use oracare_core::{OraError, OraResult};

/// Name given to camera captures.
pub const CAPTURE_FILE_NAME: &str = "webcam-capture.jpg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// A camera frame, always JPEG.
    pub fn captured(bytes: Vec<u8>) -> Self {
        Self::new(CAPTURE_FILE_NAME, "image/jpeg", bytes)
    }

    /// Read a file from disk, typing it by extension.
    pub async fn from_path(path: &Path) -> OraResult<Self> {
        let bytes = fs::read(path).await.map_err(|e| {
            OraError::InvalidInput(format!("cannot read {}: {e}", path.display()))
        })?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(CAPTURE_FILE_NAME)
            .to_string();
        let content_type = detect_mime_type(path);
        debug!(name = %name, content_type, size = bytes.len(), "Loaded image file");
        Ok(Self::new(name, content_type, bytes))
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// Detect MIME type by file extension.
pub fn detect_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png"          => "image/png",
        "gif"          => "image/gif",
        "webp"         => "image/webp",
        "bmp"          => "image/bmp",
        "tiff" | "tif" => "image/tiff",
        "heic"         => "image/heic",
        "heif"         => "image/heif",
        "avif"         => "image/avif",
        _              => "application/octet-stream",
    }
}

/// Storage key for an upload: `{prefix}/{uid}/{millis}_{name}`.
pub fn object_path(prefix: &str, uid: &str, millis: i64, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    // A name may not smuggle in extra path levels.
    let name = name.replace(['/', '\\'], "_");
    if prefix.is_empty() {
        format!("{uid}/{millis}_{name}")
    } else {
        format!("{prefix}/{uid}/{millis}_{name}")
    }
}
