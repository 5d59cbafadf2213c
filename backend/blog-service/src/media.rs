//! Uploaded post images
//!
//! Files live under `MEDIA_ROOT/posts/` with random names; the database keeps the
//! path relative to `MEDIA_ROOT` (`posts/<uuid>.<ext>`).

use crate::error::{AppError, Result};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

pub const UPLOAD_DIR: &str = "posts";

pub const INVALID_IMAGE: &str = "Загрузите правильное изображение. Файл, который вы загрузили, поврежден или не является изображением.";

const ALLOWED: &[(ImageFormat, &str, &str)] = &[
    (ImageFormat::Png, "png", "image/png"),
    (ImageFormat::Jpeg, "jpg", "image/jpeg"),
    (ImageFormat::Gif, "gif", "image/gif"),
    (ImageFormat::WebP, "webp", "image/webp"),
    (ImageFormat::Bmp, "bmp", "image/bmp"),
];

/// Recognised upload: the detected format's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageKind {
    pub extension: &'static str,
}

/// Sniff and fully decode `bytes`. Returns `None` for anything that is not a
/// supported, intact raster image.
pub async fn inspect_image(bytes: Vec<u8>) -> Option<ImageKind> {
    // Decoding is CPU-bound.
    tokio::task::spawn_blocking(move || {
        let format = image::guess_format(&bytes).ok()?;
        let (_, extension, _) = ALLOWED.iter().find(|(f, _, _)| *f == format)?;
        image::load_from_memory_with_format(&bytes, format).ok()?;
        Some(ImageKind {
            extension: *extension,
        })
    })
    .await
    .ok()
    .flatten()
}

/// Content type for a stored file, by extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpeg") => "image/jpeg",
        Some(ext) => ALLOWED
            .iter()
            .find(|(_, known, _)| *known == ext)
            .map(|(_, _, mime)| *mime)
            .unwrap_or("application/octet-stream"),
        None => "application/octet-stream",
    }
}

/// Filesystem side of uploaded media.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write an inspected image and return its stored relative path.
    pub async fn save_post_image(&self, bytes: &[u8], kind: ImageKind) -> Result<String> {
        let dir = self.root.join(UPLOAD_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let name = format!("{}.{}", Uuid::new_v4(), kind.extension);
        tokio::fs::write(dir.join(&name), bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store upload: {}", e)))?;

        let relative = format!("{}/{}", UPLOAD_DIR, name);
        info!(path = %relative, size = bytes.len(), "Stored post image");
        Ok(relative)
    }

    /// Map a `posts/<file>` name to disk, rejecting anything that could escape the
    /// upload directory.
    pub fn resolve_post_image(&self, file_name: &str) -> Option<PathBuf> {
        let valid = !file_name.is_empty()
            && file_name != "."
            && file_name != ".."
            && !file_name.starts_with('.')
            && file_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        valid.then(|| self.root.join(UPLOAD_DIR).join(file_name))
    }
}
