use std::io;
use std::path::{Path, PathBuf};

use axum::{
    extract::{Path as UrlPath, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use mime_guess::from_path;
use tokio::io::AsyncWriteExt as _;
use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;

/// Directory holding uploaded profile pictures.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// A fresh storage name: a random UUID followed by the sanitized original file name.
    pub fn storage_name(&self, original_name: &str) -> String {
        format!("{}_{}", Uuid::new_v4(), sanitize_filename(original_name))
    }

    /// Resolve a storage name to a path inside the upload directory.
    ///
    /// Names that aren't a single plain path component are refused.
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() || name != sanitize_filename(name) {
            return None;
        }

        Some(self.dir.join(name))
    }

    /// Write a new file. Never replaces an existing one.
    pub async fn save(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self
            .path_for(name)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid upload name"))?;

        tokio::fs::create_dir_all(&self.dir).await?;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        let written = async {
            file.write_all(bytes).await?;
            file.flush().await
        }
        .await;

        discard_on_error(&path, written).await
    }

    pub async fn remove(&self, name: &str) -> io::Result<()> {
        let path = self
            .path_for(name)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid upload name"))?;

        tokio::fs::remove_file(path).await
    }

    pub async fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        let path = self
            .path_for(name)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid upload name"))?;

        tokio::fs::read(path).await
    }
}

/// Removes a partially written file so a failed save leaves nothing behind
async fn discard_on_error(path: &Path, result: io::Result<()>) -> io::Result<()> {
    if result.is_err() {
        if let Err(err) = tokio::fs::remove_file(path).await {
            warn!("Failed to remove partial upload {}: {:?}", path.display(), err);
        }
    }

    result
}

/// Reduce a client supplied file name to ASCII letters, digits, `.`, `_` and `-`.
///
/// Path separators and whitespace become `_`; leading and trailing dots and underscores
/// are dropped so the result can't name a parent or hidden file.
pub fn sanitize_filename(name: &str) -> String {
    let joined = name
        .split(|c: char| c == '/' || c == '\\' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Serve an uploaded file
pub async fn serve_upload(
    State(state): State<AppState>,
    UrlPath(name): UrlPath<String>,
) -> Response {
    match state.uploads.read(&name).await {
        Ok(contents) => {
            let mime_type = from_path(&name).first_or_octet_stream().to_string();

            (
                [
                    (header::CONTENT_TYPE, mime_type),
                    (header::CACHE_CONTROL, "public, max-age=31536000".to_string()),
                ],
                contents,
            )
                .into_response()
        }
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}
