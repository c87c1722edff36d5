//! Local disk storage for user photos.
//!
//! Uploaded files are written under the configured upload directory with a
//! generated name and served back from `/uploads`.

use axum::body::Bytes;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// URL prefix the upload directory is served under
pub const UPLOADS_PREFIX: &str = "/uploads";

/// Accepted MIME types and the extension stored files get
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/svg+xml", "svg"),
];

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("Only image files are allowed (got {0})")]
    BadMime(String),

    #[error("failed to write photo: {0}")]
    Io(#[from] std::io::Error),
}

/// One file taken from a multipart form
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct PhotoStore {
    dir: PathBuf,
    public_base: Url,
}

impl PhotoStore {
    pub fn new(dir: PathBuf, public_base_url: &str) -> anyhow::Result<Self> {
        // A trailing slash keeps `join` from dropping the last path segment
        let mut base = public_base_url.trim_end_matches('/').to_string();
        base.push('/');
        let public_base = Url::parse(&base)?;
        Ok(Self { dir, public_base })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Persist an upload and return its public URL
    pub async fn store(&self, upload: PhotoUpload) -> Result<String, PhotoError> {
        let mime = upload.content_type.unwrap_or_default();
        let extension = extension_for(&mime).ok_or_else(|| PhotoError::BadMime(mime.clone()))?;

        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&file_name), &upload.bytes).await?;

        tracing::debug!(file = %file_name, bytes = upload.bytes.len(), "Stored user photo");
        Ok(self.public_url(&file_name))
    }

    fn public_url(&self, file_name: &str) -> String {
        let path = format!("{}/{}", UPLOADS_PREFIX.trim_start_matches('/'), file_name);
        match self.public_base.join(&path) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}{}", self.public_base, path),
        }
    }
}

fn extension_for(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    ALLOWED_TYPES
        .iter()
        .find(|(allowed, _)| allowed.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}
