use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::config::AppConfig;
use crate::error::ApiError;

pub const CLOUDINARY_API: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// 1. MediaUploader Contract
/// MediaUploader
///
/// Uploads avatars, post images and videos to the media host and returns the public URL
/// to store on the entity. Runs independently of the REST backend and its session.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, filename: &str, kind: MediaKind) -> Result<String, ApiError>;
}

pub type UploaderState = Arc<dyn MediaUploader>;

// 2. The Real Implementation (Cloudinary unsigned uploads)
/// CloudinaryUploader
///
/// Posts a multipart form (`file`, `upload_preset`) to
/// `{endpoint}/{cloud}/{image|video}/upload` and answers with the `secure_url`.
#[derive(Clone)]
pub struct CloudinaryUploader {
    client: reqwest::Client,
    endpoint: String,
    cloud_name: String,
    upload_preset: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryResponse {
    secure_url: Option<String>,
    error: Option<CloudinaryError>,
}

#[derive(Debug, Deserialize)]
struct CloudinaryError {
    message: String,
}

impl CloudinaryUploader {
    pub fn new(cloud_name: impl Into<String>, upload_preset: impl Into<String>) -> Self {
        Self::with_endpoint(CLOUDINARY_API, cloud_name, upload_preset)
    }

    /// Targets another Cloudinary-compatible endpoint (tests point this at a local server).
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        cloud_name: impl Into<String>,
        upload_preset: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            cloud_name: cloud_name.into(),
            upload_preset: upload_preset.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.cloudinary_cloud_name.clone(), config.cloudinary_upload_preset.clone())
    }

    pub fn upload_url(&self, kind: MediaKind) -> String {
        format!("{}/{}/{}/upload", self.endpoint, self.cloud_name, kind)
    }
}

#[async_trait]
impl MediaUploader for CloudinaryUploader {
    async fn upload(&self, bytes: Vec<u8>, filename: &str, kind: MediaKind) -> Result<String, ApiError> {
        if bytes.is_empty() {
            return Err(ApiError::Upload("File is missing".into()));
        }

        let size = bytes.len();
        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(filename.to_string()))
            .text("upload_preset", self.upload_preset.clone());

        let response = self
            .client
            .post(self.upload_url(kind))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Upload(e.to_string()))?;

        let status = response.status();
        let body: CloudinaryResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Upload(format!("unreadable upload response ({status}): {e}")))?;

        if let Some(error) = body.error {
            return Err(ApiError::Upload(error.message));
        }
        if !status.is_success() {
            return Err(ApiError::Upload(format!("upload rejected with status {status}")));
        }

        let url = body
            .secure_url
            .ok_or_else(|| ApiError::Upload("upload response carried no secure_url".into()))?;
        tracing::info!(%kind, filename, size, "media uploaded");
        Ok(url)
    }
}

/// sanitize_filename
///
/// Keeps only the final path component and drops traversal segments.
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .last()
        .unwrap_or("upload")
        .to_string()
}

// 3. The Mock Implementation (For Tests)
/// MockUploader
///
/// Answers with a deterministic URL built from the sanitised filename, or fails every
/// upload when `should_fail` is set.
#[derive(Clone, Default)]
pub struct MockUploader {
    pub should_fail: bool,
}

impl MockUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl MediaUploader for MockUploader {
    async fn upload(&self, bytes: Vec<u8>, filename: &str, kind: MediaKind) -> Result<String, ApiError> {
        if self.should_fail {
            return Err(ApiError::Upload("simulated upload failure".into()));
        }
        if bytes.is_empty() {
            return Err(ApiError::Upload("File is missing".into()));
        }
        Ok(format!(
            "https://res.cloudinary.com/mock/{}/upload/{}",
            kind,
            sanitize_filename(filename)
        ))
    }
}
