// src/services/media_uploader.rs - client for the remote media host
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use thiserror::Error;
use urlencoding::encode;
use uuid::Uuid;

use crate::config::MediaSettings;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("media host rejected upload: {status} {body}")]
    Rejected { status: u16, body: String },
    #[error("invalid content type: {0}")]
    ContentType(String),
}

/// Stores a buffer somewhere durable and hands back a URL for it.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, UploadError>;
}

/// Storage-bucket style media host: `POST /storage/v1/object/{bucket}/{key}`
/// with the raw body, public objects served from `/storage/v1/object/public/...`.
#[derive(Clone)]
pub struct StorageUploader {
    client: Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

impl StorageUploader {
    pub fn new(client: Client, settings: &MediaSettings) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            bucket: settings.bucket.clone(),
        }
    }

    /// Random object key keeping the MIME subtype as extension, e.g. `<uuid>.png`.
    pub fn object_key(content_type: &str) -> Result<String, UploadError> {
        let parsed: mime::Mime = content_type
            .parse()
            .map_err(|_| UploadError::ContentType(content_type.to_string()))?;
        let ext = parsed.subtype().as_str().to_ascii_lowercase();
        Ok(format!("{}.{}", Uuid::new_v4(), ext))
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            encode(&self.bucket),
            encode(key)
        )
    }

    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            encode(&self.bucket),
            encode(key)
        )
    }
}

#[async_trait]
impl MediaUploader for StorageUploader {
    async fn upload(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, UploadError> {
        let key = Self::object_key(content_type)?;
        let url = self.object_url(&key);
        debug!("uploading {} bytes to {}", bytes.len(), url);

        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", &self.api_key))
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("media host returned {} for {}", status, key);
            return Err(UploadError::Rejected { status: status.as_u16(), body });
        }

        Ok(self.public_url(&key))
    }
}
