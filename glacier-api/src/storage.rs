/// Attachment object storage
///
/// Files are not kept by the API. They go to an [`AttachmentStore`]; the
/// production implementation is [`CloudinaryStore`], which talks to the
/// Cloudinary upload API over reqwest with signed requests.
///
/// Images are stored with resource type `image`, everything else as `raw`,
/// and deletes must name the same resource type.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::config::CloudinaryConfig;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Attachment storage is not configured")]
    NotConfigured,

    #[error("Storage request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Cloudinary resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Image,
    Raw,
}

impl ResourceKind {
    pub fn for_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            ResourceKind::Image
        } else {
            ResourceKind::Raw
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Raw => "raw",
        }
    }
}

/// File received from a client
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Where a stored file ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub url: String,
    pub public_id: String,
}

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn upload(&self, upload: Upload) -> Result<StoredObject, StorageError>;

    async fn destroy(&self, public_id: &str, kind: ResourceKind) -> Result<(), StorageError>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorBody {
    error: CloudinaryErrorMessage,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorMessage {
    message: String,
}

/// Cloudinary upload API client
pub struct CloudinaryStore {
    http: reqwest::Client,
    config: CloudinaryConfig,
    base_url: String,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            base_url: format!("https://api.cloudinary.com/v1_1/{}", config.cloud_name),
            config,
        })
    }

    fn endpoint(&self, kind: ResourceKind, action: &str) -> String {
        format!("{}/{}/{}", self.base_url, kind.as_str(), action)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<CloudinaryErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
        };

        Err(StorageError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

/// Signs request parameters: sorted `k=v` pairs joined by `&`, secret
/// appended, SHA-256 hex
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl AttachmentStore for CloudinaryStore {
    async fn upload(&self, upload: Upload) -> Result<StoredObject, StorageError> {
        let kind = ResourceKind::for_mime(&upload.content_type);
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(&[("timestamp", timestamp.clone())], &self.config.api_secret);

        let file = Part::bytes(upload.data.to_vec())
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)?;

        let form = Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let response = self
            .http
            .post(self.endpoint(kind, "upload"))
            .multipart(form)
            .send()
            .await?;

        let body: UploadResponse = Self::check(response).await?.json().await?;

        tracing::debug!(public_id = %body.public_id, kind = kind.as_str(), "Attachment uploaded");

        Ok(StoredObject {
            url: body.secure_url,
            public_id: body.public_id,
        })
    }

    async fn destroy(&self, public_id: &str, kind: ResourceKind) -> Result<(), StorageError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("public_id", public_id.to_string()), ("timestamp", timestamp.clone())],
            &self.config.api_secret,
        );

        let form = [
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp),
            ("api_key", self.config.api_key.clone()),
            ("signature_algorithm", "sha256".to_string()),
            ("signature", signature),
        ];

        let response = self
            .http
            .post(self.endpoint(kind, "destroy"))
            .form(&form)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_kind_for_mime() {
        assert_eq!(ResourceKind::for_mime("image/png"), ResourceKind::Image);
        assert_eq!(ResourceKind::for_mime("application/pdf"), ResourceKind::Raw);
        assert_eq!(ResourceKind::for_mime("text/plain").as_str(), "raw");
    }

    #[test]
    fn test_sign_params_sorts_keys() {
        let a = sign_params(
            &[("timestamp", "1".to_string()), ("public_id", "x".to_string())],
            "secret",
        );
        let b = sign_params(
            &[("public_id", "x".to_string()), ("timestamp", "1".to_string())],
            "secret",
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut hasher = Sha256::new();
        hasher.update(b"public_id=x&timestamp=1secret");
        assert_eq!(a, hex::encode(hasher.finalize()));
    }

    #[test]
    fn test_endpoint() {
        let store = CloudinaryStore::new(CloudinaryConfig {
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
        })
        .unwrap();

        assert_eq!(
            store.endpoint(ResourceKind::Raw, "destroy"),
            "https://api.cloudinary.com/v1_1/demo/raw/destroy"
        );
    }
}
