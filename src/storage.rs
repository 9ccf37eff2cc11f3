use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3 as s3;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// MediaKind
///
/// Distinguishes the two classes of uploads the portal accepts. Controls the key
/// prefix and the Content-Type the object is stored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    fn prefix(&self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::Video => "videos",
        }
    }

    fn content_type(&self) -> &'static str {
        match self {
            Self::Image => "image/jpeg",
            Self::Video => "video/mp4",
        }
    }
}

/// MediaAsset
///
/// The handle a successful upload yields: the public URL of the object plus the
/// key needed to delete it later.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MediaAsset {
    pub url: String,
    pub public_id: String,
}

/// MediaStore
///
/// Defines the abstract contract for the media storage layer. Handlers depend on
/// this trait only, which lets tests substitute `MockMediaStore` for the real
/// S3-backed client without touching handler logic.
///
/// Upload is deliberately infallible at the type level: a failed upload yields
/// `None` and the caller decides whether the request can proceed without the
/// asset. The local temp file is consumed (deleted) on every path once it has
/// been read.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Ensures the configured bucket exists. Used in the `Env::Local` setup to
    /// provision MinIO automatically. No-op in production.
    async fn ensure_bucket_exists(&self);

    /// Uploads the file at `path` and returns its handle, or `None` when the
    /// path is missing or the remote write fails. The temp file is removed
    /// whenever it was actually read.
    async fn upload(&self, path: &Path, kind: MediaKind) -> Option<MediaAsset>;

    /// Deletes the remote object behind `public_id`. Returns whether the delete
    /// call succeeded; callers treat a failure as non-fatal and log it.
    async fn delete(&self, public_id: &str) -> bool;
}

/// The concrete type used to share the media store across the application state.
pub type MediaState = Arc<dyn MediaStore>;

/// S3MediaStore
///
/// The real implementation over the AWS SDK. S3 compatibility means the same
/// client talks to a Dockerized MinIO locally and the production object host.
/// `force_path_style(true)` is required for MinIO-style gateways.
#[derive(Clone)]
pub struct S3MediaStore {
    client: s3::Client,
    bucket_name: String,
    public_base: String,
}

impl S3MediaStore {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
            public_base: format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
        }
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    /// Calls the S3 CreateBucket API. Idempotent, so it is safe at startup.
    async fn ensure_bucket_exists(&self) {
        let _ = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await;
    }

    async fn upload(&self, path: &Path, kind: MediaKind) -> Option<MediaAsset> {
        // A missing or unreadable spool file is not our file to clean up.
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!("media upload: failed to read {}: {err}", path.display());
                return None;
            }
        };

        let key = format!("{}/{}", kind.prefix(), Uuid::new_v4());
        let result = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(kind.content_type())
            .body(bytes.into())
            .send()
            .await;

        // The spool file has served its purpose either way.
        if let Err(err) = tokio::fs::remove_file(path).await {
            tracing::warn!("media upload: failed to remove {}: {err}", path.display());
        }

        match result {
            Ok(_) => Some(MediaAsset {
                url: format!("{}/{}", self.public_base, key),
                public_id: key,
            }),
            Err(err) => {
                tracing::error!("media upload: put_object failed: {err}");
                None
            }
        }
    }

    async fn delete(&self, public_id: &str) -> bool {
        match self
            .client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(public_id)
            .send()
            .await
        {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!("media delete: {public_id}: {err}");
                false
            }
        }
    }
}

/// Writes an uploaded body to a fresh file in the OS temp directory so the
/// media store can consume it. Returns the spool path.
pub async fn spool_upload(bytes: &[u8]) -> std::io::Result<PathBuf> {
    let path = std::env::temp_dir().join(format!("upload-{}", Uuid::new_v4()));
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

/// MockMediaStore
///
/// In-memory implementation for unit and integration tests. Mirrors the real
/// client's temp-file contract: the spool file is removed whenever it existed.
#[derive(Clone)]
pub struct MockMediaStore {
    /// When true, uploads read (and remove) the file but report failure.
    pub should_fail: bool,
}

impl MockMediaStore {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

impl Default for MockMediaStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaStore for MockMediaStore {
    async fn ensure_bucket_exists(&self) {}

    async fn upload(&self, path: &Path, kind: MediaKind) -> Option<MediaAsset> {
        if tokio::fs::read(path).await.is_err() {
            return None;
        }
        let _ = tokio::fs::remove_file(path).await;

        if self.should_fail {
            return None;
        }

        // Deterministic handle for mock assertions.
        let key = format!("{}/{}", kind.prefix(), Uuid::new_v4());
        Some(MediaAsset {
            url: format!("http://localhost:9000/mock-bucket/{key}"),
            public_id: key,
        })
    }

    async fn delete(&self, _public_id: &str) -> bool {
        !self.should_fail
    }
}
