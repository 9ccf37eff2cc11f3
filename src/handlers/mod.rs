use std::collections::HashMap;
use std::path::PathBuf;

use axum::extract::{FromRequest, FromRequestParts, Multipart, OptionalFromRequest, Request};
use axum::http::request::Parts;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::response::Envelope;
use crate::storage::spool_upload;

pub mod admin;
pub mod comments;
pub mod enquiries;
pub mod orders;
pub mod products;
pub mod users;
pub mod videos;

/// A parsed multipart form: text fields by name, plus any file parts spooled to
/// the temp directory. The media store consumes (and removes) the spool files.
pub(crate) struct UploadForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, PathBuf>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str).filter(|s| !s.trim().is_empty())
    }
}

/// Spool files the media store never consumed (validation failures, early
/// returns) are removed when the form goes out of scope.
impl Drop for UploadForm {
    fn drop(&mut self) {
        for path in self.files.values() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Drains a multipart body. Any malformed part fails the whole request.
pub(crate) async fn read_multipart(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm {
        fields: HashMap::new(),
        files: HashMap::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("invalid multipart payload"))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if field.file_name().is_some() {
            let bytes = field
                .bytes()
                .await
                .map_err(|_| ApiError::bad_request("invalid multipart payload"))?;
            let path = spool_upload(&bytes).await.map_err(|err| {
                tracing::error!("failed to spool upload: {err}");
                ApiError::internal("failed to process upload")
            })?;
            form.files.insert(name, path);
        } else {
            let text = field
                .text()
                .await
                .map_err(|_| ApiError::bad_request("invalid multipart payload"))?;
            form.fields.insert(name, text);
        }
    }

    Ok(form)
}

/// JSON body extractor that turns axum's plain-text rejection into the
/// standard 400 error envelope, so malformed or missing input reads the same
/// as any other validation failure.
pub(crate) struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = <axum::Json<T> as FromRequest<S>>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(Self(value))
    }
}

impl<S, T> OptionalFromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        match <axum::Json<T> as OptionalFromRequest<S>>::from_request(req, state).await {
            Ok(value) => Ok(value.map(|axum::Json(v)| Self(v))),
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}

/// Query-string extractor with the same envelope-preserving rejection.
pub(crate) struct Query<T>(pub T);

impl<S, T> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Query(value) =
            axum::extract::Query::<T>::from_request_parts(parts, state)
                .await
                .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// HealthInfo
///
/// Liveness payload for monitoring.
#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HealthInfo {
    pub status: String,
    pub timestamp: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses((status = 200, description = "Service is healthy", body = HealthInfo))
)]
pub async fn health() -> Envelope<HealthInfo> {
    Envelope::ok(
        HealthInfo {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
        },
        "API is running smoothly",
    )
}
