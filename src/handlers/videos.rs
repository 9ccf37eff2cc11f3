use axum::extract::{Multipart, Path, State};
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{NewVideo, Role, UpdateVideoRequest, Video, VideoListQuery};
use crate::response::{Envelope, Page};
use crate::storage::MediaKind;

use super::{Json, Query, read_multipart};

/// list_videos
///
/// Public listing of published videos, newest first, with optional title
/// search.
#[utoipa::path(
    get,
    path = "/api/v1/videos",
    params(VideoListQuery),
    responses((status = 200, description = "Published videos page"))
)]
pub async fn list_videos(
    State(state): State<AppState>,
    Query(query): Query<VideoListQuery>,
) -> Result<Envelope<Page<Video>>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let (videos, total) = state
        .repo
        .list_published_videos(query.search.as_deref(), page, limit)
        .await?;
    Ok(Envelope::ok(
        Page::new(videos, page, limit, total),
        "Videos fetched successfully",
    ))
}

/// get_video
///
/// Detail fetch. An unpublished video is visible to its owner only; everyone
/// else sees the same 404 as for a missing id, so drafts are not enumerable.
#[utoipa::path(
    get,
    path = "/api/v1/videos/{id}",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 200, description = "Video detail", body = Video),
        (status = 404, description = "No such video, or unpublished and not yours")
    )
)]
pub async fn get_video(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Envelope<Video>, ApiError> {
    let video = state
        .repo
        .find_video(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    if !video.is_published && video.owner_id != auth.user.id {
        return Err(ApiError::not_found("Video not found"));
    }

    Ok(Envelope::ok(video, "Video fetched successfully"))
}

/// create_video
///
/// Upload. Multipart body: `title`, `description`, and a `video` file. New
/// videos go live immediately; the owner can unpublish afterwards.
#[utoipa::path(
    post,
    path = "/api/v1/videos",
    responses(
        (status = 201, description = "Video created", body = Video),
        (status = 400, description = "Missing title, description, or file")
    )
)]
pub async fn create_video(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<Envelope<Video>, ApiError> {
    let form = read_multipart(multipart).await?;

    let (Some(title), Some(description)) = (form.field("title"), form.field("description"))
    else {
        return Err(ApiError::bad_request("Title and description are required"));
    };
    let Some(video_path) = form.files.get("video") else {
        return Err(ApiError::bad_request("Video file is required"));
    };

    let asset = state
        .media
        .upload(video_path, MediaKind::Video)
        .await
        .ok_or_else(|| ApiError::internal("Could not upload video, try again"))?;

    let video = state
        .repo
        .create_video(NewVideo {
            owner_id: auth.user.id,
            title: title.to_string(),
            description: description.to_string(),
            video: asset,
        })
        .await?;

    Ok(Envelope::created(video, "Video created successfully"))
}

/// Shared fetch + ownership gate for mutating operations. The existence check
/// runs first so a non-owner probing a missing id still gets a 404, not a 403.
async fn owned_video(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    action: &str,
) -> Result<Video, ApiError> {
    let video = state
        .repo
        .find_video(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    if video.owner_id != auth.user.id {
        return Err(ApiError::forbidden(format!(
            "You are not authorized to {action} this video"
        )));
    }
    Ok(video)
}

/// publish_video
#[utoipa::path(
    post,
    path = "/api/v1/videos/{id}/publish",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 200, description = "Video published", body = Video),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such video")
    )
)]
pub async fn publish_video(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Envelope<Video>, ApiError> {
    owned_video(&state, &auth, id, "publish").await?;
    let video = state
        .repo
        .set_video_published(id, true)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    Ok(Envelope::ok(video, "Video published successfully"))
}

/// unpublish_video
#[utoipa::path(
    post,
    path = "/api/v1/videos/{id}/unpublish",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 200, description = "Video unpublished", body = Video),
        (status = 400, description = "Already unpublished"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such video")
    )
)]
pub async fn unpublish_video(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Envelope<Video>, ApiError> {
    let video = owned_video(&state, &auth, id, "unpublish").await?;
    if !video.is_published {
        return Err(ApiError::bad_request("Video is already unpublished"));
    }
    let video = state
        .repo
        .set_video_published(id, false)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    Ok(Envelope::ok(video, "Video unpublished successfully"))
}

/// update_video
#[utoipa::path(
    patch,
    path = "/api/v1/videos/{id}",
    params(("id" = Uuid, Path, description = "Video id")),
    request_body = UpdateVideoRequest,
    responses(
        (status = 200, description = "Video updated", body = Video),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such video")
    )
)]
pub async fn update_video(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateVideoRequest>,
) -> Result<Envelope<Video>, ApiError> {
    owned_video(&state, &auth, id, "update").await?;
    let video = state
        .repo
        .update_video(id, &req)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    Ok(Envelope::ok(video, "Video updated successfully"))
}

/// delete_video
///
/// Removal by the owner or an admin. The authorization check runs before the
/// row is touched, and the stored media object is cleaned up afterwards.
#[utoipa::path(
    delete,
    path = "/api/v1/videos/{id}",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 200, description = "Video deleted", body = Video),
        (status = 403, description = "Not the owner or an admin"),
        (status = 404, description = "No such video")
    )
)]
pub async fn delete_video(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Envelope<Video>, ApiError> {
    let video = state
        .repo
        .find_video(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    if video.owner_id != auth.user.id && auth.user.role != Role::Admin {
        return Err(ApiError::forbidden(
            "You are not authorized to delete this video",
        ));
    }

    let deleted = state
        .repo
        .delete_video(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    state.media.delete(&deleted.video_id).await;

    Ok(Envelope::ok(deleted, "Video deleted successfully"))
}
