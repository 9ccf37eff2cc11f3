use axum::extract::{Path, State};
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{Comment, CommentListQuery, CommentSort, CreateCommentRequest, Role};
use crate::response::{Envelope, Page};

use super::{Json, Query};

/// list_comments
///
/// Public comment listing for a video, with author summaries joined in.
/// Sortable by creation or update time; unknown sort fields fall back to
/// newest-first.
#[utoipa::path(
    get,
    path = "/api/v1/videos/{id}/comments",
    params(("id" = Uuid, Path, description = "Video id"), CommentListQuery),
    responses(
        (status = 200, description = "Comments page"),
        (status = 404, description = "No such video")
    )
)]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
    Query(query): Query<CommentListQuery>,
) -> Result<Envelope<Page<Comment>>, ApiError> {
    if state.repo.find_video(video_id).await?.is_none() {
        return Err(ApiError::not_found("Video not found"));
    }

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let sort = CommentSort::parse(query.sort_by.as_deref());
    let descending = query.sort_order.as_deref() != Some("asc");

    let (comments, total) = state
        .repo
        .list_video_comments(video_id, page, limit, sort, descending)
        .await?;

    Ok(Envelope::ok(
        Page::new(comments, page, limit, total),
        "Comments fetched successfully",
    ))
}

/// add_comment
#[utoipa::path(
    post,
    path = "/api/v1/videos/{id}/comments",
    params(("id" = Uuid, Path, description = "Video id")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment added", body = Comment),
        (status = 400, description = "Empty content"),
        (status = 404, description = "No such video")
    )
)]
pub async fn add_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(video_id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<Envelope<Comment>, ApiError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::bad_request("Comment content is required"));
    }
    if state.repo.find_video(video_id).await?.is_none() {
        return Err(ApiError::not_found("Video not found"));
    }

    let comment = state
        .repo
        .add_comment(video_id, auth.user.id, content)
        .await?;

    Ok(Envelope::created(comment, "Comment added successfully"))
}

/// update_comment
///
/// Owner-only edit. The existence check precedes the ownership check.
#[utoipa::path(
    patch,
    path = "/api/v1/comments/{id}",
    params(("id" = i64, Path, description = "Comment id")),
    request_body = CreateCommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = Comment),
        (status = 403, description = "Not the author"),
        (status = 404, description = "No such comment")
    )
)]
pub async fn update_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<Envelope<Comment>, ApiError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::bad_request("Comment content is required"));
    }

    let existing = state
        .repo
        .find_comment(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;
    if existing.owner_id != auth.user.id {
        return Err(ApiError::forbidden(
            "You are not authorized to update this comment",
        ));
    }

    let comment = state
        .repo
        .update_comment(id, content)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;

    Ok(Envelope::ok(comment, "Comment updated successfully"))
}

/// delete_comment
///
/// Removal by the author or an admin.
#[utoipa::path(
    delete,
    path = "/api/v1/comments/{id}",
    params(("id" = i64, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment deleted"),
        (status = 403, description = "Not the author or an admin"),
        (status = 404, description = "No such comment")
    )
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<Envelope<()>, ApiError> {
    let existing = state
        .repo
        .find_comment(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;
    if existing.owner_id != auth.user.id && auth.user.role != Role::Admin {
        return Err(ApiError::forbidden(
            "You are not authorized to delete this comment",
        ));
    }

    state.repo.delete_comment(id).await?;
    Ok(Envelope::ok((), "Comment deleted successfully"))
}
