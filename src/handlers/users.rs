use axum::extract::{Multipart, State};
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::auth::{
    AuthUser, admin_cookie, clear_session_cookies, issue_token_pair, rotate_refresh_token,
    session_cookies,
};
use crate::error::ApiError;
use crate::models::{
    ChangePasswordRequest, LoginRequest, LoginResponse, NewUser, RefreshRequest, Role,
    UpdateAccountRequest, UserProfile,
};
use crate::response::Envelope;
use crate::storage::{MediaAsset, MediaKind};

use super::{Json, read_multipart};

/// register
///
/// Account creation. The body is multipart: text fields plus an `avatar` file
/// (required) and an optional `coverImage` file. The avatar must upload
/// successfully before the row is inserted; a failed cover upload is tolerated
/// and simply leaves the account without one.
#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    responses(
        (status = 201, description = "Account created", body = UserProfile),
        (status = 400, description = "Missing fields or avatar"),
        (status = 409, description = "Username or email already taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Envelope<UserProfile>, ApiError> {
    let form = read_multipart(multipart).await?;

    let (Some(full_name), Some(email), Some(username), Some(password)) = (
        form.field("fullName"),
        form.field("email"),
        form.field("username"),
        form.field("password"),
    ) else {
        return Err(ApiError::bad_request("All fields are required"));
    };
    let username = username.to_lowercase();

    if state
        .repo
        .find_user_by_login(Some(&username), Some(email))
        .await?
        .is_some()
    {
        return Err(ApiError::conflict(
            "User already exists with this email or username",
        ));
    }

    let Some(avatar_path) = form.files.get("avatar") else {
        return Err(ApiError::bad_request("Avatar is required"));
    };
    let avatar: MediaAsset = state
        .media
        .upload(avatar_path, MediaKind::Image)
        .await
        .ok_or_else(|| ApiError::bad_request("Could not upload avatar, try again"))?;

    let cover = match form.files.get("coverImage") {
        Some(path) => state.media.upload(path, MediaKind::Image).await,
        None => None,
    };

    let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|err| {
        tracing::error!("bcrypt failure: {err}");
        ApiError::internal("Something went wrong, try again")
    })?;

    let user = state
        .repo
        .create_user(NewUser {
            username,
            email: email.to_string(),
            full_name: full_name.to_string(),
            password_hash,
            avatar: Some(avatar),
            cover,
            role: Role::User,
            is_active: true,
        })
        .await?;

    Ok(Envelope::created(
        UserProfile::from(user),
        "User registered successfully",
    ))
}

/// login
///
/// Credential check against either identifier, then a fresh token pair. The
/// tokens are returned in the body and set as HttpOnly cookies.
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Bad credentials"),
        (status = 404, description = "No such user")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Envelope<LoginResponse>), ApiError> {
    if req.username.is_none() && req.email.is_none() {
        return Err(ApiError::bad_request("username or email is required"));
    }

    let user = state
        .repo
        .find_user_by_login(req.username.as_deref(), req.email.as_deref())
        .await?
        .ok_or_else(|| ApiError::not_found("user does not exist"))?;

    let valid = bcrypt::verify(&req.password, &user.password_hash).unwrap_or(false);
    if !valid {
        return Err(ApiError::unauthorized("invalid user credentials"));
    }

    let pair = issue_token_pair(&state.repo, &state.config, &user).await?;
    state.repo.record_login(user.id).await?;

    let (access, refresh) = session_cookies(&state.config, &pair);
    let jar = jar.add(access).add(refresh);

    Ok((
        jar,
        Envelope::ok(
            LoginResponse {
                user: UserProfile::from(user),
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

/// logout
///
/// Revokes the stored refresh token and expires the session cookies.
#[utoipa::path(
    post,
    path = "/api/v1/users/logout",
    responses((status = 200, description = "Logged out"))
)]
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
    jar: CookieJar,
) -> Result<(CookieJar, Envelope<()>), ApiError> {
    state.repo.record_logout(auth.user.id).await?;
    let (access, refresh, admin) = clear_session_cookies();
    let jar = jar.add(access).add(refresh).add(admin);
    Ok((jar, Envelope::ok((), "Logged out successfully")))
}

/// refresh_token
///
/// Token rotation. The incoming refresh token comes from the cookie or the
/// body, must verify, and must byte-match the stored one; a mismatch means it
/// was already used or revoked.
#[utoipa::path(
    post,
    path = "/api/v1/users/refresh-token",
    responses(
        (status = 200, description = "New token pair issued", body = crate::auth::TokenPair),
        (status = 401, description = "Missing, invalid, or already-used refresh token")
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<(CookieJar, Envelope<crate::auth::TokenPair>), ApiError> {
    let presented = jar
        .get(crate::auth::REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| body.and_then(|Json(req)| req.refresh_token))
        .ok_or_else(|| ApiError::unauthorized("unauthorized request"))?;

    let (user, pair) = rotate_refresh_token(&state.repo, &state.config, &presented).await?;

    let (access, refresh) = session_cookies(&state.config, &pair);
    let mut jar = jar.add(access).add(refresh);
    // Console sessions ride the same access token.
    if user.role != Role::User {
        jar = jar.add(admin_cookie(&state.config, &pair.access_token));
    }

    Ok((
        jar,
        Envelope::ok(pair, "Access token refreshed successfully"),
    ))
}

/// current_user
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses((status = 200, description = "Current profile", body = UserProfile))
)]
pub async fn current_user(auth: AuthUser) -> Envelope<UserProfile> {
    Envelope::ok(
        UserProfile::from(auth.user),
        "User details fetched successfully",
    )
}

/// change_password
#[utoipa::path(
    post,
    path = "/api/v1/users/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Old password wrong or confirmation mismatch")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Envelope<()>, ApiError> {
    let valid = bcrypt::verify(&req.old_password, &auth.user.password_hash).unwrap_or(false);
    if !valid {
        return Err(ApiError::bad_request("old password is incorrect"));
    }
    if req.new_password != req.conf_password {
        return Err(ApiError::bad_request(
            "new password and confirm password do not match",
        ));
    }

    let hash = bcrypt::hash(&req.new_password, bcrypt::DEFAULT_COST).map_err(|err| {
        tracing::error!("bcrypt failure: {err}");
        ApiError::internal("Something went wrong, try again")
    })?;
    state.repo.set_password(auth.user.id, &hash).await?;

    Ok(Envelope::ok((), "Password changed successfully"))
}

/// update_account
#[utoipa::path(
    patch,
    path = "/api/v1/users/update-account",
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 400, description = "Missing fields")
    )
)]
pub async fn update_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdateAccountRequest>,
) -> Result<Envelope<UserProfile>, ApiError> {
    if req.full_name.trim().is_empty() || req.email.trim().is_empty() {
        return Err(ApiError::bad_request("fullName and email are required"));
    }

    let user = state
        .repo
        .update_account(auth.user.id, req.full_name.trim(), req.email.trim())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Envelope::ok(
        UserProfile::from(user),
        "User details updated successfully",
    ))
}

/// update_avatar
///
/// Replaces the avatar. The old object is deleted from the media store on a
/// best-effort basis after the row points at the new one.
#[utoipa::path(
    patch,
    path = "/api/v1/users/avatar",
    responses(
        (status = 200, description = "Avatar updated", body = UserProfile),
        (status = 400, description = "Avatar file missing")
    )
)]
pub async fn update_avatar(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<Envelope<UserProfile>, ApiError> {
    let form = read_multipart(multipart).await?;
    let Some(path) = form.files.get("avatar") else {
        return Err(ApiError::bad_request("Avatar file is missing"));
    };

    let asset = state
        .media
        .upload(path, MediaKind::Image)
        .await
        .ok_or_else(|| ApiError::internal("Could not upload avatar, try again"))?;

    let old_id = auth.user.avatar_id.clone();
    let user = state
        .repo
        .set_avatar(auth.user.id, &asset)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if let Some(old) = old_id {
        state.media.delete(&old).await;
    }

    Ok(Envelope::ok(
        UserProfile::from(user),
        "Avatar updated successfully",
    ))
}

/// update_cover_image
#[utoipa::path(
    patch,
    path = "/api/v1/users/cover-image",
    responses(
        (status = 200, description = "Cover image updated", body = UserProfile),
        (status = 400, description = "Cover image file missing")
    )
)]
pub async fn update_cover_image(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<Envelope<UserProfile>, ApiError> {
    let form = read_multipart(multipart).await?;
    let Some(path) = form.files.get("coverImage") else {
        return Err(ApiError::bad_request("Cover image file is missing"));
    };

    let asset = state
        .media
        .upload(path, MediaKind::Image)
        .await
        .ok_or_else(|| ApiError::internal("Could not upload cover image, try again"))?;

    let old_id = auth.user.cover_id.clone();
    let user = state
        .repo
        .set_cover_image(auth.user.id, &asset)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if let Some(old) = old_id {
        state.media.delete(&old).await;
    }

    Ok(Envelope::ok(
        UserProfile::from(user),
        "Cover image updated successfully",
    ))
}
