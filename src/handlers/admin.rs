use axum::extract::{Path, State};
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::AppState;
use crate::auth::{AdminUser, StaffUser, admin_session_cookies, clear_session_cookies, sign_access_token};
use crate::error::ApiError;
use crate::models::{
    AdminLoginRequest, AdminLoginResponse, AdminStats, AdminUpdateUserRequest, NewUser,
    ProductStats, Role, UpdateUserRoleRequest, UpdateUserStatusRequest, UserProfile,
    UserSearchQuery,
};
use crate::response::{Envelope, PageQuery};

use super::{Json, Query};

// Seeded identity for the bootstrap admin account.
const BOOTSTRAP_ADMIN_EMAIL: &str = "admin@crop-portal.local";
const BOOTSTRAP_ADMIN_NAME: &str = "Administrator";

/// admin_login
///
/// Console login by username. If no admin account exists at all, the first
/// login bootstraps one from the presented credentials; once any admin exists,
/// only a matching admin account gets in. Login marks the account active and
/// sets the console cookies.
#[utoipa::path(
    post,
    path = "/api/v1/admin/login",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Admin logged in", body = AdminLoginResponse),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Bad admin credentials")
    )
)]
pub async fn admin_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<AdminLoginRequest>,
) -> Result<(CookieJar, Envelope<AdminLoginResponse>), ApiError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }
    let username = req.username.trim().to_lowercase();

    let user = match state.repo.find_admin_by_username(&username).await? {
        Some(admin) => {
            let valid = bcrypt::verify(&req.password, &admin.password_hash).unwrap_or(false);
            if !valid {
                return Err(ApiError::unauthorized("Invalid admin credentials"));
            }
            state.repo.set_user_active(admin.id, Some(true)).await?;
            state.repo.record_login(admin.id).await?;
            state
                .repo
                .find_user(admin.id)
                .await?
                .ok_or_else(|| ApiError::unauthorized("Invalid admin credentials"))?
        }
        None => {
            if state.repo.count_admins().await? > 0 {
                return Err(ApiError::unauthorized("Invalid admin credentials"));
            }
            // First-run bootstrap: promote the presented credentials to the
            // initial admin account.
            let password_hash =
                bcrypt::hash(&req.password, bcrypt::DEFAULT_COST).map_err(|err| {
                    tracing::error!("bcrypt failure: {err}");
                    ApiError::internal("Something went wrong, try again")
                })?;
            let admin = state
                .repo
                .create_user(NewUser {
                    username,
                    email: BOOTSTRAP_ADMIN_EMAIL.to_string(),
                    full_name: BOOTSTRAP_ADMIN_NAME.to_string(),
                    password_hash,
                    avatar: None,
                    cover: None,
                    role: Role::Admin,
                    is_active: true,
                })
                .await?;
            state.repo.record_login(admin.id).await?;
            admin
        }
    };

    let token = sign_access_token(&state.config, &user)?;
    let (access, admin) = admin_session_cookies(&state.config, &token);
    let jar = jar.add(access).add(admin);

    Ok((
        jar,
        Envelope::ok(
            AdminLoginResponse {
                user: UserProfile::from(user),
                token,
            },
            "Admin logged in successfully",
        ),
    ))
}

/// admin_logout
///
/// Marks the admin inactive, records the logout time, revokes the refresh
/// token, and expires the console cookies.
#[utoipa::path(
    post,
    path = "/api/v1/admin/logout",
    responses((status = 200, description = "Admin logged out"))
)]
pub async fn admin_logout(
    State(state): State<AppState>,
    admin: AdminUser,
    jar: CookieJar,
) -> Result<(CookieJar, Envelope<()>), ApiError> {
    state.repo.set_user_active(admin.user.id, Some(false)).await?;
    state.repo.record_logout(admin.user.id).await?;

    let (access, refresh, admin_cookie) = clear_session_cookies();
    let jar = jar.add(access).add(refresh).add(admin_cookie);

    Ok((jar, Envelope::ok((), "Admin logged out successfully")))
}

/// list_users
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    params(PageQuery),
    responses((status = 200, description = "Users page", body = Vec<UserProfile>))
)]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<PageQuery>,
) -> Result<Envelope<Vec<UserProfile>>, ApiError> {
    let users = state
        .repo
        .list_users(query.page(), query.limit())
        .await?
        .into_iter()
        .map(UserProfile::from)
        .collect();
    Ok(Envelope::ok(users, "Users fetched successfully"))
}

/// search_users
#[utoipa::path(
    get,
    path = "/api/v1/admin/users/search",
    params(UserSearchQuery),
    responses(
        (status = 200, description = "Matching users", body = Vec<UserProfile>),
        (status = 400, description = "Unknown role filter")
    )
)]
pub async fn search_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<UserSearchQuery>,
) -> Result<Envelope<Vec<UserProfile>>, ApiError> {
    let role = match query.role.as_deref() {
        Some(raw) => Some(
            Role::parse(raw)
                .ok_or_else(|| ApiError::bad_request("Invalid role. Allowed: user, moderator, admin"))?,
        ),
        None => None,
    };

    let users = state
        .repo
        .search_users(role, query.is_active, query.query.as_deref())
        .await?
        .into_iter()
        .map(UserProfile::from)
        .collect();
    Ok(Envelope::ok(users, "Filtered users fetched successfully"))
}

/// get_user
#[utoipa::path(
    get,
    path = "/api/v1/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User detail", body = UserProfile),
        (status = 404, description = "No such user")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Envelope<UserProfile>, ApiError> {
    let user = state
        .repo
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Envelope::ok(
        UserProfile::from(user),
        "User details fetched successfully",
    ))
}

/// update_user
#[utoipa::path(
    patch,
    path = "/api/v1/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = AdminUpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserProfile),
        (status = 404, description = "No such user")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<AdminUpdateUserRequest>,
) -> Result<Envelope<UserProfile>, ApiError> {
    let user = state
        .repo
        .admin_update_user(id, &req)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Envelope::ok(
        UserProfile::from(user),
        "User profile updated successfully",
    ))
}

/// delete_user
///
/// Hard delete. Removing the last active admin is refused, same as demoting or
/// deactivating them, so the console can never lock itself out entirely.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 403, description = "Would remove the last active admin"),
        (status = 404, description = "No such user")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Envelope<()>, ApiError> {
    let target = state
        .repo
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if target.role == Role::Admin
        && target.is_active
        && state.repo.count_active_admins().await? <= 1
    {
        return Err(ApiError::forbidden("At least one active admin must remain"));
    }

    state.repo.delete_user(id).await?;
    Ok(Envelope::ok((), "User deleted successfully"))
}

/// update_user_role
///
/// Role changes are admin-only and guarded twice: an admin may not change their
/// own role, and the last active admin may not be demoted.
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/role",
    request_body = UpdateUserRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = UserProfile),
        (status = 400, description = "Unknown role"),
        (status = 403, description = "Self-change or last active admin"),
        (status = 404, description = "No such user")
    )
)]
pub async fn update_user_role(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(req): Json<UpdateUserRoleRequest>,
) -> Result<Envelope<UserProfile>, ApiError> {
    let new_role = Role::parse(&req.new_role)
        .ok_or_else(|| ApiError::bad_request("Invalid role. Allowed: user, moderator, admin"))?;

    if admin.user.id == req.user_id {
        return Err(ApiError::forbidden("You cannot change your own role"));
    }

    let target = state
        .repo
        .find_user(req.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if target.role == Role::Admin
        && new_role != Role::Admin
        && state.repo.count_active_admins().await? <= 1
    {
        return Err(ApiError::forbidden("At least one active admin must remain"));
    }

    let user = state
        .repo
        .set_user_role(req.user_id, new_role)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Envelope::ok(
        UserProfile::from(user),
        "User role updated successfully",
    ))
}

/// update_user_status
///
/// Activation toggle, open to admins and moderators. An explicit `isActive`
/// sets the flag; omitting it toggles. Deactivating the last active admin is
/// refused.
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/status",
    request_body = UpdateUserStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = UserProfile),
        (status = 403, description = "Would deactivate the last active admin"),
        (status = 404, description = "No such user")
    )
)]
pub async fn update_user_status(
    State(state): State<AppState>,
    _staff: StaffUser,
    Json(req): Json<UpdateUserStatusRequest>,
) -> Result<Envelope<UserProfile>, ApiError> {
    let target = state
        .repo
        .find_user(req.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let desired = req.is_active.unwrap_or(!target.is_active);
    if target.role == Role::Admin
        && target.is_active
        && !desired
        && state.repo.count_active_admins().await? <= 1
    {
        return Err(ApiError::forbidden("At least one active admin must remain"));
    }

    let user = state
        .repo
        .set_user_active(req.user_id, Some(desired))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let label = if user.is_active { "Active" } else { "Inactive" };
    Ok(Envelope::ok(
        UserProfile::from(user),
        format!("User status updated successfully: {label}"),
    ))
}

/// admin_stats
#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    responses((status = 200, description = "Dashboard counters", body = AdminStats))
)]
pub async fn admin_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Envelope<AdminStats>, ApiError> {
    let stats = state.repo.user_stats().await?;
    Ok(Envelope::ok(stats, "Admin statistics fetched successfully"))
}

/// product_stats
#[utoipa::path(
    get,
    path = "/api/v1/admin/products/stats",
    responses((status = 200, description = "Stock counters", body = ProductStats))
)]
pub async fn product_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Envelope<ProductStats>, ApiError> {
    let stats = state.repo.product_stats().await?;
    Ok(Envelope::ok(
        stats,
        "Product statistics fetched successfully",
    ))
}
