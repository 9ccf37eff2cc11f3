use axum::{
    extract::{FromRef, FromRequestParts, OriginalUri},
    http::{header, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
    models::{Role, User},
    repository::RepositoryState,
};

/// Cookie carrying the short-lived access token for site sessions.
pub const ACCESS_COOKIE: &str = "accessToken";
/// Cookie carrying the long-lived refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";
/// Cookie carrying the access token for admin-console sessions.
pub const ADMIN_COOKIE: &str = "adminToken";

/// Routes a deactivated admin may still reach, so a locked-out admin can
/// reactivate an account or hand the role to someone else. Matched by prefix
/// against the request path.
pub const DEACTIVATED_ADMIN_ALLOW_LIST: [&str; 2] = [
    "/api/v1/admin/users/status",
    "/api/v1/admin/users/role",
];

/// AccessClaims
///
/// Payload of the access token. Carries a denormalized identity snapshot so the
/// frontend can render without an extra profile fetch; authorization decisions
/// always re-read the live user row instead of trusting these fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

/// RefreshClaims
///
/// Payload of the refresh token. Identity only; everything else is re-derived
/// at rotation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
}

/// TokenPair
///
/// The two tokens returned from login and refresh, in body and cookie form.
#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub fn sign_access_token(config: &AppConfig, user: &User) -> Result<String, ApiError> {
    let iat = Utc::now().timestamp() as usize;
    let claims = AccessClaims {
        sub: user.id,
        email: user.email.clone(),
        username: user.username.clone(),
        full_name: user.full_name.clone(),
        role: user.role,
        iat,
        exp: iat + config.access_token_ttl.as_secs() as usize,
    };
    encode(
        &Header::new(config.jwt_algorithm),
        &claims,
        &EncodingKey::from_secret(config.access_token_secret.as_bytes()),
    )
    .map_err(|err| {
        tracing::error!("failed to sign access token: {err}");
        ApiError::internal("failed to issue token")
    })
}

pub fn sign_refresh_token(config: &AppConfig, user_id: Uuid) -> Result<String, ApiError> {
    let iat = Utc::now().timestamp() as usize;
    let claims = RefreshClaims {
        sub: user_id,
        iat,
        exp: iat + config.refresh_token_ttl.as_secs() as usize,
    };
    encode(
        &Header::new(config.jwt_algorithm),
        &claims,
        &EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
    )
    .map_err(|err| {
        tracing::error!("failed to sign refresh token: {err}");
        ApiError::internal("failed to issue token")
    })
}

pub fn verify_access_token(config: &AppConfig, token: &str) -> Result<AccessClaims, ApiError> {
    let mut validation = Validation::new(config.jwt_algorithm);
    validation.validate_exp = true;
    decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(config.access_token_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|err| match err.kind() {
        ErrorKind::ExpiredSignature => ApiError::unauthorized("access token expired"),
        _ => ApiError::unauthorized("invalid access token"),
    })
}

pub fn verify_refresh_token(config: &AppConfig, token: &str) -> Result<RefreshClaims, ApiError> {
    let mut validation = Validation::new(config.jwt_algorithm);
    validation.validate_exp = true;
    decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|err| match err.kind() {
        ErrorKind::ExpiredSignature => ApiError::unauthorized("refresh token expired"),
        _ => ApiError::unauthorized("invalid refresh token"),
    })
}

/// Signs a fresh pair for `user` and persists the refresh token as the single
/// valid one for the account. A persistence failure invalidates the pair, so it
/// surfaces as an internal error rather than handing out an unrotatable token.
pub async fn issue_token_pair(
    repo: &RepositoryState,
    config: &AppConfig,
    user: &User,
) -> Result<TokenPair, ApiError> {
    let access_token = sign_access_token(config, user)?;
    let refresh_token = sign_refresh_token(config, user.id)?;
    repo.set_refresh_token(user.id, Some(&refresh_token)).await?;
    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Refresh rotation. The presented token must verify AND byte-match the stored
/// one; a mismatch means it was already rotated (replay) or revoked by logout.
pub async fn rotate_refresh_token(
    repo: &RepositoryState,
    config: &AppConfig,
    presented: &str,
) -> Result<(User, TokenPair), ApiError> {
    let claims = verify_refresh_token(config, presented)?;
    let user = repo
        .find_user(claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("invalid refresh token"))?;

    match user.refresh_token.as_deref() {
        Some(stored) if stored == presented => {}
        _ => return Err(ApiError::unauthorized("refresh token expired or already used")),
    }

    let pair = issue_token_pair(repo, config, &user).await?;
    Ok((user, pair))
}

/// Builds the session cookies for a freshly issued pair. HttpOnly always,
/// Secure outside local, SameSite=Lax for the site session.
pub fn session_cookies(config: &AppConfig, pair: &TokenPair) -> (Cookie<'static>, Cookie<'static>) {
    let secure = config.env == Env::Production;
    let access = Cookie::build((ACCESS_COOKIE, pair.access_token.clone()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(config.access_token_ttl.as_secs() as i64))
        .build();
    let refresh = Cookie::build((REFRESH_COOKIE, pair.refresh_token.clone()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(config.refresh_token_ttl.as_secs() as i64))
        .build();
    (access, refresh)
}

/// Admin-console cookie: same access token, stricter SameSite.
pub fn admin_cookie(config: &AppConfig, access_token: &str) -> Cookie<'static> {
    strict_cookie(config, ADMIN_COOKIE, access_token)
}

/// Console login sets both the site access cookie and the admin cookie, both
/// SameSite=Strict.
pub fn admin_session_cookies(
    config: &AppConfig,
    access_token: &str,
) -> (Cookie<'static>, Cookie<'static>) {
    (
        strict_cookie(config, ACCESS_COOKIE, access_token),
        strict_cookie(config, ADMIN_COOKIE, access_token),
    )
}

fn strict_cookie(config: &AppConfig, name: &'static str, value: &str) -> Cookie<'static> {
    Cookie::build((name, value.to_string()))
        .path("/")
        .http_only(true)
        .secure(config.env == Env::Production)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(config.access_token_ttl.as_secs() as i64))
        .build()
}

/// Expired clones of the session cookies, for logout responses.
pub fn clear_session_cookies() -> (Cookie<'static>, Cookie<'static>, Cookie<'static>) {
    let expired = |name: &'static str| {
        Cookie::build((name, ""))
            .path("/")
            .http_only(true)
            .max_age(time::Duration::ZERO)
            .build()
    };
    (
        expired(ACCESS_COOKIE),
        expired(REFRESH_COOKIE),
        expired(ADMIN_COOKIE),
    )
}

/// Pulls a token for site sessions: the access cookie first, then the
/// Authorization bearer header.
fn site_token(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(ACCESS_COOKIE) {
        return Some(cookie.value().to_string());
    }
    bearer_token(parts)
}

/// Pulls a token for console sessions: admin cookie, then bearer, then the
/// legacy `x-auth-token` header the admin frontend still sends.
fn console_token(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(ADMIN_COOKIE) {
        return Some(cookie.value().to_string());
    }
    if let Some(token) = bearer_token(parts) {
        return Some(token);
    }
    parts
        .headers
        .get("x-auth-token")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// The path the client actually requested, before any router nesting stripped
/// prefixes from it.
fn request_path(parts: &Parts) -> String {
    parts
        .extensions
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string())
}

/// Whether a deactivated admin may still reach `path`. Only the admin role gets
/// the bypass; a deactivated moderator is locked out everywhere.
pub fn may_bypass_deactivated(user: &User, path: &str) -> bool {
    user.role == Role::Admin
        && DEACTIVATED_ADMIN_ALLOW_LIST
            .iter()
            .any(|allowed| path.starts_with(allowed))
}

/// Resolves the user behind a console token and applies the role gate shared by
/// [`AdminUser`] and [`StaffUser`].
async fn resolve_console_user(
    parts: &mut Parts,
    repo: &RepositoryState,
    config: &AppConfig,
    allow_moderator: bool,
) -> Result<User, ApiError> {
    let user = if config.env == Env::Local
        && let Some(user) = dev_bypass_user(parts, repo).await?
    {
        user
    } else {
        let token = console_token(parts)
            .ok_or_else(|| ApiError::unauthorized("no token, authorization denied"))?;
        let claims = verify_access_token(config, &token)?;
        repo.find_user(claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthorized("invalid access token"))?
    };

    let role_ok = user.role == Role::Admin || (allow_moderator && user.role == Role::Moderator);
    if !role_ok {
        return Err(ApiError::forbidden("access denied, admin privileges required"));
    }

    if !user.is_active && !may_bypass_deactivated(&user, &request_path(parts)) {
        return Err(ApiError::forbidden("account is deactivated"));
    }

    Ok(user)
}

/// Development-only identity override via the `x-user-id` header. Still hits
/// the store, so roles and active flags come from real rows.
async fn dev_bypass_user(
    parts: &Parts,
    repo: &RepositoryState,
) -> Result<Option<User>, ApiError> {
    let Some(raw) = parts.headers.get("x-user-id") else {
        return Ok(None);
    };
    let Some(id) = raw.to_str().ok().and_then(|s| Uuid::parse_str(s).ok()) else {
        return Ok(None);
    };
    Ok(repo.find_user(id).await?)
}

/// AuthUser
///
/// The resolved identity of an authenticated site request. Implements
/// `FromRequestParts`, so any handler taking `AuthUser` is authenticated by
/// construction. The live user row is re-fetched on every request; a token for
/// a deleted account is rejected even when its signature still verifies.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local
            && let Some(user) = dev_bypass_user(parts, &repo).await?
        {
            return Ok(AuthUser { user });
        }

        let token = site_token(parts)
            .ok_or_else(|| ApiError::unauthorized("unauthorized request"))?;
        let claims = verify_access_token(&config, &token)?;

        let user = repo
            .find_user(claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthorized("invalid access token"))?;

        Ok(AuthUser { user })
    }
}

/// AdminUser
///
/// Role gate for admin-only console routes. Accepts the admin role exclusively
/// and enforces the active-account check, with the reactivation bypass for the
/// allow-listed routes.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user: User,
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);
        let user = resolve_console_user(parts, &repo, &config, false).await?;
        Ok(AdminUser { user })
    }
}

/// StaffUser
///
/// Role gate admitting admins and moderators. The deactivated-account bypass
/// still applies to admins only.
#[derive(Debug, Clone)]
pub struct StaffUser {
    pub user: User,
}

impl<S> FromRequestParts<S> for StaffUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);
        let user = resolve_console_user(parts, &repo, &config, true).await?;
        Ok(StaffUser { user })
    }
}
