//! Site session lifecycle: login, refresh rotation with replay detection, and
//! logout revocation.

mod common;

use axum::http::{Method, StatusCode, header};
use serde_json::json;
use tower::util::ServiceExt;

use common::*;
use crop_portal::models::Role;
use crop_portal::create_router;

#[tokio::test]
async fn login_issues_a_pair_and_persists_the_refresh_token() {
    let repo = MockRepo::new();
    let mut user = user_with(Role::User, true);
    user.username = "grower".to_string();
    user.password_hash = hashed("field-pass");
    let user = repo.seed_user(user);
    let repo_handle = repo.clone();
    let state = test_state(repo);
    let app = create_router(state);

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/users/login",
            None,
            json!({ "username": "grower", "password": "field-pass" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let cookies: Vec<_> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("accessToken=")));
    assert!(cookies.iter().any(|c| c.starts_with("refreshToken=")));

    let body = response_json(response).await;
    assert_eq!(body["message"], json!("User logged in successfully"));
    let issued = body["data"]["refreshToken"].as_str().unwrap().to_string();
    assert_eq!(
        repo_handle.user(user.id).unwrap().refresh_token,
        Some(issued)
    );
    assert!(repo_handle.user(user.id).unwrap().last_login.is_some());
}

#[tokio::test]
async fn login_requires_an_identifier() {
    let repo = MockRepo::new();
    let state = test_state(repo);
    let app = create_router(state);

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/users/login",
            None,
            json!({ "password": "whatever" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["message"], json!("username or email is required"));
}

#[tokio::test]
async fn login_distinguishes_unknown_user_from_bad_password() {
    let repo = MockRepo::new();
    let mut user = user_with(Role::User, true);
    user.email = "grower@example.com".to_string();
    user.password_hash = hashed("field-pass");
    repo.seed_user(user);
    let state = test_state(repo);
    let app = create_router(state.clone());

    let missing = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/users/login",
            None,
            json!({ "email": "nobody@example.com", "password": "field-pass" }),
        ))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let wrong = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/users/login",
            None,
            json!({ "email": "grower@example.com", "password": "not-it" }),
        ))
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(wrong).await;
    assert_eq!(body["message"], json!("invalid user credentials"));
}

#[tokio::test]
async fn refresh_rotates_and_rejects_the_replayed_token() {
    let repo = MockRepo::new();
    let mut user = user_with(Role::User, true);
    user.username = "grower".to_string();
    user.password_hash = hashed("field-pass");
    repo.seed_user(user);
    let state = test_state(repo);
    let app = create_router(state);

    let login = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/users/login",
            None,
            json!({ "username": "grower", "password": "field-pass" }),
        ))
        .await
        .unwrap();
    let login_body = response_json(login).await;
    let first_refresh = login_body["data"]["refreshToken"].as_str().unwrap().to_string();

    let rotated = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/users/refresh-token",
            None,
            json!({ "refreshToken": first_refresh }),
        ))
        .await
        .unwrap();
    assert_eq!(rotated.status(), StatusCode::OK);
    let rotated_body = response_json(rotated).await;
    assert_eq!(
        rotated_body["message"],
        json!("Access token refreshed successfully")
    );
    assert!(rotated_body["data"]["refreshToken"].as_str().is_some());

    // The first token was consumed by the rotation above.
    let replay = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/users/refresh-token",
            None,
            json!({ "refreshToken": first_refresh }),
        ))
        .await
        .unwrap();
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    let replay_body = response_json(replay).await;
    assert_eq!(
        replay_body["message"],
        json!("refresh token expired or already used")
    );
}

#[tokio::test]
async fn refresh_accepts_the_cookie_form() {
    let repo = MockRepo::new();
    let mut user = user_with(Role::User, true);
    user.username = "grower".to_string();
    user.password_hash = hashed("field-pass");
    repo.seed_user(user);
    let state = test_state(repo);
    let app = create_router(state);

    let login = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/users/login",
            None,
            json!({ "username": "grower", "password": "field-pass" }),
        ))
        .await
        .unwrap();
    let login_body = response_json(login).await;
    let refresh = login_body["data"]["refreshToken"].as_str().unwrap();

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/v1/users/refresh-token")
        .header(header::COOKIE, format!("refreshToken={refresh}"))
        .body(axum::body::Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn refresh_without_a_token_is_unauthorized() {
    let repo = MockRepo::new();
    let state = test_state(repo);
    let app = create_router(state);

    let response = app
        .oneshot(bare_request(Method::POST, "/api/v1/users/refresh-token", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["message"], json!("unauthorized request"));
}

#[tokio::test]
async fn logout_revokes_the_stored_refresh_token() {
    let repo = MockRepo::new();
    let mut user = user_with(Role::User, true);
    user.username = "grower".to_string();
    user.password_hash = hashed("field-pass");
    let user = repo.seed_user(user);
    let repo_handle = repo.clone();
    let state = test_state(repo);
    let token = token_for(&state.config, &user);
    let app = create_router(state);

    let login = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/users/login",
            None,
            json!({ "username": "grower", "password": "field-pass" }),
        ))
        .await
        .unwrap();
    let login_body = response_json(login).await;
    let refresh = login_body["data"]["refreshToken"].as_str().unwrap().to_string();

    let logout = app
        .clone()
        .oneshot(bare_request(Method::POST, "/api/v1/users/logout", Some(&token)))
        .await
        .unwrap();
    assert_eq!(logout.status(), StatusCode::OK);
    assert_eq!(repo_handle.user(user.id).unwrap().refresh_token, None);

    // The revoked token verifies but no longer matches anything stored.
    let after = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/users/refresh-token",
            None,
            json!({ "refreshToken": refresh }),
        ))
        .await
        .unwrap();
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_response_carries_no_credentials() {
    let repo = MockRepo::new();
    let mut user = user_with(Role::User, true);
    user.password_hash = hashed("field-pass");
    user.refresh_token = Some("stored-token".to_string());
    let user = repo.seed_user(user);
    let state = test_state(repo);
    let token = token_for(&state.config, &user);
    let app = create_router(state);

    let response = app
        .oneshot(bare_request(Method::GET, "/api/v1/users/me", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert!(body["data"].get("passwordHash").is_none());
    assert!(body["data"].get("refreshToken").is_none());
    assert_eq!(body["data"]["id"], json!(user.id));
}

#[tokio::test]
async fn change_password_checks_old_password_and_confirmation() {
    let repo = MockRepo::new();
    let mut user = user_with(Role::User, true);
    user.password_hash = hashed("old-pass");
    let user = repo.seed_user(user);
    let state = test_state(repo);
    let token = token_for(&state.config, &user);
    let app = create_router(state);

    let wrong_old = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/users/change-password",
            Some(&token),
            json!({ "oldPassword": "not-it", "newPassword": "a", "confPassword": "a" }),
        ))
        .await
        .unwrap();
    assert_eq!(wrong_old.status(), StatusCode::BAD_REQUEST);
    let body = response_json(wrong_old).await;
    assert_eq!(body["message"], json!("old password is incorrect"));

    let mismatch = app
        .oneshot(json_request(
            Method::POST,
            "/api/v1/users/change-password",
            Some(&token),
            json!({ "oldPassword": "old-pass", "newPassword": "a", "confPassword": "b" }),
        ))
        .await
        .unwrap();
    assert_eq!(mismatch.status(), StatusCode::BAD_REQUEST);
    let body = response_json(mismatch).await;
    assert_eq!(
        body["message"],
        json!("new password and confirm password do not match")
    );
}
