use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Authenticated Router Module
///
/// Everything a logged-in site user can do: session management, profile and
/// media updates, order placement, and the video/comment features. The auth
/// middleware layered above this router rejects anonymous requests before any
/// handler runs; ownership checks happen inside the handlers.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Session & profile ---
        .route("/users/logout", post(handlers::users::logout))
        .route("/users/me", get(handlers::users::current_user))
        .route(
            "/users/change-password",
            post(handlers::users::change_password),
        )
        .route(
            "/users/update-account",
            patch(handlers::users::update_account),
        )
        // Media updates are multipart; old objects are replaced best-effort.
        .route("/users/avatar", patch(handlers::users::update_avatar))
        .route(
            "/users/cover-image",
            patch(handlers::users::update_cover_image),
        )
        // --- Orders ---
        .route("/orders", post(handlers::orders::create_order))
        .route("/orders/my-orders", get(handlers::orders::my_orders))
        .route("/orders/{id}", get(handlers::orders::get_order))
        // --- Videos ---
        .route("/videos", post(handlers::videos::create_video))
        .route(
            "/videos/{id}",
            get(handlers::videos::get_video)
                .patch(handlers::videos::update_video)
                .delete(handlers::videos::delete_video),
        )
        .route("/videos/{id}/publish", post(handlers::videos::publish_video))
        .route(
            "/videos/{id}/unpublish",
            post(handlers::videos::unpublish_video),
        )
        // --- Comments ---
        .route(
            "/videos/{id}/comments",
            post(handlers::comments::add_comment),
        )
        .route(
            "/comments/{id}",
            patch(handlers::comments::update_comment)
                .delete(handlers::comments::delete_comment),
        )
}
