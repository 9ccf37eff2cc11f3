use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Unauthenticated endpoints. Catalog and video reads here must only expose
/// rows marked active/published; that constraint is enforced in the repository
/// queries these handlers call.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // Liveness probe for monitoring and load balancers.
        .route("/health", get(handlers::health))
        // Identity flow: registration is multipart (profile fields + avatar),
        // login and refresh are JSON and also set the session cookies.
        .route("/users/register", post(handlers::users::register))
        .route("/users/login", post(handlers::users::login))
        .route("/users/refresh-token", post(handlers::users::refresh_token))
        // Catalog reads. The root listing carries the full filter set.
        .route("/products", get(handlers::products::list_products))
        .route(
            "/products/category/{category}",
            get(handlers::products::products_by_category),
        )
        .route("/products/{id}", get(handlers::products::get_product))
        // Wholesale enquiry submission from the contact form.
        .route("/enquiries", post(handlers::enquiries::create_enquiry))
        // Published video feed and its comment listing.
        .route("/videos", get(handlers::videos::list_videos))
        .route(
            "/videos/{id}/comments",
            get(handlers::comments::list_comments),
        )
}
