use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Console endpoints, nested under `/admin`. The role gate lives in the
/// `AdminUser`/`StaffUser` extractors on each handler, which is also why the
/// unauthenticated login endpoint can share this router. Status and role
/// changes stay reachable for a deactivated admin via the extractor's
/// allow-list, so the console can always recover an admin account.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Console session ---
        .route("/login", post(handlers::admin::admin_login))
        .route("/logout", post(handlers::admin::admin_logout))
        // --- User management ---
        .route("/users", get(handlers::admin::list_users))
        .route("/users/search", get(handlers::admin::search_users))
        // Admin-only: role changes, with the last-active-admin guard.
        .route("/users/role", put(handlers::admin::update_user_role))
        // Admin or moderator: activation toggle.
        .route("/users/status", put(handlers::admin::update_user_status))
        .route(
            "/users/{id}",
            get(handlers::admin::get_user)
                .patch(handlers::admin::update_user)
                .delete(handlers::admin::delete_user),
        )
        // --- Dashboards ---
        .route("/stats", get(handlers::admin::admin_stats))
        .route("/products/stats", get(handlers::admin::product_stats))
        // --- Catalog management ---
        .route("/products", post(handlers::products::create_product))
        .route(
            "/products/{id}",
            put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        // --- Orders ---
        .route("/orders", get(handlers::orders::list_orders))
        .route(
            "/orders/{id}/status",
            put(handlers::orders::update_order_status),
        )
        // --- Enquiries ---
        .route("/enquiries", get(handlers::enquiries::list_enquiries))
        .route(
            "/enquiries/{id}",
            get(handlers::enquiries::get_enquiry)
                .put(handlers::enquiries::update_enquiry)
                .delete(handlers::enquiries::delete_enquiry),
        )
}
