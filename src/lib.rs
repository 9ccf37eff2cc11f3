use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod repository;
pub mod response;
pub mod storage;

pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::{AppConfig, Env};
pub use error::ApiError;
pub use mailer::{HttpMailer, MailerState, NoopMailer};
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MediaState, MockMediaStore, S3MediaStore};

/// ApiDoc
///
/// Aggregates the OpenAPI documentation for every annotated handler and schema.
/// The generated JSON is served at `/api-docs/openapi.json` behind the Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::users::register, handlers::users::login, handlers::users::logout,
        handlers::users::refresh_token, handlers::users::current_user,
        handlers::users::change_password, handlers::users::update_account,
        handlers::users::update_avatar, handlers::users::update_cover_image,
        handlers::products::list_products, handlers::products::get_product,
        handlers::products::products_by_category, handlers::products::create_product,
        handlers::products::update_product, handlers::products::delete_product,
        handlers::orders::create_order, handlers::orders::my_orders, handlers::orders::get_order,
        handlers::orders::list_orders, handlers::orders::update_order_status,
        handlers::enquiries::create_enquiry, handlers::enquiries::list_enquiries,
        handlers::enquiries::get_enquiry, handlers::enquiries::update_enquiry,
        handlers::enquiries::delete_enquiry,
        handlers::videos::list_videos, handlers::videos::get_video, handlers::videos::create_video,
        handlers::videos::publish_video, handlers::videos::unpublish_video,
        handlers::videos::update_video, handlers::videos::delete_video,
        handlers::comments::list_comments, handlers::comments::add_comment,
        handlers::comments::update_comment, handlers::comments::delete_comment,
        handlers::admin::admin_login, handlers::admin::admin_logout,
        handlers::admin::list_users, handlers::admin::search_users, handlers::admin::get_user,
        handlers::admin::update_user, handlers::admin::delete_user,
        handlers::admin::update_user_role, handlers::admin::update_user_status,
        handlers::admin::admin_stats, handlers::admin::product_stats,
    ),
    components(
        schemas(
            models::UserProfile, models::Role, models::LoginRequest, models::LoginResponse,
            models::RefreshRequest, models::ChangePasswordRequest, models::UpdateAccountRequest,
            models::AdminLoginRequest, models::AdminLoginResponse,
            models::UpdateUserRoleRequest, models::UpdateUserStatusRequest,
            models::AdminUpdateUserRequest, models::AdminStats, models::ProductStats,
            models::Product, models::UpdateProductRequest,
            models::Order, models::OrderItem, models::ShippingAddress,
            models::CreateOrderRequest, models::UpdateOrderStatusRequest,
            models::OrderStatus, models::PaymentStatus, models::PaymentMethod,
            models::Enquiry, models::EnquiryStatus, models::CreateEnquiryRequest,
            models::UpdateEnquiryRequest,
            models::Video, models::UpdateVideoRequest,
            models::Comment, models::CreateCommentRequest,
            storage::MediaAsset, auth::TokenPair, handlers::HealthInfo,
        )
    ),
    tags(
        (name = "crop-portal", description = "Crop products e-commerce and media API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe container holding every shared service: persistence,
/// media storage, outgoing mail, and the immutable configuration. Cloned per
/// request by axum; all members are cheap handles.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub media: MediaState,
    pub mailer: MailerState,
    pub config: AppConfig,
}

// FromRef lets extractors pull individual services out of the shared state.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for MediaState {
    fn from_ref(app_state: &AppState) -> MediaState {
        app_state.media.clone()
    }
}

impl FromRef<AppState> for MailerState {
    fn from_ref(app_state: &AppState) -> MailerState {
        app_state.mailer.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Gates the authenticated router. Extracting `AuthUser` performs the full
/// token validation and live user lookup; a failure rejects the request with
/// the extractor's error before any handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing tree, applies the observability layers, and registers
/// the shared state. The whole API lives under `/api/v1`.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let api = Router::new()
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .nest("/admin", admin::admin_routes());

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api/v1", api)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                // Correlate every log line of a request by a generated UUID.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// Span factory for `TraceLayer`: tags the request span with method, URI, and
/// the propagated request id.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
