use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::storage::MediaAsset;

// --- Enumerations (mapped to Postgres enum types) ---

/// Role
///
/// The static authorization role carried by every principal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, TS, ToSchema, Default,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    /// Parses the wire form used by the admin role-change endpoint. Anything
    /// outside the fixed set is a validation failure, not a deserialization one.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "moderator" => Some(Self::Moderator),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, TS, ToSchema, Default,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "enquiry_status", rename_all = "lowercase")]
#[ts(export)]
pub enum EnquiryStatus {
    #[default]
    Pending,
    Contacted,
    Resolved,
    Cancelled,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, TS, ToSchema, Default,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[ts(export)]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, TS, ToSchema, Default,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[ts(export)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[ts(export)]
pub enum PaymentMethod {
    Cod,
    Online,
    Card,
    Upi,
}

// --- Principal ---

/// User
///
/// The canonical principal record. Internal only: `password_hash` and
/// `refresh_token` never cross the wire — responses use [`UserProfile`].
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub avatar_id: Option<String>,
    pub cover_url: Option<String>,
    pub cover_id: Option<String>,
    pub password_hash: String,
    // The single currently-valid refresh token for this account. Overwritten on
    // every issue; any other presented value is treated as replayed or stale.
    pub refresh_token: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub last_logout: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// UserProfile
///
/// Wire form of a principal, with credentials and session state stripped.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub cover_url: Option<String>,
    pub role: Role,
    pub is_active: bool,
    #[ts(type = "string | null")]
    pub last_login: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub last_logout: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            full_name: u.full_name,
            avatar_url: u.avatar_url,
            cover_url: u.cover_url,
            role: u.role,
            is_active: u.is_active,
            last_login: u.last_login,
            last_logout: u.last_logout,
            created_at: u.created_at,
        }
    }
}

/// Arguments for inserting a new principal. The password arrives pre-hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar: Option<MediaAsset>,
    pub cover: Option<MediaAsset>,
    pub role: Role,
    pub is_active: bool,
}

// --- Product ---

/// Product
///
/// A catalog entry. `bulk_price` is always strictly below `price`; `in_stock`
/// tracks `stock_quantity > 0`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: f64,
    pub bulk_price: f64,
    pub min_order: i32,
    pub features: Vec<String>,
    pub image_url: String,
    pub image_id: String,
    pub emoji: String,
    pub bestseller: bool,
    pub in_stock: bool,
    pub stock_quantity: i32,
    pub rating: f64,
    pub review_count: i32,
    pub total_sales: i32,
    pub tags: Vec<String>,
    pub meta_description: Option<String>,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Arguments for inserting a new product, already validated by the handler.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: f64,
    pub bulk_price: f64,
    pub min_order: i32,
    pub features: Vec<String>,
    pub image: MediaAsset,
    pub emoji: String,
    pub bestseller: bool,
    pub stock_quantity: i32,
    pub tags: Vec<String>,
    pub meta_description: Option<String>,
    pub created_by: Uuid,
}

/// UpdateProductRequest
///
/// Partial update payload. Only `Some` fields reach the store (COALESCE update).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateProductRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bulk_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_order: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bestseller: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

// --- Order ---

/// A single line item inside an order document.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderItem {
    pub product: Uuid,
    pub quantity: i32,
    pub price: f64,
    pub product_name: Option<String>,
    pub product_image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ShippingAddress {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub country: Option<String>,
}

/// Order
///
/// A stored order. Items and the shipping address live as JSONB documents, the
/// way the upstream data was shaped.
#[derive(Debug, Clone, Serialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Order {
    pub id: Uuid,
    // Human-facing order code, e.g. "ORD483021XK".
    pub order_id: String,
    pub user_id: Uuid,
    #[ts(type = "Array<OrderItem>")]
    #[schema(value_type = Vec<OrderItem>)]
    pub items: Json<Vec<OrderItem>>,
    pub total_amount: f64,
    #[ts(type = "ShippingAddress")]
    #[schema(value_type = ShippingAddress)]
    pub shipping_address: Json<ShippingAddress>,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// CreateOrderRequest
///
/// Input payload for order placement.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub total_amount: f64,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub total_amount: f64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateOrderStatusRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
}

// --- Enquiry ---

/// Enquiry
///
/// A wholesale/contact enquiry submitted from the public site.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Enquiry {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub company_name: String,
    pub contact_person: String,
    pub product_category: String,
    pub quantity_required: i32,
    pub status: EnquiryStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateEnquiryRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub company_name: String,
    pub contact_person: String,
    pub product_category: String,
    pub quantity_required: i32,
}

/// Partial enquiry update: absent fields keep their stored value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateEnquiryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_person: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_required: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EnquiryStatus>,
}

// --- Video ---

/// Video
///
/// An uploaded video. The `owner_*` fields are populated by a join in list and
/// detail queries; they default to `None` for plain row fetches.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Video {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub video_id: String,
    pub views: i64,
    pub is_published: bool,
    pub comment_count: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub owner_username: Option<String>,
    #[sqlx(default)]
    pub owner_full_name: Option<String>,
    #[sqlx(default)]
    pub owner_avatar_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub video: MediaAsset,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateVideoRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// --- Comment ---

/// Comment
///
/// A comment on a video, enriched with its author summary via a join.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub video_id: Uuid,
    pub owner_id: Uuid,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub author_username: Option<String>,
    #[sqlx(default)]
    pub author_full_name: Option<String>,
    #[sqlx(default)]
    pub author_avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateCommentRequest {
    pub content: String,
}

/// ProductFilter
///
/// Accepted query parameters for the filtered catalog listing. Sort values
/// mirror the frontend's convention: a leading `-` means descending, and the
/// default is `-createdAt`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub search: Option<String>,
    pub bestseller: Option<bool>,
    pub in_stock: Option<bool>,
    /// Comma-separated list; every tag must match.
    pub tags: Option<String>,
}

/// Sortable comment columns. A closed set so the ORDER BY clause can be
/// formatted directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentSort {
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl CommentSort {
    /// Maps the wire `sortBy` value; anything unrecognized falls back to the
    /// default, matching the lenient behavior the frontend relies on.
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("updatedAt") => Self::UpdatedAt,
            _ => Self::CreatedAt,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

// --- Auth payloads ---

/// LoginRequest
///
/// Either `username` or `email` identifies the principal; supplying neither is a
/// validation failure.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub conf_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateAccountRequest {
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

/// Role change payload. `new_role` stays a string so that unknown values produce
/// a 400 naming the allowed set rather than a deserialization rejection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateUserRoleRequest {
    pub user_id: Uuid,
    pub new_role: String,
}

/// Status change payload. `is_active: None` toggles the current value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateUserStatusRequest {
    pub user_id: Uuid,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdminUpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Login response: the profile plus both tokens, which also travel as cookies.
#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdminLoginResponse {
    pub user: UserProfile,
    pub token: String,
}

/// Accepted query parameters for the admin user search.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct UserSearchQuery {
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub query: Option<String>,
}

/// Accepted query parameters for the published-video listing.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct VideoListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

/// Accepted query parameters for the comment listing.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct CommentListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

// --- Dashboard stats ---

/// AdminStats
///
/// Counters for the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdminStats {
    pub total_users: i64,
    pub active_users: i64,
    pub inactive_users: i64,
    pub moderators: i64,
    pub admins: i64,
    pub total_products: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductStats {
    pub total_products: i64,
    pub in_stock_products: i64,
    pub out_of_stock_products: i64,
}
