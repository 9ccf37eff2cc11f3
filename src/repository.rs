use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{PgPool, query_builder::QueryBuilder};
use uuid::Uuid;

use crate::models::{
    AdminStats, AdminUpdateUserRequest, Comment, CommentSort, CreateEnquiryRequest, Enquiry,
    NewOrder, NewProduct, NewUser, NewVideo, Order, Product, ProductFilter, ProductStats, Role,
    UpdateEnquiryRequest, UpdateOrderStatusRequest, UpdateProductRequest, UpdateVideoRequest, User,
    Video,
};
use crate::storage::MediaAsset;

/// Repository
///
/// Defines the abstract contract for all persistence operations. Handlers talk
/// to this trait only, so the Postgres implementation and the test mock are
/// interchangeable behind `Arc<dyn Repository>`.
///
/// Every method returns `Result<_, sqlx::Error>`; the error conversion into the
/// API taxonomy (unique violations to 409, and so on) happens at the handler
/// boundary via `From<sqlx::Error> for ApiError`.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users / auth ---
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error>;
    // Login lookup: matches either identifier, whichever was supplied.
    async fn find_user_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;
    async fn find_admin_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error>;
    async fn count_admins(&self) -> Result<i64, sqlx::Error>;
    async fn count_active_admins(&self) -> Result<i64, sqlx::Error>;
    async fn create_user(&self, new: NewUser) -> Result<User, sqlx::Error>;
    async fn update_account(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<Option<User>, sqlx::Error>;
    // Admin partial update. COALESCE keeps absent fields untouched.
    async fn admin_update_user(
        &self,
        id: Uuid,
        req: &AdminUpdateUserRequest,
    ) -> Result<Option<User>, sqlx::Error>;
    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<bool, sqlx::Error>;
    // `None` revokes the stored refresh token.
    async fn set_refresh_token(
        &self,
        id: Uuid,
        token: Option<&str>,
    ) -> Result<bool, sqlx::Error>;
    async fn set_avatar(&self, id: Uuid, asset: &MediaAsset) -> Result<Option<User>, sqlx::Error>;
    async fn set_cover_image(
        &self,
        id: Uuid,
        asset: &MediaAsset,
    ) -> Result<Option<User>, sqlx::Error>;
    async fn list_users(&self, page: i64, limit: i64) -> Result<Vec<User>, sqlx::Error>;
    async fn search_users(
        &self,
        role: Option<Role>,
        is_active: Option<bool>,
        query: Option<&str>,
    ) -> Result<Vec<User>, sqlx::Error>;
    async fn delete_user(&self, id: Uuid) -> Result<bool, sqlx::Error>;
    async fn set_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>, sqlx::Error>;
    // `None` toggles the current flag instead of setting it.
    async fn set_user_active(
        &self,
        id: Uuid,
        active: Option<bool>,
    ) -> Result<Option<User>, sqlx::Error>;
    async fn record_login(&self, id: Uuid) -> Result<bool, sqlx::Error>;
    async fn record_logout(&self, id: Uuid) -> Result<bool, sqlx::Error>;
    async fn user_stats(&self) -> Result<AdminStats, sqlx::Error>;

    // --- Products ---
    // Filtered catalog listing. Returns the page plus the total matching count.
    async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<(Vec<Product>, i64), sqlx::Error>;
    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, sqlx::Error>;
    // Case-insensitive duplicate check used before insert.
    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>, sqlx::Error>;
    async fn find_products_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<Product>, sqlx::Error>;
    async fn create_product(&self, new: NewProduct) -> Result<Product, sqlx::Error>;
    async fn update_product(
        &self,
        id: Uuid,
        req: &UpdateProductRequest,
        updated_by: Uuid,
    ) -> Result<Option<Product>, sqlx::Error>;
    async fn delete_product(&self, id: Uuid) -> Result<bool, sqlx::Error>;
    async fn product_stats(&self) -> Result<ProductStats, sqlx::Error>;
    async fn decrement_stock(&self, id: Uuid, quantity: i32) -> Result<bool, sqlx::Error>;

    // --- Orders ---
    async fn create_order(&self, new: NewOrder) -> Result<Order, sqlx::Error>;
    async fn list_orders(&self) -> Result<Vec<Order>, sqlx::Error>;
    async fn list_user_orders(&self, user_id: Uuid) -> Result<Vec<Order>, sqlx::Error>;
    async fn find_order(&self, id: Uuid) -> Result<Option<Order>, sqlx::Error>;
    async fn update_order_status(
        &self,
        id: Uuid,
        req: &UpdateOrderStatusRequest,
    ) -> Result<Option<Order>, sqlx::Error>;

    // --- Enquiries ---
    async fn create_enquiry(&self, req: &CreateEnquiryRequest) -> Result<Enquiry, sqlx::Error>;
    async fn list_enquiries(&self) -> Result<Vec<Enquiry>, sqlx::Error>;
    async fn find_enquiry(&self, id: Uuid) -> Result<Option<Enquiry>, sqlx::Error>;
    async fn update_enquiry(
        &self,
        id: Uuid,
        req: &UpdateEnquiryRequest,
    ) -> Result<Option<Enquiry>, sqlx::Error>;
    async fn delete_enquiry(&self, id: Uuid) -> Result<bool, sqlx::Error>;

    // --- Videos ---
    async fn list_published_videos(
        &self,
        search: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Video>, i64), sqlx::Error>;
    async fn find_video(&self, id: Uuid) -> Result<Option<Video>, sqlx::Error>;
    async fn create_video(&self, new: NewVideo) -> Result<Video, sqlx::Error>;
    async fn update_video(
        &self,
        id: Uuid,
        req: &UpdateVideoRequest,
    ) -> Result<Option<Video>, sqlx::Error>;
    async fn set_video_published(
        &self,
        id: Uuid,
        published: bool,
    ) -> Result<Option<Video>, sqlx::Error>;
    // Returns the deleted row so the caller can clean up the stored media.
    async fn delete_video(&self, id: Uuid) -> Result<Option<Video>, sqlx::Error>;

    // --- Comments ---
    async fn list_video_comments(
        &self,
        video_id: Uuid,
        page: i64,
        limit: i64,
        sort: CommentSort,
        descending: bool,
    ) -> Result<(Vec<Comment>, i64), sqlx::Error>;
    async fn add_comment(
        &self,
        video_id: Uuid,
        owner_id: Uuid,
        content: &str,
    ) -> Result<Comment, sqlx::Error>;
    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, sqlx::Error>;
    async fn update_comment(&self, id: i64, content: &str)
    -> Result<Option<Comment>, sqlx::Error>;
    async fn delete_comment(&self, id: i64) -> Result<bool, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLS: &str = "id, username, email, full_name, avatar_url, avatar_id, cover_url, \
     cover_id, password_hash, refresh_token, role, is_active, last_login, last_logout, \
     created_at, updated_at";

const PRODUCT_COLS: &str = "id, name, description, category, price, bulk_price, min_order, \
     features, image_url, image_id, emoji, bestseller, in_stock, stock_quantity, rating, \
     review_count, total_sales, tags, meta_description, created_by, updated_by, is_active, \
     created_at, updated_at";

const ORDER_COLS: &str = "id, order_id, user_id, items, total_amount, shipping_address, \
     payment_status, order_status, payment_method, transaction_id, notes, created_at, updated_at";

const ENQUIRY_COLS: &str = "id, name, email, phone, message, company_name, contact_person, \
     product_category, quantity_required, status, created_at, updated_at";

const VIDEO_COLS_JOINED: &str = "v.id, v.owner_id, v.title, v.description, v.video_url, \
     v.video_id, v.views, v.is_published, v.comment_count, v.created_at, v.updated_at, \
     u.username AS owner_username, u.full_name AS owner_full_name, \
     u.avatar_url AS owner_avatar_url";

const COMMENT_COLS_JOINED: &str = "c.id, c.video_id, c.owner_id, c.content, c.created_at, \
     c.updated_at, u.username AS author_username, u.full_name AS author_full_name, \
     u.avatar_url AS author_avatar_url";

/// PostgresRepository
///
/// The concrete implementation of `Repository`, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Appends the WHERE clauses for a product filter. Shared between the page
/// query and its count query so the two can never disagree.
fn push_product_filters(builder: &mut QueryBuilder<'_, sqlx::Postgres>, filter: &ProductFilter) {
    if let Some(category) = &filter.category {
        builder.push(" AND category ILIKE ");
        builder.push_bind(format!("%{category}%"));
    }
    if let Some(min) = filter.min_price {
        builder.push(" AND price >= ");
        builder.push_bind(min);
    }
    if let Some(max) = filter.max_price {
        builder.push(" AND price <= ");
        builder.push_bind(max);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        builder.push(" AND (name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR description ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR EXISTS (SELECT 1 FROM unnest(tags) t WHERE t ILIKE ");
        builder.push_bind(pattern);
        builder.push("))");
    }
    if filter.bestseller == Some(true) {
        builder.push(" AND bestseller = TRUE");
    }
    match filter.in_stock {
        Some(true) => {
            builder.push(" AND stock_quantity > 0");
        }
        Some(false) => {
            builder.push(" AND stock_quantity <= 0");
        }
        None => {}
    }
    if let Some(tags) = &filter.tags {
        for tag in tags.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            builder.push(" AND EXISTS (SELECT 1 FROM unnest(tags) t WHERE t ILIKE ");
            builder.push_bind(format!("%{tag}%"));
            builder.push(")");
        }
    }
}

/// Maps the wire sort parameter to an ORDER BY clause. Whitelisted values only;
/// anything unrecognized falls back to newest-first.
fn product_order_clause(sort: Option<&str>) -> &'static str {
    match sort {
        Some("price") => "price ASC",
        Some("-price") => "price DESC",
        Some("name") => "name ASC",
        Some("-name") => "name DESC",
        Some("rating") => "rating ASC",
        Some("-rating") => "rating DESC",
        Some("createdAt") => "created_at ASC",
        _ => "created_at DESC",
    }
}

/// Generates a human-facing order code, e.g. `ORD1756080000000A3F2C1`.
fn generate_order_code() -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(6)
        .collect();
    format!(
        "ORD{}{}",
        Utc::now().timestamp_millis(),
        suffix.to_uppercase()
    )
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_user_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {USER_COLS} FROM users WHERE FALSE"));
        if let Some(username) = username {
            builder.push(" OR username = ");
            builder.push_bind(username.to_string());
        }
        if let Some(email) = email {
            builder.push(" OR email = ");
            builder.push_bind(email.to_string());
        }
        builder
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_admin_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLS} FROM users WHERE username = $1 AND role = 'admin'"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    async fn count_admins(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(&self.pool)
            .await
    }

    async fn count_active_admins(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE role = 'admin' AND is_active = TRUE",
        )
        .fetch_one(&self.pool)
        .await
    }

    async fn create_user(&self, new: NewUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, full_name, password_hash, avatar_url, \
             avatar_id, cover_url, cover_id, role, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {USER_COLS}"
        ))
        .bind(new.username)
        .bind(new.email)
        .bind(new.full_name)
        .bind(new.password_hash)
        .bind(new.avatar.as_ref().map(|a| a.url.clone()))
        .bind(new.avatar.as_ref().map(|a| a.public_id.clone()))
        .bind(new.cover.as_ref().map(|c| c.url.clone()))
        .bind(new.cover.as_ref().map(|c| c.public_id.clone()))
        .bind(new.role)
        .bind(new.is_active)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_account(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET full_name = $2, email = $3, updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLS}"
        ))
        .bind(id)
        .bind(full_name)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn admin_update_user(
        &self,
        id: Uuid,
        req: &AdminUpdateUserRequest,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
             full_name = COALESCE($2, full_name), \
             email = COALESCE($3, email), \
             username = COALESCE($4, username), \
             updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLS}"
        ))
        .bind(id)
        .bind(req.full_name.as_deref())
        .bind(req.email.as_deref())
        .bind(req.username.as_deref())
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_refresh_token(
        &self,
        id: Uuid,
        token: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET refresh_token = $2 WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_avatar(&self, id: Uuid, asset: &MediaAsset) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET avatar_url = $2, avatar_id = $3, updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLS}"
        ))
        .bind(id)
        .bind(&asset.url)
        .bind(&asset.public_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_cover_image(
        &self,
        id: Uuid,
        asset: &MediaAsset,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET cover_url = $2, cover_id = $3, updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLS}"
        ))
        .bind(id)
        .bind(&asset.url)
        .bind(&asset.public_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_users(&self, page: i64, limit: i64) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn search_users(
        &self,
        role: Option<Role>,
        is_active: Option<bool>,
        query: Option<&str>,
    ) -> Result<Vec<User>, sqlx::Error> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {USER_COLS} FROM users WHERE TRUE"));
        if let Some(role) = role {
            builder.push(" AND role = ");
            builder.push_bind(role);
        }
        if let Some(active) = is_active {
            builder.push(" AND is_active = ");
            builder.push_bind(active);
        }
        if let Some(query) = query {
            let pattern = format!("%{query}%");
            builder.push(" AND (username ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR email ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }
        builder.push(" ORDER BY created_at DESC");
        builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2, updated_at = now() WHERE id = $1 RETURNING {USER_COLS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_user_active(
        &self,
        id: Uuid,
        active: Option<bool>,
    ) -> Result<Option<User>, sqlx::Error> {
        // NULL toggles, an explicit value sets.
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_active = COALESCE($2, NOT is_active), updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLS}"
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await
    }

    async fn record_login(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_logout(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET last_logout = now(), refresh_token = NULL WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn user_stats(&self) -> Result<AdminStats, sqlx::Error> {
        let row: (i64, i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), \
             COUNT(*) FILTER (WHERE is_active = TRUE), \
             COUNT(*) FILTER (WHERE is_active = FALSE), \
             COUNT(*) FILTER (WHERE role = 'moderator'), \
             COUNT(*) FILTER (WHERE role = 'admin') \
             FROM users",
        )
        .fetch_one(&self.pool)
        .await?;
        let total_products = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(AdminStats {
            total_users: row.0,
            active_users: row.1,
            inactive_users: row.2,
            moderators: row.3,
            admins: row.4,
            total_products,
        })
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<(Vec<Product>, i64), sqlx::Error> {
        let page = filter.page.unwrap_or(1).max(1);
        let limit = filter.limit.unwrap_or(12).clamp(1, 100);

        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {PRODUCT_COLS} FROM products WHERE is_active = TRUE"
        ));
        push_product_filters(&mut builder, filter);
        builder.push(format!(
            " ORDER BY {}",
            product_order_clause(filter.sort.as_deref())
        ));
        builder.push(" LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind((page - 1) * limit);
        let products = builder
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        let mut count_builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM products WHERE is_active = TRUE");
        push_product_filters(&mut count_builder, filter);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok((products, total))
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLS} FROM products WHERE lower(name) = lower($1)"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_products_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLS} FROM products WHERE category = $1 ORDER BY created_at DESC"
        ))
        .bind(category)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_product(&self, new: NewProduct) -> Result<Product, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (name, description, category, price, bulk_price, min_order, \
             features, image_url, image_id, emoji, bestseller, in_stock, stock_quantity, tags, \
             meta_description, created_by, updated_by, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $16, TRUE) \
             RETURNING {PRODUCT_COLS}"
        ))
        .bind(new.name)
        .bind(new.description)
        .bind(new.category)
        .bind(new.price)
        .bind(new.bulk_price)
        .bind(new.min_order)
        .bind(new.features)
        .bind(new.image.url)
        .bind(new.image.public_id)
        .bind(new.emoji)
        .bind(new.bestseller)
        .bind(new.stock_quantity > 0)
        .bind(new.stock_quantity)
        .bind(new.tags)
        .bind(new.meta_description)
        .bind(new.created_by)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_product(
        &self,
        id: Uuid,
        req: &UpdateProductRequest,
        updated_by: Uuid,
    ) -> Result<Option<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET \
             name = COALESCE($2, name), \
             description = COALESCE($3, description), \
             category = COALESCE($4, category), \
             price = COALESCE($5, price), \
             bulk_price = COALESCE($6, bulk_price), \
             min_order = COALESCE($7, min_order), \
             features = COALESCE($8, features), \
             emoji = COALESCE($9, emoji), \
             bestseller = COALESCE($10, bestseller), \
             stock_quantity = COALESCE($11, stock_quantity), \
             in_stock = COALESCE($11, stock_quantity) > 0, \
             tags = COALESCE($12, tags), \
             meta_description = COALESCE($13, meta_description), \
             is_active = COALESCE($14, is_active), \
             updated_by = $15, \
             updated_at = now() \
             WHERE id = $1 RETURNING {PRODUCT_COLS}"
        ))
        .bind(id)
        .bind(req.name.as_deref())
        .bind(req.description.as_deref())
        .bind(req.category.as_deref())
        .bind(req.price)
        .bind(req.bulk_price)
        .bind(req.min_order)
        .bind(req.features.as_deref())
        .bind(req.emoji.as_deref())
        .bind(req.bestseller)
        .bind(req.stock_quantity)
        .bind(req.tags.as_deref())
        .bind(req.meta_description.as_deref())
        .bind(req.is_active)
        .bind(updated_by)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn product_stats(&self) -> Result<ProductStats, sqlx::Error> {
        let row: (i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), \
             COUNT(*) FILTER (WHERE in_stock = TRUE), \
             COUNT(*) FILTER (WHERE in_stock = FALSE) \
             FROM products",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(ProductStats {
            total_products: row.0,
            in_stock_products: row.1,
            out_of_stock_products: row.2,
        })
    }

    async fn decrement_stock(&self, id: Uuid, quantity: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE products SET stock_quantity = stock_quantity - $2, \
             in_stock = stock_quantity - $2 > 0, \
             total_sales = total_sales + $2, \
             updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_order(&self, new: NewOrder) -> Result<Order, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders (order_id, user_id, items, total_amount, shipping_address, \
             payment_status, order_status, payment_method, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8) RETURNING {ORDER_COLS}"
        ))
        .bind(generate_order_code())
        .bind(new.user_id)
        .bind(Json(new.items))
        .bind(new.total_amount)
        .bind(Json(new.shipping_address))
        .bind(new.payment_status)
        .bind(new.payment_method)
        .bind(new.notes)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_orders(&self) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn list_user_orders(&self, user_id: Uuid) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        req: &UpdateOrderStatusRequest,
    ) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET \
             order_status = COALESCE($2, order_status), \
             payment_status = COALESCE($3, payment_status), \
             updated_at = now() \
             WHERE id = $1 RETURNING {ORDER_COLS}"
        ))
        .bind(id)
        .bind(req.order_status)
        .bind(req.payment_status)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_enquiry(&self, req: &CreateEnquiryRequest) -> Result<Enquiry, sqlx::Error> {
        sqlx::query_as::<_, Enquiry>(&format!(
            "INSERT INTO enquiries (name, email, phone, message, company_name, contact_person, \
             product_category, quantity_required, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending') RETURNING {ENQUIRY_COLS}"
        ))
        .bind(&req.name)
        .bind(&req.email)
        .bind(&req.phone)
        .bind(&req.message)
        .bind(&req.company_name)
        .bind(&req.contact_person)
        .bind(&req.product_category)
        .bind(req.quantity_required)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_enquiries(&self) -> Result<Vec<Enquiry>, sqlx::Error> {
        sqlx::query_as::<_, Enquiry>(&format!(
            "SELECT {ENQUIRY_COLS} FROM enquiries ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn find_enquiry(&self, id: Uuid) -> Result<Option<Enquiry>, sqlx::Error> {
        sqlx::query_as::<_, Enquiry>(&format!(
            "SELECT {ENQUIRY_COLS} FROM enquiries WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_enquiry(
        &self,
        id: Uuid,
        req: &UpdateEnquiryRequest,
    ) -> Result<Option<Enquiry>, sqlx::Error> {
        sqlx::query_as::<_, Enquiry>(&format!(
            "UPDATE enquiries SET \
             name = COALESCE($2, name), \
             email = COALESCE($3, email), \
             phone = COALESCE($4, phone), \
             message = COALESCE($5, message), \
             company_name = COALESCE($6, company_name), \
             contact_person = COALESCE($7, contact_person), \
             product_category = COALESCE($8, product_category), \
             quantity_required = COALESCE($9, quantity_required), \
             status = COALESCE($10, status), \
             updated_at = now() \
             WHERE id = $1 RETURNING {ENQUIRY_COLS}"
        ))
        .bind(id)
        .bind(req.name.as_deref())
        .bind(req.email.as_deref())
        .bind(req.phone.as_deref())
        .bind(req.message.as_deref())
        .bind(req.company_name.as_deref())
        .bind(req.contact_person.as_deref())
        .bind(req.product_category.as_deref())
        .bind(req.quantity_required)
        .bind(req.status)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_enquiry(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM enquiries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_published_videos(
        &self,
        search: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Video>, i64), sqlx::Error> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {VIDEO_COLS_JOINED} FROM videos v \
             JOIN users u ON u.id = v.owner_id WHERE v.is_published = TRUE"
        ));
        if let Some(search) = search {
            builder.push(" AND v.title ILIKE ");
            builder.push_bind(format!("%{search}%"));
        }
        builder.push(" ORDER BY v.created_at DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind((page - 1) * limit);
        let videos = builder
            .build_query_as::<Video>()
            .fetch_all(&self.pool)
            .await?;

        let mut count_builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM videos v WHERE v.is_published = TRUE");
        if let Some(search) = search {
            count_builder.push(" AND v.title ILIKE ");
            count_builder.push_bind(format!("%{search}%"));
        }
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok((videos, total))
    }

    async fn find_video(&self, id: Uuid) -> Result<Option<Video>, sqlx::Error> {
        sqlx::query_as::<_, Video>(&format!(
            "SELECT {VIDEO_COLS_JOINED} FROM videos v \
             JOIN users u ON u.id = v.owner_id WHERE v.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_video(&self, new: NewVideo) -> Result<Video, sqlx::Error> {
        sqlx::query_as::<_, Video>(
            "INSERT INTO videos (owner_id, title, description, video_url, video_id, is_published) \
             VALUES ($1, $2, $3, $4, $5, TRUE) \
             RETURNING id, owner_id, title, description, video_url, video_id, views, \
             is_published, comment_count, created_at, updated_at",
        )
        .bind(new.owner_id)
        .bind(new.title)
        .bind(new.description)
        .bind(new.video.url)
        .bind(new.video.public_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_video(
        &self,
        id: Uuid,
        req: &UpdateVideoRequest,
    ) -> Result<Option<Video>, sqlx::Error> {
        sqlx::query_as::<_, Video>(
            "UPDATE videos SET \
             title = COALESCE($2, title), \
             description = COALESCE($3, description), \
             updated_at = now() \
             WHERE id = $1 \
             RETURNING id, owner_id, title, description, video_url, video_id, views, \
             is_published, comment_count, created_at, updated_at",
        )
        .bind(id)
        .bind(req.title.as_deref())
        .bind(req.description.as_deref())
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_video_published(
        &self,
        id: Uuid,
        published: bool,
    ) -> Result<Option<Video>, sqlx::Error> {
        sqlx::query_as::<_, Video>(
            "UPDATE videos SET is_published = $2, updated_at = now() WHERE id = $1 \
             RETURNING id, owner_id, title, description, video_url, video_id, views, \
             is_published, comment_count, created_at, updated_at",
        )
        .bind(id)
        .bind(published)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_video(&self, id: Uuid) -> Result<Option<Video>, sqlx::Error> {
        sqlx::query_as::<_, Video>(
            "DELETE FROM videos WHERE id = $1 \
             RETURNING id, owner_id, title, description, video_url, video_id, views, \
             is_published, comment_count, created_at, updated_at",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_video_comments(
        &self,
        video_id: Uuid,
        page: i64,
        limit: i64,
        sort: CommentSort,
        descending: bool,
    ) -> Result<(Vec<Comment>, i64), sqlx::Error> {
        let direction = if descending { "DESC" } else { "ASC" };
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLS_JOINED} FROM comments c \
             JOIN users u ON u.id = c.owner_id WHERE c.video_id = $1 \
             ORDER BY c.{} {direction} LIMIT $2 OFFSET $3",
            sort.column()
        ))
        .bind(video_id)
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(&self.pool)
        .await?;

        let total =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE video_id = $1")
                .bind(video_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((comments, total))
    }

    async fn add_comment(
        &self,
        video_id: Uuid,
        owner_id: Uuid,
        content: &str,
    ) -> Result<Comment, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (video_id, owner_id, content) VALUES ($1, $2, $3) \
             RETURNING id, video_id, owner_id, content, created_at, updated_at",
        )
        .bind(video_id)
        .bind(owner_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query("UPDATE videos SET comment_count = comment_count + 1 WHERE id = $1")
            .bind(video_id)
            .execute(&self.pool)
            .await?;

        Ok(comment)
    }

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLS_JOINED} FROM comments c \
             JOIN users u ON u.id = c.owner_id WHERE c.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_comment(
        &self,
        id: i64,
        content: &str,
    ) -> Result<Option<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            "UPDATE comments SET content = $2, updated_at = now() WHERE id = $1 \
             RETURNING id, video_id, owner_id, content, created_at, updated_at",
        )
        .bind(id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, sqlx::Error> {
        let deleted: Option<Uuid> =
            sqlx::query_scalar("DELETE FROM comments WHERE id = $1 RETURNING video_id")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match deleted {
            Some(video_id) => {
                sqlx::query(
                    "UPDATE videos SET comment_count = GREATEST(comment_count - 1, 0) \
                     WHERE id = $1",
                )
                .bind(video_id)
                .execute(&self.pool)
                .await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_codes_are_prefixed_and_unique() {
        let a = generate_order_code();
        let b = generate_order_code();
        assert!(a.starts_with("ORD"));
        assert!(a.len() > 10);
        assert_ne!(a, b);
    }

    #[test]
    fn unknown_sort_falls_back_to_newest_first() {
        assert_eq!(product_order_clause(Some("price")), "price ASC");
        assert_eq!(product_order_clause(Some("-price")), "price DESC");
        assert_eq!(product_order_clause(Some("evil; DROP TABLE")), "created_at DESC");
        assert_eq!(product_order_clause(None), "created_at DESC");
    }
}
