//! Shared test harness: an in-memory `Repository` implementation plus request
//! and state builders used by the integration test suites.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{self, Request};
use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use crop_portal::models::{
    AdminStats, AdminUpdateUserRequest, Comment, CommentSort, CreateEnquiryRequest, Enquiry,
    NewOrder, NewProduct, NewUser, NewVideo, Order, OrderItem, Product, ProductFilter,
    ProductStats, Role, ShippingAddress, UpdateEnquiryRequest, UpdateOrderStatusRequest,
    UpdateProductRequest, UpdateVideoRequest, User, Video,
};
use crop_portal::repository::Repository;
use crop_portal::storage::MediaAsset;
use crop_portal::{AppConfig, AppState, MockMediaStore, NoopMailer};

// --- In-memory repository ---

#[derive(Default)]
struct MockDb {
    users: Vec<User>,
    products: Vec<Product>,
    orders: Vec<Order>,
    enquiries: Vec<Enquiry>,
    videos: Vec<Video>,
    comments: Vec<Comment>,
    next_comment_id: i64,
}

/// MockRepo
///
/// Implements the full `Repository` contract over plain vectors. Every lock is
/// released before any await point, so the `Mutex` never crosses a suspension.
#[derive(Default)]
pub struct MockRepo {
    inner: Mutex<MockDb>,
}

impl MockRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_user(&self, user: User) -> User {
        self.inner.lock().unwrap().users.push(user.clone());
        user
    }

    pub fn seed_product(&self, product: Product) -> Product {
        self.inner.lock().unwrap().products.push(product.clone());
        product
    }

    pub fn seed_video(&self, video: Video) -> Video {
        self.inner.lock().unwrap().videos.push(video.clone());
        video
    }

    // --- Direct state accessors for assertions ---

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.inner.lock().unwrap().users.iter().find(|u| u.id == id).cloned()
    }

    pub fn product(&self, id: Uuid) -> Option<Product> {
        self.inner.lock().unwrap().products.iter().find(|p| p.id == id).cloned()
    }

    pub fn video(&self, id: Uuid) -> Option<Video> {
        self.inner.lock().unwrap().videos.iter().find(|v| v.id == id).cloned()
    }

    pub fn comment(&self, id: i64) -> Option<Comment> {
        self.inner.lock().unwrap().comments.iter().find(|c| c.id == id).cloned()
    }

    pub fn user_by_username(&self, username: &str) -> Option<User> {
        self.inner
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
    }

    pub fn user_count(&self) -> usize {
        self.inner.lock().unwrap().users.len()
    }

    pub fn order_count(&self) -> usize {
        self.inner.lock().unwrap().orders.len()
    }

    pub fn enquiry_count(&self) -> usize {
        self.inner.lock().unwrap().enquiries.len()
    }
}

fn page_slice<T: Clone>(rows: &[T], page: i64, limit: i64) -> Vec<T> {
    let offset = ((page - 1) * limit).max(0) as usize;
    rows.iter().skip(offset).take(limit.max(0) as usize).cloned().collect()
}

#[async_trait]
impl Repository for MockRepo {
    // --- Users / auth ---

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        Ok(self.user(id))
    }

    async fn find_user_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let db = self.inner.lock().unwrap();
        Ok(db
            .users
            .iter()
            .find(|u| {
                username.is_some_and(|name| u.username == name)
                    || email.is_some_and(|mail| u.email == mail)
            })
            .cloned())
    }

    async fn find_admin_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        let db = self.inner.lock().unwrap();
        Ok(db
            .users
            .iter()
            .find(|u| u.role == Role::Admin && u.username == username)
            .cloned())
    }

    async fn count_admins(&self) -> Result<i64, sqlx::Error> {
        let db = self.inner.lock().unwrap();
        Ok(db.users.iter().filter(|u| u.role == Role::Admin).count() as i64)
    }

    async fn count_active_admins(&self) -> Result<i64, sqlx::Error> {
        let db = self.inner.lock().unwrap();
        Ok(db
            .users
            .iter()
            .filter(|u| u.role == Role::Admin && u.is_active)
            .count() as i64)
    }

    async fn create_user(&self, new: NewUser) -> Result<User, sqlx::Error> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            full_name: new.full_name,
            avatar_url: new.avatar.as_ref().map(|a| a.url.clone()),
            avatar_id: new.avatar.map(|a| a.public_id),
            cover_url: new.cover.as_ref().map(|a| a.url.clone()),
            cover_id: new.cover.map(|a| a.public_id),
            password_hash: new.password_hash,
            refresh_token: None,
            role: new.role,
            is_active: new.is_active,
            last_login: None,
            last_logout: None,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().unwrap().users.push(user.clone());
        Ok(user)
    }

    async fn update_account(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        Ok(db.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.full_name = full_name.to_string();
            u.email = email.to_string();
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn admin_update_user(
        &self,
        id: Uuid,
        req: &AdminUpdateUserRequest,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        Ok(db.users.iter_mut().find(|u| u.id == id).map(|u| {
            if let Some(full_name) = &req.full_name {
                u.full_name = full_name.clone();
            }
            if let Some(email) = &req.email {
                u.email = email.clone();
            }
            if let Some(username) = &req.username {
                u.username = username.clone();
            }
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<bool, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        Ok(db.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.password_hash = password_hash.to_string();
        }).is_some())
    }

    async fn set_refresh_token(
        &self,
        id: Uuid,
        token: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        Ok(db.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.refresh_token = token.map(str::to_string);
        }).is_some())
    }

    async fn set_avatar(&self, id: Uuid, asset: &MediaAsset) -> Result<Option<User>, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        Ok(db.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.avatar_url = Some(asset.url.clone());
            u.avatar_id = Some(asset.public_id.clone());
            u.clone()
        }))
    }

    async fn set_cover_image(
        &self,
        id: Uuid,
        asset: &MediaAsset,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        Ok(db.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.cover_url = Some(asset.url.clone());
            u.cover_id = Some(asset.public_id.clone());
            u.clone()
        }))
    }

    async fn list_users(&self, page: i64, limit: i64) -> Result<Vec<User>, sqlx::Error> {
        let db = self.inner.lock().unwrap();
        Ok(page_slice(&db.users, page, limit))
    }

    async fn search_users(
        &self,
        role: Option<Role>,
        is_active: Option<bool>,
        query: Option<&str>,
    ) -> Result<Vec<User>, sqlx::Error> {
        let db = self.inner.lock().unwrap();
        let needle = query.map(str::to_lowercase);
        Ok(db
            .users
            .iter()
            .filter(|u| role.is_none_or(|r| u.role == r))
            .filter(|u| is_active.is_none_or(|a| u.is_active == a))
            .filter(|u| {
                needle.as_deref().is_none_or(|q| {
                    u.username.to_lowercase().contains(q)
                        || u.email.to_lowercase().contains(q)
                        || u.full_name.to_lowercase().contains(q)
                })
            })
            .cloned()
            .collect())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        let before = db.users.len();
        db.users.retain(|u| u.id != id);
        Ok(db.users.len() < before)
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        Ok(db.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.role = role;
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn set_user_active(
        &self,
        id: Uuid,
        active: Option<bool>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        Ok(db.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.is_active = active.unwrap_or(!u.is_active);
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn record_login(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        Ok(db.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.last_login = Some(Utc::now());
        }).is_some())
    }

    async fn record_logout(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        Ok(db.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.last_logout = Some(Utc::now());
            u.refresh_token = None;
        }).is_some())
    }

    async fn user_stats(&self) -> Result<AdminStats, sqlx::Error> {
        let db = self.inner.lock().unwrap();
        Ok(AdminStats {
            total_users: db.users.len() as i64,
            active_users: db.users.iter().filter(|u| u.is_active).count() as i64,
            inactive_users: db.users.iter().filter(|u| !u.is_active).count() as i64,
            moderators: db.users.iter().filter(|u| u.role == Role::Moderator).count() as i64,
            admins: db.users.iter().filter(|u| u.role == Role::Admin).count() as i64,
            total_products: db.products.len() as i64,
        })
    }

    // --- Products ---

    async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<(Vec<Product>, i64), sqlx::Error> {
        let db = self.inner.lock().unwrap();
        let matches: Vec<Product> = db
            .products
            .iter()
            .filter(|p| p.is_active)
            .filter(|p| {
                filter
                    .category
                    .as_deref()
                    .is_none_or(|c| p.category.to_lowercase().contains(&c.to_lowercase()))
            })
            .filter(|p| {
                filter.search.as_deref().is_none_or(|s| {
                    let s = s.to_lowercase();
                    p.name.to_lowercase().contains(&s)
                        || p.description.to_lowercase().contains(&s)
                })
            })
            .filter(|p| filter.bestseller != Some(true) || p.bestseller)
            .filter(|p| filter.in_stock.is_none_or(|want| p.in_stock == want))
            .cloned()
            .collect();
        let total = matches.len() as i64;
        let page = filter.page.unwrap_or(1).max(1);
        let limit = filter.limit.unwrap_or(12).clamp(1, 100);
        Ok((page_slice(&matches, page, limit), total))
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, sqlx::Error> {
        Ok(self.product(id))
    }

    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>, sqlx::Error> {
        let db = self.inner.lock().unwrap();
        Ok(db
            .products
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn find_products_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<Product>, sqlx::Error> {
        let db = self.inner.lock().unwrap();
        Ok(db
            .products
            .iter()
            .filter(|p| p.is_active && p.category.eq_ignore_ascii_case(category))
            .cloned()
            .collect())
    }

    async fn create_product(&self, new: NewProduct) -> Result<Product, sqlx::Error> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            category: new.category,
            price: new.price,
            bulk_price: new.bulk_price,
            min_order: new.min_order,
            features: new.features,
            image_url: new.image.url,
            image_id: new.image.public_id,
            emoji: new.emoji,
            bestseller: new.bestseller,
            in_stock: new.stock_quantity > 0,
            stock_quantity: new.stock_quantity,
            rating: 0.0,
            review_count: 0,
            total_sales: 0,
            tags: new.tags,
            meta_description: new.meta_description,
            created_by: new.created_by,
            updated_by: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().unwrap().products.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: Uuid,
        req: &UpdateProductRequest,
        updated_by: Uuid,
    ) -> Result<Option<Product>, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        Ok(db.products.iter_mut().find(|p| p.id == id).map(|p| {
            if let Some(name) = &req.name {
                p.name = name.clone();
            }
            if let Some(description) = &req.description {
                p.description = description.clone();
            }
            if let Some(category) = &req.category {
                p.category = category.clone();
            }
            if let Some(price) = req.price {
                p.price = price;
            }
            if let Some(bulk_price) = req.bulk_price {
                p.bulk_price = bulk_price;
            }
            if let Some(min_order) = req.min_order {
                p.min_order = min_order;
            }
            if let Some(features) = &req.features {
                p.features = features.clone();
            }
            if let Some(emoji) = &req.emoji {
                p.emoji = emoji.clone();
            }
            if let Some(bestseller) = req.bestseller {
                p.bestseller = bestseller;
            }
            if let Some(stock_quantity) = req.stock_quantity {
                p.stock_quantity = stock_quantity;
                p.in_stock = stock_quantity > 0;
            }
            if let Some(tags) = &req.tags {
                p.tags = tags.clone();
            }
            if let Some(meta_description) = &req.meta_description {
                p.meta_description = Some(meta_description.clone());
            }
            if let Some(is_active) = req.is_active {
                p.is_active = is_active;
            }
            p.updated_by = Some(updated_by);
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        let before = db.products.len();
        db.products.retain(|p| p.id != id);
        Ok(db.products.len() < before)
    }

    async fn product_stats(&self) -> Result<ProductStats, sqlx::Error> {
        let db = self.inner.lock().unwrap();
        Ok(ProductStats {
            total_products: db.products.len() as i64,
            in_stock_products: db.products.iter().filter(|p| p.in_stock).count() as i64,
            out_of_stock_products: db.products.iter().filter(|p| !p.in_stock).count() as i64,
        })
    }

    async fn decrement_stock(&self, id: Uuid, quantity: i32) -> Result<bool, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        Ok(db.products.iter_mut().find(|p| p.id == id).map(|p| {
            p.stock_quantity -= quantity;
            p.total_sales += quantity;
            p.in_stock = p.stock_quantity > 0;
        }).is_some())
    }

    // --- Orders ---

    async fn create_order(&self, new: NewOrder) -> Result<Order, sqlx::Error> {
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            order_id: format!("ORD{}", Uuid::new_v4().simple()),
            user_id: new.user_id,
            items: Json(new.items),
            total_amount: new.total_amount,
            shipping_address: Json(new.shipping_address),
            payment_status: new.payment_status,
            order_status: Default::default(),
            payment_method: new.payment_method,
            transaction_id: None,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().unwrap().orders.push(order.clone());
        Ok(order)
    }

    async fn list_orders(&self) -> Result<Vec<Order>, sqlx::Error> {
        Ok(self.inner.lock().unwrap().orders.clone())
    }

    async fn list_user_orders(&self, user_id: Uuid) -> Result<Vec<Order>, sqlx::Error> {
        let db = self.inner.lock().unwrap();
        Ok(db.orders.iter().filter(|o| o.user_id == user_id).cloned().collect())
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>, sqlx::Error> {
        let db = self.inner.lock().unwrap();
        Ok(db.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        req: &UpdateOrderStatusRequest,
    ) -> Result<Option<Order>, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        Ok(db.orders.iter_mut().find(|o| o.id == id).map(|o| {
            if let Some(status) = req.order_status {
                o.order_status = status;
            }
            if let Some(status) = req.payment_status {
                o.payment_status = status;
            }
            o.updated_at = Utc::now();
            o.clone()
        }))
    }

    // --- Enquiries ---

    async fn create_enquiry(&self, req: &CreateEnquiryRequest) -> Result<Enquiry, sqlx::Error> {
        let now = Utc::now();
        let enquiry = Enquiry {
            id: Uuid::new_v4(),
            name: req.name.clone(),
            email: req.email.clone(),
            phone: req.phone.clone(),
            message: req.message.clone(),
            company_name: req.company_name.clone(),
            contact_person: req.contact_person.clone(),
            product_category: req.product_category.clone(),
            quantity_required: req.quantity_required,
            status: Default::default(),
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().unwrap().enquiries.push(enquiry.clone());
        Ok(enquiry)
    }

    async fn list_enquiries(&self) -> Result<Vec<Enquiry>, sqlx::Error> {
        Ok(self.inner.lock().unwrap().enquiries.clone())
    }

    async fn find_enquiry(&self, id: Uuid) -> Result<Option<Enquiry>, sqlx::Error> {
        let db = self.inner.lock().unwrap();
        Ok(db.enquiries.iter().find(|e| e.id == id).cloned())
    }

    async fn update_enquiry(
        &self,
        id: Uuid,
        req: &UpdateEnquiryRequest,
    ) -> Result<Option<Enquiry>, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        Ok(db.enquiries.iter_mut().find(|e| e.id == id).map(|e| {
            if let Some(name) = &req.name {
                e.name = name.clone();
            }
            if let Some(email) = &req.email {
                e.email = email.clone();
            }
            if let Some(phone) = &req.phone {
                e.phone = phone.clone();
            }
            if let Some(message) = &req.message {
                e.message = message.clone();
            }
            if let Some(company_name) = &req.company_name {
                e.company_name = company_name.clone();
            }
            if let Some(contact_person) = &req.contact_person {
                e.contact_person = contact_person.clone();
            }
            if let Some(product_category) = &req.product_category {
                e.product_category = product_category.clone();
            }
            if let Some(quantity_required) = req.quantity_required {
                e.quantity_required = quantity_required;
            }
            if let Some(status) = req.status {
                e.status = status;
            }
            e.updated_at = Utc::now();
            e.clone()
        }))
    }

    async fn delete_enquiry(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        let before = db.enquiries.len();
        db.enquiries.retain(|e| e.id != id);
        Ok(db.enquiries.len() < before)
    }

    // --- Videos ---

    async fn list_published_videos(
        &self,
        search: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Video>, i64), sqlx::Error> {
        let db = self.inner.lock().unwrap();
        let matches: Vec<Video> = db
            .videos
            .iter()
            .filter(|v| v.is_published)
            .filter(|v| {
                search.is_none_or(|s| v.title.to_lowercase().contains(&s.to_lowercase()))
            })
            .cloned()
            .collect();
        let total = matches.len() as i64;
        Ok((page_slice(&matches, page, limit), total))
    }

    async fn find_video(&self, id: Uuid) -> Result<Option<Video>, sqlx::Error> {
        Ok(self.video(id))
    }

    async fn create_video(&self, new: NewVideo) -> Result<Video, sqlx::Error> {
        let now = Utc::now();
        let mut db = self.inner.lock().unwrap();
        let owner = db.users.iter().find(|u| u.id == new.owner_id);
        let video = Video {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            title: new.title,
            description: new.description,
            video_url: new.video.url,
            video_id: new.video.public_id,
            views: 0,
            is_published: true,
            comment_count: 0,
            created_at: now,
            updated_at: now,
            owner_username: owner.map(|u| u.username.clone()),
            owner_full_name: owner.map(|u| u.full_name.clone()),
            owner_avatar_url: owner.and_then(|u| u.avatar_url.clone()),
        };
        db.videos.push(video.clone());
        Ok(video)
    }

    async fn update_video(
        &self,
        id: Uuid,
        req: &UpdateVideoRequest,
    ) -> Result<Option<Video>, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        Ok(db.videos.iter_mut().find(|v| v.id == id).map(|v| {
            if let Some(title) = &req.title {
                v.title = title.clone();
            }
            if let Some(description) = &req.description {
                v.description = description.clone();
            }
            v.updated_at = Utc::now();
            v.clone()
        }))
    }

    async fn set_video_published(
        &self,
        id: Uuid,
        published: bool,
    ) -> Result<Option<Video>, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        Ok(db.videos.iter_mut().find(|v| v.id == id).map(|v| {
            v.is_published = published;
            v.updated_at = Utc::now();
            v.clone()
        }))
    }

    async fn delete_video(&self, id: Uuid) -> Result<Option<Video>, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        let pos = db.videos.iter().position(|v| v.id == id);
        Ok(pos.map(|idx| db.videos.remove(idx)))
    }

    // --- Comments ---

    async fn list_video_comments(
        &self,
        video_id: Uuid,
        page: i64,
        limit: i64,
        sort: CommentSort,
        descending: bool,
    ) -> Result<(Vec<Comment>, i64), sqlx::Error> {
        let db = self.inner.lock().unwrap();
        let mut matches: Vec<Comment> = db
            .comments
            .iter()
            .filter(|c| c.video_id == video_id)
            .cloned()
            .collect();
        matches.sort_by_key(|c| match sort {
            CommentSort::CreatedAt => c.created_at,
            CommentSort::UpdatedAt => c.updated_at,
        });
        if descending {
            matches.reverse();
        }
        let total = matches.len() as i64;
        Ok((page_slice(&matches, page, limit), total))
    }

    async fn add_comment(
        &self,
        video_id: Uuid,
        owner_id: Uuid,
        content: &str,
    ) -> Result<Comment, sqlx::Error> {
        let now = Utc::now();
        let mut db = self.inner.lock().unwrap();
        db.next_comment_id += 1;
        let author = db.users.iter().find(|u| u.id == owner_id);
        let comment = Comment {
            id: db.next_comment_id,
            video_id,
            owner_id,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
            author_username: author.map(|u| u.username.clone()),
            author_full_name: author.map(|u| u.full_name.clone()),
            author_avatar_url: author.and_then(|u| u.avatar_url.clone()),
        };
        db.comments.push(comment.clone());
        if let Some(video) = db.videos.iter_mut().find(|v| v.id == video_id) {
            video.comment_count += 1;
        }
        Ok(comment)
    }

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, sqlx::Error> {
        Ok(self.comment(id))
    }

    async fn update_comment(
        &self,
        id: i64,
        content: &str,
    ) -> Result<Option<Comment>, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        Ok(db.comments.iter_mut().find(|c| c.id == id).map(|c| {
            c.content = content.to_string();
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, sqlx::Error> {
        let mut db = self.inner.lock().unwrap();
        let Some(idx) = db.comments.iter().position(|c| c.id == id) else {
            return Ok(false);
        };
        let removed = db.comments.remove(idx);
        if let Some(video) = db.videos.iter_mut().find(|v| v.id == removed.video_id) {
            video.comment_count = (video.comment_count - 1).max(0);
        }
        Ok(true)
    }
}

// --- State and fixture builders ---

pub fn test_state(repo: Arc<MockRepo>) -> AppState {
    test_state_with_config(repo, AppConfig::default())
}

pub fn test_state_with_config(repo: Arc<MockRepo>, config: AppConfig) -> AppState {
    AppState {
        repo,
        media: Arc::new(MockMediaStore::new()),
        mailer: Arc::new(NoopMailer),
        config,
    }
}

pub fn user_with(role: Role, is_active: bool) -> User {
    let id = Uuid::new_v4();
    let now = Utc::now();
    User {
        id,
        username: format!("user-{}", id.simple()),
        email: format!("{}@example.com", id.simple()),
        full_name: "Test User".to_string(),
        role,
        is_active,
        created_at: now,
        updated_at: now,
        ..User::default()
    }
}

/// Low-cost hash so credential tests stay fast.
pub fn hashed(password: &str) -> String {
    bcrypt::hash(password, 4).unwrap()
}

pub fn product_with(name: &str, price: f64, bulk_price: f64, stock: i32) -> Product {
    let now = Utc::now();
    Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: format!("{name} description"),
        category: "grains".to_string(),
        price,
        bulk_price,
        min_order: 1,
        image_url: "http://localhost:9000/mock-bucket/images/seed".to_string(),
        image_id: "images/seed".to_string(),
        emoji: "🌾".to_string(),
        in_stock: stock > 0,
        stock_quantity: stock,
        created_by: Uuid::new_v4(),
        is_active: true,
        created_at: now,
        updated_at: now,
        ..Product::default()
    }
}

pub fn video_owned_by(owner: &User, published: bool) -> Video {
    let now = Utc::now();
    Video {
        id: Uuid::new_v4(),
        owner_id: owner.id,
        title: "Harvest walkthrough".to_string(),
        description: "Field footage".to_string(),
        video_url: "http://localhost:9000/mock-bucket/videos/seed".to_string(),
        video_id: "videos/seed".to_string(),
        is_published: published,
        created_at: now,
        updated_at: now,
        owner_username: Some(owner.username.clone()),
        owner_full_name: Some(owner.full_name.clone()),
        ..Video::default()
    }
}

pub fn order_item(product: &Product, quantity: i32) -> OrderItem {
    OrderItem {
        product: product.id,
        quantity,
        price: product.price,
        product_name: Some(product.name.clone()),
        product_image: Some(product.image_url.clone()),
    }
}

pub fn shipping_address() -> ShippingAddress {
    ShippingAddress {
        name: Some("Test Buyer".to_string()),
        phone: Some("5550001234".to_string()),
        address: Some("1 Farm Lane".to_string()),
        city: Some("Springfield".to_string()),
        ..ShippingAddress::default()
    }
}

pub fn token_for(config: &AppConfig, user: &User) -> String {
    crop_portal::auth::sign_access_token(config, user).unwrap()
}

// --- Request builders ---

pub fn json_request(
    method: http::Method,
    path: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn bare_request(method: http::Method, path: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub const MULTIPART_BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

/// Hand-rolls a multipart/form-data body from text fields and file parts.
pub fn multipart_request(
    method: http::Method,
    path: &str,
    token: Option<&str>,
    fields: &[(&str, &str)],
    files: &[(&str, &str, &[u8])],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, filename, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder().method(method).uri(path).header(
        http::header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
    );
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

pub async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
