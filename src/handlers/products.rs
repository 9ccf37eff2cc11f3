use axum::extract::{Multipart, Path, State};
use uuid::Uuid;

use crate::AppState;
use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::models::{NewProduct, Product, ProductFilter, UpdateProductRequest};
use crate::response::{Envelope, Page};
use crate::storage::MediaKind;

use super::{Json, Query, read_multipart};

/// Splits a comma-separated form value into trimmed, non-empty entries.
fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// list_products
///
/// The public catalog listing: active products only, with category, price
/// range, text search, bestseller, stock, and tag filters.
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductFilter),
    responses((status = 200, description = "Filtered product page"))
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Envelope<Page<Product>>, ApiError> {
    let page = filter.page.unwrap_or(1).max(1);
    let limit = filter.limit.unwrap_or(12).clamp(1, 100);
    let (products, total) = state.repo.list_products(&filter).await?;
    Ok(Envelope::ok(
        Page::new(products, page, limit, total),
        "Products fetched successfully",
    ))
}

/// get_product
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product detail", body = Product),
        (status = 404, description = "No such product")
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Envelope<Product>, ApiError> {
    let product = state
        .repo
        .find_product(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    Ok(Envelope::ok(product, "Product fetched successfully"))
}

/// products_by_category
#[utoipa::path(
    get,
    path = "/api/v1/products/category/{category}",
    params(("category" = String, Path, description = "Category name")),
    responses((status = 200, description = "Products in the category", body = Vec<Product>))
)]
pub async fn products_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Envelope<Vec<Product>>, ApiError> {
    let products = state.repo.find_products_by_category(&category).await?;
    Ok(Envelope::ok(products, "Products fetched successfully"))
}

/// create_product
///
/// Admin catalog insert. Multipart body: text fields plus a required `image`
/// file. Validation happens before the image is uploaded so a rejected payload
/// never leaves an orphaned object behind.
#[utoipa::path(
    post,
    path = "/api/v1/admin/products",
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Validation failure"),
        (status = 409, description = "Duplicate product name")
    )
)]
pub async fn create_product(
    State(state): State<AppState>,
    admin: AdminUser,
    multipart: Multipart,
) -> Result<Envelope<Product>, ApiError> {
    let form = read_multipart(multipart).await?;

    let (Some(name), Some(description), Some(category), Some(price), Some(bulk_price), Some(min_order)) = (
        form.field("name"),
        form.field("description"),
        form.field("category"),
        form.field("price"),
        form.field("bulkPrice"),
        form.field("minOrder"),
    ) else {
        return Err(ApiError::bad_request(
            "Name, description, category, price, bulk price, and min order are required",
        ));
    };

    let price: f64 = price
        .parse()
        .map_err(|_| ApiError::bad_request("Price and bulk price must be greater than 0"))?;
    let bulk_price: f64 = bulk_price
        .parse()
        .map_err(|_| ApiError::bad_request("Price and bulk price must be greater than 0"))?;
    let min_order: i32 = min_order
        .parse()
        .map_err(|_| ApiError::bad_request("Minimum order must be at least 1"))?;

    if price <= 0.0 || bulk_price <= 0.0 {
        return Err(ApiError::bad_request(
            "Price and bulk price must be greater than 0",
        ));
    }
    if bulk_price >= price {
        return Err(ApiError::bad_request(
            "Bulk price must be less than regular price",
        ));
    }
    if min_order < 1 {
        return Err(ApiError::bad_request("Minimum order must be at least 1"));
    }

    if state.repo.find_product_by_name(name.trim()).await?.is_some() {
        return Err(ApiError::conflict("Product with this name already exists"));
    }

    let Some(image_path) = form.files.get("image") else {
        return Err(ApiError::bad_request("Product image is required"));
    };
    let image = state
        .media
        .upload(image_path, MediaKind::Image)
        .await
        .ok_or_else(|| ApiError::bad_request("Failed to upload product image"))?;

    let stock_quantity: i32 = form
        .field("stockQuantity")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    let product = state
        .repo
        .create_product(NewProduct {
            name: name.trim().to_string(),
            description: description.trim().to_string(),
            category: category.to_lowercase(),
            price,
            bulk_price,
            min_order,
            features: split_list(form.field("features")),
            image,
            emoji: form.field("emoji").unwrap_or("📦").to_string(),
            bestseller: form.field("bestseller") == Some("true"),
            stock_quantity,
            tags: split_list(form.field("tags")),
            meta_description: form.field("metaDescription").map(|s| s.trim().to_string()),
            created_by: admin.user.id,
        })
        .await?;

    Ok(Envelope::created(product, "Product created successfully"))
}

/// update_product
///
/// Admin partial update. Price rules are re-checked against the merged view of
/// the incoming fields and the stored row.
#[utoipa::path(
    put,
    path = "/api/v1/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 400, description = "Validation failure"),
        (status = 404, description = "No such product")
    )
)]
pub async fn update_product(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Envelope<Product>, ApiError> {
    let existing = state
        .repo
        .find_product(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    if req.price.is_some() || req.bulk_price.is_some() {
        let price = req.price.unwrap_or(existing.price);
        let bulk_price = req.bulk_price.unwrap_or(existing.bulk_price);
        if price <= 0.0 || bulk_price <= 0.0 {
            return Err(ApiError::bad_request(
                "Price and bulk price must be greater than 0",
            ));
        }
        if bulk_price >= price {
            return Err(ApiError::bad_request(
                "Bulk price must be less than regular price",
            ));
        }
    }
    if let Some(min_order) = req.min_order
        && min_order < 1
    {
        return Err(ApiError::bad_request("Minimum order must be at least 1"));
    }

    let product = state
        .repo
        .update_product(id, &req, admin.user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    Ok(Envelope::ok(product, "Product updated successfully"))
}

/// delete_product
#[utoipa::path(
    delete,
    path = "/api/v1/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 404, description = "No such product")
    )
)]
pub async fn delete_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Envelope<()>, ApiError> {
    let existing = state.repo.find_product(id).await?;
    let Some(product) = existing else {
        return Err(ApiError::not_found("Product not found"));
    };

    state.repo.delete_product(id).await?;
    state.media.delete(&product.image_id).await;

    Ok(Envelope::ok((), "Product deleted successfully"))
}
