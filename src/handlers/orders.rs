use axum::extract::{Path, State};
use uuid::Uuid;

use crate::AppState;
use crate::auth::{AdminUser, AuthUser};
use crate::error::ApiError;
use crate::models::{
    CreateOrderRequest, NewOrder, Order, PaymentMethod, PaymentStatus, UpdateOrderStatusRequest,
};
use crate::response::Envelope;

use super::Json;

/// create_order
///
/// Order placement. Every line item is checked against current stock before the
/// order row is written, then each product's stock is decremented.
///
/// The check and the decrement are separate statements, so two orders racing on
/// the same product can both pass the check and drive the stock negative.
/// TODO: fold the check and decrement into one conditional UPDATE per item.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = Order),
        (status = 400, description = "Insufficient stock or empty order"),
        (status = 404, description = "Unknown product in items")
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Envelope<Order>, ApiError> {
    if req.items.is_empty() {
        return Err(ApiError::bad_request("Order must contain at least one item"));
    }

    for item in &req.items {
        let name = item.product_name.clone().unwrap_or_default();
        let product = state
            .repo
            .find_product(item.product)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Product not found: {name}")))?;
        if product.stock_quantity < item.quantity {
            return Err(ApiError::bad_request(format!(
                "Insufficient stock for {name}. Available: {}",
                product.stock_quantity
            )));
        }
    }

    let payment_status = match req.payment_method {
        PaymentMethod::Cod => PaymentStatus::Pending,
        _ => PaymentStatus::Paid,
    };

    let order = state
        .repo
        .create_order(NewOrder {
            user_id: auth.user.id,
            items: req.items.clone(),
            shipping_address: req.shipping_address,
            total_amount: req.total_amount,
            payment_method: req.payment_method,
            payment_status,
            notes: req.notes,
        })
        .await?;

    for item in &req.items {
        state.repo.decrement_stock(item.product, item.quantity).await?;
    }

    Ok(Envelope::created(order, "Order created successfully"))
}

/// my_orders
#[utoipa::path(
    get,
    path = "/api/v1/orders/my-orders",
    responses((status = 200, description = "Orders of the current user", body = Vec<Order>))
)]
pub async fn my_orders(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Envelope<Vec<Order>>, ApiError> {
    let orders = state.repo.list_user_orders(auth.user.id).await?;
    Ok(Envelope::ok(orders, "Orders fetched successfully"))
}

/// get_order
///
/// Fetch by id for any authenticated user. There is deliberately no ownership
/// check here; order codes are unguessable and support staff share them.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order detail", body = Order),
        (status = 404, description = "No such order")
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Envelope<Order>, ApiError> {
    let order = state
        .repo
        .find_order(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;
    Ok(Envelope::ok(order, "Order fetched successfully"))
}

/// list_orders
#[utoipa::path(
    get,
    path = "/api/v1/admin/orders",
    responses((status = 200, description = "All orders, newest first", body = Vec<Order>))
)]
pub async fn list_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Envelope<Vec<Order>>, ApiError> {
    let orders = state.repo.list_orders().await?;
    Ok(Envelope::ok(orders, "Orders fetched successfully"))
}

/// update_order_status
#[utoipa::path(
    put,
    path = "/api/v1/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated", body = Order),
        (status = 404, description = "No such order")
    )
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> Result<Envelope<Order>, ApiError> {
    let order = state
        .repo
        .update_order_status(id, &req)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;
    Ok(Envelope::ok(order, "Order status updated successfully"))
}
