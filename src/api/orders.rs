//! Order endpoints, including checkout

use axum::extract::{OriginalUri, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPool;

use super::extract::{Json, Path, Query};
use super::{ApiError, ApiResult, AppState, Page, PageQuery};
use crate::checkout::{place_order, validate_address, MAX_ADDRESS_LEN};
use crate::db::{
    delete_order, get_order, get_user_by_id, list_order_items, list_orders, update_order,
    update_order_status, OrderChanges, OrderFilter, PageRequest, Paged,
};
use crate::errors::StoreError;
use crate::models::{Order, OrderItem, OrderStatus, User};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list))
        .route("/api/orders/checkout", post(checkout))
        .route(
            "/api/orders/{id}",
            get(retrieve).put(update).patch(update).delete(destroy),
        )
        .route("/api/orders/{id}/change_status", post(change_status))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDetail {
    pub id: i64,
    pub user: User,
    pub status: OrderStatus,
    pub address: String,
    pub total_price: Decimal,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderDetail {
    pub fn new(order: Order, user: User, items: Vec<OrderItem>) -> Self {
        Self {
            id: order.id,
            user,
            status: order.status,
            address: order.address,
            total_price: order.total_price,
            items,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub user: i64,
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ChangeStatusResponse {
    pub status: &'static str,
    pub order_status: OrderStatus,
}

/// Map an address check failure to a client error
fn check_address(address: &str) -> ApiResult<String> {
    validate_address(address).map_err(|reason| {
        let message = match reason {
            "too_long" => format!("address must be at most {MAX_ADDRESS_LEN} characters"),
            _ => "address must not be empty".to_string(),
        };
        ApiError::BadRequest(message)
    })
}

async fn order_detail(pool: &PgPool, order: Order) -> ApiResult<OrderDetail> {
    let user = get_user_by_id(pool, order.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;
    let items = list_order_items(pool, order.id).await?;
    Ok(OrderDetail::new(order, user, items))
}

async fn list(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(page): Query<PageQuery>,
    Query(filter): Query<OrderFilter>,
) -> ApiResult<Json<Page<OrderDetail>>> {
    let request = PageRequest::from(page);
    let orders = list_orders(&state.pool, &filter, request).await?;

    let mut results = Vec::with_capacity(orders.items.len());
    for order in orders.items {
        results.push(order_detail(&state.pool, order).await?);
    }

    let details = Paged {
        items: results,
        total: orders.total,
    };
    Ok(Json(Page::new(details, request, &uri)))
}

/// Turn the user's active cart into an order
async fn checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<OrderDetail>)> {
    let address = check_address(&request.address)?;
    let user = get_user_by_id(&state.pool, request.user)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;

    let (order, items) = place_order(&state.pool, user.id, &address).await?;
    Ok((StatusCode::CREATED, Json(OrderDetail::new(order, user, items))))
}

async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<OrderDetail>> {
    let order = get_order(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("order"))?;
    Ok(Json(order_detail(&state.pool, order).await?))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(mut changes): Json<OrderChanges>,
) -> ApiResult<Json<OrderDetail>> {
    if let Some(address) = changes.address.as_deref() {
        changes.address = Some(check_address(address)?);
    }

    let order = update_order(&state.pool, id, &changes)
        .await?
        .ok_or_else(|| ApiError::not_found("order"))?;
    Ok(Json(order_detail(&state.pool, order).await?))
}

async fn destroy(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    if delete_order(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("order"))
    }
}

async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<ChangeStatusRequest>,
) -> ApiResult<Json<ChangeStatusResponse>> {
    let status: OrderStatus = request
        .status
        .parse()
        .map_err(|_| StoreError::InvalidStatus(request.status.clone()))?;

    let order = update_order_status(&state.pool, id, status)
        .await?
        .ok_or_else(|| ApiError::not_found("order"))?;

    Ok(Json(ChangeStatusResponse {
        status: "success",
        order_status: order.status,
    }))
}
