//! Cart endpoints

use axum::extract::{OriginalUri, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Router;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPool;

use super::extract::{Json, Path, Query};
use super::{ApiError, ApiResult, AppState, Page, PageQuery};
use crate::db::{
    add_to_cart, delete_cart_item, get_active_cart, get_cart, list_cart_lines, list_carts,
    set_cart_item_quantity, CartFilter, PageRequest, Paged,
};
use crate::models::{cart_total, Cart, CartItem, CartLine};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/carts", get(list))
        .route("/api/carts/add_item", post(add_item))
        .route("/api/carts/{id}", get(retrieve))
        .route(
            "/api/cart-items/{id}",
            patch(update_item).put(update_item).delete(destroy_item),
        )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartColorView {
    pub id: i64,
    pub name_uz: String,
    pub name_ru: String,
    pub price: Decimal,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartProductView {
    pub id: i64,
    pub name_uz: String,
    pub name_ru: String,
    pub main_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartItemView {
    pub id: i64,
    pub color: CartColorView,
    pub product: CartProductView,
    pub quantity: i32,
    pub total_price: Decimal,
}

impl From<CartLine> for CartItemView {
    fn from(line: CartLine) -> Self {
        let total_price = line.line_total();
        Self {
            id: line.item_id,
            color: CartColorView {
                id: line.color_id,
                name_uz: line.color_name_uz,
                name_ru: line.color_name_ru,
                price: line.price,
                is_active: line.color_is_active,
            },
            product: CartProductView {
                id: line.product_id,
                name_uz: line.product_name_uz,
                name_ru: line.product_name_ru,
                main_image: line.product_main_image,
            },
            quantity: line.quantity,
            total_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartDetail {
    pub id: i64,
    pub user: i64,
    pub is_active: bool,
    pub items: Vec<CartItemView>,
    pub total_price: Decimal,
    pub items_count: usize,
    pub created_at: DateTime<Utc>,
}

impl CartDetail {
    pub fn new(cart: Cart, lines: Vec<CartLine>) -> Self {
        let total_price = cart_total(&lines);
        Self {
            id: cart.id,
            user: cart.user_id,
            is_active: cart.is_active,
            items_count: lines.len(),
            items: lines.into_iter().map(CartItemView::from).collect(),
            total_price,
            created_at: cart.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddItemRequest {
    pub user: i64,
    pub color_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

async fn cart_detail(pool: &PgPool, cart: Cart) -> ApiResult<CartDetail> {
    let lines = list_cart_lines(pool, cart.id).await?;
    Ok(CartDetail::new(cart, lines))
}

async fn list(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(page): Query<PageQuery>,
    Query(filter): Query<CartFilter>,
) -> ApiResult<Json<Page<CartDetail>>> {
    let request = PageRequest::from(page);
    let carts = list_carts(&state.pool, &filter, request).await?;

    let mut results = Vec::with_capacity(carts.items.len());
    for cart in carts.items {
        results.push(cart_detail(&state.pool, cart).await?);
    }

    let details = Paged {
        items: results,
        total: carts.total,
    };
    Ok(Json(Page::new(details, request, &uri)))
}

async fn retrieve(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<CartDetail>> {
    let cart = get_cart(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("cart"))?;
    Ok(Json(cart_detail(&state.pool, cart).await?))
}

/// Add a color to the user's active cart and return the whole cart
async fn add_item(
    State(state): State<AppState>,
    Json(request): Json<AddItemRequest>,
) -> ApiResult<(StatusCode, Json<CartDetail>)> {
    add_to_cart(&state.pool, request.user, request.color_id, request.quantity).await?;

    let cart = get_active_cart(&state.pool, request.user)
        .await?
        .ok_or_else(|| ApiError::not_found("cart"))?;
    Ok((StatusCode::CREATED, Json(cart_detail(&state.pool, cart).await?)))
}

async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateItemRequest>,
) -> ApiResult<Json<CartItem>> {
    set_cart_item_quantity(&state.pool, id, request.quantity)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("cart item"))
}

async fn destroy_item(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    if delete_cart_item(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("cart item"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(item_id: i64, price: Decimal, quantity: i32) -> CartLine {
        CartLine {
            item_id,
            cart_id: 1,
            quantity,
            color_id: item_id * 10,
            color_name_uz: "Qora".to_string(),
            color_name_ru: "Черный".to_string(),
            color_is_active: true,
            price,
            product_id: 5,
            product_name_uz: "iPhone 14".to_string(),
            product_name_ru: "iPhone 14".to_string(),
            product_main_image: None,
        }
    }

    fn cart() -> Cart {
        Cart {
            id: 1,
            user_id: 42,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_cart_detail_totals() {
        let detail = CartDetail::new(
            cart(),
            vec![line(1, dec!(1200000), 2), line(2, dec!(99.50), 3)],
        );

        assert_eq!(detail.user, 42);
        assert_eq!(detail.items_count, 2);
        assert_eq!(detail.total_price, dec!(2400298.50));
        assert_eq!(detail.items[0].total_price, dec!(2400000));
        assert_eq!(detail.items[1].color.id, 20);
        assert_eq!(detail.items[1].product.name_uz, "iPhone 14");
    }

    #[test]
    fn test_empty_cart_detail() {
        let detail = CartDetail::new(cart(), Vec::new());
        assert_eq!(detail.items_count, 0);
        assert_eq!(detail.total_price, Decimal::ZERO);
    }

    #[test]
    fn test_add_item_defaults_quantity() {
        let request: AddItemRequest =
            serde_json::from_str(r#"{"user": 3, "color_id": 9}"#).unwrap();
        assert_eq!(request.quantity, 1);
    }
}
