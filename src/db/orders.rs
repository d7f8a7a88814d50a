use serde::Deserialize;
use sqlx::postgres::{PgExecutor, PgPool};
use sqlx::{Postgres, QueryBuilder};
use tracing::info;

use super::{PageRequest, Paged};
use crate::errors::StoreResult;
use crate::models::{Order, OrderItem, OrderStatus};

pub(crate) const ORDER_COLUMNS: &str =
    "id, user_id, status, address, total_price, created_at, updated_at";
pub(crate) const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, product_name, color_name, price, quantity";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OrderFilter {
    pub user: Option<i64>,
    pub status: Option<OrderStatus>,
    /// Matched against the order number
    pub search: Option<String>,
}

/// Fields an administrator may edit after checkout
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OrderChanges {
    pub address: Option<String>,
    pub status: Option<OrderStatus>,
}

pub async fn get_order(pool: &PgPool, order_id: i64) -> StoreResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
    ))
    .bind(order_id)
    .fetch_optional(pool)
    .await?;
    Ok(order)
}

pub async fn list_order_items<'e, E>(executor: E, order_id: i64) -> StoreResult<Vec<OrderItem>>
where
    E: PgExecutor<'e>,
{
    let items = sqlx::query_as::<_, OrderItem>(&format!(
        "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
    ))
    .bind(order_id)
    .fetch_all(executor)
    .await?;
    Ok(items)
}

/// A user's orders, newest first
pub async fn list_user_orders(pool: &PgPool, user_id: i64, limit: i64) -> StoreResult<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders
         WHERE user_id = $1
         ORDER BY created_at DESC, id DESC
         LIMIT $2"
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(orders)
}

fn push_order_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    qb.push(" WHERE TRUE");
    if let Some(user_id) = filter.user {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let search = search.trim_start_matches('#');
        qb.push(" AND CAST(id AS TEXT) LIKE ")
            .push_bind(super::like_pattern(search));
    }
}

/// Orders matching the filter, newest first
pub async fn list_orders(
    pool: &PgPool,
    filter: &OrderFilter,
    page: PageRequest,
) -> StoreResult<Paged<Order>> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders");
    push_order_filters(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
    push_order_filters(&mut select, filter);
    select
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);
    let items = select.build_query_as::<Order>().fetch_all(pool).await?;

    Ok(Paged { items, total })
}

pub async fn update_order(
    pool: &PgPool,
    order_id: i64,
    changes: &OrderChanges,
) -> StoreResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "UPDATE orders
         SET address = COALESCE($2, address),
             status = COALESCE($3, status),
             updated_at = NOW()
         WHERE id = $1
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order_id)
    .bind(&changes.address)
    .bind(changes.status.map(OrderStatus::as_str))
    .fetch_optional(pool)
    .await?;
    Ok(order)
}

pub async fn update_order_status(
    pool: &PgPool,
    order_id: i64,
    status: OrderStatus,
) -> StoreResult<Option<Order>> {
    let changes = OrderChanges {
        status: Some(status),
        ..Default::default()
    };
    let order = update_order(pool, order_id, &changes).await?;
    if order.is_some() {
        info!(order_id, status = %status, "Order status changed");
    }
    Ok(order)
}

pub async fn delete_order(pool: &PgPool, order_id: i64) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(order_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
