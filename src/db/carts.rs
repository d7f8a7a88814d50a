use serde::Deserialize;
use sqlx::postgres::{PgExecutor, PgPool};
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, info, warn};

use super::{get_color, get_user_by_id, PageRequest, Paged};
use crate::errors::{StoreError, StoreResult};
use crate::models::{Cart, CartItem, CartLine, MAX_QUANTITY};

const CART_COLUMNS: &str = "id, user_id, is_active, created_at, updated_at";

const CART_LINE_SELECT: &str = "SELECT ci.id AS item_id, ci.cart_id, ci.quantity,
            c.id AS color_id, c.name_uz AS color_name_uz, c.name_ru AS color_name_ru,
            c.is_active AS color_is_active, c.price,
            p.id AS product_id, p.name_uz AS product_name_uz, p.name_ru AS product_name_ru,
            p.main_image AS product_main_image
     FROM cart_items ci
     JOIN colors c ON c.id = ci.color_id
     JOIN products p ON p.id = c.product_id";

/// Outcome of a +/- button press on a cart line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    Increased(i32),
    Decreased(i32),
    /// Already at one; the line is left unchanged
    AtMinimum,
    /// Already at `MAX_QUANTITY`
    AtMaximum,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CartFilter {
    pub user: Option<i64>,
}

pub async fn get_active_cart(pool: &PgPool, user_id: i64) -> StoreResult<Option<Cart>> {
    let cart = sqlx::query_as::<_, Cart>(&format!(
        "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1 AND is_active"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(cart)
}

/// Return the user's active cart, creating it on first use
///
/// Concurrent callers race on the partial unique index; the loser re-reads
/// the winner's row.
pub async fn get_or_create_active_cart(pool: &PgPool, user_id: i64) -> StoreResult<Cart> {
    let inserted = sqlx::query_as::<_, Cart>(&format!(
        "INSERT INTO carts (user_id) VALUES ($1)
         ON CONFLICT (user_id) WHERE is_active DO NOTHING
         RETURNING {CART_COLUMNS}"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    if let Some(cart) = inserted {
        debug!(user_id, cart_id = cart.id, "Created active cart");
        return Ok(cart);
    }

    get_active_cart(pool, user_id)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "active cart for user",
            id: user_id,
        })
}

/// Active cart only; checked-out carts are hidden
pub async fn get_cart(pool: &PgPool, cart_id: i64) -> StoreResult<Option<Cart>> {
    let cart = sqlx::query_as::<_, Cart>(&format!(
        "SELECT {CART_COLUMNS} FROM carts WHERE id = $1 AND is_active"
    ))
    .bind(cart_id)
    .fetch_optional(pool)
    .await?;
    Ok(cart)
}

pub async fn list_carts(
    pool: &PgPool,
    filter: &CartFilter,
    page: PageRequest,
) -> StoreResult<Paged<Cart>> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM carts WHERE is_active");
    let mut select = QueryBuilder::<Postgres>::new(format!(
        "SELECT {CART_COLUMNS} FROM carts WHERE is_active"
    ));
    if let Some(user_id) = filter.user {
        count.push(" AND user_id = ").push_bind(user_id);
        select.push(" AND user_id = ").push_bind(user_id);
    }
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    select
        .push(" ORDER BY id LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);
    let items = select.build_query_as::<Cart>().fetch_all(pool).await?;

    Ok(Paged { items, total })
}

/// Lines of a cart joined with color and product, in insertion order
pub async fn list_cart_lines<'e, E>(executor: E, cart_id: i64) -> StoreResult<Vec<CartLine>>
where
    E: PgExecutor<'e>,
{
    let lines = sqlx::query_as::<_, CartLine>(&format!(
        "{CART_LINE_SELECT} WHERE ci.cart_id = $1 ORDER BY ci.id"
    ))
    .bind(cart_id)
    .fetch_all(executor)
    .await?;
    Ok(lines)
}

/// Lines of the user's active cart; empty when there is no cart yet
pub async fn list_active_cart_lines(pool: &PgPool, user_id: i64) -> StoreResult<Vec<CartLine>> {
    match get_active_cart(pool, user_id).await? {
        Some(cart) => list_cart_lines(pool, cart.id).await,
        None => Ok(Vec::new()),
    }
}

/// One line of the user's active cart
pub async fn get_cart_line_for_user(
    pool: &PgPool,
    item_id: i64,
    user_id: i64,
) -> StoreResult<Option<CartLine>> {
    let line = sqlx::query_as::<_, CartLine>(&format!(
        "{CART_LINE_SELECT}
         JOIN carts ca ON ca.id = ci.cart_id
         WHERE ci.id = $1 AND ca.user_id = $2 AND ca.is_active"
    ))
    .bind(item_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(line)
}

fn validate_quantity(quantity: i32) -> StoreResult<()> {
    if quantity < 1 {
        return Err(StoreError::Validation(
            "quantity must be at least 1".to_string(),
        ));
    }
    if quantity > MAX_QUANTITY {
        return Err(StoreError::Validation(format!(
            "quantity must be at most {MAX_QUANTITY}"
        )));
    }
    Ok(())
}

/// Add a color to the user's active cart
///
/// Adding a color already in the cart increments that line instead of
/// creating a second one.
pub async fn add_to_cart(
    pool: &PgPool,
    user_id: i64,
    color_id: i64,
    quantity: i32,
) -> StoreResult<CartItem> {
    validate_quantity(quantity)?;
    if get_user_by_id(pool, user_id).await?.is_none() {
        return Err(StoreError::not_found("user", user_id));
    }
    match get_color(pool, color_id).await? {
        Some(color) if color.is_active => {}
        Some(_) => {
            warn!(user_id, color_id, "Attempt to add inactive color to cart");
            return Err(StoreError::Validation(
                "this color is not available".to_string(),
            ));
        }
        None => return Err(StoreError::not_found("color", color_id)),
    }

    let cart = get_or_create_active_cart(pool, user_id).await?;

    let item = sqlx::query_as::<_, CartItem>(
        "INSERT INTO cart_items (cart_id, color_id, quantity) VALUES ($1, $2, $3)
         ON CONFLICT (cart_id, color_id)
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
         WHERE cart_items.quantity + EXCLUDED.quantity <= $4
         RETURNING id, cart_id, color_id, quantity",
    )
    .bind(cart.id)
    .bind(color_id)
    .bind(quantity)
    .bind(MAX_QUANTITY)
    .fetch_optional(pool)
    .await?;

    // The conflict update is skipped when the sum would pass the limit
    let Some(item) = item else {
        return Err(StoreError::Validation(format!(
            "quantity must be at most {MAX_QUANTITY}"
        )));
    };

    sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1")
        .bind(cart.id)
        .execute(pool)
        .await?;

    info!(
        user_id,
        cart_id = cart.id,
        color_id,
        quantity = item.quantity,
        "Added color to cart"
    );
    Ok(item)
}

/// Apply a +1/-1 step to a line of the user's active cart
///
/// A decrement never drops the quantity below one.
pub async fn change_cart_item_quantity(
    pool: &PgPool,
    item_id: i64,
    user_id: i64,
    delta: i32,
) -> StoreResult<QuantityChange> {
    let Some(line) = get_cart_line_for_user(pool, item_id, user_id).await? else {
        return Err(StoreError::not_found("cart item", item_id));
    };

    let new_quantity = line.quantity.saturating_add(delta);
    if new_quantity < 1 {
        return Ok(QuantityChange::AtMinimum);
    }
    if new_quantity > MAX_QUANTITY {
        return Ok(QuantityChange::AtMaximum);
    }

    sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
        .bind(item_id)
        .bind(new_quantity)
        .execute(pool)
        .await?;

    debug!(user_id, item_id, new_quantity, "Changed cart item quantity");
    if new_quantity > line.quantity {
        Ok(QuantityChange::Increased(new_quantity))
    } else {
        Ok(QuantityChange::Decreased(new_quantity))
    }
}

/// Set the quantity of a line in an active cart
pub async fn set_cart_item_quantity(
    pool: &PgPool,
    item_id: i64,
    quantity: i32,
) -> StoreResult<Option<CartItem>> {
    validate_quantity(quantity)?;

    let item = sqlx::query_as::<_, CartItem>(
        "UPDATE cart_items SET quantity = $2
         WHERE id = $1
           AND cart_id IN (SELECT id FROM carts WHERE is_active)
         RETURNING id, cart_id, color_id, quantity",
    )
    .bind(item_id)
    .bind(quantity)
    .fetch_optional(pool)
    .await?;
    Ok(item)
}

pub async fn remove_cart_item_for_user(
    pool: &PgPool,
    item_id: i64,
    user_id: i64,
) -> StoreResult<bool> {
    let result = sqlx::query(
        "DELETE FROM cart_items
         WHERE id = $1
           AND cart_id IN (SELECT id FROM carts WHERE user_id = $2 AND is_active)",
    )
    .bind(item_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a line from an active cart
pub async fn delete_cart_item(pool: &PgPool, item_id: i64) -> StoreResult<bool> {
    let result = sqlx::query(
        "DELETE FROM cart_items
         WHERE id = $1 AND cart_id IN (SELECT id FROM carts WHERE is_active)",
    )
    .bind(item_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Remove every line from the user's active cart
///
/// Returns the number of removed lines, or `None` when the user has no
/// active cart.
pub async fn clear_cart(pool: &PgPool, user_id: i64) -> StoreResult<Option<u64>> {
    let Some(cart) = get_active_cart(pool, user_id).await? else {
        return Ok(None);
    };

    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart.id)
        .execute(pool)
        .await?;

    info!(user_id, cart_id = cart.id, removed = result.rows_affected(), "Cleared cart");
    Ok(Some(result.rows_affected()))
}
