//! # Checkout Module
//!
//! Turns a user's active cart into an order. The pure part (`OrderDraft`)
//! freezes names, unit prices and the total; `place_order` writes the draft
//! and retires the cart inside one transaction.

use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use tracing::{debug, info, warn};

use crate::db::orders::ORDER_COLUMNS;
use crate::db::{list_cart_lines, list_order_items};
use crate::errors::{StoreError, StoreResult};
use crate::localization::t_args_lang;
use crate::models::{
    amount_fits, cart_total, Cart, CartLine, Language, Order, OrderItem, AMOUNT_LIMIT,
};

/// Longest delivery address accepted
pub const MAX_ADDRESS_LEN: usize = 500;

/// Trim and check a delivery address
pub fn validate_address(address: &str) -> Result<String, &'static str> {
    let trimmed = address.trim();

    if trimmed.is_empty() {
        return Err("empty");
    }

    if trimmed.chars().count() > MAX_ADDRESS_LEN {
        return Err("too_long");
    }

    Ok(trimmed.to_string())
}

/// Snapshot of one cart line as it will be stored in the order
#[derive(Debug, Clone, PartialEq)]
pub struct DraftItem {
    pub product_name: String,
    pub color_name: String,
    pub price: Decimal,
    pub quantity: i32,
}

/// An order ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub address: String,
    pub items: Vec<DraftItem>,
    pub total_price: Decimal,
}

impl OrderDraft {
    /// Freeze cart lines into order items
    ///
    /// Names are taken from the Uzbek columns, the store's default language.
    pub fn from_lines(lines: &[CartLine], address: &str) -> StoreResult<Self> {
        if lines.is_empty() {
            return Err(StoreError::EmptyCart);
        }

        let address = validate_address(address).map_err(|reason| {
            StoreError::Validation(match reason {
                "too_long" => format!("address is longer than {MAX_ADDRESS_LEN} characters"),
                _ => "address must not be empty".to_string(),
            })
        })?;

        let items = lines
            .iter()
            .map(|line| DraftItem {
                product_name: line.product_name_uz.clone(),
                color_name: line.color_name_uz.clone(),
                price: line.price,
                quantity: line.quantity,
            })
            .collect();

        let total_price = cart_total(lines);
        if !amount_fits(total_price) {
            return Err(StoreError::Validation(format!(
                "order total must be below {AMOUNT_LIMIT}"
            )));
        }

        Ok(Self {
            address,
            items,
            total_price,
        })
    }
}

/// Create an order from the user's active cart
///
/// The cart row is locked for the duration of the transaction, so two
/// concurrent confirmations cannot both consume it. On success the cart is
/// deactivated and the next `add_to_cart` starts a fresh one.
pub async fn place_order(
    pool: &PgPool,
    user_id: i64,
    address: &str,
) -> StoreResult<(Order, Vec<OrderItem>)> {
    let mut tx = pool.begin().await?;

    let cart = sqlx::query_as::<_, Cart>(
        "SELECT id, user_id, is_active, created_at, updated_at
         FROM carts
         WHERE user_id = $1 AND is_active
         FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(StoreError::NotFound {
        entity: "active cart for user",
        id: user_id,
    })?;

    let lines = list_cart_lines(&mut *tx, cart.id).await?;
    debug!(user_id, cart_id = cart.id, lines = lines.len(), "Loaded cart for checkout");

    let draft = match OrderDraft::from_lines(&lines, address) {
        Ok(draft) => draft,
        Err(e) => {
            warn!(user_id, cart_id = cart.id, error = %e, "Checkout rejected");
            return Err(e);
        }
    };

    let order = sqlx::query_as::<_, Order>(&format!(
        "INSERT INTO orders (user_id, address, total_price)
         VALUES ($1, $2, $3)
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(user_id)
    .bind(&draft.address)
    .bind(draft.total_price)
    .fetch_one(&mut *tx)
    .await?;

    for item in &draft.items {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_name, color_name, price, quantity)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(order.id)
        .bind(&item.product_name)
        .bind(&item.color_name)
        .bind(item.price)
        .bind(item.quantity)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("UPDATE carts SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
        .bind(cart.id)
        .execute(&mut *tx)
        .await?;

    let items = list_order_items(&mut *tx, order.id).await?;
    tx.commit().await?;

    info!(
        user_id,
        order_id = order.id,
        cart_id = cart.id,
        total = %order.total_price,
        items = items.len(),
        "Order placed"
    );
    Ok((order, items))
}

/// Format an amount with thousands separators and no decimals, e.g. `1,200,000`
pub fn format_price(amount: Decimal) -> String {
    let rounded = amount.round();
    let digits = rounded.abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        grouped.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Confirmation text shown before the order is created
pub fn order_summary(lines: &[CartLine], address: &str, language: Language) -> String {
    let lang = Some(language.code());

    let items: String = lines
        .iter()
        .map(|line| {
            let line_total = format_price(line.line_total());
            let quantity = line.quantity.to_string();
            t_args_lang(
                "order-summary-line",
                &[
                    ("product", line.product_name(language)),
                    ("color", line.color_name(language)),
                    ("quantity", quantity.as_str()),
                    ("total", line_total.as_str()),
                ],
                lang,
            ) + "\n"
        })
        .collect();

    let total = format_price(cart_total(lines));
    t_args_lang(
        "order-summary",
        &[
            ("items", items.trim_end()),
            ("address", address),
            ("total", total.as_str()),
        ],
        lang,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(product: &str, color: &str, price: Decimal, quantity: i32) -> CartLine {
        CartLine {
            item_id: 1,
            cart_id: 1,
            quantity,
            color_id: 1,
            color_name_uz: color.to_string(),
            color_name_ru: format!("{color}-ru"),
            color_is_active: true,
            price,
            product_id: 1,
            product_name_uz: product.to_string(),
            product_name_ru: format!("{product}-ru"),
            product_main_image: None,
        }
    }

    #[test]
    fn test_address_validation() {
        assert_eq!(validate_address("  Tashkent, Chilonzor 5  ").unwrap(), "Tashkent, Chilonzor 5");
        assert_eq!(validate_address("   "), Err("empty"));
        assert_eq!(validate_address(&"a".repeat(MAX_ADDRESS_LEN + 1)), Err("too_long"));
        assert!(validate_address(&"ш".repeat(MAX_ADDRESS_LEN)).is_ok());
    }

    #[test]
    fn test_draft_snapshots_uzbek_names_and_total() {
        let lines = vec![
            line("iPhone 14", "Qora", dec!(1200000.00), 2),
            line("Chexol", "Oq", dec!(50000.00), 1),
        ];
        let draft = OrderDraft::from_lines(&lines, " Yunusobod 1 ").unwrap();

        assert_eq!(draft.address, "Yunusobod 1");
        assert_eq!(draft.total_price, dec!(2450000.00));
        assert_eq!(draft.items.len(), 2);
        assert_eq!(draft.items[0].product_name, "iPhone 14");
        assert_eq!(draft.items[0].color_name, "Qora");
        assert_eq!(draft.items[0].price, dec!(1200000.00));
        assert_eq!(draft.items[0].quantity, 2);
    }

    #[test]
    fn test_draft_rejects_empty_cart_before_address() {
        let err = OrderDraft::from_lines(&[], "").unwrap_err();
        assert!(matches!(err, StoreError::EmptyCart));
    }

    #[test]
    fn test_draft_rejects_blank_address() {
        let lines = vec![line("iPhone 14", "Qora", dec!(1), 1)];
        let err = OrderDraft::from_lines(&lines, "  ").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_draft_rejects_total_beyond_money_column() {
        // 2000 x 99,999,999.99 does not fit NUMERIC(12,2)
        let lines = vec![line("Server", "Kulrang", dec!(99999999.99), 2000)];
        let err = OrderDraft::from_lines(&lines, "Toshkent").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let lines = vec![line("Server", "Kulrang", dec!(9999999999.99), 1)];
        assert!(OrderDraft::from_lines(&lines, "Toshkent").is_ok());
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(dec!(0)), "0");
        assert_eq!(format_price(dec!(999)), "999");
        assert_eq!(format_price(dec!(1000)), "1,000");
        assert_eq!(format_price(dec!(1200000.00)), "1,200,000");
        assert_eq!(format_price(dec!(2450000.50)), "2,450,000");
        assert_eq!(format_price(dec!(-15000)), "-15,000");
    }
}
