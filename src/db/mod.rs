//! Database module for the storefront tables
//!
//! Split by aggregate:
//! - `users`: Telegram users and their profile settings
//! - `catalog`: categories, products, colors and color images
//! - `carts`: active carts and their items
//! - `orders`: orders and their frozen items

pub mod carts;
pub mod catalog;
pub mod orders;
pub mod users;

pub use carts::*;
pub use catalog::*;
pub use orders::*;
pub use users::*;

use sqlx::postgres::PgPool;
use tracing::{debug, info};

use crate::errors::StoreResult;

/// Arbitrary key serializing concurrent schema initialization
const SCHEMA_LOCK_KEY: i64 = 0x5354_4f52_4546_524f;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        telegram_id BIGINT NOT NULL UNIQUE,
        username VARCHAR(100),
        first_name VARCHAR(100) NOT NULL,
        last_name VARCHAR(100),
        phone_number VARCHAR(20),
        language VARCHAR(5) NOT NULL DEFAULT 'uz' CHECK (language IN ('uz', 'ru')),
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS categories (
        id BIGSERIAL PRIMARY KEY,
        name_uz VARCHAR(200) NOT NULL,
        name_ru VARCHAR(200) NOT NULL,
        parent_id BIGINT REFERENCES categories(id) ON DELETE CASCADE,
        image TEXT,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS products (
        id BIGSERIAL PRIMARY KEY,
        name_uz VARCHAR(200) NOT NULL,
        name_ru VARCHAR(200) NOT NULL,
        description_uz TEXT,
        description_ru TEXT,
        main_image TEXT,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS product_categories (
        product_id BIGINT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
        category_id BIGINT NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
        PRIMARY KEY (product_id, category_id)
    )",
    "CREATE TABLE IF NOT EXISTS colors (
        id BIGSERIAL PRIMARY KEY,
        product_id BIGINT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
        name_uz VARCHAR(50) NOT NULL,
        name_ru VARCHAR(50) NOT NULL,
        price NUMERIC(12, 2) NOT NULL CHECK (price >= 0),
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS color_images (
        id BIGSERIAL PRIMARY KEY,
        color_id BIGINT NOT NULL REFERENCES colors(id) ON DELETE CASCADE,
        image TEXT NOT NULL,
        sort_order INTEGER NOT NULL DEFAULT 0 CHECK (sort_order >= 0)
    )",
    "CREATE TABLE IF NOT EXISTS carts (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS carts_one_active_per_user
        ON carts (user_id) WHERE is_active",
    "CREATE TABLE IF NOT EXISTS cart_items (
        id BIGSERIAL PRIMARY KEY,
        cart_id BIGINT NOT NULL REFERENCES carts(id) ON DELETE CASCADE,
        color_id BIGINT NOT NULL REFERENCES colors(id) ON DELETE CASCADE,
        quantity INTEGER NOT NULL DEFAULT 1 CHECK (quantity >= 1),
        UNIQUE (cart_id, color_id)
    )",
    "CREATE TABLE IF NOT EXISTS orders (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        status VARCHAR(20) NOT NULL DEFAULT 'new'
            CHECK (status IN ('new', 'processing', 'shipped', 'delivered', 'cancelled')),
        address TEXT NOT NULL,
        total_price NUMERIC(12, 2) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE INDEX IF NOT EXISTS orders_user_created_idx
        ON orders (user_id, created_at DESC)",
    "CREATE TABLE IF NOT EXISTS order_items (
        id BIGSERIAL PRIMARY KEY,
        order_id BIGINT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
        product_name VARCHAR(200) NOT NULL,
        color_name VARCHAR(50) NOT NULL,
        price NUMERIC(12, 2) NOT NULL,
        quantity INTEGER NOT NULL DEFAULT 1 CHECK (quantity >= 1)
    )",
];

/// Initialize the database schema
///
/// Safe to call from several processes at once: the statements run in one
/// transaction guarded by an advisory lock.
pub async fn init_database_schema(pool: &PgPool) -> StoreResult<()> {
    info!("Initializing database schema");

    let mut tx = pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SCHEMA_LOCK_KEY)
        .execute(&mut *tx)
        .await?;

    for statement in SCHEMA {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    info!(statements = SCHEMA.len(), "Database schema initialized");
    Ok(())
}

/// Limit/offset window for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    pub const DEFAULT_PAGE_SIZE: i64 = 20;
    pub const MAX_PAGE_SIZE: i64 = 100;

    /// Build a window from a 1-based page number and a page size
    ///
    /// Out-of-range values are clamped instead of rejected.
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        let limit = page_size
            .unwrap_or(Self::DEFAULT_PAGE_SIZE)
            .clamp(1, Self::MAX_PAGE_SIZE);
        let page = page.unwrap_or(1).max(1);
        debug!(page, limit, "Resolved page request");
        Self {
            limit,
            offset: (page - 1) * limit,
        }
    }

    pub fn page(&self) -> i64 {
        self.offset / self.limit + 1
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of rows plus the total number of matching rows
#[derive(Debug, Clone, PartialEq)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: i64,
}

impl<T> Paged<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

/// `%term%` pattern for ILIKE searches
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults() {
        let page = PageRequest::default();
        assert_eq!(page.limit, 20);
        assert_eq!(page.offset, 0);
        assert_eq!(page.page(), 1);
    }

    #[test]
    fn test_page_request_offsets() {
        let page = PageRequest::new(Some(3), Some(10));
        assert_eq!(page.offset, 20);
        assert_eq!(page.page(), 3);
    }

    #[test]
    fn test_page_request_clamps_out_of_range_values() {
        let page = PageRequest::new(Some(0), Some(1000));
        assert_eq!(page.limit, PageRequest::MAX_PAGE_SIZE);
        assert_eq!(page.offset, 0);

        let page = PageRequest::new(Some(-4), Some(0));
        assert_eq!(page.limit, 1);
        assert_eq!(page.page(), 1);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("iphone"), "%iphone%");
        assert_eq!(like_pattern(" 50%_off "), "%50\\%\\_off%");
    }

    #[test]
    fn test_paged_map_keeps_total() {
        let paged = Paged {
            items: vec![1, 2, 3],
            total: 42,
        };
        let mapped = paged.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20, 30]);
        assert_eq!(mapped.total, 42);
    }
}
