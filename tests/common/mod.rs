//! Shared fixtures for the database-backed integration tests

#![allow(dead_code)]

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::env;
use std::sync::atomic::{AtomicI64, Ordering};

use storefront::db::{
    create_category, create_color, create_product, create_user, init_database_schema,
    NewCategory, NewColor, NewProduct, NewUser,
};
use storefront::models::{Category, Color, Language, Product, User};

static SEQUENCE: AtomicI64 = AtomicI64::new(0);

pub async fn setup_test_db() -> Result<PgPool> {
    // Skip tests if no DATABASE_URL is provided
    let database_url = match env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping database tests: DATABASE_URL not set");
            return Err(anyhow::anyhow!("Test database not configured"));
        }
    };

    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to test database")?;

    // Tests share the schema; every fixture uses fresh ids instead of truncating
    init_database_schema(&pool).await?;

    Ok(pool)
}

/// Telegram id not used by any other test run
pub fn unique_telegram_id() -> i64 {
    let micros = chrono::Utc::now().timestamp_micros();
    micros * 100 + SEQUENCE.fetch_add(1, Ordering::Relaxed) % 100
}

pub async fn create_test_user(pool: &PgPool) -> Result<User> {
    let new_user = NewUser {
        telegram_id: unique_telegram_id(),
        username: Some("tester".to_string()),
        first_name: "Test".to_string(),
        last_name: None,
        phone_number: Some("+998901234567".to_string()),
        language: Language::Uz,
    };
    Ok(create_user(pool, &new_user).await?)
}

pub async fn create_test_category(pool: &PgPool, parent_id: Option<i64>) -> Result<Category> {
    let new_category = NewCategory {
        name_uz: "Telefonlar".to_string(),
        name_ru: "Телефоны".to_string(),
        parent_id,
        image: None,
        is_active: true,
    };
    Ok(create_category(pool, &new_category).await?)
}

/// Category, product and one active color at the given price
pub async fn create_test_color(pool: &PgPool, price: Decimal) -> Result<(Product, Color)> {
    let category = create_test_category(pool, None).await?;
    let product = create_product(
        pool,
        &NewProduct {
            name_uz: "iPhone 14".to_string(),
            name_ru: "Айфон 14".to_string(),
            description_uz: Some("128 GB".to_string()),
            description_ru: None,
            main_image: None,
            is_active: true,
            category_ids: vec![category.id],
        },
    )
    .await?;
    let color = create_color(
        pool,
        &NewColor {
            product_id: product.id,
            name_uz: "Qora".to_string(),
            name_ru: "Черный".to_string(),
            price,
            is_active: true,
        },
    )
    .await?;
    Ok((product, color))
}
