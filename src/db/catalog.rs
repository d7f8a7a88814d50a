use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::postgres::PgPool;
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, info};

use super::{like_pattern, PageRequest, Paged};
use crate::errors::{StoreError, StoreResult};
use crate::models::{amount_fits, Category, Color, ColorImage, Product, AMOUNT_LIMIT};

const CATEGORY_COLUMNS: &str =
    "id, name_uz, name_ru, parent_id, image, is_active, created_at, updated_at";
const PRODUCT_COLUMNS: &str = "id, name_uz, name_ru, description_uz, description_ru, main_image, \
                               is_active, created_at, updated_at";
const COLOR_COLUMNS: &str =
    "id, product_id, name_uz, name_ru, price, is_active, created_at, updated_at";
const COLOR_IMAGE_COLUMNS: &str = "id, color_id, image, sort_order";

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewCategory {
    pub name_uz: String,
    pub name_ru: String,
    #[serde(default, alias = "parent")]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CategoryChanges {
    pub name_uz: Option<String>,
    pub name_ru: Option<String>,
    /// `Some(None)` moves the category to the root; absent leaves it alone
    #[serde(default, alias = "parent", with = "::serde_with::rust::double_option")]
    pub parent_id: Option<Option<i64>>,
    pub image: Option<String>,
    pub is_active: Option<bool>,
}

/// List filter; without `parent` only root categories match
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CategoryFilter {
    pub parent: Option<i64>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

pub async fn get_category(pool: &PgPool, category_id: i64) -> StoreResult<Option<Category>> {
    let category = sqlx::query_as::<_, Category>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
    ))
    .bind(category_id)
    .fetch_optional(pool)
    .await?;
    Ok(category)
}

/// Top-level categories shown first in the catalog
pub async fn list_root_categories(pool: &PgPool) -> StoreResult<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories
         WHERE parent_id IS NULL AND is_active
         ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;
    Ok(categories)
}

pub async fn list_child_categories(pool: &PgPool, parent_id: i64) -> StoreResult<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories
         WHERE parent_id = $1 AND is_active
         ORDER BY id"
    ))
    .bind(parent_id)
    .fetch_all(pool)
    .await?;
    Ok(categories)
}

/// Every category, for building trees in memory
pub async fn list_all_categories(pool: &PgPool) -> StoreResult<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;
    Ok(categories)
}

fn push_category_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &CategoryFilter) {
    match filter.parent {
        Some(parent) => {
            qb.push(" WHERE parent_id = ").push_bind(parent);
        }
        None => {
            qb.push(" WHERE parent_id IS NULL");
        }
    }
    if let Some(is_active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (name_uz ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR name_ru ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn list_categories(
    pool: &PgPool,
    filter: &CategoryFilter,
    page: PageRequest,
) -> StoreResult<Paged<Category>> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM categories");
    push_category_filters(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    let mut select =
        QueryBuilder::<Postgres>::new(format!("SELECT {CATEGORY_COLUMNS} FROM categories"));
    push_category_filters(&mut select, filter);
    select
        .push(" ORDER BY id LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);
    let items = select.build_query_as::<Category>().fetch_all(pool).await?;

    Ok(Paged { items, total })
}

/// Reject a parent that would make the category its own ancestor
async fn ensure_valid_parent(
    pool: &PgPool,
    category_id: Option<i64>,
    parent_id: Option<i64>,
) -> StoreResult<()> {
    let Some(parent_id) = parent_id else {
        return Ok(());
    };

    if get_category(pool, parent_id).await?.is_none() {
        return Err(StoreError::not_found("category", parent_id));
    }

    if let Some(category_id) = category_id {
        let creates_cycle: bool = sqlx::query_scalar(
            "WITH RECURSIVE subtree AS (
                 SELECT id FROM categories WHERE id = $1
                 UNION
                 SELECT c.id FROM categories c JOIN subtree s ON c.parent_id = s.id
             )
             SELECT EXISTS (SELECT 1 FROM subtree WHERE id = $2)",
        )
        .bind(category_id)
        .bind(parent_id)
        .fetch_one(pool)
        .await?;

        if creates_cycle {
            return Err(StoreError::Validation(
                "a category cannot be nested under itself".to_string(),
            ));
        }
    }
    Ok(())
}

pub async fn create_category(pool: &PgPool, new_category: &NewCategory) -> StoreResult<Category> {
    ensure_valid_parent(pool, None, new_category.parent_id).await?;

    let category = sqlx::query_as::<_, Category>(&format!(
        "INSERT INTO categories (name_uz, name_ru, parent_id, image, is_active)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {CATEGORY_COLUMNS}"
    ))
    .bind(&new_category.name_uz)
    .bind(&new_category.name_ru)
    .bind(new_category.parent_id)
    .bind(&new_category.image)
    .bind(new_category.is_active)
    .fetch_one(pool)
    .await?;

    info!(category_id = category.id, "Category created");
    Ok(category)
}

pub async fn update_category(
    pool: &PgPool,
    category_id: i64,
    changes: &CategoryChanges,
) -> StoreResult<Option<Category>> {
    let parent_id = changes.parent_id.flatten();
    ensure_valid_parent(pool, Some(category_id), parent_id).await?;

    let category = sqlx::query_as::<_, Category>(&format!(
        "UPDATE categories
         SET name_uz = COALESCE($2, name_uz),
             name_ru = COALESCE($3, name_ru),
             parent_id = CASE WHEN $4 THEN $5 ELSE parent_id END,
             image = COALESCE($6, image),
             is_active = COALESCE($7, is_active),
             updated_at = NOW()
         WHERE id = $1
         RETURNING {CATEGORY_COLUMNS}"
    ))
    .bind(category_id)
    .bind(&changes.name_uz)
    .bind(&changes.name_ru)
    .bind(changes.parent_id.is_some())
    .bind(parent_id)
    .bind(&changes.image)
    .bind(changes.is_active)
    .fetch_optional(pool)
    .await?;
    Ok(category)
}

pub async fn delete_category(pool: &PgPool, category_id: i64) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(category_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewProduct {
    pub name_uz: String,
    pub name_ru: String,
    #[serde(default)]
    pub description_uz: Option<String>,
    #[serde(default)]
    pub description_ru: Option<String>,
    #[serde(default)]
    pub main_image: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, alias = "categories")]
    pub category_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProductChanges {
    pub name_uz: Option<String>,
    pub name_ru: Option<String>,
    pub description_uz: Option<String>,
    pub description_ru: Option<String>,
    pub main_image: Option<String>,
    pub is_active: Option<bool>,
    /// Replaces the whole category set when present
    #[serde(alias = "categories")]
    pub category_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProductFilter {
    pub categories: Option<i64>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

pub async fn get_product(pool: &PgPool, product_id: i64) -> StoreResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(product_id)
    .fetch_optional(pool)
    .await?;
    Ok(product)
}

/// Active products linked to a category
pub async fn list_products_in_category(
    pool: &PgPool,
    category_id: i64,
) -> StoreResult<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products
         WHERE is_active
           AND id IN (SELECT product_id FROM product_categories WHERE category_id = $1)
         ORDER BY id"
    ))
    .bind(category_id)
    .fetch_all(pool)
    .await?;
    Ok(products)
}

pub async fn list_product_categories(
    pool: &PgPool,
    product_id: i64,
) -> StoreResult<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories
         WHERE id IN (SELECT category_id FROM product_categories WHERE product_id = $1)
         ORDER BY id"
    ))
    .bind(product_id)
    .fetch_all(pool)
    .await?;
    Ok(categories)
}

fn push_product_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" WHERE TRUE");
    if let Some(category_id) = filter.categories {
        qb.push(" AND id IN (SELECT product_id FROM product_categories WHERE category_id = ")
            .push_bind(category_id)
            .push(")");
    }
    if let Some(is_active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (name_uz ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR name_ru ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description_uz ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description_ru ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn list_products(
    pool: &PgPool,
    filter: &ProductFilter,
    page: PageRequest,
) -> StoreResult<Paged<Product>> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
    push_product_filters(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    let mut select =
        QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
    push_product_filters(&mut select, filter);
    select
        .push(" ORDER BY id LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);
    let items = select.build_query_as::<Product>().fetch_all(pool).await?;

    Ok(Paged { items, total })
}

async fn link_product_categories(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    product_id: i64,
    category_ids: &[i64],
) -> StoreResult<()> {
    sqlx::query("DELETE FROM product_categories WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut **tx)
        .await?;

    for &category_id in category_ids {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
            .bind(category_id)
            .fetch_one(&mut **tx)
            .await?;
        if !exists {
            return Err(StoreError::not_found("category", category_id));
        }

        sqlx::query(
            "INSERT INTO product_categories (product_id, category_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(product_id)
        .bind(category_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub async fn create_product(pool: &PgPool, new_product: &NewProduct) -> StoreResult<Product> {
    let mut tx = pool.begin().await?;

    let product = sqlx::query_as::<_, Product>(&format!(
        "INSERT INTO products (name_uz, name_ru, description_uz, description_ru, main_image, is_active)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(&new_product.name_uz)
    .bind(&new_product.name_ru)
    .bind(&new_product.description_uz)
    .bind(&new_product.description_ru)
    .bind(&new_product.main_image)
    .bind(new_product.is_active)
    .fetch_one(&mut *tx)
    .await?;

    link_product_categories(&mut tx, product.id, &new_product.category_ids).await?;
    tx.commit().await?;

    info!(product_id = product.id, categories = new_product.category_ids.len(), "Product created");
    Ok(product)
}

pub async fn update_product(
    pool: &PgPool,
    product_id: i64,
    changes: &ProductChanges,
) -> StoreResult<Option<Product>> {
    let mut tx = pool.begin().await?;

    let product = sqlx::query_as::<_, Product>(&format!(
        "UPDATE products
         SET name_uz = COALESCE($2, name_uz),
             name_ru = COALESCE($3, name_ru),
             description_uz = COALESCE($4, description_uz),
             description_ru = COALESCE($5, description_ru),
             main_image = COALESCE($6, main_image),
             is_active = COALESCE($7, is_active),
             updated_at = NOW()
         WHERE id = $1
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(product_id)
    .bind(&changes.name_uz)
    .bind(&changes.name_ru)
    .bind(&changes.description_uz)
    .bind(&changes.description_ru)
    .bind(&changes.main_image)
    .bind(changes.is_active)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(product) = product else {
        return Ok(None);
    };

    if let Some(ref category_ids) = changes.category_ids {
        link_product_categories(&mut tx, product.id, category_ids).await?;
    }
    tx.commit().await?;

    debug!(product_id, "Product updated");
    Ok(Some(product))
}

pub async fn delete_product(pool: &PgPool, product_id: i64) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(product_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewColor {
    #[serde(alias = "product")]
    pub product_id: i64,
    pub name_uz: String,
    pub name_ru: String,
    pub price: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ColorChanges {
    pub name_uz: Option<String>,
    pub name_ru: Option<String>,
    pub price: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ColorFilter {
    pub product: Option<i64>,
    pub is_active: Option<bool>,
}

fn validate_price(price: Decimal) -> StoreResult<()> {
    if price.is_sign_negative() {
        return Err(StoreError::Validation("price must not be negative".to_string()));
    }
    if !amount_fits(price) {
        return Err(StoreError::Validation(format!(
            "price must be below {AMOUNT_LIMIT}"
        )));
    }
    Ok(())
}

pub async fn get_color(pool: &PgPool, color_id: i64) -> StoreResult<Option<Color>> {
    let color = sqlx::query_as::<_, Color>(&format!(
        "SELECT {COLOR_COLUMNS} FROM colors WHERE id = $1"
    ))
    .bind(color_id)
    .fetch_optional(pool)
    .await?;
    Ok(color)
}

pub async fn list_colors_for_product(
    pool: &PgPool,
    product_id: i64,
    active_only: bool,
) -> StoreResult<Vec<Color>> {
    let colors = sqlx::query_as::<_, Color>(&format!(
        "SELECT {COLOR_COLUMNS} FROM colors
         WHERE product_id = $1 AND (is_active OR NOT $2)
         ORDER BY id"
    ))
    .bind(product_id)
    .bind(active_only)
    .fetch_all(pool)
    .await?;
    Ok(colors)
}

fn push_color_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ColorFilter) {
    qb.push(" WHERE TRUE");
    if let Some(product_id) = filter.product {
        qb.push(" AND product_id = ").push_bind(product_id);
    }
    if let Some(is_active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
}

pub async fn list_colors(
    pool: &PgPool,
    filter: &ColorFilter,
    page: PageRequest,
) -> StoreResult<Paged<Color>> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM colors");
    push_color_filters(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {COLOR_COLUMNS} FROM colors"));
    push_color_filters(&mut select, filter);
    select
        .push(" ORDER BY id LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);
    let items = select.build_query_as::<Color>().fetch_all(pool).await?;

    Ok(Paged { items, total })
}

pub async fn create_color(pool: &PgPool, new_color: &NewColor) -> StoreResult<Color> {
    validate_price(new_color.price)?;
    if get_product(pool, new_color.product_id).await?.is_none() {
        return Err(StoreError::not_found("product", new_color.product_id));
    }

    let color = sqlx::query_as::<_, Color>(&format!(
        "INSERT INTO colors (product_id, name_uz, name_ru, price, is_active)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {COLOR_COLUMNS}"
    ))
    .bind(new_color.product_id)
    .bind(&new_color.name_uz)
    .bind(&new_color.name_ru)
    .bind(new_color.price)
    .bind(new_color.is_active)
    .fetch_one(pool)
    .await?;

    info!(color_id = color.id, product_id = color.product_id, "Color created");
    Ok(color)
}

pub async fn update_color(
    pool: &PgPool,
    color_id: i64,
    changes: &ColorChanges,
) -> StoreResult<Option<Color>> {
    if let Some(price) = changes.price {
        validate_price(price)?;
    }

    let color = sqlx::query_as::<_, Color>(&format!(
        "UPDATE colors
         SET name_uz = COALESCE($2, name_uz),
             name_ru = COALESCE($3, name_ru),
             price = COALESCE($4, price),
             is_active = COALESCE($5, is_active),
             updated_at = NOW()
         WHERE id = $1
         RETURNING {COLOR_COLUMNS}"
    ))
    .bind(color_id)
    .bind(&changes.name_uz)
    .bind(&changes.name_ru)
    .bind(changes.price)
    .bind(changes.is_active)
    .fetch_optional(pool)
    .await?;
    Ok(color)
}

pub async fn delete_color(pool: &PgPool, color_id: i64) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM colors WHERE id = $1")
        .bind(color_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// Color images
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewColorImage {
    #[serde(alias = "color")]
    pub color_id: i64,
    pub image: String,
    #[serde(default, alias = "order")]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ColorImageChanges {
    pub image: Option<String>,
    #[serde(alias = "order")]
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ColorImageFilter {
    pub color: Option<i64>,
}

fn validate_sort_order(sort_order: i32) -> StoreResult<()> {
    if sort_order < 0 {
        return Err(StoreError::Validation("order must not be negative".to_string()));
    }
    Ok(())
}

pub async fn get_color_image(pool: &PgPool, image_id: i64) -> StoreResult<Option<ColorImage>> {
    let image = sqlx::query_as::<_, ColorImage>(&format!(
        "SELECT {COLOR_IMAGE_COLUMNS} FROM color_images WHERE id = $1"
    ))
    .bind(image_id)
    .fetch_optional(pool)
    .await?;
    Ok(image)
}

pub async fn list_images_for_color(pool: &PgPool, color_id: i64) -> StoreResult<Vec<ColorImage>> {
    let images = sqlx::query_as::<_, ColorImage>(&format!(
        "SELECT {COLOR_IMAGE_COLUMNS} FROM color_images
         WHERE color_id = $1
         ORDER BY sort_order, id"
    ))
    .bind(color_id)
    .fetch_all(pool)
    .await?;
    Ok(images)
}

pub async fn list_color_images(
    pool: &PgPool,
    filter: &ColorImageFilter,
    page: PageRequest,
) -> StoreResult<Paged<ColorImage>> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM color_images WHERE TRUE");
    let mut select = QueryBuilder::<Postgres>::new(format!(
        "SELECT {COLOR_IMAGE_COLUMNS} FROM color_images WHERE TRUE"
    ));
    if let Some(color_id) = filter.color {
        count.push(" AND color_id = ").push_bind(color_id);
        select.push(" AND color_id = ").push_bind(color_id);
    }
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    select
        .push(" ORDER BY sort_order, id LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);
    let items = select.build_query_as::<ColorImage>().fetch_all(pool).await?;

    Ok(Paged { items, total })
}

pub async fn create_color_image(pool: &PgPool, new_image: &NewColorImage) -> StoreResult<ColorImage> {
    validate_sort_order(new_image.sort_order)?;
    if get_color(pool, new_image.color_id).await?.is_none() {
        return Err(StoreError::not_found("color", new_image.color_id));
    }

    let image = sqlx::query_as::<_, ColorImage>(&format!(
        "INSERT INTO color_images (color_id, image, sort_order)
         VALUES ($1, $2, $3)
         RETURNING {COLOR_IMAGE_COLUMNS}"
    ))
    .bind(new_image.color_id)
    .bind(&new_image.image)
    .bind(new_image.sort_order)
    .fetch_one(pool)
    .await?;
    Ok(image)
}

pub async fn update_color_image(
    pool: &PgPool,
    image_id: i64,
    changes: &ColorImageChanges,
) -> StoreResult<Option<ColorImage>> {
    if let Some(sort_order) = changes.sort_order {
        validate_sort_order(sort_order)?;
    }

    let image = sqlx::query_as::<_, ColorImage>(&format!(
        "UPDATE color_images
         SET image = COALESCE($2, image),
             sort_order = COALESCE($3, sort_order)
         WHERE id = $1
         RETURNING {COLOR_IMAGE_COLUMNS}"
    ))
    .bind(image_id)
    .bind(&changes.image)
    .bind(changes.sort_order)
    .fetch_optional(pool)
    .await?;
    Ok(image)
}

pub async fn delete_color_image(pool: &PgPool, image_id: i64) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM color_images WHERE id = $1")
        .bind(image_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_product_accepts_categories_alias() {
        let product: NewProduct = serde_json::from_value(serde_json::json!({
            "name_uz": "iPhone 14",
            "name_ru": "Айфон 14",
            "categories": [1, 2]
        }))
        .unwrap();
        assert_eq!(product.category_ids, vec![1, 2]);
        assert!(product.is_active);
        assert!(product.description_uz.is_none());
    }

    #[test]
    fn test_category_changes_tell_null_parent_from_missing() {
        let to_root: CategoryChanges =
            serde_json::from_value(serde_json::json!({"parent": null})).unwrap();
        assert_eq!(to_root.parent_id, Some(None));

        let moved: CategoryChanges =
            serde_json::from_value(serde_json::json!({"parent_id": 7})).unwrap();
        assert_eq!(moved.parent_id, Some(Some(7)));

        let untouched: CategoryChanges =
            serde_json::from_value(serde_json::json!({"name_uz": "Telefonlar"})).unwrap();
        assert_eq!(untouched.parent_id, None);
    }

    #[test]
    fn test_new_color_parses_string_price() {
        let color: NewColor = serde_json::from_value(serde_json::json!({
            "product": 3,
            "name_uz": "Qora",
            "name_ru": "Черный",
            "price": "1200000.00"
        }))
        .unwrap();
        assert_eq!(color.product_id, 3);
        assert_eq!(color.price, dec!(1200000.00));
    }

    #[test]
    fn test_price_and_order_validation() {
        assert!(validate_price(dec!(0)).is_ok());
        assert!(validate_price(dec!(-1)).is_err());
        assert!(validate_sort_order(0).is_ok());
        assert!(validate_sort_order(-1).is_err());
    }
}
