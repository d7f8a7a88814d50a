//! Catalog endpoints: categories, products, colors and color images

use axum::extract::{OriginalUri, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use sqlx::postgres::PgPool;

use super::extract::{Json, Path, Query};
use super::{ApiError, ApiResult, AppState, Page, PageQuery};
use crate::db::{
    create_category, create_color, create_color_image, create_product, delete_category,
    delete_color, delete_color_image, delete_product, get_category, get_color, get_color_image,
    get_product, list_all_categories, list_categories, list_color_images, list_colors,
    list_colors_for_product, list_images_for_color, list_product_categories, list_products,
    update_category, update_color, update_color_image, update_product, CategoryChanges,
    CategoryFilter, ColorChanges, ColorFilter, ColorImageChanges, ColorImageFilter, NewCategory,
    NewColor, NewColorImage, NewProduct, PageRequest, ProductChanges, ProductFilter,
};
use crate::models::{Category, Color, ColorImage, Product};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list_category_nodes).post(create_category_node))
        .route(
            "/api/categories/{id}",
            get(retrieve_category)
                .put(update_category_node)
                .patch(update_category_node)
                .delete(destroy_category),
        )
        .route("/api/products", get(list_product_rows).post(create_product_detail))
        .route(
            "/api/products/{id}",
            get(retrieve_product)
                .put(update_product_detail)
                .patch(update_product_detail)
                .delete(destroy_product),
        )
        .route("/api/colors", get(list_color_rows).post(create_color_detail))
        .route(
            "/api/colors/{id}",
            get(retrieve_color)
                .put(update_color_detail)
                .patch(update_color_detail)
                .delete(destroy_color),
        )
        .route("/api/color-images", get(list_image_rows).post(create_image))
        .route(
            "/api/color-images/{id}",
            get(retrieve_image)
                .put(update_image)
                .patch(update_image)
                .delete(destroy_image),
        )
}

/// Category with its active subcategories, recursively
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

/// Attach active descendants found in `all` to `root`
///
/// A category already on the current path is skipped, so a bad parent chain
/// cannot recurse forever.
pub fn build_category_tree(root: Category, all: &[Category]) -> CategoryNode {
    fn build(category: Category, all: &[Category], path: &mut Vec<i64>) -> CategoryNode {
        path.push(category.id);
        let direct: Vec<Category> = all
            .iter()
            .filter(|child| {
                child.parent_id == Some(category.id) && child.is_active && !path.contains(&child.id)
            })
            .cloned()
            .collect();
        let children = direct
            .into_iter()
            .map(|child| build(child, all, path))
            .collect();
        path.pop();

        CategoryNode { category, children }
    }

    build(root, all, &mut Vec::new())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorDetail {
    #[serde(flatten)]
    pub color: Color,
    pub images: Vec<ColorImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub categories: Vec<Category>,
    pub colors: Vec<ColorDetail>,
}

fn require_text(field: &str, value: Option<&str>) -> ApiResult<()> {
    match value {
        Some(text) if text.trim().is_empty() => {
            Err(ApiError::BadRequest(format!("{field} must not be blank")))
        }
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

async fn category_node(pool: &PgPool, category: Category) -> ApiResult<CategoryNode> {
    let all = list_all_categories(pool).await?;
    Ok(build_category_tree(category, &all))
}

async fn list_category_nodes(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(page): Query<PageQuery>,
    Query(filter): Query<CategoryFilter>,
) -> ApiResult<Json<Page<CategoryNode>>> {
    let request = PageRequest::from(page);
    let categories = list_categories(&state.pool, &filter, request).await?;
    let all = list_all_categories(&state.pool).await?;

    let nodes = categories.map(|category| build_category_tree(category, &all));
    Ok(Json(Page::new(nodes, request, &uri)))
}

async fn create_category_node(
    State(state): State<AppState>,
    Json(new_category): Json<NewCategory>,
) -> ApiResult<(StatusCode, Json<CategoryNode>)> {
    require_text("name_uz", Some(new_category.name_uz.as_str()))?;
    require_text("name_ru", Some(new_category.name_ru.as_str()))?;

    let category = create_category(&state.pool, &new_category).await?;
    let node = category_node(&state.pool, category).await?;
    Ok((StatusCode::CREATED, Json(node)))
}

async fn retrieve_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CategoryNode>> {
    let category = get_category(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("category"))?;
    Ok(Json(category_node(&state.pool, category).await?))
}

async fn update_category_node(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(changes): Json<CategoryChanges>,
) -> ApiResult<Json<CategoryNode>> {
    require_text("name_uz", changes.name_uz.as_deref())?;
    require_text("name_ru", changes.name_ru.as_deref())?;

    let category = update_category(&state.pool, id, &changes)
        .await?
        .ok_or_else(|| ApiError::not_found("category"))?;
    Ok(Json(category_node(&state.pool, category).await?))
}

async fn destroy_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if delete_category(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("category"))
    }
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

async fn color_detail(pool: &PgPool, color: Color) -> ApiResult<ColorDetail> {
    let images = list_images_for_color(pool, color.id).await?;
    Ok(ColorDetail { color, images })
}

async fn product_detail(pool: &PgPool, product: Product) -> ApiResult<ProductDetail> {
    let categories = list_product_categories(pool, product.id).await?;

    let mut colors = Vec::new();
    for color in list_colors_for_product(pool, product.id, false).await? {
        colors.push(color_detail(pool, color).await?);
    }

    Ok(ProductDetail {
        product,
        categories,
        colors,
    })
}

async fn list_product_rows(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(page): Query<PageQuery>,
    Query(filter): Query<ProductFilter>,
) -> ApiResult<Json<Page<Product>>> {
    let request = PageRequest::from(page);
    let products = list_products(&state.pool, &filter, request).await?;
    Ok(Json(Page::new(products, request, &uri)))
}

async fn create_product_detail(
    State(state): State<AppState>,
    Json(new_product): Json<NewProduct>,
) -> ApiResult<(StatusCode, Json<ProductDetail>)> {
    require_text("name_uz", Some(new_product.name_uz.as_str()))?;
    require_text("name_ru", Some(new_product.name_ru.as_str()))?;

    let product = create_product(&state.pool, &new_product).await?;
    let detail = product_detail(&state.pool, product).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn retrieve_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ProductDetail>> {
    let product = get_product(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("product"))?;
    Ok(Json(product_detail(&state.pool, product).await?))
}

async fn update_product_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(changes): Json<ProductChanges>,
) -> ApiResult<Json<ProductDetail>> {
    require_text("name_uz", changes.name_uz.as_deref())?;
    require_text("name_ru", changes.name_ru.as_deref())?;

    let product = update_product(&state.pool, id, &changes)
        .await?
        .ok_or_else(|| ApiError::not_found("product"))?;
    Ok(Json(product_detail(&state.pool, product).await?))
}

async fn destroy_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if delete_product(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("product"))
    }
}

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

async fn list_color_rows(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(page): Query<PageQuery>,
    Query(filter): Query<ColorFilter>,
) -> ApiResult<Json<Page<Color>>> {
    let request = PageRequest::from(page);
    let colors = list_colors(&state.pool, &filter, request).await?;
    Ok(Json(Page::new(colors, request, &uri)))
}

async fn create_color_detail(
    State(state): State<AppState>,
    Json(new_color): Json<NewColor>,
) -> ApiResult<(StatusCode, Json<ColorDetail>)> {
    require_text("name_uz", Some(new_color.name_uz.as_str()))?;
    require_text("name_ru", Some(new_color.name_ru.as_str()))?;

    let color = create_color(&state.pool, &new_color).await?;
    Ok((StatusCode::CREATED, Json(color_detail(&state.pool, color).await?)))
}

async fn retrieve_color(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ColorDetail>> {
    let color = get_color(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("color"))?;
    Ok(Json(color_detail(&state.pool, color).await?))
}

async fn update_color_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(changes): Json<ColorChanges>,
) -> ApiResult<Json<ColorDetail>> {
    require_text("name_uz", changes.name_uz.as_deref())?;
    require_text("name_ru", changes.name_ru.as_deref())?;

    let color = update_color(&state.pool, id, &changes)
        .await?
        .ok_or_else(|| ApiError::not_found("color"))?;
    Ok(Json(color_detail(&state.pool, color).await?))
}

async fn destroy_color(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    if delete_color(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("color"))
    }
}

// ---------------------------------------------------------------------------
// Color images
// ---------------------------------------------------------------------------

async fn list_image_rows(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(page): Query<PageQuery>,
    Query(filter): Query<ColorImageFilter>,
) -> ApiResult<Json<Page<ColorImage>>> {
    let request = PageRequest::from(page);
    let images = list_color_images(&state.pool, &filter, request).await?;
    Ok(Json(Page::new(images, request, &uri)))
}

async fn create_image(
    State(state): State<AppState>,
    Json(new_image): Json<NewColorImage>,
) -> ApiResult<(StatusCode, Json<ColorImage>)> {
    require_text("image", Some(new_image.image.as_str()))?;

    let image = create_color_image(&state.pool, &new_image).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

async fn retrieve_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ColorImage>> {
    get_color_image(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("color image"))
}

async fn update_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(changes): Json<ColorImageChanges>,
) -> ApiResult<Json<ColorImage>> {
    require_text("image", changes.image.as_deref())?;

    update_color_image(&state.pool, id, &changes)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("color image"))
}

async fn destroy_image(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    if delete_color_image(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("color image"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn category(id: i64, parent_id: Option<i64>, is_active: bool) -> Category {
        Category {
            id,
            name_uz: format!("Bo'lim {id}"),
            name_ru: format!("Раздел {id}"),
            parent_id,
            image: None,
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_category_tree_nests_active_children() {
        let all = vec![
            category(1, None, true),
            category(2, Some(1), true),
            category(3, Some(2), true),
            category(4, Some(1), false),
            category(5, None, true),
        ];

        let tree = build_category_tree(all[0].clone(), &all);
        assert_eq!(tree.category.id, 1);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].category.id, 2);
        assert_eq!(tree.children[0].children[0].category.id, 3);
        assert!(tree.children[0].children[0].children.is_empty());
    }

    #[test]
    fn test_category_tree_stops_on_cycle() {
        let all = vec![category(1, Some(2), true), category(2, Some(1), true)];

        let tree = build_category_tree(all[0].clone(), &all);
        assert_eq!(tree.children.len(), 1);
        assert!(tree.children[0].children.is_empty());
    }

    #[test]
    fn test_category_node_serializes_flat() {
        let node = build_category_tree(category(7, None, true), &[]);
        let value = serde_json::to_value(&node).unwrap();

        assert_eq!(value["id"], 7);
        assert_eq!(value["name_ru"], "Раздел 7");
        assert_eq!(value["children"], serde_json::json!([]));
    }

    #[test]
    fn test_require_text() {
        assert!(require_text("name_uz", None).is_ok());
        assert!(require_text("name_uz", Some("Telefonlar")).is_ok());
        assert!(require_text("name_uz", Some("   ")).is_err());
    }
}
