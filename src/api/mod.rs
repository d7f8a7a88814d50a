//! REST API module
//!
//! JSON endpoints over the same store operations the bot uses:
//! - `users`: user management and blocking
//! - `catalog`: categories, products, colors and color images
//! - `carts`: active carts and their items
//! - `orders`: checkout, order listing and status changes

pub mod carts;
pub mod catalog;
pub mod error;
pub mod extract;
pub mod orders;
pub mod users;

use axum::http::Uri;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::postgres::PgPool;

pub use error::{ApiError, ApiResult};

use crate::db::{PageRequest, Paged};

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: PgPool,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/info", get(api_info))
        .merge(users::routes())
        .merge(catalog::routes())
        .merge(carts::routes())
        .merge(orders::routes())
        .with_state(state)
}

async fn api_info() -> Json<Value> {
    Json(json!({
        "name": "Storefront API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Catalog, cart and order management for the storefront bot",
        "endpoints": {
            "users": "/api/users",
            "categories": "/api/categories",
            "products": "/api/products",
            "colors": "/api/colors",
            "color_images": "/api/color-images",
            "carts": "/api/carts",
            "cart_items": "/api/cart-items",
            "orders": "/api/orders",
            "checkout": "/api/orders/checkout",
        },
    }))
}

/// `page` and `page_size` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl From<PageQuery> for PageRequest {
    fn from(query: PageQuery) -> Self {
        PageRequest::new(query.page, query.page_size)
    }
}

/// Paginated list response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Wrap a page of rows, linking neighbours relative to the request URI
    pub fn new(paged: Paged<T>, request: PageRequest, uri: &Uri) -> Self {
        let page = request.page();
        let has_next = request.offset + request.limit < paged.total;

        Self {
            count: paged.total,
            next: has_next.then(|| page_link(uri, page + 1)),
            previous: (page > 1).then(|| page_link(uri, page - 1)),
            results: paged.items,
        }
    }
}

/// Request URI with its `page` parameter replaced
fn page_link(uri: &Uri, page: i64) -> String {
    let mut params: Vec<&str> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|param| !param.is_empty() && !param.starts_with("page="))
        .collect();
    let page_param = format!("page={page}");
    params.push(&page_param);

    format!("{}?{}", uri.path(), params.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paged(total: i64) -> Paged<i64> {
        Paged {
            items: vec![1, 2],
            total,
        }
    }

    #[test]
    fn test_first_page_links() {
        let uri: Uri = "/api/users?is_active=true".parse().unwrap();
        let page = Page::new(paged(45), PageRequest::new(None, None), &uri);

        assert_eq!(page.count, 45);
        assert_eq!(page.previous, None);
        assert_eq!(page.next.as_deref(), Some("/api/users?is_active=true&page=2"));
    }

    #[test]
    fn test_middle_page_keeps_page_size() {
        let uri: Uri = "/api/orders?page=2&page_size=10&status=new".parse().unwrap();
        let page = Page::new(paged(45), PageRequest::new(Some(2), Some(10)), &uri);

        assert_eq!(
            page.next.as_deref(),
            Some("/api/orders?page_size=10&status=new&page=3")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("/api/orders?page_size=10&status=new&page=1")
        );
    }

    #[test]
    fn test_last_page_has_no_next() {
        let uri: Uri = "/api/colors?page=3&page_size=20".parse().unwrap();
        let page = Page::new(paged(45), PageRequest::new(Some(3), Some(20)), &uri);

        assert_eq!(page.next, None);
        assert!(page.previous.is_some());
    }

    #[test]
    fn test_page_query_clamps() {
        let request = PageRequest::from(PageQuery {
            page: Some(0),
            page_size: Some(500),
        });
        assert_eq!(request.limit, PageRequest::MAX_PAGE_SIZE);
        assert_eq!(request.offset, 0);
    }
}
