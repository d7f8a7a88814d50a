//! # Store Data Model
//!
//! Row types for the storefront tables and the small enums stored as text
//! columns. Every catalog entity carries an Uzbek and a Russian name; the
//! `name(language)` helpers pick the right one.
//!
//! ## Core Concepts
//!
//! - **Product**: a catalog entry linked to one or more categories
//! - **Color**: a purchasable, price-bearing variant of a product
//! - **Cart**: a user's mutable selection of colors and quantities
//! - **Order**: an immutable snapshot of a cart plus a delivery address
//!
//! ## Usage
//!
//! ```rust
//! use storefront::models::{Language, OrderStatus};
//!
//! let language: Language = "ru".parse().unwrap();
//! assert_eq!(language.code(), "ru");
//! assert_eq!(OrderStatus::default().as_str(), "new");
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Interface language of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Uz,
    Ru,
}

/// Raised when a stored or submitted enum value is unknown
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Uz, Language::Ru];

    /// Two-letter code used in the database, callback data and locale files
    pub fn code(self) -> &'static str {
        match self {
            Language::Uz => "uz",
            Language::Ru => "ru",
        }
    }

    /// Pick the column matching this language
    pub fn pick<'a>(self, uz: &'a str, ru: &'a str) -> &'a str {
        match self {
            Language::Uz => uz,
            Language::Ru => ru,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uz" => Ok(Language::Uz),
            "ru" => Ok(Language::Ru),
            other => Err(ParseEnumError {
                kind: "language",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Language {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    New,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::New,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "order status",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A Telegram user registered with the shop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    #[sqlx(try_from = "String")]
    pub language: Language,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product category, optionally nested under a parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name_uz: String,
    pub name_ru: String,
    pub parent_id: Option<i64>,
    pub image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn name(&self, language: Language) -> &str {
        language.pick(&self.name_uz, &self.name_ru)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name_uz: String,
    pub name_ru: String,
    pub description_uz: Option<String>,
    pub description_ru: Option<String>,
    pub main_image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn name(&self, language: Language) -> &str {
        language.pick(&self.name_uz, &self.name_ru)
    }

    pub fn description(&self, language: Language) -> Option<&str> {
        match language {
            Language::Uz => self.description_uz.as_deref(),
            Language::Ru => self.description_ru.as_deref(),
        }
    }
}

/// A purchasable variant of a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Color {
    pub id: i64,
    pub product_id: i64,
    pub name_uz: String,
    pub name_ru: String,
    pub price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Color {
    pub fn name(&self, language: Language) -> &str {
        language.pick(&self.name_uz, &self.name_ru)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ColorImage {
    pub id: i64,
    pub color_id: i64,
    pub image: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Cart {
    pub id: i64,
    pub user_id: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CartItem {
    pub id: i64,
    pub cart_id: i64,
    pub color_id: i64,
    pub quantity: i32,
}

/// A cart item joined with its color and product, as shown to users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CartLine {
    pub item_id: i64,
    pub cart_id: i64,
    pub quantity: i32,
    pub color_id: i64,
    pub color_name_uz: String,
    pub color_name_ru: String,
    pub color_is_active: bool,
    pub price: Decimal,
    pub product_id: i64,
    pub product_name_uz: String,
    pub product_name_ru: String,
    pub product_main_image: Option<String>,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }

    pub fn product_name(&self, language: Language) -> &str {
        language.pick(&self.product_name_uz, &self.product_name_ru)
    }

    pub fn color_name(&self, language: Language) -> &str {
        language.pick(&self.color_name_uz, &self.color_name_ru)
    }
}

/// Largest quantity a single cart line may hold
pub const MAX_QUANTITY: i32 = 10_000;

/// Money columns are NUMERIC(12,2), so stored amounts stay below 10^10
pub const AMOUNT_LIMIT: i64 = 10_000_000_000;

/// Whether a price or total fits the money columns
pub fn amount_fits(amount: Decimal) -> bool {
    amount < Decimal::from(AMOUNT_LIMIT)
}

/// Sum of line totals
pub fn cart_total(lines: &[CartLine]) -> Decimal {
    lines.iter().map(CartLine::line_total).sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub address: String,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Frozen copy of a cart line inside an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_name: String,
    pub color_name: String,
    pub price: Decimal,
    pub quantity: i32,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}
