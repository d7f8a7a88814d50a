//! # Storefront
//!
//! An online shop driven by a Telegram bot and administered through a JSON
//! REST API. Both front-ends share one PostgreSQL store; the checkout flow
//! turns a user's cart into an immutable order.

pub mod api;
pub mod bot;
pub mod checkout;
pub mod config;
pub mod db;
pub mod dialogue;
pub mod errors;
pub mod localization;
pub mod models;
