use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use storefront::api::{self, AppState};
use storefront::bot;
use storefront::config::{Config, LogFormat};
use storefront::db::init_database_schema;
use storefront::dialogue::ShopDialogueState;
use storefront::localization::init_localization;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = Config::from_env().context("Invalid configuration")?;
    init_tracing(config.log_format);

    info!("Starting storefront");

    // Initialize localization
    init_localization().context("Failed to load localization bundles")?;

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to the database")?;

    // Initialize database schema
    init_database_schema(&pool)
        .await
        .context("Failed to initialize the database schema")?;

    // Start the REST API
    let listener = tokio::net::TcpListener::bind(config.api_bind_addr)
        .await
        .context("Failed to bind the API listener")?;
    info!(addr = %config.api_bind_addr, "REST API listening");

    let app = api::router(AppState::new(pool.clone()));
    let api_server = tokio::spawn(async move { axum::serve(listener, app).await });

    let Some(token) = config.telegram_bot_token else {
        info!("TELEGRAM_BOT_TOKEN not set, running the REST API only");
        api_server
            .await
            .context("API server task failed")?
            .context("API server error")?;
        return Ok(());
    };

    // Initialize the bot
    let bot = Bot::new(token);
    info!("Bot initialized, starting dispatcher");

    Dispatcher::builder(bot, bot::schema())
        .dependencies(dptree::deps![
            InMemStorage::<ShopDialogueState>::new(),
            Arc::new(pool)
        ])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Dispatcher stopped, shutting down");
    api_server.abort();
    if let Err(e) = api_server.await {
        if !e.is_cancelled() {
            error!(error = %e, "API server task failed");
        }
    }

    Ok(())
}
