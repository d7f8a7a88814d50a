//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: Handles commands, menu buttons and dialogue text input
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `callback_data`: Encodes and parses inline button payloads
//! - `ui_builder`: Creates keyboards and formats messages
//! - `dialogue_manager`: Manages registration, checkout and settings dialogue steps

pub mod callback_data;
pub mod callback_handler;
pub mod dialogue_manager;
pub mod message_handler;
pub mod ui_builder;

use anyhow::Result;
use sqlx::postgres::PgPool;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use tracing::debug;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

use crate::db::get_user_by_telegram_id;
use crate::dialogue::ShopDialogueState;
use crate::localization::{detect_language, t_lang};
use crate::models::User;

/// Build the update handler tree for the dispatcher
///
/// Needs `Arc<PgPool>` and `InMemStorage<ShopDialogueState>` registered as
/// dependencies.
pub fn schema() -> UpdateHandler<anyhow::Error> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .enter_dialogue::<Message, InMemStorage<ShopDialogueState>, ShopDialogueState>()
                .endpoint(message_handler),
        )
        .branch(
            Update::filter_callback_query()
                .enter_dialogue::<CallbackQuery, InMemStorage<ShopDialogueState>, ShopDialogueState>()
                .endpoint(callback_handler),
        )
}

/// Telegram user id as stored in the `users` table
pub fn telegram_id(user: &teloxide::types::User) -> i64 {
    user.id.0 as i64
}

/// Language to use before the user is known
pub fn fallback_language(from: Option<&teloxide::types::User>) -> &'static str {
    detect_language(from.and_then(|user| user.language_code.as_deref()))
}

/// Load the registered, active user behind an update
///
/// Unknown users are asked to /start and blocked users are told so; both
/// yield `None`.
pub(crate) async fn resolve_user(
    bot: &Bot,
    chat_id: ChatId,
    pool: &PgPool,
    from: Option<&teloxide::types::User>,
) -> Result<Option<User>> {
    let Some(from) = from else {
        return Ok(None);
    };

    match get_user_by_telegram_id(pool, telegram_id(from)).await? {
        Some(user) if user.is_active => Ok(Some(user)),
        Some(user) => {
            debug!(user_id = %chat_id, "Blocked user tried to use the bot");
            bot.send_message(chat_id, t_lang("account-blocked", Some(user.language.code())))
                .await?;
            Ok(None)
        }
        None => {
            debug!(user_id = %chat_id, "Unregistered user tried to use the bot");
            bot.send_message(chat_id, t_lang("please-start", Some(fallback_language(Some(from)))))
                .await?;
            Ok(None)
        }
    }
}
