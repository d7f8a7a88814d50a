//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use sqlx::postgres::PgPool;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{debug, error};

// Import localization
use crate::localization::t_lang;

// Import dialogue types
use crate::dialogue::{ShopDialogue, ShopDialogueState};

// Import store operations
use crate::db::{get_user_by_telegram_id, list_active_cart_lines, list_root_categories};
use crate::models::User;

// Import dialogue manager functions
use super::dialogue_manager::{
    handle_checkout_input, handle_contact_input, handle_name_input, handle_new_name_input,
    handle_new_phone_input,
};

// Import UI builder functions
use super::ui_builder::{
    cart_keyboard, categories_keyboard, format_settings, language_keyboard, main_menu_keyboard,
    settings_keyboard, MenuAction,
};
use super::{fallback_language, resolve_user, telegram_id};

/// Bot commands understood outside of menus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
}

impl Command {
    /// Parse `/start` and `/help`, also with a `@botname` suffix or payload
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?;
        let name = first.strip_prefix('/')?.split('@').next()?;
        match name {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            _ => None,
        }
    }
}

async fn handle_start_command(
    bot: &Bot,
    msg: &Message,
    dialogue: ShopDialogue,
    pool: &PgPool,
) -> Result<()> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };

    match get_user_by_telegram_id(pool, telegram_id(from)).await? {
        Some(user) if !user.is_active => {
            bot.send_message(msg.chat.id, t_lang("account-blocked", Some(user.language.code())))
                .await?;
        }
        Some(user) => {
            debug!(user_id = %msg.chat.id, "Known user restarted the bot");
            dialogue.exit().await?;
            bot.send_message(msg.chat.id, t_lang("welcome-back", Some(user.language.code())))
                .reply_markup(main_menu_keyboard(user.language))
                .await?;
        }
        None => {
            debug!(user_id = %msg.chat.id, "New user, starting registration");
            // Clear any existing state
            dialogue.update(ShopDialogueState::Start).await?;
            bot.send_message(msg.chat.id, t_lang("choose-language", None))
                .reply_markup(language_keyboard(false))
                .await?;
        }
    }

    Ok(())
}

async fn handle_help_command(bot: &Bot, msg: &Message, pool: &PgPool) -> Result<()> {
    let language = match msg.from.as_ref() {
        Some(from) => match get_user_by_telegram_id(pool, telegram_id(from)).await? {
            Some(user) => user.language.code(),
            None => fallback_language(Some(from)),
        },
        None => fallback_language(None),
    };

    bot.send_message(msg.chat.id, t_lang("help-text", Some(language)))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Show root categories
async fn show_catalog(bot: &Bot, chat_id: ChatId, pool: &PgPool, user: &User) -> Result<()> {
    let lang = Some(user.language.code());
    let categories = list_root_categories(pool).await?;

    if categories.is_empty() {
        bot.send_message(chat_id, t_lang("no-categories", lang))
            .reply_markup(main_menu_keyboard(user.language))
            .await?;
    } else {
        bot.send_message(chat_id, t_lang("choose-category", lang))
            .reply_markup(categories_keyboard(&categories, user.language, None))
            .await?;
    }
    Ok(())
}

async fn show_cart(bot: &Bot, chat_id: ChatId, pool: &PgPool, user: &User) -> Result<()> {
    let lang = Some(user.language.code());
    let lines = list_active_cart_lines(pool, user.id).await?;

    if lines.is_empty() {
        bot.send_message(chat_id, t_lang("cart-empty", lang))
            .reply_markup(main_menu_keyboard(user.language))
            .await?;
    } else {
        bot.send_message(chat_id, t_lang("cart-title", lang))
            .reply_markup(cart_keyboard(&lines, user.language))
            .await?;
    }
    Ok(())
}

async fn handle_menu_action(
    bot: &Bot,
    chat_id: ChatId,
    pool: &PgPool,
    user: &User,
    action: MenuAction,
) -> Result<()> {
    debug!(user_id = %chat_id, action = ?action, "Main menu button pressed");

    match action {
        MenuAction::Catalog => show_catalog(bot, chat_id, pool, user).await,
        MenuAction::Cart => show_cart(bot, chat_id, pool, user).await,
        MenuAction::Contact => {
            bot.send_message(chat_id, t_lang("contact-info", Some(user.language.code())))
                .parse_mode(ParseMode::Html)
                .reply_markup(main_menu_keyboard(user.language))
                .await?;
            Ok(())
        }
        MenuAction::Settings => {
            bot.send_message(chat_id, format_settings(user))
                .parse_mode(ParseMode::Html)
                .reply_markup(settings_keyboard(user.language))
                .await?;
            Ok(())
        }
    }
}

async fn handle_message(
    bot: &Bot,
    msg: &Message,
    dialogue: ShopDialogue,
    pool: &PgPool,
) -> Result<()> {
    if let Some(command) = msg.text().and_then(Command::parse) {
        return match command {
            Command::Start => handle_start_command(bot, msg, dialogue, pool).await,
            Command::Help => handle_help_command(bot, msg, pool).await,
        };
    }

    // Check dialogue state first
    let dialogue_state = dialogue.get().await?.unwrap_or_default();
    debug!(user_id = %msg.chat.id, dialogue_state = ?dialogue_state, "Retrieved dialogue state");

    // Registration happens before the user exists
    match dialogue_state {
        ShopDialogueState::WaitingForContact { language } => {
            return handle_contact_input(bot, msg, dialogue, language).await;
        }
        ShopDialogueState::WaitingForName {
            language,
            phone_number,
        } => {
            return handle_name_input(bot, msg, dialogue, pool, language, phone_number).await;
        }
        _ => {}
    }

    let Some(user) = resolve_user(bot, msg.chat.id, pool, msg.from.as_ref()).await? else {
        dialogue.exit().await?;
        return Ok(());
    };

    // A main menu button always leaves the current dialogue
    if let Some(action) = msg.text().and_then(MenuAction::from_text) {
        if dialogue_state != ShopDialogueState::Start {
            debug!(user_id = %msg.chat.id, "Dialogue left through the main menu");
            dialogue.exit().await?;
        }
        return handle_menu_action(bot, msg.chat.id, pool, &user, action).await;
    }

    match dialogue_state {
        state @ (ShopDialogueState::WaitingForAddress | ShopDialogueState::ConfirmOrder { .. }) => {
            handle_checkout_input(bot, msg, dialogue, pool, &user, state).await
        }
        ShopDialogueState::WaitingForNewPhone => {
            handle_new_phone_input(bot, msg, dialogue, pool, &user).await
        }
        ShopDialogueState::WaitingForNewName => {
            handle_new_name_input(bot, msg, dialogue, pool, &user).await
        }
        _ => {
            debug!(user_id = %msg.chat.id, "Unrecognized message outside of a dialogue");
            bot.send_message(msg.chat.id, t_lang("unknown-message", Some(user.language.code())))
                .reply_markup(main_menu_keyboard(user.language))
                .await?;
            Ok(())
        }
    }
}

/// Entry point for every incoming message
pub async fn message_handler(
    bot: Bot,
    msg: Message,
    pool: Arc<PgPool>,
    dialogue: ShopDialogue,
) -> Result<()> {
    if let Err(e) = handle_message(&bot, &msg, dialogue, &pool).await {
        error!(user_id = %msg.chat.id, error = %e, "Failed to handle message");
        bot.send_message(
            msg.chat.id,
            t_lang("error-generic", Some(fallback_language(msg.from.as_ref()))),
        )
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/start promo"), Some(Command::Start));
        assert_eq!(Command::parse("/help@shop_bot"), Some(Command::Help));
        assert_eq!(Command::parse("/orders"), None);
        assert_eq!(Command::parse("start"), None);
        assert_eq!(Command::parse(""), None);
    }
}
