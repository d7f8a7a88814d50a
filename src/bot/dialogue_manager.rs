//! Dialogue Manager module for handling dialogue state transitions

use anyhow::Result;
use sqlx::postgres::PgPool;
use teloxide::prelude::*;
use teloxide::types::{KeyboardRemove, ParseMode};
use tracing::{debug, error, info, warn};

// Import localization
use crate::localization::{t_args_lang, t_lang};

// Import dialogue types
use crate::dialogue::{
    checkout_step, validate_name, validate_phone_number, validate_typed_phone_number,
    CheckoutInput, CheckoutStep, ShopDialogue, ShopDialogueState,
};

// Import store operations
use crate::checkout::{order_summary, place_order, MAX_ADDRESS_LEN};
use crate::db::{list_active_cart_lines, register_user, set_user_name, set_user_phone, NewUser};
use crate::errors::StoreError;
use crate::models::{Language, User};

// Import UI builder functions
use super::telegram_id;
use super::ui_builder::{
    cancel_keyboard, confirm_order_keyboard, main_menu_keyboard, matches_label, restart_keyboard,
};

/// Extract a phone number from a shared contact or typed text
///
/// A shared contact must belong to the sender.
fn phone_from_message(msg: &Message) -> Option<String> {
    if let Some(contact) = msg.contact() {
        let sender = msg.from.as_ref().map(|user| user.id);
        if contact.user_id.is_some() && contact.user_id != sender {
            debug!(user_id = %msg.chat.id, "Rejected contact of another user");
            return None;
        }
        return validate_phone_number(&contact.phone_number).ok();
    }

    msg.text()
        .and_then(|text| validate_typed_phone_number(text).ok())
}

/// Handle the phone number step of registration
pub async fn handle_contact_input(
    bot: &Bot,
    msg: &Message,
    dialogue: ShopDialogue,
    language: Language,
) -> Result<()> {
    let lang = Some(language.code());

    match phone_from_message(msg) {
        Some(phone_number) => {
            bot.send_message(msg.chat.id, t_lang("request-name", lang))
                .reply_markup(cancel_keyboard(language))
                .await?;

            dialogue
                .update(ShopDialogueState::WaitingForName {
                    language,
                    phone_number,
                })
                .await?;
        }
        None => {
            bot.send_message(msg.chat.id, t_lang("invalid-phone", lang))
                .await?;
            // Keep dialogue active, user can try again
        }
    }

    Ok(())
}

/// Handle the name step of registration and create the user
pub async fn handle_name_input(
    bot: &Bot,
    msg: &Message,
    dialogue: ShopDialogue,
    pool: &PgPool,
    language: Language,
    phone_number: String,
) -> Result<()> {
    let lang = Some(language.code());
    let text = msg.text().unwrap_or_default();

    if matches_label(text, "cancel-button") {
        bot.send_message(msg.chat.id, t_lang("registration-cancelled", lang))
            .reply_markup(restart_keyboard())
            .await?;
        dialogue.exit().await?;
        return Ok(());
    }

    let Some(from) = msg.from.as_ref() else {
        dialogue.exit().await?;
        return Ok(());
    };

    match validate_name(text) {
        Ok(first_name) => {
            let new_user = NewUser {
                telegram_id: telegram_id(from),
                username: from.username.clone(),
                first_name,
                last_name: from.last_name.clone(),
                phone_number: Some(phone_number),
                language,
            };
            let user = register_user(pool, &new_user).await?;
            info!(user_id = %msg.chat.id, db_user_id = user.id, "User registered");

            let welcome = t_args_lang(
                "registration-complete",
                &[("name", user.first_name.as_str())],
                lang,
            );
            bot.send_message(msg.chat.id, welcome)
                .reply_markup(main_menu_keyboard(language))
                .await?;

            dialogue.exit().await?;
        }
        Err(_) => {
            bot.send_message(msg.chat.id, t_lang("invalid-name", lang))
                .await?;
            // Keep dialogue active, user can try again
        }
    }

    Ok(())
}

/// Handle text sent while checking out: the delivery address, then the
/// confirm/cancel answer to the order summary
pub async fn handle_checkout_input(
    bot: &Bot,
    msg: &Message,
    dialogue: ShopDialogue,
    pool: &PgPool,
    user: &User,
    state: ShopDialogueState,
) -> Result<()> {
    let lang = Some(user.language.code());
    let text = msg.text().unwrap_or_default();
    let input = if matches_label(text, "confirm-button") {
        CheckoutInput::Confirm
    } else if matches_label(text, "cancel-order-button") {
        CheckoutInput::Cancel
    } else {
        CheckoutInput::Text(text)
    };

    let lines = list_active_cart_lines(pool, user.id).await?;
    let Some(step) = checkout_step(&state, input, !lines.is_empty()) else {
        return Ok(());
    };
    debug!(user_id = %msg.chat.id, step = ?step, "Checkout step");

    match &step {
        CheckoutStep::Stay { reply } => {
            let max = MAX_ADDRESS_LEN.to_string();
            let text = t_args_lang(reply, &[("max", max.as_str())], lang);
            if matches!(state, ShopDialogueState::ConfirmOrder { .. }) {
                bot.send_message(msg.chat.id, text)
                    .reply_markup(confirm_order_keyboard(user.language))
                    .await?;
            } else {
                bot.send_message(msg.chat.id, text).await?;
            }
            // Keep dialogue active, user can try again
        }
        CheckoutStep::Confirm { address } => {
            bot.send_message(msg.chat.id, order_summary(&lines, address, user.language))
                .reply_markup(confirm_order_keyboard(user.language))
                .await?;
        }
        CheckoutStep::PlaceOrder { address } => {
            confirm_order(bot, msg.chat.id, pool, user, address).await?;
        }
        CheckoutStep::Exit { reply } => {
            bot.send_message(msg.chat.id, t_lang(reply, lang))
                .reply_markup(main_menu_keyboard(user.language))
                .await?;
        }
    }

    match step.next_state(&state) {
        Some(next) if next != state => dialogue.update(next).await?,
        Some(_) => {}
        None => dialogue.exit().await?,
    }
    Ok(())
}

/// Create the order and report the outcome
async fn confirm_order(
    bot: &Bot,
    chat_id: ChatId,
    pool: &PgPool,
    user: &User,
    address: &str,
) -> Result<()> {
    let lang = Some(user.language.code());

    match place_order(pool, user.id, address).await {
        Ok((order, items)) => {
            info!(
                user_id = %chat_id,
                order_id = order.id,
                items = items.len(),
                "Order confirmed from chat"
            );
            let order_id = order.id.to_string();
            bot.send_message(
                chat_id,
                t_args_lang("order-created", &[("order_id", order_id.as_str())], lang),
            )
            .reply_markup(main_menu_keyboard(user.language))
            .await?;
        }
        Err(e @ (StoreError::EmptyCart | StoreError::NotFound { .. })) => {
            warn!(user_id = %chat_id, error = %e, "Cart changed before confirmation");
            bot.send_message(chat_id, t_lang("order-failed", lang))
                .reply_markup(main_menu_keyboard(user.language))
                .await?;
        }
        Err(StoreError::Validation(reason)) => {
            warn!(user_id = %chat_id, reason = %reason, "Order rejected");
            bot.send_message(chat_id, t_lang("order-failed", lang))
                .reply_markup(main_menu_keyboard(user.language))
                .await?;
        }
        Err(e) => {
            error!(user_id = %chat_id, error = %e, "Failed to place order");
            bot.send_message(chat_id, t_lang("order-failed", lang))
                .reply_markup(main_menu_keyboard(user.language))
                .await?;
        }
    }
    Ok(())
}

/// Handle a new phone number sent from the settings screen
pub async fn handle_new_phone_input(
    bot: &Bot,
    msg: &Message,
    dialogue: ShopDialogue,
    pool: &PgPool,
    user: &User,
) -> Result<()> {
    let lang = Some(user.language.code());

    match phone_from_message(msg) {
        Some(phone_number) => {
            set_user_phone(pool, user.id, &phone_number).await?;
            bot.send_message(
                msg.chat.id,
                t_args_lang("phone-changed", &[("phone", phone_number.as_str())], lang),
            )
            .reply_markup(main_menu_keyboard(user.language))
            .await?;
        }
        None => {
            bot.send_message(msg.chat.id, t_lang("invalid-phone-format", lang))
                .reply_markup(main_menu_keyboard(user.language))
                .await?;
        }
    }

    dialogue.exit().await?;
    Ok(())
}

/// Handle a new name sent from the settings screen
pub async fn handle_new_name_input(
    bot: &Bot,
    msg: &Message,
    dialogue: ShopDialogue,
    pool: &PgPool,
    user: &User,
) -> Result<()> {
    let lang = Some(user.language.code());

    match validate_name(msg.text().unwrap_or_default()) {
        Ok(name) => {
            set_user_name(pool, user.id, &name).await?;
            let text = teloxide::utils::html::escape(&name);
            bot.send_message(
                msg.chat.id,
                t_args_lang("name-changed", &[("name", text.as_str())], lang),
            )
            .parse_mode(ParseMode::Html)
            .reply_markup(main_menu_keyboard(user.language))
            .await?;
        }
        Err(_) => {
            bot.send_message(msg.chat.id, t_lang("name-empty", lang))
                .reply_markup(main_menu_keyboard(user.language))
                .await?;
        }
    }

    dialogue.exit().await?;
    Ok(())
}

/// Prompt for the delivery address and enter the checkout dialogue
pub async fn start_checkout(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: ShopDialogue,
    user: &User,
) -> Result<()> {
    bot.send_message(chat_id, t_lang("enter-address", Some(user.language.code())))
        .reply_markup(KeyboardRemove::new())
        .await?;

    dialogue.update(ShopDialogueState::WaitingForAddress).await?;
    debug!(user_id = %chat_id, "Checkout started");
    Ok(())
}
