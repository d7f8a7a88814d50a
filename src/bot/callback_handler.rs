//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use sqlx::postgres::PgPool;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, InputFile, KeyboardRemove, MessageId, ParseMode};
use teloxide::{ApiError, RequestError};
use tracing::{debug, error, warn};

// Import localization
use crate::localization::{t_args_lang, t_lang};

// Import dialogue types
use crate::dialogue::{ShopDialogue, ShopDialogueState};

// Import store operations
use crate::checkout::format_price;
use crate::db::{
    add_to_cart, change_cart_item_quantity, clear_cart, get_cart_line_for_user, get_category,
    get_color, get_product, list_active_cart_lines, list_child_categories,
    list_colors_for_product, list_images_for_color, list_products_in_category,
    list_root_categories, remove_cart_item_for_user, set_user_language, QuantityChange,
};
use crate::errors::StoreError;
use crate::models::{Language, User, MAX_QUANTITY};

// Import UI builder functions
use super::callback_data::CallbackAction;
use super::dialogue_manager::start_checkout;
use super::ui_builder::{
    add_to_cart_keyboard, cart_item_keyboard, cart_keyboard, categories_keyboard,
    category_back_target, colors_keyboard, contact_request_keyboard, format_cart_item,
    format_category_listing, format_color_details, format_product_details, language_keyboard,
    main_menu_keyboard, products_keyboard,
};
use super::{fallback_language, resolve_user};

/// Text shown in the callback answer
#[derive(Debug, Default)]
struct Notice {
    text: Option<String>,
    alert: bool,
}

impl Notice {
    fn none() -> Self {
        Self::default()
    }

    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            alert: false,
        }
    }

    fn alert(text: String) -> Self {
        Self {
            text: Some(text),
            alert: true,
        }
    }
}

/// The message a callback came from
#[derive(Debug, Clone, Copy)]
struct Screen {
    chat_id: ChatId,
    message_id: MessageId,
}

impl Screen {
    /// Replace the screen with a text message, editing in place when possible
    async fn show(&self, bot: &Bot, text: String, keyboard: InlineKeyboardMarkup) -> Result<()> {
        let edited = bot
            .edit_message_text(self.chat_id, self.message_id, text.clone())
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard.clone())
            .await;

        match edited {
            Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(e) => {
                // Photo messages have no text to edit
                debug!(user_id = %self.chat_id, error = %e, "Replacing message instead of editing");
                self.delete(bot).await;
                bot.send_message(self.chat_id, text)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(keyboard)
                    .await?;
                Ok(())
            }
        }
    }

    /// Replace the screen with a photo and caption, or text without a usable image
    async fn show_photo(
        &self,
        bot: &Bot,
        image: Option<&str>,
        caption: String,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<()> {
        let Some(photo) = image.and_then(photo_input) else {
            return self.show(bot, caption, keyboard).await;
        };

        self.delete(bot).await;
        let sent = bot
            .send_photo(self.chat_id, photo)
            .caption(caption.clone())
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard.clone())
            .await;

        if let Err(e) = sent {
            warn!(user_id = %self.chat_id, error = %e, "Failed to send photo, falling back to text");
            bot.send_message(self.chat_id, caption)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard)
                .await?;
        }
        Ok(())
    }

    async fn delete(&self, bot: &Bot) {
        if let Err(e) = bot.delete_message(self.chat_id, self.message_id).await {
            debug!(user_id = %self.chat_id, error = %e, "Failed to delete message");
        }
    }
}

/// Images are stored as opaque strings; only absolute URLs can be sent
fn photo_input(image: &str) -> Option<InputFile> {
    image.parse().ok().map(InputFile::url)
}

async fn show_root_categories(
    bot: &Bot,
    screen: Screen,
    pool: &PgPool,
    user: &User,
) -> Result<Notice> {
    let lang = Some(user.language.code());
    let categories = list_root_categories(pool).await?;

    if categories.is_empty() {
        screen
            .show(bot, t_lang("no-categories", lang), InlineKeyboardMarkup::default())
            .await?;
    } else {
        screen
            .show(
                bot,
                t_lang("choose-category", lang),
                categories_keyboard(&categories, user.language, None),
            )
            .await?;
    }
    Ok(Notice::none())
}

/// Show subcategories of a category, or its products when it has none
async fn show_category(
    bot: &Bot,
    screen: Screen,
    pool: &PgPool,
    user: &User,
    category_id: i64,
) -> Result<Notice> {
    let lang = Some(user.language.code());
    let category = match get_category(pool, category_id).await? {
        Some(category) if category.is_active => category,
        _ => return Ok(Notice::text(t_lang("category-not-found", lang))),
    };

    let children = list_child_categories(pool, category.id).await?;
    if !children.is_empty() {
        screen
            .show(
                bot,
                teloxide::utils::html::escape(category.name(user.language)),
                categories_keyboard(&children, user.language, Some(category_back_target(&category))),
            )
            .await?;
        return Ok(Notice::none());
    }

    let products = list_products_in_category(pool, category.id).await?;
    if products.is_empty() {
        screen
            .show(
                bot,
                format_category_listing(&category, user.language, true),
                categories_keyboard(&[], user.language, Some(category_back_target(&category))),
            )
            .await?;
    } else {
        screen
            .show(
                bot,
                format_category_listing(&category, user.language, false),
                products_keyboard(&products, user.language, category.id),
            )
            .await?;
    }
    Ok(Notice::none())
}

async fn show_product(
    bot: &Bot,
    screen: Screen,
    pool: &PgPool,
    user: &User,
    product_id: i64,
    category_id: Option<i64>,
) -> Result<Notice> {
    let product = match get_product(pool, product_id).await? {
        Some(product) if product.is_active => product,
        _ => {
            return Ok(Notice::text(t_lang(
                "product-not-found",
                Some(user.language.code()),
            )))
        }
    };

    let colors = list_colors_for_product(pool, product.id, true).await?;
    screen
        .show_photo(
            bot,
            product.main_image.as_deref(),
            format_product_details(&product, user.language),
            colors_keyboard(&colors, user.language, product.id, category_id),
        )
        .await?;
    Ok(Notice::none())
}

async fn show_color(
    bot: &Bot,
    screen: Screen,
    pool: &PgPool,
    user: &User,
    color_id: i64,
    product_id: i64,
    category_id: Option<i64>,
) -> Result<Notice> {
    let not_found = || Notice::text(t_lang("product-not-found", Some(user.language.code())));

    let Some(color) = get_color(pool, color_id).await? else {
        return Ok(not_found());
    };
    let Some(product) = get_product(pool, product_id).await? else {
        return Ok(not_found());
    };
    if color.product_id != product.id {
        warn!(user_id = %screen.chat_id, color_id, product_id, "Color does not belong to product");
        return Ok(not_found());
    }

    let caption = format_color_details(&product, &color, user.language);
    let keyboard = add_to_cart_keyboard(color.id, product.id, category_id, user.language);
    let images = list_images_for_color(pool, color.id).await?;

    match images.split_first() {
        Some((first, rest)) => {
            screen
                .show_photo(bot, Some(&first.image), caption, keyboard)
                .await?;
            for image in rest {
                if let Some(photo) = photo_input(&image.image) {
                    if let Err(e) = bot.send_photo(screen.chat_id, photo).await {
                        warn!(user_id = %screen.chat_id, error = %e, "Failed to send color image");
                    }
                }
            }
        }
        None => {
            screen
                .show_photo(bot, product.main_image.as_deref(), caption, keyboard)
                .await?;
        }
    }
    Ok(Notice::none())
}

async fn handle_add_to_cart(
    bot: &Bot,
    chat_id: ChatId,
    pool: &PgPool,
    user: &User,
    color_id: i64,
) -> Result<Notice> {
    let lang = Some(user.language.code());

    match add_to_cart(pool, user.id, color_id, 1).await {
        Ok(item) => {
            if let Some(color) = get_color(pool, color_id).await? {
                let product_name = get_product(pool, color.product_id)
                    .await?
                    .map(|product| product.name(user.language).to_string())
                    .unwrap_or_default();
                let quantity = item.quantity.to_string();
                let price = format_price(color.price);
                let text = t_args_lang(
                    "added-to-cart",
                    &[
                        ("product", product_name.as_str()),
                        ("color", color.name(user.language)),
                        ("quantity", quantity.as_str()),
                        ("price", price.as_str()),
                    ],
                    lang,
                );
                bot.send_message(chat_id, text).await?;
            }
            Ok(Notice::alert(t_lang("added-to-cart-alert", lang)))
        }
        Err(StoreError::Validation(_)) => Ok(Notice::text(t_lang("color-unavailable", lang))),
        Err(StoreError::NotFound { .. }) => Ok(Notice::text(t_lang("product-not-found", lang))),
        Err(e) => Err(e.into()),
    }
}

async fn show_cart(bot: &Bot, screen: Screen, pool: &PgPool, user: &User) -> Result<Notice> {
    let lang = Some(user.language.code());
    let lines = list_active_cart_lines(pool, user.id).await?;

    if lines.is_empty() {
        screen
            .show(bot, t_lang("cart-empty", lang), InlineKeyboardMarkup::default())
            .await?;
    } else {
        screen
            .show(bot, t_lang("cart-title", lang), cart_keyboard(&lines, user.language))
            .await?;
    }
    Ok(Notice::none())
}

async fn show_cart_item(
    bot: &Bot,
    screen: Screen,
    pool: &PgPool,
    user: &User,
    item_id: i64,
) -> Result<Option<()>> {
    let Some(line) = get_cart_line_for_user(pool, item_id, user.id).await? else {
        return Ok(None);
    };
    screen
        .show(
            bot,
            format_cart_item(&line, user.language),
            cart_item_keyboard(&line, user.language),
        )
        .await?;
    Ok(Some(()))
}

async fn handle_quantity(
    bot: &Bot,
    screen: Screen,
    pool: &PgPool,
    user: &User,
    item_id: i64,
    delta: i32,
) -> Result<Notice> {
    let lang = Some(user.language.code());

    let key = match change_cart_item_quantity(pool, item_id, user.id, delta).await {
        Ok(QuantityChange::Increased(_)) => "quantity-increased",
        Ok(QuantityChange::Decreased(_)) => "quantity-decreased",
        Ok(QuantityChange::AtMinimum) => return Ok(Notice::text(t_lang("quantity-minimum", lang))),
        Ok(QuantityChange::AtMaximum) => {
            let max = MAX_QUANTITY.to_string();
            return Ok(Notice::text(t_args_lang(
                "quantity-maximum",
                &[("max", max.as_str())],
                lang,
            )));
        }
        Err(StoreError::NotFound { .. }) => return Ok(Notice::text(t_lang("item-not-found", lang))),
        Err(e) => return Err(e.into()),
    };

    show_cart_item(bot, screen, pool, user, item_id).await?;
    Ok(Notice::text(t_lang(key, lang)))
}

async fn handle_remove(
    bot: &Bot,
    screen: Screen,
    pool: &PgPool,
    user: &User,
    item_id: i64,
) -> Result<Notice> {
    let lang = Some(user.language.code());
    let Some(line) = get_cart_line_for_user(pool, item_id, user.id).await? else {
        return Ok(Notice::text(t_lang("item-not-found", lang)));
    };

    if !remove_cart_item_for_user(pool, item_id, user.id).await? {
        return Ok(Notice::text(t_lang("item-not-found", lang)));
    }

    show_cart(bot, screen, pool, user).await?;
    Ok(Notice::text(t_args_lang(
        "item-removed",
        &[("product", line.product_name(user.language))],
        lang,
    )))
}

async fn handle_clear_cart(
    bot: &Bot,
    screen: Screen,
    pool: &PgPool,
    user: &User,
) -> Result<Notice> {
    let lang = Some(user.language.code());

    match clear_cart(pool, user.id).await? {
        Some(_) => {
            screen
                .show(bot, t_lang("cart-empty", lang), InlineKeyboardMarkup::default())
                .await?;
            Ok(Notice::text(t_lang("cart-cleared", lang)))
        }
        None => Ok(Notice::text(t_lang("cart-already-empty", lang))),
    }
}

async fn handle_checkout(
    bot: &Bot,
    screen: Screen,
    pool: &PgPool,
    user: &User,
    dialogue: ShopDialogue,
) -> Result<Notice> {
    let lines = list_active_cart_lines(pool, user.id).await?;
    if lines.is_empty() {
        return Ok(Notice::text(t_lang("cart-empty", Some(user.language.code()))));
    }

    screen.delete(bot).await;
    start_checkout(bot, screen.chat_id, dialogue, user).await?;
    Ok(Notice::none())
}

/// Registration: language picked, ask for the phone number
async fn handle_language_choice(
    bot: &Bot,
    screen: Screen,
    dialogue: ShopDialogue,
    language: Language,
) -> Result<Notice> {
    let lang = Some(language.code());

    screen
        .show(bot, t_lang("request-phone", lang), InlineKeyboardMarkup::default())
        .await?;
    bot.send_message(screen.chat_id, t_lang("press-button", lang))
        .reply_markup(contact_request_keyboard(language))
        .await?;

    dialogue
        .update(ShopDialogueState::WaitingForContact { language })
        .await?;
    Ok(Notice::none())
}

async fn handle_new_language(
    bot: &Bot,
    screen: Screen,
    pool: &PgPool,
    user: &User,
    language: Language,
) -> Result<Notice> {
    let lang = Some(language.code());
    set_user_language(pool, user.id, language).await?;

    screen
        .show(bot, t_lang("language-changed", lang), InlineKeyboardMarkup::default())
        .await?;
    bot.send_message(screen.chat_id, t_lang("main-menu", lang))
        .reply_markup(main_menu_keyboard(language))
        .await?;
    Ok(Notice::none())
}

async fn handle_action(
    bot: &Bot,
    q: &CallbackQuery,
    screen: Screen,
    pool: &PgPool,
    dialogue: ShopDialogue,
    action: CallbackAction,
) -> Result<Notice> {
    // Language choice is the only action available before registration
    if let CallbackAction::Language(language) = action {
        return handle_language_choice(bot, screen, dialogue, language).await;
    }

    let Some(user) = resolve_user(bot, screen.chat_id, pool, Some(&q.from)).await? else {
        return Ok(Notice::none());
    };
    let lang = Some(user.language.code());

    match action {
        CallbackAction::Language(_) => Ok(Notice::none()),
        CallbackAction::Category(category_id) | CallbackAction::BackToCategory(category_id) => {
            show_category(bot, screen, pool, &user, category_id).await
        }
        CallbackAction::BackToCategories => show_root_categories(bot, screen, pool, &user).await,
        CallbackAction::Product {
            product_id,
            category_id,
        }
        | CallbackAction::BackToProduct {
            product_id,
            category_id,
        } => show_product(bot, screen, pool, &user, product_id, category_id).await,
        CallbackAction::Color {
            color_id,
            product_id,
            category_id,
        } => show_color(bot, screen, pool, &user, color_id, product_id, category_id).await,
        CallbackAction::AddToCart(color_id) => {
            handle_add_to_cart(bot, screen.chat_id, pool, &user, color_id).await
        }
        CallbackAction::ShowCart => show_cart(bot, screen, pool, &user).await,
        CallbackAction::CartItem(item_id) => {
            match show_cart_item(bot, screen, pool, &user, item_id).await? {
                Some(()) => Ok(Notice::none()),
                None => Ok(Notice::text(t_lang("item-not-found", lang))),
            }
        }
        CallbackAction::Quantity { step, item_id } => {
            handle_quantity(bot, screen, pool, &user, item_id, step.delta()).await
        }
        CallbackAction::QuantityInfo => Ok(Notice::none()),
        CallbackAction::Remove(item_id) => handle_remove(bot, screen, pool, &user, item_id).await,
        CallbackAction::ClearCart => handle_clear_cart(bot, screen, pool, &user).await,
        CallbackAction::Checkout => handle_checkout(bot, screen, pool, &user, dialogue).await,
        CallbackAction::ChangeLanguage => {
            screen
                .show(bot, t_lang("choose-new-language", lang), language_keyboard(true))
                .await?;
            Ok(Notice::none())
        }
        CallbackAction::NewLanguage(language) => {
            handle_new_language(bot, screen, pool, &user, language).await
        }
        CallbackAction::ChangePhone => {
            screen.delete(bot).await;
            bot.send_message(screen.chat_id, t_lang("request-new-phone", lang))
                .reply_markup(contact_request_keyboard(user.language))
                .await?;
            dialogue.update(ShopDialogueState::WaitingForNewPhone).await?;
            Ok(Notice::none())
        }
        CallbackAction::ChangeName => {
            screen
                .show(bot, t_lang("request-new-name", lang), InlineKeyboardMarkup::default())
                .await?;
            bot.send_message(screen.chat_id, "👇")
                .reply_markup(KeyboardRemove::new())
                .await?;
            dialogue.update(ShopDialogueState::WaitingForNewName).await?;
            Ok(Notice::none())
        }
    }
}

/// Handle callback queries from inline keyboards
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    pool: Arc<PgPool>,
    dialogue: ShopDialogue,
) -> Result<()> {
    debug!(user_id = %q.from.id, data = ?q.data, "Received callback query from user");

    let action = q.data.as_deref().and_then(CallbackAction::parse);
    let screen = q.message.as_ref().map(|msg| Screen {
        chat_id: msg.chat().id,
        message_id: msg.id(),
    });

    let notice = match (action, screen) {
        (Some(action), Some(screen)) => {
            match handle_action(&bot, &q, screen, &pool, dialogue, action).await {
                Ok(notice) => notice,
                Err(e) => {
                    error!(user_id = %q.from.id, error = %e, "Failed to handle callback query");
                    Notice::text(t_lang("error-generic", Some(fallback_language(Some(&q.from)))))
                }
            }
        }
        (None, _) => {
            warn!(user_id = %q.from.id, data = ?q.data, "Unknown callback data");
            Notice::none()
        }
        (Some(_), None) => Notice::none(),
    };

    // Answer the callback query to remove the loading state
    let mut answer = bot.answer_callback_query(q.id.clone());
    if let Some(text) = notice.text {
        answer = answer.text(text).show_alert(notice.alert);
    }
    answer.await?;

    Ok(())
}
