//! UI Builder module for creating keyboards and formatting messages

use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
};
use teloxide::utils::html;

// Import localization
use crate::localization::{t_args_lang, t_lang};

// Import store types
use crate::checkout::format_price;
use crate::models::{cart_total, CartLine, Category, Color, Language, Product, User};

use super::callback_data::{CallbackAction, QuantityStep};

/// Buttons of the persistent main menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Catalog,
    Cart,
    Contact,
    Settings,
}

impl MenuAction {
    const ALL: [MenuAction; 4] = [
        MenuAction::Catalog,
        MenuAction::Cart,
        MenuAction::Contact,
        MenuAction::Settings,
    ];

    fn key(self) -> &'static str {
        match self {
            MenuAction::Catalog => "menu-catalog",
            MenuAction::Cart => "menu-cart",
            MenuAction::Contact => "menu-contact",
            MenuAction::Settings => "menu-settings",
        }
    }

    /// Match a menu button label in any supported language
    pub fn from_text(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|action| matches_label(text, action.key()))
    }
}

/// Whether `text` is the localized label of `key` in any supported language
pub fn matches_label(text: &str, key: &str) -> bool {
    Language::ALL
        .iter()
        .any(|language| t_lang(key, Some(language.code())) == text)
}

fn callback(text: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, action.to_data())
}

/// Create the main menu reply keyboard
pub fn main_menu_keyboard(language: Language) -> KeyboardMarkup {
    let lang = Some(language.code());
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(t_lang("menu-catalog", lang))],
        vec![KeyboardButton::new(t_lang("menu-cart", lang))],
        vec![
            KeyboardButton::new(t_lang("menu-contact", lang)),
            KeyboardButton::new(t_lang("menu-settings", lang)),
        ],
    ])
    .resize_keyboard()
}

/// Create the language picker; `for_settings` switches to `new_lang_*` data
pub fn language_keyboard(for_settings: bool) -> InlineKeyboardMarkup {
    let action = |language| {
        if for_settings {
            CallbackAction::NewLanguage(language)
        } else {
            CallbackAction::Language(language)
        }
    };
    InlineKeyboardMarkup::new(vec![vec![
        callback("🇺🇿 O'zbek", action(Language::Uz)),
        callback("🇷🇺 Русский", action(Language::Ru)),
    ]])
}

/// Create a one-time keyboard with a single "share contact" button
pub fn contact_request_keyboard(language: Language) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(t_lang(
        "share-phone-button",
        Some(language.code()),
    ))
    .request(ButtonRequest::Contact)]])
    .resize_keyboard()
    .one_time_keyboard()
}

pub fn cancel_keyboard(language: Language) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(t_lang(
        "cancel-button",
        Some(language.code()),
    ))]])
    .resize_keyboard()
}

/// Keyboard offered after registration was cancelled
pub fn restart_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new("/start")]]).resize_keyboard()
}

/// Create the confirm/cancel keyboard shown with the order summary
pub fn confirm_order_keyboard(language: Language) -> KeyboardMarkup {
    let lang = Some(language.code());
    KeyboardMarkup::new(vec![vec![
        KeyboardButton::new(t_lang("confirm-button", lang)),
        KeyboardButton::new(t_lang("cancel-order-button", lang)),
    ]])
    .resize_keyboard()
}

/// Create a keyboard listing categories
///
/// `back` adds a trailing back button with the given target.
pub fn categories_keyboard(
    categories: &[Category],
    language: Language,
    back: Option<CallbackAction>,
) -> InlineKeyboardMarkup {
    let mut buttons: Vec<Vec<InlineKeyboardButton>> = categories
        .iter()
        .map(|category| {
            vec![callback(
                category.name(language),
                CallbackAction::Category(category.id),
            )]
        })
        .collect();

    if let Some(back) = back {
        buttons.push(vec![callback(
            t_lang("back-button", Some(language.code())),
            back,
        )]);
    }

    InlineKeyboardMarkup::new(buttons)
}

/// Where the back button of a category screen leads
pub fn category_back_target(category: &Category) -> CallbackAction {
    match category.parent_id {
        Some(parent_id) => CallbackAction::Category(parent_id),
        None => CallbackAction::BackToCategories,
    }
}

/// Create a keyboard listing the products of a category
pub fn products_keyboard(
    products: &[Product],
    language: Language,
    category_id: i64,
) -> InlineKeyboardMarkup {
    let mut buttons: Vec<Vec<InlineKeyboardButton>> = products
        .iter()
        .map(|product| {
            vec![callback(
                product.name(language),
                CallbackAction::Product {
                    product_id: product.id,
                    category_id: Some(category_id),
                },
            )]
        })
        .collect();

    buttons.push(vec![callback(
        t_lang("back-to-categories", Some(language.code())),
        CallbackAction::BackToCategories,
    )]);

    InlineKeyboardMarkup::new(buttons)
}

/// Create a keyboard with one button per color of a product
pub fn colors_keyboard(
    colors: &[Color],
    language: Language,
    product_id: i64,
    category_id: Option<i64>,
) -> InlineKeyboardMarkup {
    let lang = Some(language.code());
    let mut buttons: Vec<Vec<InlineKeyboardButton>> = colors
        .iter()
        .map(|color| {
            let price = format_price(color.price);
            let label = t_args_lang(
                "color-button",
                &[("color", color.name(language)), ("price", price.as_str())],
                lang,
            );
            vec![callback(
                label,
                CallbackAction::Color {
                    color_id: color.id,
                    product_id,
                    category_id,
                },
            )]
        })
        .collect();

    let back = match category_id {
        Some(category_id) => CallbackAction::BackToCategory(category_id),
        None => CallbackAction::BackToCategories,
    };
    buttons.push(vec![callback(t_lang("back-button", lang), back)]);

    InlineKeyboardMarkup::new(buttons)
}

pub fn add_to_cart_keyboard(
    color_id: i64,
    product_id: i64,
    category_id: Option<i64>,
    language: Language,
) -> InlineKeyboardMarkup {
    let lang = Some(language.code());
    InlineKeyboardMarkup::new(vec![
        vec![callback(
            t_lang("add-to-cart-button", lang),
            CallbackAction::AddToCart(color_id),
        )],
        vec![callback(
            t_lang("back-to-product", lang),
            CallbackAction::BackToProduct {
                product_id,
                category_id,
            },
        )],
    ])
}

/// Create the cart keyboard: one button per line, then clear and checkout
pub fn cart_keyboard(lines: &[CartLine], language: Language) -> InlineKeyboardMarkup {
    let lang = Some(language.code());
    let mut buttons: Vec<Vec<InlineKeyboardButton>> = lines
        .iter()
        .map(|line| {
            let quantity = line.quantity.to_string();
            let total = format_price(line.line_total());
            let label = t_args_lang(
                "cart-line-button",
                &[
                    ("product", line.product_name(language)),
                    ("color", line.color_name(language)),
                    ("quantity", quantity.as_str()),
                    ("total", total.as_str()),
                ],
                lang,
            );
            vec![callback(label, CallbackAction::CartItem(line.item_id))]
        })
        .collect();

    let total = format_price(cart_total(lines));
    buttons.push(vec![callback(
        t_lang("clear-cart-button", lang),
        CallbackAction::ClearCart,
    )]);
    buttons.push(vec![callback(
        t_args_lang("checkout-button", &[("total", total.as_str())], lang),
        CallbackAction::Checkout,
    )]);

    InlineKeyboardMarkup::new(buttons)
}

/// Create the -/quantity/+ keyboard of a single cart line
pub fn cart_item_keyboard(line: &CartLine, language: Language) -> InlineKeyboardMarkup {
    let lang = Some(language.code());
    InlineKeyboardMarkup::new(vec![
        vec![
            callback(
                "➖",
                CallbackAction::Quantity {
                    step: QuantityStep::Minus,
                    item_id: line.item_id,
                },
            ),
            callback(line.quantity.to_string(), CallbackAction::QuantityInfo),
            callback(
                "➕",
                CallbackAction::Quantity {
                    step: QuantityStep::Plus,
                    item_id: line.item_id,
                },
            ),
        ],
        vec![callback(
            t_lang("remove-button", lang),
            CallbackAction::Remove(line.item_id),
        )],
        vec![callback(t_lang("back-to-cart", lang), CallbackAction::ShowCart)],
    ])
}

pub fn settings_keyboard(language: Language) -> InlineKeyboardMarkup {
    let lang = Some(language.code());
    InlineKeyboardMarkup::new(vec![
        vec![callback(
            t_lang("change-language-button", lang),
            CallbackAction::ChangeLanguage,
        )],
        vec![callback(
            t_lang("change-phone-button", lang),
            CallbackAction::ChangePhone,
        )],
        vec![callback(
            t_lang("change-name-button", lang),
            CallbackAction::ChangeName,
        )],
    ])
}

/// Heading of a category's product list, or of an empty category (HTML)
pub fn format_category_listing(category: &Category, language: Language, empty: bool) -> String {
    let name = html::escape(category.name(language));
    let key = if empty {
        "category-empty"
    } else {
        "category-products"
    };
    t_args_lang(key, &[("category", name.as_str())], Some(language.code()))
}

/// Format product name and description (HTML)
pub fn format_product_details(product: &Product, language: Language) -> String {
    let lang = Some(language.code());
    let description = product
        .description(language)
        .filter(|d| !d.trim().is_empty())
        .map(html::escape)
        .unwrap_or_else(|| t_lang("no-description", lang));
    let name = html::escape(product.name(language));

    t_args_lang(
        "product-details",
        &[("name", name.as_str()), ("description", description.as_str())],
        lang,
    )
}

/// Format a color with its product and price (HTML)
pub fn format_color_details(product: &Product, color: &Color, language: Language) -> String {
    let product_name = html::escape(product.name(language));
    let color_name = html::escape(color.name(language));
    let price = format_price(color.price);

    t_args_lang(
        "color-details",
        &[
            ("product", product_name.as_str()),
            ("color", color_name.as_str()),
            ("price", price.as_str()),
        ],
        Some(language.code()),
    )
}

/// Format a cart line with unit price, quantity and line total (HTML)
pub fn format_cart_item(line: &CartLine, language: Language) -> String {
    let product_name = html::escape(line.product_name(language));
    let color_name = html::escape(line.color_name(language));
    let price = format_price(line.price);
    let quantity = line.quantity.to_string();
    let total = format_price(line.line_total());

    t_args_lang(
        "cart-item-details",
        &[
            ("product", product_name.as_str()),
            ("color", color_name.as_str()),
            ("price", price.as_str()),
            ("quantity", quantity.as_str()),
            ("total", total.as_str()),
        ],
        Some(language.code()),
    )
}

/// Format the profile shown on the settings screen (HTML)
pub fn format_settings(user: &User) -> String {
    let lang = Some(user.language.code());
    let not_set = t_lang("not-set", lang);
    let name = if user.first_name.trim().is_empty() {
        not_set.clone()
    } else {
        html::escape(&user.first_name)
    };
    let phone = user
        .phone_number
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(html::escape)
        .unwrap_or(not_set);
    let language = t_lang("language-name", lang);
    let telegram_id = user.telegram_id.to_string();

    t_args_lang(
        "settings",
        &[
            ("name", name.as_str()),
            ("phone", phone.as_str()),
            ("language", language.as_str()),
            ("telegram_id", telegram_id.as_str()),
        ],
        lang,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn cart_line(item_id: i64, quantity: i32) -> CartLine {
        CartLine {
            item_id,
            cart_id: 1,
            quantity,
            color_id: 2,
            color_name_uz: "Qora".to_string(),
            color_name_ru: "Черный".to_string(),
            color_is_active: true,
            price: dec!(1200000.00),
            product_id: 3,
            product_name_uz: "iPhone 14".to_string(),
            product_name_ru: "Айфон 14".to_string(),
            product_main_image: None,
        }
    }

    fn category(id: i64, parent_id: Option<i64>) -> Category {
        Category {
            id,
            name_uz: format!("Kategoriya {id}"),
            name_ru: format!("Категория {id}"),
            parent_id,
            image: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn callback_data(button: &InlineKeyboardButton) -> Option<&str> {
        match &button.kind {
            teloxide::types::InlineKeyboardButtonKind::CallbackData(data) => Some(data.as_str()),
            _ => None,
        }
    }

    #[test]
    fn test_menu_action_matches_both_languages() {
        assert_eq!(MenuAction::from_text("🛒 Savatcha"), Some(MenuAction::Cart));
        assert_eq!(MenuAction::from_text("🛒 Корзина"), Some(MenuAction::Cart));
        assert_eq!(MenuAction::from_text("⚙️ Настройки"), Some(MenuAction::Settings));
        assert_eq!(MenuAction::from_text("hello"), None);
    }

    #[test]
    fn test_cart_keyboard_layout() {
        let lines = vec![cart_line(10, 2), cart_line(11, 1)];
        let keyboard = cart_keyboard(&lines, Language::Uz);

        assert_eq!(keyboard.inline_keyboard.len(), 4);
        assert_eq!(callback_data(&keyboard.inline_keyboard[0][0]), Some("cartitem_10"));
        assert_eq!(
            keyboard.inline_keyboard[0][0].text,
            "iPhone 14 (Qora) x 2 - 2,400,000"
        );
        assert_eq!(callback_data(&keyboard.inline_keyboard[2][0]), Some("clearcart"));
        assert_eq!(callback_data(&keyboard.inline_keyboard[3][0]), Some("checkout"));
        assert!(keyboard.inline_keyboard[3][0].text.contains("3,600,000"));
    }

    #[test]
    fn test_cart_item_keyboard_layout() {
        let keyboard = cart_item_keyboard(&cart_line(10, 3), Language::Ru);
        let row = &keyboard.inline_keyboard[0];
        assert_eq!(callback_data(&row[0]), Some("quantity_minus_10"));
        assert_eq!(row[1].text, "3");
        assert_eq!(callback_data(&row[2]), Some("quantity_plus_10"));
        assert_eq!(callback_data(&keyboard.inline_keyboard[1][0]), Some("remove_10"));
        assert_eq!(callback_data(&keyboard.inline_keyboard[2][0]), Some("show_cart"));
    }

    #[test]
    fn test_category_back_targets() {
        assert_eq!(category_back_target(&category(1, None)), CallbackAction::BackToCategories);
        assert_eq!(category_back_target(&category(2, Some(1))), CallbackAction::Category(1));

        let keyboard = categories_keyboard(
            &[category(3, Some(2))],
            Language::Ru,
            Some(CallbackAction::Category(1)),
        );
        assert_eq!(keyboard.inline_keyboard[0][0].text, "Категория 3");
        assert_eq!(callback_data(&keyboard.inline_keyboard[1][0]), Some("category_1"));
    }

    #[test]
    fn test_language_keyboard_data() {
        let registration = language_keyboard(false);
        assert_eq!(callback_data(&registration.inline_keyboard[0][0]), Some("lang_uz"));
        let settings = language_keyboard(true);
        assert_eq!(callback_data(&settings.inline_keyboard[0][1]), Some("new_lang_ru"));
    }

    #[test]
    fn test_category_listing_escapes_html() {
        let mut phones = category(4, None);
        phones.name_uz = "Phones & <Tablets>".to_string();

        let text = format_category_listing(&phones, Language::Uz, false);
        assert_eq!(text, "Phones &amp; &lt;Tablets&gt; → Mahsulotlar:");

        let text = format_category_listing(&phones, Language::Uz, true);
        assert!(text.starts_with("Phones &amp; &lt;Tablets&gt; → "));
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_cart_item_text_escapes_html() {
        let mut line = cart_line(1, 2);
        line.product_name_uz = "<Chexol & plyonka>".to_string();
        let text = format_cart_item(&line, Language::Uz);
        assert!(text.contains("&lt;Chexol &amp; plyonka&gt;"));
        assert!(text.contains("2,400,000"));
    }
}
