//! Callback Data module for the compact strings carried by inline buttons
//!
//! Telegram limits callback data to 64 bytes, so actions are encoded as
//! underscore-separated tokens. A missing category is written as `0`.

use crate::models::Language;

/// Direction of a quantity button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityStep {
    Minus,
    Plus,
}

impl QuantityStep {
    pub fn delta(self) -> i32 {
        match self {
            QuantityStep::Minus => -1,
            QuantityStep::Plus => 1,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            QuantityStep::Minus => "minus",
            QuantityStep::Plus => "plus",
        }
    }
}

/// Every action an inline button can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Registration language choice
    Language(Language),
    Category(i64),
    BackToCategories,
    Product {
        product_id: i64,
        category_id: Option<i64>,
    },
    Color {
        color_id: i64,
        product_id: i64,
        category_id: Option<i64>,
    },
    AddToCart(i64),
    BackToCategory(i64),
    BackToProduct {
        product_id: i64,
        category_id: Option<i64>,
    },
    ShowCart,
    CartItem(i64),
    Quantity {
        step: QuantityStep,
        item_id: i64,
    },
    /// The non-interactive counter between the -/+ buttons
    QuantityInfo,
    Remove(i64),
    ClearCart,
    Checkout,
    ChangeLanguage,
    NewLanguage(Language),
    ChangePhone,
    ChangeName,
}

fn parse_id(token: &str) -> Option<i64> {
    token.parse().ok().filter(|id: &i64| *id > 0)
}

fn parse_category(token: Option<&str>) -> Option<Option<i64>> {
    match token {
        None | Some("0") => Some(None),
        Some(token) => parse_id(token).map(Some),
    }
}

fn category_token(category_id: Option<i64>) -> i64 {
    category_id.unwrap_or(0)
}

impl CallbackAction {
    /// Parse callback data; unknown or malformed data yields `None`
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "back_to_categories" => return Some(Self::BackToCategories),
            "show_cart" => return Some(Self::ShowCart),
            "quantity_info" => return Some(Self::QuantityInfo),
            "clearcart" => return Some(Self::ClearCart),
            "checkout" => return Some(Self::Checkout),
            "change_lang" => return Some(Self::ChangeLanguage),
            "change_phone" => return Some(Self::ChangePhone),
            "change_name" => return Some(Self::ChangeName),
            _ => {}
        }

        // Longer prefixes first: "back_to_category_" vs "category_", "new_lang_" vs "lang_"
        if let Some(rest) = data.strip_prefix("back_to_category_") {
            return parse_id(rest).map(Self::BackToCategory);
        }
        if let Some(rest) = data.strip_prefix("back_to_product_") {
            let mut tokens = rest.split('_');
            let product_id = parse_id(tokens.next()?)?;
            let category_id = parse_category(tokens.next())?;
            return tokens.next().is_none().then_some(Self::BackToProduct {
                product_id,
                category_id,
            });
        }
        if let Some(rest) = data.strip_prefix("add_to_cart_") {
            return parse_id(rest).map(Self::AddToCart);
        }
        if let Some(rest) = data.strip_prefix("new_lang_") {
            return rest.parse().ok().map(Self::NewLanguage);
        }
        if let Some(rest) = data.strip_prefix("lang_") {
            return rest.parse().ok().map(Self::Language);
        }
        if let Some(rest) = data.strip_prefix("category_") {
            return parse_id(rest).map(Self::Category);
        }
        if let Some(rest) = data.strip_prefix("product_") {
            let mut tokens = rest.split('_');
            let product_id = parse_id(tokens.next()?)?;
            let category_id = parse_category(tokens.next())?;
            return tokens.next().is_none().then_some(Self::Product {
                product_id,
                category_id,
            });
        }
        if let Some(rest) = data.strip_prefix("color_") {
            let mut tokens = rest.split('_');
            let color_id = parse_id(tokens.next()?)?;
            let product_id = parse_id(tokens.next()?)?;
            let category_id = parse_category(tokens.next())?;
            return tokens.next().is_none().then_some(Self::Color {
                color_id,
                product_id,
                category_id,
            });
        }
        if let Some(rest) = data.strip_prefix("cartitem_") {
            return parse_id(rest).map(Self::CartItem);
        }
        if let Some(rest) = data.strip_prefix("quantity_") {
            let (step, id) = rest.split_once('_')?;
            let step = match step {
                "minus" => QuantityStep::Minus,
                "plus" => QuantityStep::Plus,
                _ => return None,
            };
            return parse_id(id).map(|item_id| Self::Quantity { step, item_id });
        }
        if let Some(rest) = data.strip_prefix("remove_") {
            return parse_id(rest).map(Self::Remove);
        }

        None
    }

    /// Encode the action as callback data
    pub fn to_data(&self) -> String {
        match *self {
            Self::Language(language) => format!("lang_{language}"),
            Self::Category(id) => format!("category_{id}"),
            Self::BackToCategories => "back_to_categories".to_string(),
            Self::Product {
                product_id,
                category_id,
            } => format!("product_{product_id}_{}", category_token(category_id)),
            Self::Color {
                color_id,
                product_id,
                category_id,
            } => format!(
                "color_{color_id}_{product_id}_{}",
                category_token(category_id)
            ),
            Self::AddToCart(color_id) => format!("add_to_cart_{color_id}"),
            Self::BackToCategory(id) => format!("back_to_category_{id}"),
            Self::BackToProduct {
                product_id,
                category_id,
            } => format!("back_to_product_{product_id}_{}", category_token(category_id)),
            Self::ShowCart => "show_cart".to_string(),
            Self::CartItem(id) => format!("cartitem_{id}"),
            Self::Quantity { step, item_id } => format!("quantity_{}_{item_id}", step.as_str()),
            Self::QuantityInfo => "quantity_info".to_string(),
            Self::Remove(id) => format!("remove_{id}"),
            Self::ClearCart => "clearcart".to_string(),
            Self::Checkout => "checkout".to_string(),
            Self::ChangeLanguage => "change_lang".to_string(),
            Self::NewLanguage(language) => format!("new_lang_{language}"),
            Self::ChangePhone => "change_phone".to_string(),
            Self::ChangeName => "change_name".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalog_actions() {
        assert_eq!(CallbackAction::parse("category_12"), Some(CallbackAction::Category(12)));
        assert_eq!(
            CallbackAction::parse("product_5_12"),
            Some(CallbackAction::Product {
                product_id: 5,
                category_id: Some(12)
            })
        );
        assert_eq!(
            CallbackAction::parse("color_7_5_0"),
            Some(CallbackAction::Color {
                color_id: 7,
                product_id: 5,
                category_id: None
            })
        );
        assert_eq!(CallbackAction::parse("add_to_cart_7"), Some(CallbackAction::AddToCart(7)));
        assert_eq!(
            CallbackAction::parse("back_to_category_12"),
            Some(CallbackAction::BackToCategory(12))
        );
        assert_eq!(
            CallbackAction::parse("back_to_product_5_12"),
            Some(CallbackAction::BackToProduct {
                product_id: 5,
                category_id: Some(12)
            })
        );
    }

    #[test]
    fn test_parse_cart_actions() {
        assert_eq!(CallbackAction::parse("cartitem_3"), Some(CallbackAction::CartItem(3)));
        assert_eq!(
            CallbackAction::parse("quantity_minus_3"),
            Some(CallbackAction::Quantity {
                step: QuantityStep::Minus,
                item_id: 3
            })
        );
        assert_eq!(CallbackAction::parse("remove_3"), Some(CallbackAction::Remove(3)));
        assert_eq!(CallbackAction::parse("clearcart"), Some(CallbackAction::ClearCart));
        assert_eq!(CallbackAction::parse("checkout"), Some(CallbackAction::Checkout));
        assert_eq!(CallbackAction::parse("quantity_info"), Some(CallbackAction::QuantityInfo));
    }

    #[test]
    fn test_language_prefixes_do_not_collide() {
        assert_eq!(
            CallbackAction::parse("lang_ru"),
            Some(CallbackAction::Language(Language::Ru))
        );
        assert_eq!(
            CallbackAction::parse("new_lang_uz"),
            Some(CallbackAction::NewLanguage(Language::Uz))
        );
        assert_eq!(CallbackAction::parse("change_lang"), Some(CallbackAction::ChangeLanguage));
        assert_eq!(CallbackAction::parse("lang_en"), None);
    }

    #[test]
    fn test_malformed_data_is_rejected() {
        assert_eq!(CallbackAction::parse(""), None);
        assert_eq!(CallbackAction::parse("category_abc"), None);
        assert_eq!(CallbackAction::parse("category_-1"), None);
        assert_eq!(CallbackAction::parse("quantity_double_3"), None);
        assert_eq!(CallbackAction::parse("product_5_12_9"), None);
        assert_eq!(CallbackAction::parse("color_7"), None);
    }

    #[test]
    fn test_encoding_matches_parsing() {
        let actions = [
            CallbackAction::Product {
                product_id: 5,
                category_id: None,
            },
            CallbackAction::Quantity {
                step: QuantityStep::Plus,
                item_id: 9,
            },
            CallbackAction::NewLanguage(Language::Ru),
            CallbackAction::BackToCategories,
        ];
        for action in actions {
            assert_eq!(CallbackAction::parse(&action.to_data()), Some(action));
        }
        assert_eq!(
            CallbackAction::Product {
                product_id: 5,
                category_id: None
            }
            .to_data(),
            "product_5_0"
        );
    }

    #[test]
    fn test_quantity_step_delta() {
        assert_eq!(QuantityStep::Minus.delta(), -1);
        assert_eq!(QuantityStep::Plus.delta(), 1);
    }
}
