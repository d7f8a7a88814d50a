//! # Localization Tests
//!
//! This module contains unit tests for the localization functionality,
//! testing message retrieval and formatting in both shop languages.

use std::collections::HashMap;
use storefront::localization::{
    detect_language, t_args_lang, t_lang, LocalizationManager, SUPPORTED_LANGUAGES,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_localization() -> LocalizationManager {
        // Create a new localization manager for each test
        LocalizationManager::new().expect("Failed to create localization manager")
    }

    #[test]
    fn test_get_message_existing_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("cart-empty", "uz", None);
        assert_eq!(message, "Sizning savatchangiz bo'sh.");

        let message = manager.get_message_in_language("cart-empty", "ru", None);
        assert_eq!(message, "Ваша корзина пуста.");
    }

    #[test]
    fn test_get_message_nonexistent_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("nonexistent-key", "ru", None);
        assert_eq!(message, "nonexistent-key");
    }

    #[test]
    fn test_get_message_unsupported_language() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("cart-empty", "en", None);
        // Should fall back to Uzbek
        assert_eq!(message, "Sizning savatchangiz bo'sh.");
    }

    #[test]
    fn test_get_message_with_args() {
        let manager = setup_localization();

        let mut args = HashMap::new();
        args.insert("order_id", "1024");

        let message = manager.get_message_in_language("order-created", "ru", Some(&args));
        assert!(message.contains("Номер заказа: 1024"));
    }

    #[test]
    fn test_every_supported_language_has_menu_labels() {
        let manager = setup_localization();

        for language in SUPPORTED_LANGUAGES {
            for key in ["menu-catalog", "menu-cart", "menu-contact", "menu-settings"] {
                assert!(
                    manager.has_message(key, language),
                    "{key} missing for {language}"
                );
            }
        }
    }

    #[test]
    fn test_global_helpers() {
        let message = t_args_lang("checkout-button", &[("total", "2,400,000")], Some("uz"));
        assert_eq!(message, "🛒 Buyurtma berish (2,400,000 so'm)");

        let message = t_args_lang("address-too-long", &[("max", "500")], Some("ru"));
        assert!(message.contains("500"));

        assert_eq!(t_lang("cart-empty", None), "Sizning savatchangiz bo'sh.");
    }

    #[test]
    fn test_detect_language_from_telegram_codes() {
        assert_eq!(detect_language(Some("ru-RU")), "ru");
        assert_eq!(detect_language(Some("uz")), "uz");
        assert_eq!(detect_language(Some("en")), "uz");
        assert_eq!(detect_language(None), "uz");
    }
}
