use anyhow::Result;

use storefront::bot::callback_data::CallbackAction;
use storefront::dialogue::{
    checkout_step, validate_address, validate_name, validate_phone_number,
    validate_typed_phone_number, CheckoutInput, CheckoutStep, ShopDialogueState,
};
use storefront::models::Language;

/// Integration test for registration input validation
#[tokio::test]
async fn test_registration_validation() -> Result<()> {
    // Test valid inputs
    assert!(validate_name("Sardor").is_ok());
    assert_eq!(validate_typed_phone_number("+998 90 123 45 67").unwrap(), "+998901234567");

    // Test invalid inputs
    assert!(validate_name("S").is_err());
    assert_eq!(validate_typed_phone_number("998901234567"), Err("missing_plus"));
    assert_eq!(validate_phone_number("call me"), Err("invalid_format"));

    Ok(())
}

/// Test dialogue state serialization
#[tokio::test]
async fn test_dialogue_state_serialization() -> Result<()> {
    let state = ShopDialogueState::ConfirmOrder {
        address: "Toshkent, Yunusobod 4".to_string(),
    };

    let json = serde_json::to_string(&state)?;
    let restored: ShopDialogueState = serde_json::from_str(&json)?;
    assert_eq!(restored, state);

    let state = ShopDialogueState::WaitingForName {
        language: Language::Ru,
        phone_number: "+998901234567".to_string(),
    };
    match serde_json::from_str::<ShopDialogueState>(&serde_json::to_string(&state)?)? {
        ShopDialogueState::WaitingForName { language, .. } => assert_eq!(language, Language::Ru),
        _ => panic!("Unexpected dialogue state"),
    }

    Ok(())
}

/// Test basic dialogue functionality
#[tokio::test]
async fn test_dialogue_default_state() -> Result<()> {
    let default_state = ShopDialogueState::default();
    assert!(matches!(default_state, ShopDialogueState::Start));

    Ok(())
}

/// Unit test for delivery address validation
#[test]
fn test_address_validation() {
    assert_eq!(validate_address("  Samarqand, Registon 1 ").unwrap(), "Samarqand, Registon 1");
    assert_eq!(validate_address("\n\t"), Err("empty"));

    // Limit counts characters, not bytes
    assert!(validate_address(&"ш".repeat(500)).is_ok());
    assert_eq!(validate_address(&"ш".repeat(501)), Err("too_long"));
}

/// Checkout entry and catalog navigation callbacks
#[test]
fn test_checkout_callback_data() {
    assert_eq!(CallbackAction::parse("checkout"), Some(CallbackAction::Checkout));
    assert_eq!(CallbackAction::Checkout.to_data(), "checkout");
    assert_eq!(
        CallbackAction::parse("product_12_0"),
        Some(CallbackAction::Product {
            product_id: 12,
            category_id: None
        })
    );
    assert_eq!(CallbackAction::parse("checkout_now"), None);
}

/// Address entry: bad input keeps the state, a valid address moves to confirmation
#[test]
fn test_checkout_address_step() {
    let state = ShopDialogueState::WaitingForAddress;

    let step = checkout_step(&state, CheckoutInput::Text("   "), true).unwrap();
    assert_eq!(step.reply_key(), "address-empty");
    assert_eq!(step.next_state(&state), Some(ShopDialogueState::WaitingForAddress));

    let long = "a".repeat(501);
    let step = checkout_step(&state, CheckoutInput::Text(&long), true).unwrap();
    assert_eq!(step.reply_key(), "address-too-long");
    assert_eq!(step.next_state(&state), Some(ShopDialogueState::WaitingForAddress));

    let step = checkout_step(&state, CheckoutInput::Text(" Chilonzor 9 "), true).unwrap();
    assert_eq!(
        step,
        CheckoutStep::Confirm {
            address: "Chilonzor 9".to_string()
        }
    );
    assert_eq!(
        step.next_state(&state),
        Some(ShopDialogueState::ConfirmOrder {
            address: "Chilonzor 9".to_string()
        })
    );
}

/// A cart emptied before the address arrives ends the dialogue
#[test]
fn test_checkout_address_with_empty_cart() {
    let state = ShopDialogueState::WaitingForAddress;

    let step = checkout_step(&state, CheckoutInput::Text("Chilonzor 9"), false).unwrap();
    assert_eq!(step, CheckoutStep::Exit { reply: "cart-empty" });
    assert_eq!(step.next_state(&state), None);

    let step = checkout_step(&state, CheckoutInput::Cancel, true).unwrap();
    assert_eq!(step.reply_key(), "order-cancelled");
    assert_eq!(step.next_state(&state), None);
}

/// Confirmation: confirm places the order, cancel exits, other text re-prompts
#[test]
fn test_checkout_confirmation_step() {
    let state = ShopDialogueState::ConfirmOrder {
        address: "Chilonzor 9".to_string(),
    };

    let step = checkout_step(&state, CheckoutInput::Text("maybe later"), true).unwrap();
    assert_eq!(step.reply_key(), "choose-button");
    assert_eq!(step.next_state(&state), Some(state.clone()));

    let step = checkout_step(&state, CheckoutInput::Cancel, true).unwrap();
    assert_eq!(step, CheckoutStep::Exit { reply: "order-cancelled" });
    assert_eq!(step.next_state(&state), None);

    let step = checkout_step(&state, CheckoutInput::Confirm, true).unwrap();
    assert_eq!(
        step,
        CheckoutStep::PlaceOrder {
            address: "Chilonzor 9".to_string()
        }
    );
    assert_eq!(step.reply_key(), "order-created");
    assert_eq!(step.next_state(&state), None);
}

/// A cart that vanished before confirmation ends the dialogue with an error
#[test]
fn test_checkout_confirmation_with_vanished_cart() {
    let state = ShopDialogueState::ConfirmOrder {
        address: "Chilonzor 9".to_string(),
    };

    let step = checkout_step(&state, CheckoutInput::Confirm, false).unwrap();
    assert_eq!(step, CheckoutStep::Exit { reply: "order-failed" });
    assert_eq!(step.next_state(&state), None);
}

/// Other dialogue states are not part of checkout
#[test]
fn test_checkout_step_outside_checkout() {
    assert_eq!(
        checkout_step(&ShopDialogueState::Start, CheckoutInput::Confirm, true),
        None
    );
    assert_eq!(
        checkout_step(
            &ShopDialogueState::WaitingForNewName,
            CheckoutInput::Text("Aziz"),
            true
        ),
        None
    );
}
