//! Shop dialogue module for handling conversation state with users.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

use crate::models::Language;

pub use crate::checkout::validate_address;

/// Represents the conversation state of a chat
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ShopDialogueState {
    #[default]
    Start,
    /// Language picked, waiting for a shared contact or a typed number
    WaitingForContact {
        language: Language,
    },
    WaitingForName {
        language: Language,
        phone_number: String,
    },
    /// Checkout started from the cart
    WaitingForAddress,
    ConfirmOrder {
        address: String,
    },
    WaitingForNewPhone,
    WaitingForNewName,
}

/// Type alias for our shop dialogue
pub type ShopDialogue = Dialogue<ShopDialogueState, InMemStorage<ShopDialogueState>>;

lazy_static! {
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?\d{7,15}$").unwrap();
}

/// Validates a user name input
pub fn validate_name(name: &str) -> Result<String, &'static str> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err("empty");
    }

    let length = trimmed.chars().count();
    if length < 2 {
        return Err("too_short");
    }

    if length > 100 {
        return Err("too_long");
    }

    Ok(trimmed.to_string())
}

/// Validates a phone number, either shared as a contact or typed
///
/// Spaces, dashes and parentheses are dropped before matching.
pub fn validate_phone_number(phone: &str) -> Result<String, &'static str> {
    let normalized: String = phone
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    if normalized.is_empty() {
        return Err("empty");
    }

    if !PHONE_REGEX.is_match(&normalized) {
        return Err("invalid_format");
    }

    Ok(normalized)
}

/// Validates a phone number typed as text; it must start with `+`
pub fn validate_typed_phone_number(text: &str) -> Result<String, &'static str> {
    if !text.trim_start().starts_with('+') {
        return Err("missing_plus");
    }
    validate_phone_number(text)
}

/// A message received while checking out, classified by the confirm keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutInput<'a> {
    Confirm,
    Cancel,
    Text(&'a str),
}

/// What to do with a message received while checking out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutStep {
    /// Answer with `reply` and keep waiting in the same state
    Stay { reply: &'static str },
    /// Address accepted: show the order summary and wait for confirmation
    Confirm { address: String },
    /// Create the order for `address`, then leave the dialogue
    PlaceOrder { address: String },
    /// Answer with `reply` and leave the dialogue
    Exit { reply: &'static str },
}

impl CheckoutStep {
    /// State after this step; `None` leaves the dialogue
    pub fn next_state(&self, current: &ShopDialogueState) -> Option<ShopDialogueState> {
        match self {
            CheckoutStep::Stay { .. } => Some(current.clone()),
            CheckoutStep::Confirm { address } => Some(ShopDialogueState::ConfirmOrder {
                address: address.clone(),
            }),
            CheckoutStep::PlaceOrder { .. } | CheckoutStep::Exit { .. } => None,
        }
    }

    /// Localization key of the reply
    pub fn reply_key(&self) -> &'static str {
        match self {
            CheckoutStep::Stay { reply } | CheckoutStep::Exit { reply } => reply,
            CheckoutStep::Confirm { .. } => "order-summary",
            CheckoutStep::PlaceOrder { .. } => "order-created",
        }
    }
}

/// Decide the next checkout step
///
/// Returns `None` outside of the address and confirmation states.
/// `cart_has_lines` reflects the user's active cart when the message arrived.
pub fn checkout_step(
    state: &ShopDialogueState,
    input: CheckoutInput<'_>,
    cart_has_lines: bool,
) -> Option<CheckoutStep> {
    let step = match state {
        ShopDialogueState::WaitingForAddress => match input {
            CheckoutInput::Cancel => CheckoutStep::Exit {
                reply: "order-cancelled",
            },
            CheckoutInput::Confirm => CheckoutStep::Stay {
                reply: "enter-address",
            },
            CheckoutInput::Text(text) => match validate_address(text) {
                Err("too_long") => CheckoutStep::Stay {
                    reply: "address-too-long",
                },
                Err(_) => CheckoutStep::Stay {
                    reply: "address-empty",
                },
                Ok(_) if !cart_has_lines => CheckoutStep::Exit {
                    reply: "cart-empty",
                },
                Ok(address) => CheckoutStep::Confirm { address },
            },
        },
        ShopDialogueState::ConfirmOrder { address } => match input {
            CheckoutInput::Cancel => CheckoutStep::Exit {
                reply: "order-cancelled",
            },
            CheckoutInput::Text(_) => CheckoutStep::Stay {
                reply: "choose-button",
            },
            CheckoutInput::Confirm if !cart_has_lines => CheckoutStep::Exit {
                reply: "order-failed",
            },
            CheckoutInput::Confirm => CheckoutStep::PlaceOrder {
                address: address.clone(),
            },
        },
        _ => return None,
    };
    Some(step)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_validation() {
        // Valid names
        assert!(validate_name("Ali").is_ok());
        assert!(validate_name("  Алишер  ").is_ok());

        // Invalid names
        assert_eq!(validate_name(""), Err("empty"));
        assert_eq!(validate_name("   "), Err("empty"));
        assert_eq!(validate_name("A"), Err("too_short"));
        assert_eq!(validate_name(&"a".repeat(101)), Err("too_long"));
    }

    #[test]
    fn test_name_trimming() {
        let result = validate_name("  Dilnoza  ");
        assert_eq!(result.unwrap(), "Dilnoza");
    }

    #[test]
    fn test_phone_validation() {
        assert_eq!(validate_phone_number("+998 90 123-45-67").unwrap(), "+998901234567");
        assert_eq!(validate_phone_number("998901234567").unwrap(), "998901234567");
        assert_eq!(validate_phone_number(""), Err("empty"));
        assert_eq!(validate_phone_number("+99890abc"), Err("invalid_format"));
        assert_eq!(validate_phone_number("+123"), Err("invalid_format"));
    }

    #[test]
    fn test_typed_phone_requires_plus() {
        assert!(validate_typed_phone_number("+998901234567").is_ok());
        assert_eq!(validate_typed_phone_number("998901234567"), Err("missing_plus"));
        assert_eq!(validate_typed_phone_number("hello"), Err("missing_plus"));
    }

    #[test]
    fn test_default_state_is_start() {
        assert_eq!(ShopDialogueState::default(), ShopDialogueState::Start);
    }
}
