use std::fmt;

use uuid::Uuid;

/// Typed form of an inline button's callback payload.
///
/// `Display` renders the wire string and [`CallbackAction::parse`] reads it back; the wire
/// strings are what already-sent buttons carry, so they must stay stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Verify(String),
    Buy(i64),
    CustomAmount,
    CheckSubscription,
    ShowMenu,
    ReadyToOrder,
    Showcase,
    ContactAdmin,
    RequestCompletion(Uuid),
    ConfirmCompletion { order_id: Uuid, message_id: i32 },
    Cancel,
    AlreadyCompleted,
    ConfirmStars { user_id: i64, amount: i64 },
    Unknown(String),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Self {
        match data {
            "custom_amount" => return CallbackAction::CustomAmount,
            "check_subscription" => return CallbackAction::CheckSubscription,
            "verified_start" => return CallbackAction::ShowMenu,
            "check_order_time" => return CallbackAction::ReadyToOrder,
            "watch_warning" => return CallbackAction::Showcase,
            "contact_admin" => return CallbackAction::ContactAdmin,
            "cancel" => return CallbackAction::Cancel,
            "already_completed" => return CallbackAction::AlreadyCompleted,
            _ => {}
        }

        let parsed = if let Some(emoji) = data.strip_prefix("verify_") {
            (!emoji.is_empty()).then(|| CallbackAction::Verify(emoji.to_string()))
        } else if let Some(amount) = data.strip_prefix("buy_") {
            amount.parse().ok().map(CallbackAction::Buy)
        } else if let Some(rest) = data.strip_prefix("confirmComplete_") {
            rest.split_once('_').and_then(|(order, message)| {
                Some(CallbackAction::ConfirmCompletion {
                    order_id: Uuid::parse_str(order).ok()?,
                    message_id: message.parse().ok()?,
                })
            })
        } else if let Some(order) = data.strip_prefix("complete_") {
            Uuid::parse_str(order).ok().map(CallbackAction::RequestCompletion)
        } else if let Some(rest) = data.strip_prefix("confirm_stars_") {
            rest.split_once('_').and_then(|(user, amount)| {
                Some(CallbackAction::ConfirmStars {
                    user_id: user.parse().ok()?,
                    amount: amount.parse().ok()?,
                })
            })
        } else {
            None
        };

        parsed.unwrap_or_else(|| CallbackAction::Unknown(data.to_string()))
    }

    /// Operator-only controls, honoured solely for configured operator ids.
    pub fn is_operator_action(&self) -> bool {
        matches!(
            self,
            CallbackAction::RequestCompletion(_)
                | CallbackAction::ConfirmCompletion { .. }
                | CallbackAction::ConfirmStars { .. }
        )
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Order ids use the 32-char simple form to stay inside the 64-byte payload limit.
        match self {
            CallbackAction::Verify(emoji) => write!(f, "verify_{emoji}"),
            CallbackAction::Buy(n) => write!(f, "buy_{n}"),
            CallbackAction::CustomAmount => f.write_str("custom_amount"),
            CallbackAction::CheckSubscription => f.write_str("check_subscription"),
            CallbackAction::ShowMenu => f.write_str("verified_start"),
            CallbackAction::ReadyToOrder => f.write_str("check_order_time"),
            CallbackAction::Showcase => f.write_str("watch_warning"),
            CallbackAction::ContactAdmin => f.write_str("contact_admin"),
            CallbackAction::RequestCompletion(id) => write!(f, "complete_{}", id.simple()),
            CallbackAction::ConfirmCompletion {
                order_id,
                message_id,
            } => write!(f, "confirmComplete_{}_{}", order_id.simple(), message_id),
            CallbackAction::Cancel => f.write_str("cancel"),
            CallbackAction::AlreadyCompleted => f.write_str("already_completed"),
            CallbackAction::ConfirmStars { user_id, amount } => {
                write!(f, "confirm_stars_{user_id}_{amount}")
            }
            CallbackAction::Unknown(raw) => f.write_str(raw),
        }
    }
}
