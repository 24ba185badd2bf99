use uuid::Uuid;

use crate::bot::callback_data::CallbackAction;
use crate::bot::texts;
use crate::config::Config;

/// What a button does when tapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Callback(String),
    Url(String),
    WebApp(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn callback(text: impl Into<String>, action: CallbackAction) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Callback(action.to_string()),
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Url(url.into()),
        }
    }

    pub fn web_app(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::WebApp(url.into()),
        }
    }
}

pub type InlineKeyboard = Vec<Vec<Button>>;

/// Reply markup attached to an outbound message, independent of the platform client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    Inline(InlineKeyboard),
    /// One-time custom keyboard with a single "share phone number" button.
    RequestContact(String),
    ForceReply,
    RemoveKeyboard,
}

#[cfg(test)]
impl Markup {
    /// Every callback payload carried by this markup, in button order.
    pub fn callback_data(&self) -> Vec<&str> {
        match self {
            Markup::Inline(rows) => rows
                .iter()
                .flatten()
                .filter_map(|b| match &b.action {
                    ButtonAction::Callback(data) => Some(data.as_str()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

pub fn contact_request() -> Markup {
    Markup::RequestContact(texts::SHARE_PHONE_BUTTON.to_string())
}

pub fn challenge_keyboard(candidates: &[String]) -> Markup {
    Markup::Inline(vec![
        candidates
            .iter()
            .map(|emoji| Button::callback(emoji.clone(), CallbackAction::Verify(emoji.clone())))
            .collect(),
    ])
}

pub fn verified_keyboard() -> Markup {
    Markup::Inline(vec![vec![Button::callback("🚀 Start", CallbackAction::ShowMenu)]])
}

pub fn welcome_menu(config: &Config) -> Markup {
    Markup::Inline(vec![
        vec![Button::callback("🚀 Browse the showcase", CallbackAction::Showcase)],
        vec![Button::callback("🚀 Place an order", CallbackAction::ReadyToOrder)],
        vec![Button::url("Join the proofs channel", &config.proofs_channel_url)],
    ])
}

/// Join prompt. Without a public channel link only the re-check button is shown.
pub fn join_channel(channel_link: Option<String>) -> Markup {
    let mut rows = Vec::new();
    if let Some(link) = channel_link {
        rows.push(vec![Button::url("Join the channel", link)]);
    }
    rows.push(vec![Button::callback(
        "✅ I have joined",
        CallbackAction::CheckSubscription,
    )]);
    Markup::Inline(rows)
}

pub const SHOP_DENOMINATIONS: [i64; 3] = [15, 25, 50];

pub fn shop_keyboard() -> Markup {
    let mut rows: InlineKeyboard = SHOP_DENOMINATIONS
        .iter()
        .map(|&n| vec![Button::callback(format!("{n} stars"), CallbackAction::Buy(n))])
        .collect();
    rows.push(vec![Button::callback(
        "Enter a custom amount",
        CallbackAction::CustomAmount,
    )]);
    Markup::Inline(rows)
}

pub fn share_invite(link: &str) -> Markup {
    let share = format!(
        "https://t.me/share/url?url={}&text={}",
        urlencoding::encode(link),
        urlencoding::encode(texts::SHARE_INVITE_TEXT)
    );
    Markup::Inline(vec![vec![Button::url("Share the link", share)]])
}

pub fn support(config: &Config) -> Markup {
    Markup::Inline(vec![vec![Button::url("Here you go 🥰", &config.support_url)]])
}

pub fn dashboard(config: &Config) -> Markup {
    Markup::Inline(vec![vec![Button::web_app("DataBase🚀", &config.dashboard_url)]])
}

pub fn storefront(config: &Config) -> Markup {
    Markup::Inline(vec![vec![Button::url("🚀 Start your order", &config.storefront_url)]])
}

pub fn showcase(config: &Config) -> Markup {
    Markup::Inline(vec![vec![Button::web_app(
        "🚀 Continue to the showcase",
        &config.showcase_url,
    )]])
}

/// Controls attached to the operator notification of a storefront order.
pub fn new_order(config: &Config, order_id: Uuid) -> Markup {
    Markup::Inline(vec![
        vec![Button::web_app("🔗 Fulfil for the customer", &config.fragment_url)],
        vec![Button::callback(
            "🛩 Mark as completed",
            CallbackAction::RequestCompletion(order_id),
        )],
    ])
}

pub fn confirm_completion(order_id: Uuid, message_id: i32) -> Markup {
    Markup::Inline(vec![vec![
        Button::callback(
            "Yes ✅",
            CallbackAction::ConfirmCompletion {
                order_id,
                message_id,
            },
        ),
        Button::callback("No ❌", CallbackAction::Cancel),
    ]])
}

pub fn stars_purchase(user_id: i64, amount: i64) -> Markup {
    Markup::Inline(vec![vec![Button::callback(
        "✅ Confirm fulfilment",
        CallbackAction::ConfirmStars { user_id, amount },
    )]])
}

pub fn completed_indicator() -> InlineKeyboard {
    vec![vec![Button::callback(
        "✅ This order is already completed",
        CallbackAction::AlreadyCompleted,
    )]]
}
