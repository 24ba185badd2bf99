//! Conversation states and the transition table.
//!
//! `route` is pure: it sees the stored account (if any) and a classified event and names the
//! transition to run. The dispatcher performs the effects.

use starshop_db::models::Account;
use uuid::Uuid;

use crate::bot::callback_data::CallbackAction;
use crate::bot::challenge;
use crate::bot::event::{Command, InboundEvent};
use crate::bot::texts;

#[derive(Debug, Clone)]
pub enum ConversationState {
    Unregistered,
    AwaitingVerification(Account),
    Verified(Account),
}

impl ConversationState {
    pub fn from_account(account: Option<Account>) -> Self {
        match account {
            None => ConversationState::Unregistered,
            Some(account) if account.verified => ConversationState::Verified(account),
            Some(account) => ConversationState::AwaitingVerification(account),
        }
    }

    pub fn account(&self) -> Option<&Account> {
        match self {
            ConversationState::Unregistered => None,
            ConversationState::AwaitingVerification(account)
            | ConversationState::Verified(account) => Some(account),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConversationState::Unregistered => "unregistered",
            ConversationState::AwaitingVerification(_) => "awaiting_verification",
            ConversationState::Verified(_) => "verified",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    RequestPhone,
    RegisterReferral(String),
    RegisterWithContact(String),
    AttachPhoneAndChallenge(String),
    IssueChallenge,
    ConfirmChallenge(String),
    AlreadyVerified,
    RefuseForeignContact,
    WelcomeMenu,
    ShowInvite,
    ShowShop,
    Purchase(i64),
    PromptCustomAmount,
    InvalidAmount,
    RegisterFirst,
    VerifyFirst,
    Help,
    Dashboard,
    RecheckSubscription,
    ShowcaseWarning,
    ReadyToOrder,
    ContactAdmin,
    /// `message_id` is the operator notification carrying the order controls.
    RequestCompletion { order_id: Uuid, message_id: i32 },
    ConfirmCompletion {
        order_id: Uuid,
        notification_id: i32,
        prompt_id: Option<i32>,
    },
    Cancel { prompt_id: Option<i32> },
    AlreadyCompletedToast,
    ConfirmStars {
        user_id: i64,
        amount: i64,
        message_id: Option<i32>,
    },
    Ignore,
}

/// Requires a verified account, otherwise tells the user which step is missing.
fn verified_only(state: &ConversationState, then: Transition) -> Transition {
    match state {
        ConversationState::Unregistered => Transition::RegisterFirst,
        ConversationState::AwaitingVerification(_) => Transition::VerifyFirst,
        ConversationState::Verified(_) => then,
    }
}

fn purchase(state: &ConversationState, amount: Option<i64>) -> Transition {
    match amount {
        Some(n) if n > 0 => verified_only(state, Transition::Purchase(n)),
        _ => verified_only(state, Transition::InvalidAmount),
    }
}

/// Strict positive integer: digits only, no sign, no fraction.
pub fn parse_amount(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<i64>().ok().filter(|n| *n > 0)
}

pub fn route(state: &ConversationState, event: &InboundEvent, is_operator: bool) -> Transition {
    match event {
        InboundEvent::Command { command, .. } => route_command(state, command, is_operator),
        InboundEvent::Contact {
            sender,
            phone_number,
            contact_user_id,
        } => {
            if contact_user_id.is_some_and(|id| id != sender.user_id) {
                return Transition::RefuseForeignContact;
            }
            match state {
                ConversationState::Unregistered => {
                    Transition::RegisterWithContact(phone_number.clone())
                }
                ConversationState::AwaitingVerification(_) => {
                    Transition::AttachPhoneAndChallenge(phone_number.clone())
                }
                ConversationState::Verified(_) => Transition::AlreadyVerified,
            }
        }
        InboundEvent::Callback {
            action, message_id, ..
        } => route_callback(state, action, *message_id, is_operator),
        InboundEvent::PlainReply {
            text,
            replied_to_text,
            ..
        } => {
            let answers_prompt = replied_to_text
                .as_deref()
                .is_some_and(|t| t.contains(texts::CUSTOM_AMOUNT_MARKER));
            if answers_prompt {
                purchase(state, parse_amount(text))
            } else {
                Transition::Ignore
            }
        }
        InboundEvent::Unrecognized => Transition::Ignore,
    }
}

fn route_command(state: &ConversationState, command: &Command, is_operator: bool) -> Transition {
    match (command, state) {
        (Command::Start(payload), ConversationState::Unregistered) => match payload {
            Some(code) if challenge::is_referral_code(code) => {
                Transition::RegisterReferral(code.clone())
            }
            _ => Transition::RequestPhone,
        },
        (Command::Start(_), ConversationState::AwaitingVerification(_)) => {
            Transition::IssueChallenge
        }
        (Command::Start(_), ConversationState::Verified(_)) => Transition::WelcomeMenu,
        (Command::Invite, ConversationState::Unregistered) => Transition::RegisterFirst,
        (Command::Invite, _) => Transition::ShowInvite,
        (Command::Shop, _) => verified_only(state, Transition::ShowShop),
        (Command::Help, _) => Transition::Help,
        (Command::Database, _) if is_operator => Transition::Dashboard,
        (Command::Database, _) | (Command::Other(_), _) => Transition::Ignore,
    }
}

fn route_callback(
    state: &ConversationState,
    action: &CallbackAction,
    message_id: Option<i32>,
    is_operator: bool,
) -> Transition {
    if action.is_operator_action() && !is_operator {
        return Transition::Ignore;
    }

    match action {
        CallbackAction::Verify(emoji) => match state {
            ConversationState::Unregistered => Transition::RegisterFirst,
            ConversationState::AwaitingVerification(_) => {
                Transition::ConfirmChallenge(emoji.clone())
            }
            ConversationState::Verified(_) => Transition::AlreadyVerified,
        },
        CallbackAction::Buy(n) => purchase(state, Some(*n)),
        CallbackAction::CustomAmount => verified_only(state, Transition::PromptCustomAmount),
        CallbackAction::CheckSubscription => Transition::RecheckSubscription,
        CallbackAction::ShowMenu => verified_only(state, Transition::WelcomeMenu),
        CallbackAction::ReadyToOrder => Transition::ReadyToOrder,
        CallbackAction::Showcase => Transition::ShowcaseWarning,
        CallbackAction::ContactAdmin => Transition::ContactAdmin,
        CallbackAction::RequestCompletion(order_id) => match message_id {
            Some(message_id) => Transition::RequestCompletion {
                order_id: *order_id,
                message_id,
            },
            None => Transition::Ignore,
        },
        CallbackAction::ConfirmCompletion {
            order_id,
            message_id: notification_id,
        } => Transition::ConfirmCompletion {
            order_id: *order_id,
            notification_id: *notification_id,
            prompt_id: message_id,
        },
        CallbackAction::Cancel => Transition::Cancel {
            prompt_id: message_id,
        },
        CallbackAction::AlreadyCompleted => Transition::AlreadyCompletedToast,
        CallbackAction::ConfirmStars { user_id, amount } => Transition::ConfirmStars {
            user_id: *user_id,
            amount: *amount,
            message_id,
        },
        CallbackAction::Unknown(_) => Transition::Ignore,
    }
}
