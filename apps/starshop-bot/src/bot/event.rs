//! Normalises raw webhook payloads into [`InboundEvent`]s.
//!
//! Classification is structural only: it looks at which fields are present and at
//! literal command text. It never touches a store or the platform.

use serde::Deserialize;

use crate::bot::callback_data::CallbackAction;

/// The subset of an update this service reads; everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub phone_number: String,
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i32,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
    pub contact: Option<Contact>,
    pub reply_to_message: Option<Box<Message>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

/// Who sent the event and where replies go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub user_id: i64,
    pub chat_id: i64,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start`, optionally with a deep-link payload.
    Start(Option<String>),
    Shop,
    Invite,
    Help,
    Database,
    Other(String),
}

impl Command {
    pub(crate) fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let body = text.strip_prefix('/')?;
        let (head, payload) = match body.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, Some(rest.trim()).filter(|p| !p.is_empty())),
            None => (body, None),
        };
        // `/start@SomeBot` addresses the command at a specific bot.
        let name = head.split('@').next().unwrap_or(head);
        Some(match name {
            "start" => Command::Start(payload.map(str::to_string)),
            "shop" => Command::Shop,
            "invite" => Command::Invite,
            "help" => Command::Help,
            "database" => Command::Database,
            other => Command::Other(other.to_string()),
        })
    }

    /// Entry commands are held behind the channel-subscription gate.
    pub fn is_entry(&self) -> bool {
        matches!(self, Command::Start(_) | Command::Shop | Command::Invite)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Command {
        sender: Sender,
        command: Command,
        text: String,
    },
    Contact {
        sender: Sender,
        phone_number: String,
        contact_user_id: Option<i64>,
    },
    Callback {
        sender: Sender,
        callback_id: String,
        action: CallbackAction,
        message_id: Option<i32>,
    },
    PlainReply {
        sender: Sender,
        text: String,
        replied_to_text: Option<String>,
    },
    Unrecognized,
}

impl InboundEvent {
    pub fn sender(&self) -> Option<&Sender> {
        match self {
            InboundEvent::Command { sender, .. }
            | InboundEvent::Contact { sender, .. }
            | InboundEvent::Callback { sender, .. }
            | InboundEvent::PlainReply { sender, .. } => Some(sender),
            InboundEvent::Unrecognized => None,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Command { .. } => "command",
            InboundEvent::Contact { .. } => "contact",
            InboundEvent::Callback { .. } => "callback",
            InboundEvent::PlainReply { .. } => "reply",
            InboundEvent::Unrecognized => "unrecognized",
        }
    }
}

/// Parses and classifies a raw webhook body. Anything that does not parse is `Unrecognized`.
pub fn classify_payload(body: &[u8]) -> InboundEvent {
    match serde_json::from_slice::<Update>(body) {
        Ok(update) => classify(update),
        Err(e) => {
            tracing::warn!("Unparseable webhook payload: {}", e);
            InboundEvent::Unrecognized
        }
    }
}

pub fn classify(update: Update) -> InboundEvent {
    if let Some(query) = update.callback_query {
        return classify_callback(query);
    }
    match update.message {
        Some(message) => classify_message(message),
        None => InboundEvent::Unrecognized,
    }
}

fn classify_callback(query: CallbackQuery) -> InboundEvent {
    let Some(data) = query.data else {
        return InboundEvent::Unrecognized;
    };
    let chat_id = query
        .message
        .as_ref()
        .map(|m| m.chat.id)
        .unwrap_or(query.from.id);
    InboundEvent::Callback {
        sender: Sender {
            user_id: query.from.id,
            chat_id,
            username: query.from.username,
            language_code: query.from.language_code,
        },
        callback_id: query.id,
        action: CallbackAction::parse(&data),
        message_id: query.message.map(|m| m.message_id),
    }
}

fn classify_message(message: Message) -> InboundEvent {
    let Some(from) = message.from else {
        return InboundEvent::Unrecognized;
    };
    let sender = Sender {
        user_id: from.id,
        chat_id: message.chat.id,
        username: from.username,
        language_code: from.language_code,
    };

    if let Some(contact) = message.contact {
        return InboundEvent::Contact {
            sender,
            phone_number: contact.phone_number,
            contact_user_id: contact.user_id,
        };
    }

    let Some(text) = message.text else {
        return InboundEvent::Unrecognized;
    };

    if let Some(command) = Command::parse(&text) {
        return InboundEvent::Command {
            sender,
            command,
            text,
        };
    }

    InboundEvent::PlainReply {
        sender,
        text,
        replied_to_text: message.reply_to_message.and_then(|m| m.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(extra: serde_json::Value) -> Vec<u8> {
        let mut msg = json!({
            "message_id": 10,
            "date": 1_700_000_000,
            "chat": { "id": 100, "type": "private" },
            "from": { "id": 100, "is_bot": false, "first_name": "A", "username": "alice", "language_code": "en" }
        });
        if let (Some(base), Some(extra)) = (msg.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        serde_json::to_vec(&json!({ "update_id": 1, "message": msg })).unwrap()
    }

    #[test]
    fn start_with_referral_payload() {
        let event = classify_payload(&message(json!({ "text": "/start AB12CD" })));
        let InboundEvent::Command { sender, command, .. } = event else {
            panic!("expected command, got {event:?}");
        };
        assert_eq!(command, Command::Start(Some("AB12CD".into())));
        assert_eq!(sender.user_id, 100);
        assert_eq!(sender.language_code.as_deref(), Some("en"));
    }

    #[test]
    fn bot_addressed_commands_are_recognised() {
        let event = classify_payload(&message(json!({ "text": "/shop@PandaStores_bot" })));
        assert!(matches!(
            event,
            InboundEvent::Command {
                command: Command::Shop,
                ..
            }
        ));
    }

    #[test]
    fn contact_wins_over_text() {
        let event = classify_payload(&message(json!({
            "contact": { "phone_number": "+201234567", "first_name": "A", "user_id": 100 }
        })));
        assert_eq!(
            event,
            InboundEvent::Contact {
                sender: Sender {
                    user_id: 100,
                    chat_id: 100,
                    username: Some("alice".into()),
                    language_code: Some("en".into()),
                },
                phone_number: "+201234567".into(),
                contact_user_id: Some(100),
            }
        );
    }

    #[test]
    fn reply_keeps_the_replied_to_text() {
        let event = classify_payload(&message(json!({
            "text": "55",
            "reply_to_message": {
                "message_id": 9,
                "date": 1_700_000_000,
                "chat": { "id": 100, "type": "private" },
                "text": "📝 Please enter the number of stars you want to buy (for example 55 or 66):"
            }
        })));
        let InboundEvent::PlainReply {
            text,
            replied_to_text,
            ..
        } = event
        else {
            panic!("expected reply");
        };
        assert_eq!(text, "55");
        assert!(replied_to_text.unwrap().contains("number of stars"));
    }

    #[test]
    fn callback_uses_message_chat_and_id() {
        let body = serde_json::to_vec(&json!({
            "update_id": 2,
            "callback_query": {
                "id": "cbq-1",
                "from": { "id": 100, "is_bot": false, "first_name": "A" },
                "chat_instance": "x",
                "data": "buy_25",
                "message": {
                    "message_id": 77,
                    "date": 1_700_000_000,
                    "chat": { "id": 555, "type": "private" }
                }
            }
        }))
        .unwrap();
        let InboundEvent::Callback {
            sender,
            callback_id,
            action,
            message_id,
        } = classify_payload(&body)
        else {
            panic!("expected callback");
        };
        assert_eq!(sender.chat_id, 555);
        assert_eq!(callback_id, "cbq-1");
        assert_eq!(action, CallbackAction::Buy(25));
        assert_eq!(message_id, Some(77));
    }

    #[test]
    fn garbage_and_unsupported_updates_are_unrecognized() {
        assert_eq!(classify_payload(b"not json"), InboundEvent::Unrecognized);
        assert_eq!(
            classify_payload(br#"{"update_id": 3, "edited_message": {}}"#),
            InboundEvent::Unrecognized
        );
        assert_eq!(
            classify_payload(&message(json!({ "sticker": { "file_id": "x" } }))),
            InboundEvent::Unrecognized
        );
    }
}
