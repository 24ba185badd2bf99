//! Test doubles and event builders shared by the unit tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use starshop_db::models::Account;
use starshop_db::{AccountStore, MemoryAccountStore, MemoryOrderStore, OrderStore};
use tokio::sync::Mutex;

use crate::bot::callback_data::CallbackAction;
use crate::bot::event::{Command, InboundEvent, Sender};
use crate::bot::gates::Clock;
use crate::bot::handlers::Dispatcher;
use crate::bot::keyboards::{InlineKeyboard, Markup};
use crate::config::Config;
use crate::services::notification_service::{
    MembershipStatus, NotificationSink, SinkError, SinkResult,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Send {
        chat_id: i64,
        text: String,
        markup: Option<Markup>,
    },
    Edit {
        chat_id: i64,
        message_id: i32,
        keyboard: Option<InlineKeyboard>,
    },
    Delete {
        chat_id: i64,
        message_id: i32,
    },
    Answer {
        callback_id: String,
        text: Option<String>,
    },
    Webhook(String),
}

/// Records every successful call. Membership defaults to "everyone subscribed".
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
    members: Mutex<Option<HashSet<i64>>>,
    membership_fails: AtomicBool,
    sends_fail: AtomicBool,
    next_message_id: AtomicI32,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            members: Mutex::new(None),
            membership_fails: AtomicBool::new(false),
            sends_fail: AtomicBool::new(false),
            next_message_id: AtomicI32::new(1000),
        }
    }
}

impl RecordingSink {
    pub async fn set_member(&self, user_id: i64) {
        self.members
            .lock()
            .await
            .get_or_insert_with(HashSet::new)
            .insert(user_id);
    }

    pub async fn clear_members(&self) {
        *self.members.lock().await = Some(HashSet::new());
    }

    pub async fn fail_membership(&self) {
        self.membership_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_sends(&self) {
        self.sends_fail.store(true, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().await.clone()
    }

    pub async fn texts_to(&self, chat: i64) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                SinkCall::Send { chat_id, text, .. } if *chat_id == chat => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn last_send_to(&self, chat: i64) -> Option<SinkCall> {
        self.calls
            .lock()
            .await
            .iter()
            .rev()
            .find(|call| matches!(call, SinkCall::Send { chat_id, .. } if *chat_id == chat))
            .cloned()
    }

    async fn record(&self, call: SinkCall) {
        self.calls.lock().await.push(call);
    }
}

fn offline() -> SinkError {
    SinkError::Request(teloxide::RequestError::Api(teloxide::ApiError::BotBlocked))
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<Markup>,
    ) -> SinkResult<i32> {
        if self.sends_fail.load(Ordering::SeqCst) {
            return Err(offline());
        }
        self.record(SinkCall::Send {
            chat_id,
            text: text.to_string(),
            markup,
        })
        .await;
        Ok(self.next_message_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn edit_markup(
        &self,
        chat_id: i64,
        message_id: i32,
        keyboard: Option<InlineKeyboard>,
    ) -> SinkResult<()> {
        self.record(SinkCall::Edit {
            chat_id,
            message_id,
            keyboard,
        })
        .await;
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> SinkResult<()> {
        self.record(SinkCall::Delete {
            chat_id,
            message_id,
        })
        .await;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> SinkResult<()> {
        self.record(SinkCall::Answer {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
        })
        .await;
        Ok(())
    }

    async fn membership(&self, _channel: &str, user_id: i64) -> SinkResult<MembershipStatus> {
        if self.membership_fails.load(Ordering::SeqCst) {
            return Err(offline());
        }
        let subscribed = match &*self.members.lock().await {
            None => true,
            Some(members) => members.contains(&user_id),
        };
        Ok(if subscribed {
            MembershipStatus::Member
        } else {
            MembershipStatus::Outsider
        })
    }

    async fn register_webhook(&self, url: &str) -> SinkResult<()> {
        self.record(SinkCall::Webhook(url.to_string())).await;
        Ok(())
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Dispatcher wired to in-memory stores and a recording sink.
pub struct Harness {
    pub dispatcher: Arc<Dispatcher>,
    pub accounts: Arc<MemoryAccountStore>,
    pub orders: Arc<MemoryOrderStore>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    /// Noon at the default +2 business offset.
    pub fn new() -> Self {
        Self::build(Vec::new(), Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap())
    }

    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        Self::build(
            accounts.into_iter().collect(),
            Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
        )
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self::build(Vec::new(), now)
    }

    pub fn with_config(config: Config, now: DateTime<Utc>) -> Self {
        Self::build_with(config, Vec::new(), now)
    }

    fn build(accounts: Vec<Account>, now: DateTime<Utc>) -> Self {
        Self::build_with(Config::for_tests(), accounts, now)
    }

    fn build_with(config: Config, accounts: Vec<Account>, now: DateTime<Utc>) -> Self {
        let accounts = Arc::new(MemoryAccountStore::with_accounts(accounts));
        let orders = Arc::new(MemoryOrderStore::new());
        let sink = Arc::new(RecordingSink::default());
        let account_store: Arc<dyn AccountStore> = accounts.clone();
        let order_store: Arc<dyn OrderStore> = orders.clone();
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(config),
            account_store,
            order_store,
            sink.clone(),
            Arc::new(FixedClock(now)),
        ));
        Self {
            dispatcher,
            accounts,
            orders,
            sink,
        }
    }

    pub async fn dispatch(&self, event: InboundEvent) {
        self.dispatcher.handle(event).await;
    }
}

pub fn account(user_id: i64, verified: bool, star_balance: i64) -> Account {
    Account {
        user_id,
        username: Some(format!("user{user_id}")),
        phone_number: Some("+201234567".into()),
        referral_code: None,
        invited_by: None,
        star_balance,
        verified,
        pending_challenge: None,
        created_at: Utc::now(),
    }
}

pub fn sender(user_id: i64) -> Sender {
    Sender {
        user_id,
        chat_id: user_id,
        username: Some("alice".into()),
        language_code: Some("en".into()),
    }
}

pub fn command(user_id: i64, text: &str) -> InboundEvent {
    InboundEvent::Command {
        sender: sender(user_id),
        command: Command::parse(text).unwrap_or(Command::Other(text.to_string())),
        text: text.to_string(),
    }
}

pub fn start(user_id: i64, payload: Option<&str>) -> InboundEvent {
    match payload {
        Some(payload) => command(user_id, &format!("/start {payload}")),
        None => command(user_id, "/start"),
    }
}

pub fn contact(user_id: i64, phone_number: &str) -> InboundEvent {
    InboundEvent::Contact {
        sender: sender(user_id),
        phone_number: phone_number.to_string(),
        contact_user_id: Some(user_id),
    }
}

pub fn tap(user_id: i64, data: &str) -> InboundEvent {
    tap_on(user_id, data, 1)
}

pub fn tap_on(user_id: i64, data: &str, message_id: i32) -> InboundEvent {
    InboundEvent::Callback {
        sender: sender(user_id),
        callback_id: format!("cb-{user_id}"),
        action: CallbackAction::parse(data),
        message_id: Some(message_id),
    }
}

pub fn reply(user_id: i64, text: &str, replied_to: &str) -> InboundEvent {
    InboundEvent::PlainReply {
        sender: sender(user_id),
        text: text.to_string(),
        replied_to_text: Some(replied_to.to_string()),
    }
}

pub fn with_locale(mut event: InboundEvent, locale: &str) -> InboundEvent {
    match &mut event {
        InboundEvent::Command { sender, .. }
        | InboundEvent::Contact { sender, .. }
        | InboundEvent::Callback { sender, .. }
        | InboundEvent::PlainReply { sender, .. } => {
            sender.language_code = Some(locale.to_string());
        }
        InboundEvent::Unrecognized => {}
    }
    event
}
