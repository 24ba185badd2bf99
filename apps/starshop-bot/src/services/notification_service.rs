use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    ButtonRequest, CallbackQueryId, ForceReply, InlineKeyboardButton, InlineKeyboardMarkup,
    KeyboardButton, KeyboardMarkup, KeyboardRemove, MessageId, Recipient, ReplyMarkup, UserId,
    WebAppInfo,
};
use thiserror::Error;
use tracing::debug;

use crate::bot::keyboards::{ButtonAction, InlineKeyboard, Markup};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid channel id: {0}")]
    InvalidChannel(String),
}

pub type SinkResult<T> = Result<T, SinkError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipStatus {
    Creator,
    Administrator,
    Member,
    /// Left, kicked, restricted or anything else that does not count as subscribed.
    Outsider,
}

impl MembershipStatus {
    pub fn is_subscribed(self) -> bool {
        !matches!(self, MembershipStatus::Outsider)
    }
}

/// Outbound side of the messaging platform.
///
/// Every call may fail; callers decide whether a failure matters; in the conversation flow it
/// never aborts the transition.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Returns the id of the sent message.
    async fn send_message(&self, chat_id: i64, text: &str, markup: Option<Markup>)
    -> SinkResult<i32>;

    /// Replaces the inline keyboard of a sent message; `None` removes it.
    async fn edit_markup(
        &self,
        chat_id: i64,
        message_id: i32,
        keyboard: Option<InlineKeyboard>,
    ) -> SinkResult<()>;

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> SinkResult<()>;

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> SinkResult<()>;

    async fn membership(&self, channel: &str, user_id: i64) -> SinkResult<MembershipStatus>;

    async fn register_webhook(&self, url: &str) -> SinkResult<()>;
}

/// [`NotificationSink`] over the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn parse_url(raw: &str) -> SinkResult<url::Url> {
    url::Url::parse(raw).map_err(|source| SinkError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

fn inline_markup(rows: &InlineKeyboard) -> SinkResult<InlineKeyboardMarkup> {
    let mut keyboard = Vec::with_capacity(rows.len());
    for row in rows {
        let mut buttons = Vec::with_capacity(row.len());
        for button in row {
            buttons.push(match &button.action {
                ButtonAction::Callback(data) => {
                    InlineKeyboardButton::callback(button.text.clone(), data.clone())
                }
                ButtonAction::Url(url) => {
                    InlineKeyboardButton::url(button.text.clone(), parse_url(url)?)
                }
                ButtonAction::WebApp(url) => InlineKeyboardButton::web_app(
                    button.text.clone(),
                    WebAppInfo {
                        url: parse_url(url)?,
                    },
                ),
            });
        }
        keyboard.push(buttons);
    }
    Ok(InlineKeyboardMarkup::new(keyboard))
}

fn reply_markup(markup: &Markup) -> SinkResult<ReplyMarkup> {
    Ok(match markup {
        Markup::Inline(rows) => ReplyMarkup::InlineKeyboard(inline_markup(rows)?),
        Markup::RequestContact(label) => ReplyMarkup::Keyboard(
            KeyboardMarkup::new(vec![vec![
                KeyboardButton::new(label.clone()).request(ButtonRequest::Contact),
            ]])
            .resize_keyboard()
            .one_time_keyboard(),
        ),
        Markup::ForceReply => ReplyMarkup::ForceReply(ForceReply::new()),
        Markup::RemoveKeyboard => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
    })
}

/// `@name` addresses a public channel, anything else must be a numeric chat id.
fn channel_recipient(channel: &str) -> SinkResult<Recipient> {
    if channel.starts_with('@') {
        return Ok(Recipient::ChannelUsername(channel.to_string()));
    }
    channel
        .parse::<i64>()
        .map(|id| Recipient::Id(ChatId(id)))
        .map_err(|_| SinkError::InvalidChannel(channel.to_string()))
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<Markup>,
    ) -> SinkResult<i32> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);
        if let Some(markup) = markup {
            request = request.reply_markup(reply_markup(&markup)?);
        }
        let sent = request.await?;
        Ok(sent.id.0)
    }

    async fn edit_markup(
        &self,
        chat_id: i64,
        message_id: i32,
        keyboard: Option<InlineKeyboard>,
    ) -> SinkResult<()> {
        let mut request = self
            .bot
            .edit_message_reply_markup(ChatId(chat_id), MessageId(message_id));
        if let Some(rows) = keyboard {
            request = request.reply_markup(inline_markup(&rows)?);
        }
        request.await?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> SinkResult<()> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> SinkResult<()> {
        let mut request = self
            .bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()));
        if let Some(text) = text {
            request = request.text(text);
        }
        request.await?;
        Ok(())
    }

    async fn membership(&self, channel: &str, user_id: i64) -> SinkResult<MembershipStatus> {
        let member = self
            .bot
            .get_chat_member(channel_recipient(channel)?, UserId(user_id as u64))
            .await?;
        debug!(
            "Membership of {} in {}: {:?}",
            user_id, channel, member.kind
        );
        let status = if member.kind.is_owner() {
            MembershipStatus::Creator
        } else if member.kind.is_administrator() {
            MembershipStatus::Administrator
        } else if member.kind.is_member() {
            MembershipStatus::Member
        } else {
            MembershipStatus::Outsider
        };
        Ok(status)
    }

    async fn register_webhook(&self, url: &str) -> SinkResult<()> {
        self.bot.set_webhook(parse_url(url)?).await?;
        Ok(())
    }
}
