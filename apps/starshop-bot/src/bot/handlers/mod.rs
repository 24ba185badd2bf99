pub mod callback;
pub mod command;

use std::sync::Arc;

use starshop_db::{AccountStore, OrderStore, StoreError};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::bot::callback_data::CallbackAction;
use crate::bot::event::{InboundEvent, Sender};
use crate::bot::gates::{self, Clock};
use crate::bot::keyboards::{self, InlineKeyboard, Markup};
use crate::bot::state_machine::{ConversationState, Transition, route};
use crate::bot::texts;
use crate::config::Config;
use crate::services::notification_service::NotificationSink;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("account {0} vanished during the transition")]
    MissingAccount(i64),
    #[error("could not assign a unique referral code to {0}")]
    ReferralCodeExhausted(i64),
}

pub type DispatchResult = Result<(), DispatchError>;

/// Runs gates, resolves the stored state, routes the event and applies the transition.
///
/// Sink failures are logged and never abort a transition. Store failures end the transition
/// and are reported to the user as a temporary failure; the webhook is acknowledged either way.
pub struct Dispatcher {
    pub(crate) config: Arc<Config>,
    pub(crate) accounts: Arc<dyn AccountStore>,
    pub(crate) orders: Arc<dyn OrderStore>,
    pub(crate) sink: Arc<dyn NotificationSink>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Dispatcher {
    pub fn new(
        config: Arc<Config>,
        accounts: Arc<dyn AccountStore>,
        orders: Arc<dyn OrderStore>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            accounts,
            orders,
            sink,
            clock,
        }
    }

    pub async fn handle(&self, event: InboundEvent) {
        let Some(sender) = event.sender().cloned() else {
            debug!("Acknowledging unrecognized update");
            return;
        };

        if let Err(e) = self.dispatch(&sender, &event).await {
            error!(
                "Failed to handle {} from user {}: {}",
                event.kind(),
                sender.user_id,
                e
            );
            self.notify(sender.chat_id, texts::TEMPORARY_FAILURE, None)
                .await;
        }
    }

    async fn dispatch(&self, sender: &Sender, event: &InboundEvent) -> DispatchResult {
        match event {
            InboundEvent::Callback {
                callback_id,
                action,
                ..
            } => {
                let toast = matches!(action, CallbackAction::AlreadyCompleted)
                    .then_some(texts::ALREADY_COMPLETED_TOAST);
                self.answer(callback_id, toast).await;
            }
            _ => {
                if self.region_blocked(sender, event) {
                    info!("Refusing user {} from a blocked region", sender.user_id);
                    self.notify(sender.chat_id, texts::REGION_REFUSAL, None)
                        .await;
                    return Ok(());
                }
            }
        }

        if let InboundEvent::Command { command, .. } = event {
            if command.is_entry()
                && !gates::is_subscribed(&self.config, self.sink.as_ref(), sender.user_id).await
            {
                self.send_join_prompt(sender.chat_id).await;
                return Ok(());
            }
        }

        let state = ConversationState::from_account(self.accounts.find(sender.user_id).await?);
        let transition = route(&state, event, self.config.is_operator(sender.user_id));
        debug!(
            "User {} ({}) {} -> {:?}",
            sender.user_id,
            state.name(),
            event.kind(),
            transition
        );

        self.apply(sender, state, transition).await
    }

    fn region_blocked(&self, sender: &Sender, event: &InboundEvent) -> bool {
        if gates::locale_blocked(&self.config, sender.language_code.as_deref()) {
            return true;
        }
        match event {
            InboundEvent::Contact { phone_number, .. } => {
                gates::phone_blocked(&self.config, phone_number)
            }
            _ => false,
        }
    }

    async fn apply(
        &self,
        sender: &Sender,
        state: ConversationState,
        transition: Transition,
    ) -> DispatchResult {
        let chat_id = sender.chat_id;
        match transition {
            Transition::RequestPhone => {
                self.notify(chat_id, texts::ASK_PHONE, Some(keyboards::contact_request()))
                    .await;
            }
            Transition::RegisterReferral(code) => self.register_referral(sender, &code).await?,
            Transition::RegisterWithContact(phone) => {
                self.register_with_contact(sender, &phone).await?
            }
            Transition::AttachPhoneAndChallenge(phone) => {
                self.accounts.attach_phone(sender.user_id, &phone).await?;
                self.issue_challenge(sender, true).await?;
            }
            Transition::IssueChallenge => self.issue_challenge(sender, false).await?,
            Transition::ConfirmChallenge(emoji) => self.confirm_challenge(sender, &emoji).await?,
            Transition::AlreadyVerified => {
                self.notify(chat_id, texts::ALREADY_VERIFIED, None).await;
            }
            Transition::RefuseForeignContact => {
                self.notify(
                    chat_id,
                    texts::FOREIGN_CONTACT,
                    Some(keyboards::contact_request()),
                )
                .await;
            }
            Transition::WelcomeMenu => self.welcome_menu(chat_id).await,
            Transition::ShowInvite => {
                let account = state
                    .account()
                    .ok_or(DispatchError::MissingAccount(sender.user_id))?;
                self.show_invite(chat_id, account).await?
            }
            Transition::ShowShop => {
                let balance = state.account().map(|a| a.star_balance).unwrap_or(0);
                self.notify(chat_id, &texts::shop(balance), Some(keyboards::shop_keyboard()))
                    .await;
            }
            Transition::Purchase(amount) => self.purchase(sender, amount).await?,
            Transition::PromptCustomAmount => {
                self.notify(chat_id, texts::CUSTOM_AMOUNT_PROMPT, Some(Markup::ForceReply))
                    .await;
            }
            Transition::InvalidAmount => {
                self.notify(chat_id, texts::INVALID_AMOUNT, None).await;
            }
            Transition::RegisterFirst => {
                self.notify(chat_id, texts::REGISTER_FIRST, None).await;
            }
            Transition::VerifyFirst => {
                self.notify(chat_id, texts::VERIFY_FIRST, None).await;
            }
            Transition::Help | Transition::ContactAdmin => {
                self.notify(chat_id, texts::HELP, Some(keyboards::support(&self.config)))
                    .await;
            }
            Transition::Dashboard => {
                self.notify(
                    chat_id,
                    texts::DASHBOARD,
                    Some(keyboards::dashboard(&self.config)),
                )
                .await;
            }
            Transition::RecheckSubscription => self.recheck_subscription(sender).await,
            Transition::ShowcaseWarning => {
                self.notify(
                    chat_id,
                    texts::SHOWCASE_WARNING,
                    Some(keyboards::showcase(&self.config)),
                )
                .await;
            }
            Transition::ReadyToOrder => self.ready_to_order(chat_id).await,
            Transition::RequestCompletion {
                order_id,
                message_id,
            } => {
                self.notify(
                    chat_id,
                    texts::CONFIRM_COMPLETION,
                    Some(keyboards::confirm_completion(order_id, message_id)),
                )
                .await;
            }
            Transition::ConfirmCompletion {
                order_id,
                notification_id,
                prompt_id,
            } => {
                self.confirm_completion(chat_id, order_id, notification_id, prompt_id)
                    .await?
            }
            Transition::Cancel { prompt_id } => self.cancel(chat_id, prompt_id).await,
            Transition::ConfirmStars {
                user_id,
                amount,
                message_id,
            } => self.confirm_stars(chat_id, user_id, amount, message_id).await,
            // Answered with a toast before routing.
            Transition::AlreadyCompletedToast | Transition::Ignore => {}
        }
        Ok(())
    }

    pub(crate) async fn notify(&self, chat_id: i64, text: &str, markup: Option<Markup>) -> Option<i32> {
        match self.sink.send_message(chat_id, text, markup).await {
            Ok(message_id) => Some(message_id),
            Err(e) => {
                warn!("Failed to send message to {}: {}", chat_id, e);
                None
            }
        }
    }

    pub(crate) async fn edit_markup(
        &self,
        chat_id: i64,
        message_id: i32,
        keyboard: Option<InlineKeyboard>,
    ) {
        if let Err(e) = self.sink.edit_markup(chat_id, message_id, keyboard).await {
            warn!(
                "Failed to edit markup of message {} in {}: {}",
                message_id, chat_id, e
            );
        }
    }

    pub(crate) async fn delete(&self, chat_id: i64, message_id: i32) {
        if let Err(e) = self.sink.delete_message(chat_id, message_id).await {
            warn!("Failed to delete message {} in {}: {}", message_id, chat_id, e);
        }
    }

    async fn answer(&self, callback_id: &str, text: Option<&str>) {
        if let Err(e) = self.sink.answer_callback(callback_id, text).await {
            warn!("Failed to answer callback {}: {}", callback_id, e);
        }
    }

    pub(crate) async fn send_join_prompt(&self, chat_id: i64) {
        self.notify(
            chat_id,
            texts::JOIN_CHANNEL,
            Some(keyboards::join_channel(self.config.channel_link())),
        )
        .await;
    }
}
