use starshop_db::StoreError;
use starshop_db::models::{Account, InsertOutcome, NewAccount};
use tracing::{info, warn};

use super::{DispatchError, DispatchResult, Dispatcher};
use crate::bot::challenge;
use crate::bot::event::Sender;
use crate::bot::keyboards;
use crate::bot::state_machine::ConversationState;
use crate::bot::texts;

const REFERRAL_CODE_ATTEMPTS: usize = 5;

impl Dispatcher {
    /// First contact through an invite link. The inviter is credited only when this call
    /// created the record, so replays never credit twice.
    pub(super) async fn register_referral(&self, sender: &Sender, code: &str) -> DispatchResult {
        let outcome = self
            .accounts
            .insert(NewAccount {
                user_id: sender.user_id,
                username: sender.username.clone(),
                invited_by: Some(code.to_string()),
                ..Default::default()
            })
            .await?;

        match outcome {
            InsertOutcome::Inserted => {
                if self.accounts.credit_by_code(code, 1).await? {
                    info!("User {} joined through referral code {}", sender.user_id, code);
                } else {
                    warn!(
                        "User {} used unknown referral code {}, nobody credited",
                        sender.user_id, code
                    );
                }
                self.notify(sender.chat_id, texts::INVITE_REGISTERED, None)
                    .await;
            }
            InsertOutcome::AlreadyRegistered => {
                // Lost a race with another registration; continue as a plain /start.
                let account = self.accounts.find(sender.user_id).await?;
                match ConversationState::from_account(account) {
                    ConversationState::Unregistered => {
                        return Err(DispatchError::MissingAccount(sender.user_id));
                    }
                    ConversationState::AwaitingVerification(_) => {
                        self.issue_challenge(sender, false).await?
                    }
                    ConversationState::Verified(_) => self.welcome_menu(sender.chat_id).await,
                }
            }
        }
        Ok(())
    }

    pub(super) async fn register_with_contact(
        &self,
        sender: &Sender,
        phone_number: &str,
    ) -> DispatchResult {
        let outcome = self
            .accounts
            .insert(NewAccount {
                user_id: sender.user_id,
                username: sender.username.clone(),
                phone_number: Some(phone_number.to_string()),
                ..Default::default()
            })
            .await?;

        match outcome {
            InsertOutcome::Inserted => info!("Registered user {} by contact", sender.user_id),
            InsertOutcome::AlreadyRegistered => {
                self.accounts
                    .attach_phone(sender.user_id, phone_number)
                    .await?;
            }
        }

        self.issue_challenge(sender, true).await
    }

    /// Replaces any earlier challenge, so only the latest one can verify the account.
    pub(super) async fn issue_challenge(&self, sender: &Sender, after_contact: bool) -> DispatchResult {
        let challenge = challenge::generate(&mut rand::rng());
        self.accounts
            .store_challenge(sender.user_id, &challenge)
            .await?;

        self.notify(
            sender.chat_id,
            &texts::challenge(&challenge.candidates, after_contact),
            Some(keyboards::challenge_keyboard(&challenge.candidates)),
        )
        .await;
        Ok(())
    }

    pub(super) async fn confirm_challenge(&self, sender: &Sender, emoji: &str) -> DispatchResult {
        if self.accounts.confirm_challenge(sender.user_id, emoji).await? {
            info!("User {} verified", sender.user_id);
            self.notify(
                sender.chat_id,
                texts::VERIFIED,
                Some(keyboards::verified_keyboard()),
            )
            .await;
        } else {
            self.notify(sender.chat_id, texts::WRONG_EMOJI, None).await;
        }
        Ok(())
    }

    pub(super) async fn welcome_menu(&self, chat_id: i64) {
        self.notify(
            chat_id,
            texts::WELCOME,
            Some(keyboards::welcome_menu(&self.config)),
        )
        .await;
    }

    pub(super) async fn show_invite(&self, chat_id: i64, account: &Account) -> DispatchResult {
        let code = match &account.referral_code {
            Some(code) => code.clone(),
            None => self.assign_referral_code(account.user_id).await?,
        };
        let invitees = self.accounts.count_invitees(&code).await?;
        let link = self.config.referral_link(&code);

        self.notify(
            chat_id,
            &texts::invite(&link, invitees, account.star_balance),
            Some(keyboards::share_invite(&link)),
        )
        .await;
        Ok(())
    }

    /// The store keeps the first code ever assigned, so concurrent calls agree on one.
    async fn assign_referral_code(&self, user_id: i64) -> Result<String, DispatchError> {
        for _ in 0..REFERRAL_CODE_ATTEMPTS {
            let candidate = challenge::referral_code(&mut rand::rng());
            match self.accounts.assign_referral_code(user_id, &candidate).await {
                Ok(Some(code)) => return Ok(code),
                Ok(None) => return Err(DispatchError::MissingAccount(user_id)),
                Err(StoreError::Conflict(_)) => {
                    warn!("Referral code collision for user {}, retrying", user_id);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(DispatchError::ReferralCodeExhausted(user_id))
    }
}
