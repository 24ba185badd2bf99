use starshop_db::models::Completion;
use tracing::{info, warn};
use uuid::Uuid;

use super::{DispatchResult, Dispatcher};
use crate::bot::event::Sender;
use crate::bot::gates;
use crate::bot::keyboards::{self, Markup};
use crate::bot::texts;

impl Dispatcher {
    /// Debits through the store's conditional decrement, then tells every operator.
    pub(super) async fn purchase(&self, sender: &Sender, amount: i64) -> DispatchResult {
        let Some(remaining) = self.accounts.debit(sender.user_id, amount).await? else {
            self.notify(sender.chat_id, texts::INSUFFICIENT_STARS, None)
                .await;
            return Ok(());
        };

        info!(
            "User {} bought {} stars, {} left",
            sender.user_id, amount, remaining
        );

        let notice =
            texts::purchase_for_operators(sender.username.as_deref(), sender.user_id, amount);
        for &operator in &self.config.operator_ids {
            self.notify(
                operator,
                &notice,
                Some(keyboards::stars_purchase(sender.user_id, amount)),
            )
            .await;
        }

        self.notify(
            sender.chat_id,
            &texts::purchase_received(amount, remaining),
            None,
        )
        .await;
        Ok(())
    }

    pub(super) async fn recheck_subscription(&self, sender: &Sender) {
        if gates::is_subscribed(&self.config, self.sink.as_ref(), sender.user_id).await {
            self.notify(sender.chat_id, texts::SUBSCRIPTION_CONFIRMED, None)
                .await;
        } else {
            self.send_join_prompt(sender.chat_id).await;
        }
    }

    pub(super) async fn ready_to_order(&self, chat_id: i64) {
        if gates::is_open(self.clock.now(), &self.config.working_hours) {
            self.notify(
                chat_id,
                texts::OPEN,
                Some(keyboards::storefront(&self.config)),
            )
            .await;
        } else {
            let hours = &self.config.working_hours;
            let closed = texts::closed(hours.open_hour, hours.close_hour);
            self.notify(chat_id, &closed, None).await;
        }
    }

    /// Only a `Completed` outcome is new; a repeated confirmation changes nothing but the
    /// wording of the reply.
    pub(super) async fn confirm_completion(
        &self,
        chat_id: i64,
        order_id: Uuid,
        notification_id: i32,
        prompt_id: Option<i32>,
    ) -> DispatchResult {
        let outcome = self.orders.complete(order_id).await?;

        if let Some(prompt_id) = prompt_id {
            self.delete(chat_id, prompt_id).await;
        }

        let reply = match outcome {
            Completion::Completed => {
                info!("Order {} completed", order_id);
                texts::ORDER_COMPLETED
            }
            Completion::AlreadyCompleted => {
                info!("Order {} was already completed", order_id);
                texts::ORDER_ALREADY_COMPLETED
            }
            Completion::NotFound => {
                warn!("Completion requested for unknown order {}", order_id);
                self.notify(chat_id, texts::ORDER_NOT_FOUND, None).await;
                return Ok(());
            }
        };

        self.edit_markup(
            chat_id,
            notification_id,
            Some(keyboards::completed_indicator()),
        )
        .await;
        self.notify(chat_id, reply, None).await;
        Ok(())
    }

    pub(super) async fn cancel(&self, chat_id: i64, prompt_id: Option<i32>) {
        if let Some(prompt_id) = prompt_id {
            self.edit_markup(chat_id, prompt_id, None).await;
        }
        self.notify(chat_id, texts::CANCELLED, Some(Markup::RemoveKeyboard))
            .await;
    }

    /// Operational acknowledgment only; the balance was debited at purchase time.
    pub(super) async fn confirm_stars(
        &self,
        chat_id: i64,
        user_id: i64,
        amount: i64,
        message_id: Option<i32>,
    ) {
        info!(
            "Operator in chat {} fulfilled {} stars for user {}",
            chat_id, amount, user_id
        );
        if let Some(message_id) = message_id {
            self.edit_markup(chat_id, message_id, Some(keyboards::completed_indicator()))
                .await;
        }
        self.notify(user_id, &texts::purchase_fulfilled(amount), None)
            .await;
        self.notify(chat_id, texts::STARS_CONFIRMED, None).await;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use starshop_db::models::NewOrder;
    use starshop_db::{AccountStore, OrderStore};

    use crate::bot::callback_data::CallbackAction;
    use crate::bot::keyboards;
    use crate::bot::texts;
    use crate::config::Config;
    use crate::testing::{Harness, SinkCall, account, reply, tap, tap_on};

    #[tokio::test]
    async fn purchase_over_balance_is_refused() {
        let h = Harness::with_accounts([account(100, true, 30)]);
        h.dispatch(tap(100, "buy_50")).await;

        assert_eq!(h.accounts.find(100).await.unwrap().unwrap().star_balance, 30);
        assert_eq!(h.sink.texts_to(100).await, vec![texts::INSUFFICIENT_STARS]);
        assert!(h.sink.texts_to(9001).await.is_empty());
    }

    #[tokio::test]
    async fn purchase_debits_and_notifies_every_operator() {
        let h = Harness::with_accounts([account(100, true, 50)]);
        h.dispatch(tap(100, "buy_25")).await;

        assert_eq!(h.accounts.find(100).await.unwrap().unwrap().star_balance, 25);
        for operator in [9001, 9002] {
            let Some(SinkCall::Send { text, markup, .. }) = h.sink.last_send_to(operator).await
            else {
                panic!("operator {operator} was not notified");
            };
            assert!(text.contains("@alice"));
            assert!(text.contains("25"));
            assert_eq!(
                markup.unwrap().callback_data(),
                vec!["confirm_stars_100_25"]
            );
        }
        assert_eq!(
            h.sink.texts_to(100).await,
            vec![texts::purchase_received(25, 25)]
        );
        // Callback answered before anything else.
        assert!(matches!(
            h.sink.calls().await.first(),
            Some(SinkCall::Answer { text: None, .. })
        ));
    }

    #[tokio::test]
    async fn concurrent_purchases_never_overdraw() {
        let h = Harness::with_accounts([account(100, true, 30)]);
        let dispatcher = h.dispatcher.clone();
        let mut tasks = Vec::new();
        for _ in 0..4 {
            let dispatcher = dispatcher.clone();
            tasks.push(tokio::spawn(async move {
                dispatcher.handle(tap(100, "buy_25")).await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(h.accounts.find(100).await.unwrap().unwrap().star_balance, 5);
        assert_eq!(h.sink.texts_to(9001).await.len(), 1);
    }

    #[tokio::test]
    async fn custom_amount_reply_goes_through_the_same_debit() {
        let h = Harness::with_accounts([account(100, true, 60)]);
        h.dispatch(tap(100, "custom_amount")).await;
        assert_eq!(h.sink.texts_to(100).await, vec![texts::CUSTOM_AMOUNT_PROMPT]);

        h.dispatch(reply(100, "abc", texts::CUSTOM_AMOUNT_PROMPT)).await;
        h.dispatch(reply(100, "61", texts::CUSTOM_AMOUNT_PROMPT)).await;
        h.dispatch(reply(100, "55", texts::CUSTOM_AMOUNT_PROMPT)).await;

        assert_eq!(h.accounts.find(100).await.unwrap().unwrap().star_balance, 5);
        assert_eq!(
            h.sink.texts_to(100).await[1..],
            [
                texts::INVALID_AMOUNT.to_string(),
                texts::INSUFFICIENT_STARS.to_string(),
                texts::purchase_received(55, 5),
            ]
        );
    }

    #[tokio::test]
    async fn order_completion_is_idempotent() {
        let h = Harness::new();
        let order = h
            .orders
            .create(NewOrder {
                username: "bob".into(),
                stars: 100,
                amount_ton: "0.5".into(),
                amount_usd: "1.5".into(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let complete = CallbackAction::RequestCompletion(order.id).to_string();
        h.dispatch(tap_on(9001, &complete, 40)).await;
        let Some(SinkCall::Send { markup: Some(prompt), .. }) = h.sink.last_send_to(9001).await
        else {
            panic!("confirmation prompt expected");
        };
        let yes = prompt.callback_data()[0].to_string();
        assert_eq!(
            prompt,
            keyboards::confirm_completion(order.id, 40)
        );

        h.dispatch(tap_on(9001, &yes, 41)).await;
        h.dispatch(tap_on(9001, &yes, 41)).await;

        let stored = h.orders.find(order.id).await.unwrap().unwrap();
        assert!(stored.completed);
        let texts = h.sink.texts_to(9001).await;
        assert_eq!(
            texts[1..],
            [
                texts::ORDER_COMPLETED.to_string(),
                texts::ORDER_ALREADY_COMPLETED.to_string()
            ]
        );

        let calls = h.sink.calls().await;
        assert!(calls.contains(&SinkCall::Delete {
            chat_id: 9001,
            message_id: 41
        }));
        assert!(calls.contains(&SinkCall::Edit {
            chat_id: 9001,
            message_id: 40,
            keyboard: Some(keyboards::completed_indicator()),
        }));
    }

    #[tokio::test]
    async fn completion_controls_are_operator_only() {
        let h = Harness::new();
        let order = h
            .orders
            .create(NewOrder {
                username: "bob".into(),
                stars: 100,
                amount_ton: "0.5".into(),
                amount_usd: "1.5".into(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let confirm = CallbackAction::ConfirmCompletion {
            order_id: order.id,
            message_id: 40,
        };
        h.dispatch(tap_on(100, &confirm.to_string(), 41)).await;
        assert!(!h.orders.find(order.id).await.unwrap().unwrap().completed);
        assert!(h.sink.texts_to(100).await.is_empty());
    }

    #[tokio::test]
    async fn unknown_order_is_reported() {
        let h = Harness::new();
        let confirm = CallbackAction::ConfirmCompletion {
            order_id: uuid::Uuid::new_v4(),
            message_id: 40,
        };
        h.dispatch(tap_on(9001, &confirm.to_string(), 41)).await;
        assert_eq!(h.sink.texts_to(9001).await, vec![texts::ORDER_NOT_FOUND]);
    }

    #[tokio::test]
    async fn cancel_clears_prompt_and_keyboard() {
        let h = Harness::new();
        h.dispatch(tap_on(9001, "cancel", 41)).await;
        let calls = h.sink.calls().await;
        assert!(calls.contains(&SinkCall::Edit {
            chat_id: 9001,
            message_id: 41,
            keyboard: None,
        }));
        assert!(matches!(
            h.sink.last_send_to(9001).await,
            Some(SinkCall::Send { markup: Some(crate::bot::keyboards::Markup::RemoveKeyboard), .. })
        ));
    }

    #[tokio::test]
    async fn stars_confirmation_tells_the_purchaser_without_touching_balance() {
        let h = Harness::with_accounts([account(100, true, 25)]);
        h.dispatch(tap_on(9001, "confirm_stars_100_25", 50)).await;

        assert_eq!(h.accounts.find(100).await.unwrap().unwrap().star_balance, 25);
        assert_eq!(h.sink.texts_to(100).await, vec![texts::purchase_fulfilled(25)]);
        assert_eq!(h.sink.texts_to(9001).await, vec![texts::STARS_CONFIRMED]);
    }

    #[tokio::test]
    async fn already_completed_is_answered_with_a_toast() {
        let h = Harness::new();
        h.dispatch(tap(9001, "already_completed")).await;
        assert_eq!(
            h.sink.calls().await,
            vec![SinkCall::Answer {
                callback_id: "cb-9001".into(),
                text: Some(texts::ALREADY_COMPLETED_TOAST.into()),
            }]
        );
    }

    #[tokio::test]
    async fn ready_to_order_respects_working_hours() {
        let h = Harness::new();
        h.dispatch(tap(100, "check_order_time")).await;
        assert_eq!(h.sink.texts_to(100).await, vec![texts::OPEN]);

        // 23:30 UTC is 01:30 at the +2 business offset.
        let night = Harness::at(Utc.with_ymd_and_hms(2025, 3, 1, 23, 30, 0).unwrap());
        night.dispatch(tap(100, "check_order_time")).await;
        assert_eq!(night.sink.texts_to(100).await, vec![texts::closed(9, 24)]);
    }

    #[tokio::test]
    async fn closed_reply_follows_configured_hours() {
        let mut config = Config::for_tests();
        config.working_hours.open_hour = 10;
        config.working_hours.close_hour = 18;

        // 17:00 UTC is 19:00 at the +2 business offset.
        let h = Harness::with_config(config, Utc.with_ymd_and_hms(2025, 3, 1, 17, 0, 0).unwrap());
        h.dispatch(tap(100, "check_order_time")).await;
        let replies = h.sink.texts_to(100).await;
        assert_eq!(replies.len(), 1);
        assert!(replies[0].contains("10 AM until 6 PM"));
    }

    #[tokio::test]
    async fn sink_failures_do_not_undo_the_debit() {
        let h = Harness::with_accounts([account(100, true, 50)]);
        h.sink.fail_sends();
        h.dispatch(tap(100, "buy_25")).await;
        assert_eq!(h.accounts.find(100).await.unwrap().unwrap().star_balance, 25);
    }
}
