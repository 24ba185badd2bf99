//! In-process stores with the same semantics as the PostgreSQL repositories.
//! Used when no database is configured and by tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::account::{Account, Challenge, InsertOutcome, NewAccount};
use crate::models::order::{Completion, NewOrder, Order};
use crate::repositories::account_repo::AccountStore;
use crate::repositories::order_repo::OrderStore;

#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<i64, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        Self {
            accounts: Mutex::new(accounts.into_iter().map(|a| (a.user_id, a)).collect()),
        }
    }

    pub async fn len(&self) -> usize {
        self.accounts.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.lock().await.is_empty()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find(&self, user_id: i64) -> StoreResult<Option<Account>> {
        Ok(self.accounts.lock().await.get(&user_id).cloned())
    }

    async fn insert(&self, account: NewAccount) -> StoreResult<InsertOutcome> {
        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(&account.user_id) {
            return Ok(InsertOutcome::AlreadyRegistered);
        }
        accounts.insert(
            account.user_id,
            Account {
                user_id: account.user_id,
                username: account.username,
                phone_number: account.phone_number,
                referral_code: None,
                invited_by: account.invited_by,
                star_balance: 0,
                verified: false,
                pending_challenge: None,
                created_at: Utc::now(),
            },
        );
        Ok(InsertOutcome::Inserted)
    }

    async fn attach_phone(&self, user_id: i64, phone_number: &str) -> StoreResult<()> {
        if let Some(account) = self.accounts.lock().await.get_mut(&user_id) {
            if account.phone_number.is_none() {
                account.phone_number = Some(phone_number.to_string());
            }
        }
        Ok(())
    }

    async fn store_challenge(&self, user_id: i64, challenge: &Challenge) -> StoreResult<()> {
        if let Some(account) = self.accounts.lock().await.get_mut(&user_id) {
            account.pending_challenge = Some(challenge.clone());
        }
        Ok(())
    }

    async fn confirm_challenge(&self, user_id: i64, answer: &str) -> StoreResult<bool> {
        let mut accounts = self.accounts.lock().await;
        let Some(account) = accounts.get_mut(&user_id) else {
            return Ok(false);
        };
        let matches = !account.verified
            && account
                .pending_challenge
                .as_ref()
                .is_some_and(|c| c.target == answer);
        if matches {
            account.verified = true;
            account.pending_challenge = None;
        }
        Ok(matches)
    }

    async fn assign_referral_code(
        &self,
        user_id: i64,
        candidate: &str,
    ) -> StoreResult<Option<String>> {
        let mut accounts = self.accounts.lock().await;
        let taken = accounts
            .values()
            .any(|a| a.user_id != user_id && a.referral_code.as_deref() == Some(candidate));
        let Some(account) = accounts.get_mut(&user_id) else {
            return Ok(None);
        };
        if let Some(existing) = &account.referral_code {
            return Ok(Some(existing.clone()));
        }
        if taken {
            return Err(StoreError::Conflict("referral code".to_string()));
        }
        account.referral_code = Some(candidate.to_string());
        Ok(Some(candidate.to_string()))
    }

    async fn count_invitees(&self, referral_code: &str) -> StoreResult<i64> {
        let accounts = self.accounts.lock().await;
        let count = accounts
            .values()
            .filter(|a| a.invited_by.as_deref() == Some(referral_code))
            .count();
        Ok(count as i64)
    }

    async fn credit_by_code(&self, referral_code: &str, amount: i64) -> StoreResult<bool> {
        let mut accounts = self.accounts.lock().await;
        match accounts
            .values_mut()
            .find(|a| a.referral_code.as_deref() == Some(referral_code))
        {
            Some(inviter) => {
                inviter.star_balance += amount;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn debit(&self, user_id: i64, amount: i64) -> StoreResult<Option<i64>> {
        let mut accounts = self.accounts.lock().await;
        match accounts.get_mut(&user_id) {
            Some(account) if account.star_balance >= amount => {
                account.star_balance -= amount;
                Ok(Some(account.star_balance))
            }
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: Mutex<Vec<Order>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create(&self, order: NewOrder) -> StoreResult<Order> {
        let order = Order {
            id: Uuid::new_v4(),
            username: order.username,
            stars: order.stars,
            amount_ton: order.amount_ton,
            amount_usd: order.amount_usd,
            created_at: order.created_at,
            completed: false,
            completed_at: None,
        };
        self.orders.lock().await.push(order.clone());
        Ok(order)
    }

    async fn list(&self) -> StoreResult<Vec<Order>> {
        let mut orders = self.orders.lock().await.clone();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.orders.lock().await.iter().find(|o| o.id == id).cloned())
    }

    async fn complete(&self, id: Uuid) -> StoreResult<Completion> {
        let mut orders = self.orders.lock().await;
        match orders.iter_mut().find(|o| o.id == id) {
            Some(order) if order.completed => Ok(Completion::AlreadyCompleted),
            Some(order) => {
                order.completed = true;
                order.completed_at = Some(Utc::now());
                Ok(Completion::Completed)
            }
            None => Ok(Completion::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn account(user_id: i64, balance: i64) -> Account {
        Account {
            user_id,
            username: Some(format!("user{user_id}")),
            phone_number: None,
            referral_code: None,
            invited_by: None,
            star_balance: balance,
            verified: true,
            pending_challenge: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_insert_is_reported_not_failed() {
        let store = MemoryAccountStore::new();
        let new = NewAccount {
            user_id: 7,
            ..Default::default()
        };
        assert_eq!(store.insert(new.clone()).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(
            store.insert(new).await.unwrap(),
            InsertOutcome::AlreadyRegistered
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn racing_debits_never_overdraw() {
        let store = Arc::new(MemoryAccountStore::with_accounts([account(1, 30)]));
        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.debit(1, 20).await.unwrap() }));
        }
        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(store.find(1).await.unwrap().unwrap().star_balance, 10);
    }

    #[tokio::test]
    async fn referral_code_is_assigned_once() {
        let store = MemoryAccountStore::with_accounts([account(1, 0), account(2, 0)]);
        let first = store.assign_referral_code(1, "ABC123").await.unwrap();
        let second = store.assign_referral_code(1, "ZZZ999").await.unwrap();
        assert_eq!(first.as_deref(), Some("ABC123"));
        assert_eq!(second.as_deref(), Some("ABC123"));

        let clash = store.assign_referral_code(2, "ABC123").await;
        assert!(matches!(clash, Err(StoreError::Conflict(_))));
        assert_eq!(store.assign_referral_code(99, "NEW000").await.unwrap(), None);
    }

    #[tokio::test]
    async fn stale_challenge_answer_is_rejected() {
        let mut unverified = account(5, 0);
        unverified.verified = false;
        let store = MemoryAccountStore::with_accounts([unverified]);
        let first = Challenge {
            candidates: vec!["🐼".into(), "🍎".into(), "⚽".into()],
            target: "🐼".into(),
        };
        let second = Challenge {
            candidates: vec!["🚀".into(), "🎯".into(), "⭐".into()],
            target: "🚀".into(),
        };
        store.store_challenge(5, &first).await.unwrap();
        store.store_challenge(5, &second).await.unwrap();

        assert!(!store.confirm_challenge(5, "🐼").await.unwrap());
        assert!(store.confirm_challenge(5, "🚀").await.unwrap());
        let stored = store.find(5).await.unwrap().unwrap();
        assert!(stored.verified);
        assert!(stored.pending_challenge.is_none());
    }

    #[tokio::test]
    async fn order_completion_flips_once() {
        let store = MemoryOrderStore::new();
        let order = store
            .create(NewOrder {
                username: "buyer".into(),
                stars: 100,
                amount_ton: "0.5".into(),
                amount_usd: "1.7".into(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        assert_eq!(store.complete(order.id).await.unwrap(), Completion::Completed);
        assert_eq!(
            store.complete(order.id).await.unwrap(),
            Completion::AlreadyCompleted
        );
        assert_eq!(
            store.complete(Uuid::new_v4()).await.unwrap(),
            Completion::NotFound
        );
        assert!(store.find(order.id).await.unwrap().unwrap().completed);
    }
}
