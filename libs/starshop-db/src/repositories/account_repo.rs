use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::{StoreError, StoreResult};
use crate::models::account::{Account, AccountRow, Challenge, InsertOutcome, NewAccount};

const ACCOUNT_COLUMNS: &str = "user_id, username, phone_number, referral_code, invited_by, \
     star_balance, verified, challenge_candidates, challenge_target, created_at";

/// Relational account/referral store keyed by platform user id.
///
/// Every mutation is a single statement so concurrent webhook deliveries never
/// interleave a read and a write of the same row.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find(&self, user_id: i64) -> StoreResult<Option<Account>>;

    /// Inserts a fresh record. A concurrent or earlier insert for the same user id
    /// yields [`InsertOutcome::AlreadyRegistered`] instead of an error.
    async fn insert(&self, account: NewAccount) -> StoreResult<InsertOutcome>;

    /// Stores the phone number unless one is already set.
    async fn attach_phone(&self, user_id: i64, phone_number: &str) -> StoreResult<()>;

    /// Replaces any previously issued challenge.
    async fn store_challenge(&self, user_id: i64, challenge: &Challenge) -> StoreResult<()>;

    /// Flips `verified` when `answer` equals the latest stored target. Returns whether it did.
    async fn confirm_challenge(&self, user_id: i64, answer: &str) -> StoreResult<bool>;

    /// Sets the referral code to `candidate` unless the account already has one and
    /// returns the effective code (`None` when the account does not exist).
    /// A collision with another account's code is a [`StoreError::Conflict`].
    async fn assign_referral_code(&self, user_id: i64, candidate: &str)
    -> StoreResult<Option<String>>;

    async fn count_invitees(&self, referral_code: &str) -> StoreResult<i64>;

    /// Adds `amount` stars to the owner of `referral_code`. Returns false if no one owns it.
    async fn credit_by_code(&self, referral_code: &str, amount: i64) -> StoreResult<bool>;

    /// Conditional decrement: subtracts `amount` only if the balance covers it.
    /// Returns the remaining balance, or `None` when the debit was refused.
    async fn debit(&self, user_id: i64, amount: i64) -> StoreResult<Option<i64>>;
}

#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn find(&self, user_id: i64) -> StoreResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Account::from))
    }

    async fn insert(&self, account: NewAccount) -> StoreResult<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (user_id, username, phone_number, invited_by)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(account.user_id)
        .bind(account.username.as_deref())
        .bind(account.phone_number.as_deref())
        .bind(account.invited_by.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_write(e, "account insert"))?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::AlreadyRegistered)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn attach_phone(&self, user_id: i64, phone_number: &str) -> StoreResult<()> {
        sqlx::query(
            "UPDATE accounts SET phone_number = COALESCE(phone_number, $1) WHERE user_id = $2",
        )
        .bind(phone_number)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn store_challenge(&self, user_id: i64, challenge: &Challenge) -> StoreResult<()> {
        sqlx::query(
            "UPDATE accounts SET challenge_candidates = $1, challenge_target = $2 WHERE user_id = $3",
        )
        .bind(&challenge.candidates)
        .bind(&challenge.target)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn confirm_challenge(&self, user_id: i64, answer: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET verified = TRUE, challenge_candidates = NULL, challenge_target = NULL
            WHERE user_id = $1 AND verified = FALSE AND challenge_target = $2
            "#,
        )
        .bind(user_id)
        .bind(answer)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn assign_referral_code(
        &self,
        user_id: i64,
        candidate: &str,
    ) -> StoreResult<Option<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            UPDATE accounts SET referral_code = COALESCE(referral_code, $1)
            WHERE user_id = $2
            RETURNING referral_code
            "#,
        )
        .bind(candidate)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::from_write(e, "referral code"))
    }

    async fn count_invitees(&self, referral_code: &str) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE invited_by = $1")
            .bind(referral_code)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn credit_by_code(&self, referral_code: &str, amount: i64) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET star_balance = star_balance + $1 WHERE referral_code = $2",
        )
        .bind(amount)
        .bind(referral_code)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn debit(&self, user_id: i64, amount: i64) -> StoreResult<Option<i64>> {
        let remaining = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE accounts SET star_balance = star_balance - $1
            WHERE user_id = $2 AND star_balance >= $1
            RETURNING star_balance
            "#,
        )
        .bind(amount)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(remaining)
    }
}
