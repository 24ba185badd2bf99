use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Emoji puzzle issued to an unverified account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub candidates: Vec<String>,
    pub target: String,
}

/// Referral / verification / balance record, one per platform user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub user_id: i64,
    pub username: Option<String>,
    pub phone_number: Option<String>,
    pub referral_code: Option<String>,
    pub invited_by: Option<String>,
    pub star_balance: i64,
    pub verified: bool,
    pub pending_challenge: Option<Challenge>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub user_id: i64,
    pub username: Option<String>,
    pub phone_number: Option<String>,
    pub invited_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A record with the same user id already existed; nothing was written.
    AlreadyRegistered,
}

#[derive(Debug, FromRow)]
pub(crate) struct AccountRow {
    pub user_id: i64,
    pub username: Option<String>,
    pub phone_number: Option<String>,
    pub referral_code: Option<String>,
    pub invited_by: Option<String>,
    pub star_balance: i64,
    pub verified: bool,
    pub challenge_candidates: Option<Vec<String>>,
    pub challenge_target: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        let pending_challenge = match (row.challenge_candidates, row.challenge_target) {
            (Some(candidates), Some(target)) if !row.verified => Some(Challenge { candidates, target }),
            _ => None,
        };
        Account {
            user_id: row.user_id,
            username: row.username,
            phone_number: row.phone_number,
            referral_code: row.referral_code,
            invited_by: row.invited_by,
            star_balance: row.star_balance,
            verified: row.verified,
            pending_challenge,
            created_at: row.created_at,
        }
    }
}
