use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Storefront purchase awaiting manual fulfilment by an operator.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub username: String,
    pub stars: i64,
    pub amount_ton: String,
    pub amount_usd: String,
    pub created_at: DateTime<Utc>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub username: String,
    pub stars: i64,
    pub amount_ton: String,
    pub amount_usd: String,
    pub created_at: DateTime<Utc>,
}

/// Result of marking an order completed. Only `Completed` means this call flipped the flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Completed,
    AlreadyCompleted,
    NotFound,
}
