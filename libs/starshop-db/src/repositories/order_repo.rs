use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::order::{Completion, NewOrder, Order};

/// Document-style order store, independent of the account store.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, order: NewOrder) -> StoreResult<Order>;
    /// All orders, newest first.
    async fn list(&self) -> StoreResult<Vec<Order>>;
    async fn find(&self, id: Uuid) -> StoreResult<Option<Order>>;
    /// Flips `completed` false→true at most once.
    async fn complete(&self, id: Uuid) -> StoreResult<Completion>;
}

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn create(&self, order: NewOrder) -> StoreResult<Order> {
        let rec = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (id, username, stars, amount_ton, amount_usd, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, username, stars, amount_ton, amount_usd, created_at, completed, completed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&order.username)
        .bind(order.stars)
        .bind(&order.amount_ton)
        .bind(&order.amount_usd)
        .bind(order.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec)
    }

    async fn list(&self) -> StoreResult<Vec<Order>> {
        let recs = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, username, stars, amount_ton, amount_usd, created_at, completed, completed_at
            FROM orders
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(recs)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let rec = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, username, stars, amount_ton, amount_usd, created_at, completed, completed_at
            FROM orders WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rec)
    }

    async fn complete(&self, id: Uuid) -> StoreResult<Completion> {
        let result = sqlx::query(
            "UPDATE orders SET completed = TRUE, completed_at = NOW() WHERE id = $1 AND completed = FALSE",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(Completion::Completed);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(if exists {
            Completion::AlreadyCompleted
        } else {
            Completion::NotFound
        })
    }
}
