use std::sync::Arc;

use starshop_db::models::{Completion, NewOrder, Order};
use starshop_db::{OrderStore, StoreResult};
use tracing::{info, warn};
use uuid::Uuid;

use crate::bot::{keyboards, texts};
use crate::config::Config;
use crate::services::notification_service::NotificationSink;

/// Storefront orders: persistence plus operator notification.
#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    sink: Arc<dyn NotificationSink>,
    config: Arc<Config>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        sink: Arc<dyn NotificationSink>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            orders,
            sink,
            config,
        }
    }

    /// Stores the order, then notifies every operator. Notification failures are logged;
    /// the order stands regardless.
    pub async fn place(&self, order: NewOrder) -> StoreResult<Order> {
        let order = self.orders.create(order).await?;
        info!(
            "Order {} created: {} stars for @{}",
            order.id, order.stars, order.username
        );

        let text = texts::new_order(
            &order.username,
            order.stars,
            &order.amount_ton,
            &order.amount_usd,
            &self.format_timestamp(&order),
        );
        for &operator in &self.config.operator_ids {
            if let Err(e) = self
                .sink
                .send_message(
                    operator,
                    &text,
                    Some(keyboards::new_order(&self.config, order.id)),
                )
                .await
            {
                warn!(
                    "Failed to notify operator {} about order {}: {}",
                    operator, order.id, e
                );
            }
        }

        Ok(order)
    }

    pub async fn list(&self) -> StoreResult<Vec<Order>> {
        self.orders.list().await
    }

    pub async fn complete(&self, id: Uuid) -> StoreResult<Completion> {
        let outcome = self.orders.complete(id).await?;
        info!("Completion of order {}: {:?}", id, outcome);
        Ok(outcome)
    }

    fn format_timestamp(&self, order: &Order) -> String {
        order
            .created_at
            .with_timezone(&self.config.working_hours.offset)
            .format("%d/%m/%Y, %I:%M:%S %p")
            .to_string()
    }
}
