use std::sync::Arc;

use crate::bot::Dispatcher;
use crate::services::order_service::OrderService;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub order_service: OrderService,
}
