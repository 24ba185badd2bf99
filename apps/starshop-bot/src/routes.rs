use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer};

use crate::handlers::{orders, webhook};
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn build_router(state: AppState, public_dir: &str) -> Router {
    // The webhook reads its own bounded body so that it can still answer 200.
    let storefront: Router<AppState> = Router::new()
        .route("/order", post(orders::create_order))
        .route("/complete-order/{id}", post(orders::complete_order))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    Router::new()
        .route("/", get(webhook::health))
        .route("/admin", get(orders::list_orders))
        .route("/webhook", post(webhook::telegram_webhook))
        .route("/telegramWebhook", post(webhook::telegram_webhook))
        .merge(storefront)
        .fallback_service(ServeDir::new(public_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
