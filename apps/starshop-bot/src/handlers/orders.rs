use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use starshop_db::models::{Completion, NewOrder};
use tracing::{error, warn};
use uuid::Uuid;

use crate::state::AppState;

/// Amounts arrive as strings or bare JSON numbers depending on the storefront build.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Text(String),
    Number(serde_json::Number),
}

impl Amount {
    fn into_text(self) -> String {
        match self {
            Amount::Text(text) => text,
            Amount::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub username: String,
    pub stars: i64,
    #[serde(alias = "amountInCurrencyA")]
    pub amount_ton: Amount,
    #[serde(alias = "amountInCurrencyB")]
    pub amount_usd: Amount,
    pub created_at: Option<DateTime<Utc>>,
}

const ORDER_FAILED: &str = "❌ Something went wrong while processing the order";
const UPDATE_FAILED: &str = "❌ Something went wrong while updating the order";

fn failure(message: &'static str) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
}

/// Replies 200 or 500 only; malformed bodies get the same answer as a store failure.
pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> impl IntoResponse {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            warn!("Rejected order body: {}", rejection.body_text());
            return failure(ORDER_FAILED);
        }
    };

    let username = payload.username.trim().trim_start_matches('@').to_string();
    if username.is_empty() || payload.stars <= 0 {
        warn!(
            "Rejected order with username {:?} and {} stars",
            payload.username, payload.stars
        );
        return failure(ORDER_FAILED);
    }

    let order = NewOrder {
        username,
        stars: payload.stars,
        amount_ton: payload.amount_ton.into_text(),
        amount_usd: payload.amount_usd.into_text(),
        created_at: payload.created_at.unwrap_or_else(Utc::now),
    };

    match state.order_service.place(order).await {
        Ok(_) => (StatusCode::OK, "✅ Your order was received successfully!").into_response(),
        Err(e) => {
            error!("Failed to create order: {}", e);
            failure(ORDER_FAILED)
        }
    }
}

pub async fn list_orders(State(state): State<AppState>) -> impl IntoResponse {
    match state.order_service.list().await {
        Ok(orders) => Json(orders).into_response(),
        Err(e) => {
            error!("Failed to list orders: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "❌ Something went wrong while fetching orders",
            )
                .into_response()
        }
    }
}

pub async fn complete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let id = match Uuid::parse_str(&id) {
        Ok(id) => id,
        Err(e) => {
            error!("Cannot complete order {:?}: {}", id, e);
            return failure(UPDATE_FAILED);
        }
    };

    match state.order_service.complete(id).await {
        Ok(outcome) => {
            if outcome == Completion::NotFound {
                warn!("Completion requested for unknown order {}", id);
            }
            (StatusCode::OK, "✅ Order status updated").into_response()
        }
        Err(e) => {
            error!("Failed to complete order {}: {}", id, e);
            failure(UPDATE_FAILED)
        }
    }
}
