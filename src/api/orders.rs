use super::auth::CurrentUser;
use super::AppState;
use crate::domain::{Decimal, Side, TradeRecord, Version};
use crate::error::AppError;
use crate::orchestration::OrderRequest;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct OrderBody {
    pub side: Side,
    pub symbol: String,
    pub qty: Decimal,
    pub price: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub trade: TradeRecord,
    pub balance: Decimal,
    pub version: Version,
}

pub async fn post_order(
    CurrentUser(uid): CurrentUser,
    State(state): State<AppState>,
    body: Result<Json<OrderBody>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let Json(body) = body.map_err(|e| AppError::bad_request(e.body_text()))?;

    let outcome = state
        .trading
        .submit(
            &uid,
            OrderRequest {
                side: body.side,
                symbol: body.symbol,
                qty: body.qty,
                price: body.price,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            trade: outcome.trade,
            balance: outcome.balance,
            version: outcome.version,
        }),
    ))
}
