use super::auth::CurrentUser;
use super::AppState;
use crate::domain::{Symbol, TradeRecord};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct TradesQuery {
    pub symbol: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TradesResponse {
    pub trades: Vec<TradeRecord>,
}

pub async fn get_trades(
    CurrentUser(uid): CurrentUser,
    Query(params): Query<TradesQuery>,
    State(state): State<AppState>,
) -> Result<Json<TradesResponse>, AppError> {
    // Blank filter means all symbols.
    let symbol = params
        .symbol
        .as_deref()
        .and_then(|s| s.parse::<Symbol>().ok());

    let trades = state.trading.trades(&uid, symbol.as_ref()).await?;
    Ok(Json(TradesResponse { trades }))
}
