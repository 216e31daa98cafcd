use super::auth::CurrentUser;
use super::AppState;
use crate::domain::Symbol;
use crate::error::AppError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct WatchBody {
    pub symbol: String,
}

#[derive(Debug, Serialize)]
pub struct WatchlistResponse {
    pub symbols: Vec<Symbol>,
}

pub async fn get_watchlist(
    CurrentUser(uid): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<WatchlistResponse>, AppError> {
    let symbols = state.watchlist.get(&uid).await?;
    Ok(Json(WatchlistResponse { symbols }))
}

pub async fn add_to_watchlist(
    CurrentUser(uid): CurrentUser,
    State(state): State<AppState>,
    body: Result<Json<WatchBody>, JsonRejection>,
) -> Result<Json<WatchlistResponse>, AppError> {
    let Json(body) = body.map_err(|e| AppError::bad_request(e.body_text()))?;
    let symbols = state.watchlist.add(&uid, &body.symbol).await?;
    Ok(Json(WatchlistResponse { symbols }))
}

pub async fn remove_from_watchlist(
    CurrentUser(uid): CurrentUser,
    Path(symbol): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<WatchlistResponse>, AppError> {
    let symbols = state.watchlist.remove(&uid, &symbol).await?;
    Ok(Json(WatchlistResponse { symbols }))
}
