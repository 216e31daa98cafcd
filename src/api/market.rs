//! Market data endpoints. These are display-only and need no user id.

use super::AppState;
use crate::domain::{
    CompanyProfile, Forecast, PricePoint, Quote, Symbol, SymbolMatch, Timeframe,
};
use crate::error::AppError;
use crate::orchestration::NewsDigest;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SymbolMatch>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub timeframe: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub points: Vec<PricePoint>,
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub symbol: Symbol,
    /// `null` whenever no advisory forecast could be produced.
    pub forecast: Option<Forecast>,
}

fn parse_symbol(raw: &str) -> Result<Symbol, AppError> {
    raw.parse().map_err(|_| AppError::BadRequest {
        message: "symbol must not be empty".to_string(),
        code: "INVALID_SYMBOL",
    })
}

pub async fn search(
    Query(params): Query<SearchQuery>,
    State(state): State<AppState>,
) -> Result<Json<SearchResponse>, AppError> {
    let query = params.q.unwrap_or_default();
    let results = state.market.search(&query).await?;
    Ok(Json(SearchResponse { results }))
}

pub async fn get_quote(
    Path(symbol): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Quote>, AppError> {
    let symbol = parse_symbol(&symbol)?;
    Ok(Json(state.market.quote(&symbol).await?))
}

pub async fn get_history(
    Path(symbol): Path<String>,
    Query(params): Query<HistoryQuery>,
    State(state): State<AppState>,
) -> Result<Json<HistoryResponse>, AppError> {
    let symbol = parse_symbol(&symbol)?;
    let timeframe = match params.timeframe.as_deref() {
        None | Some("") => Timeframe::default(),
        Some(raw) => raw.parse().map_err(AppError::bad_request)?,
    };

    let points = state.market.history(&symbol, timeframe).await?;
    Ok(Json(HistoryResponse {
        symbol,
        timeframe,
        points,
    }))
}

pub async fn get_profile(
    Path(symbol): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CompanyProfile>, AppError> {
    let symbol = parse_symbol(&symbol)?;
    Ok(Json(state.market.profile(&symbol).await?))
}

pub async fn get_forecast(
    Path(symbol): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ForecastResponse>, AppError> {
    let symbol = parse_symbol(&symbol)?;
    let forecast = state.market.forecast(&symbol).await;
    Ok(Json(ForecastResponse { symbol, forecast }))
}

pub async fn get_news(
    Path(symbol): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<NewsDigest>, AppError> {
    let symbol = parse_symbol(&symbol)?;
    Ok(Json(state.market.news(&symbol).await?))
}
