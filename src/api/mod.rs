pub mod account;
pub mod auth;
pub mod health;
pub mod market;
pub mod orders;
pub mod portfolio;
pub mod trades;
pub mod watchlist;

use crate::datasource::{ForecastOracle, MarketData};
use crate::db::AccountStore;
use crate::orchestration::{LedgerSettings, MarketService, TradingService, WatchlistService};
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub trading: TradingService,
    pub watchlist: WatchlistService,
    pub market: MarketService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn AccountStore>,
        market: Arc<dyn MarketData>,
        oracle: Arc<dyn ForecastOracle>,
        settings: LedgerSettings,
    ) -> Self {
        Self {
            trading: TradingService::new(store.clone(), market.clone(), settings),
            watchlist: WatchlistService::new(store, settings),
            market: MarketService::new(market, oracle),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/account", get(account::get_account))
        .route("/v1/account/stream", get(account::stream_account))
        .route("/v1/orders", post(orders::post_order))
        .route("/v1/trades", get(trades::get_trades))
        .route("/v1/portfolio", get(portfolio::get_portfolio))
        .route(
            "/v1/watchlist",
            get(watchlist::get_watchlist).post(watchlist::add_to_watchlist),
        )
        .route(
            "/v1/watchlist/:symbol",
            delete(watchlist::remove_from_watchlist),
        )
        .route("/v1/market/search", get(market::search))
        .route("/v1/market/:symbol/quote", get(market::get_quote))
        .route("/v1/market/:symbol/history", get(market::get_history))
        .route("/v1/market/:symbol/profile", get(market::get_profile))
        .route("/v1/market/:symbol/forecast", get(market::get_forecast))
        .route("/v1/market/:symbol/news", get(market::get_news))
        .layer(cors)
        .with_state(state)
}
