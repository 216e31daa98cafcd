//! Domain types for the paper-trading ledger.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Domain primitives: TimeMs, UserId, Symbol, Side
//! - The Account aggregate with its positions, trades and watchlist
//! - Display-only market data and advisory forecast types

pub mod account;
pub mod decimal;
pub mod forecast;
pub mod market;
pub mod primitives;

pub use account::{Account, Position, TradeRecord, Version, Watchlist};
pub use decimal::Decimal;
pub use forecast::{
    parse_forecast, parse_sentiment, Forecast, ForecastError, Impact, Risk, Sentiment, Trend,
};
pub use market::{CompanyProfile, NewsArticle, PricePoint, Quote, SymbolMatch, Timeframe};
pub use primitives::{Side, Symbol, SymbolParseError, TimeMs, UserId};
