//! External collaborators: market data and the forecasting oracle.
//!
//! Both are display-only. Nothing fetched here is ever used to admit or
//! reject a ledger operation, with one exception: an order submitted without
//! a price is filled at the current quote.

use crate::domain::{
    CompanyProfile, Decimal, Forecast, ForecastError, NewsArticle, PricePoint, Quote, Sentiment,
    Symbol, SymbolMatch, TimeMs,
};
use async_trait::async_trait;
use std::fmt;

pub mod forecast;
pub mod http;
pub mod market;
pub mod mock;

pub use forecast::{ChatForecaster, DisabledForecaster};
pub use market::RestMarketData;
pub use mock::{MockForecaster, MockMarketData};

/// Quotes, price history, fundamentals, search and news for listed symbols.
///
/// Implementations must handle retry/backoff for transient upstream failures.
#[async_trait]
pub trait MarketData: Send + Sync + fmt::Debug {
    /// Latest quote. `NoData` if the upstream has nothing for the symbol.
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, DataSourceError>;

    /// Daily closes between `from` and `to` (inclusive), oldest first.
    async fn fetch_daily_series(
        &self,
        symbol: &Symbol,
        from: TimeMs,
        to: TimeMs,
    ) -> Result<Vec<PricePoint>, DataSourceError>;

    /// Company profile merged with headline fundamentals.
    async fn fetch_profile(&self, symbol: &Symbol) -> Result<CompanyProfile, DataSourceError>;

    /// Symbol lookup, restricted to common stock and exchange-traded products.
    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, DataSourceError>;

    /// Recent company news, newest first.
    async fn fetch_news(
        &self,
        symbol: &Symbol,
        from: TimeMs,
        to: TimeMs,
    ) -> Result<Vec<NewsArticle>, DataSourceError>;
}

/// What the oracle is shown when asked for a prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionInput {
    pub symbol: Symbol,
    pub quote: Quote,
    pub profile: Option<CompanyProfile>,
    /// Most recent closes, oldest first.
    pub recent_closes: Vec<Decimal>,
}

/// Speculative price prediction and news sentiment.
///
/// Results are advisory. Every failure mode, including malformed output, is
/// reported as a [`ForecastError`] rather than a panic.
#[async_trait]
pub trait ForecastOracle: Send + Sync + fmt::Debug {
    async fn predict(&self, input: &PredictionInput) -> Result<Forecast, ForecastError>;

    async fn sentiment(
        &self,
        symbol: &Symbol,
        headlines: &[String],
    ) -> Result<Sentiment, ForecastError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 4xx client error, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded (caller should implement backoff)
    RateLimited,
    /// Upstream answered but has nothing for the request
    NoData(String),
    /// Other error
    Other(String),
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
            DataSourceError::NoData(msg) => write!(f, "No data: {}", msg),
            DataSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}

impl From<DataSourceError> for ForecastError {
    fn from(err: DataSourceError) -> Self {
        ForecastError::Unavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datasource_error_display() {
        let err = DataSourceError::NetworkError("connection timeout".to_string());
        assert_eq!(err.to_string(), "Network error: connection timeout");

        let err = DataSourceError::HttpError {
            status: 429,
            message: "Too many requests".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error 429: Too many requests");

        let err = DataSourceError::NoData("ZZZZ".to_string());
        assert_eq!(err.to_string(), "No data: ZZZZ");

        assert_eq!(DataSourceError::RateLimited.to_string(), "Rate limited");
    }

    #[test]
    fn test_datasource_error_becomes_unavailable_forecast() {
        let err: ForecastError = DataSourceError::RateLimited.into();
        assert_eq!(err, ForecastError::Unavailable("Rate limited".to_string()));
    }
}
