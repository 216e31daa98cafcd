//! Display-only market views and advisory signals.
//!
//! Forecasts and sentiment degrade to `None` on any failure; they are logged
//! and never surfaced as errors.

use crate::datasource::forecast::SENTIMENT_HEADLINES;
use crate::datasource::{DataSourceError, ForecastOracle, MarketData, PredictionInput};
use crate::domain::{
    CompanyProfile, Decimal, Forecast, NewsArticle, PricePoint, Quote, Sentiment, Symbol,
    SymbolMatch, TimeMs, Timeframe,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Fewer closes than this and no prediction is requested.
pub const MIN_FORECAST_HISTORY: usize = 5;
/// Closes shown to the oracle.
pub const FORECAST_WINDOW: usize = 10;
const FORECAST_LOOKBACK_DAYS: i64 = 30;
const NEWS_LOOKBACK_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsDigest {
    pub articles: Vec<NewsArticle>,
    pub sentiment: Option<Sentiment>,
}

#[derive(Clone)]
pub struct MarketService {
    market: Arc<dyn MarketData>,
    oracle: Arc<dyn ForecastOracle>,
}

impl MarketService {
    pub fn new(market: Arc<dyn MarketData>, oracle: Arc<dyn ForecastOracle>) -> Self {
        Self { market, oracle }
    }

    pub async fn quote(&self, symbol: &Symbol) -> Result<Quote, DataSourceError> {
        self.market.fetch_quote(symbol).await
    }

    pub async fn history(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
    ) -> Result<Vec<PricePoint>, DataSourceError> {
        let to = TimeMs::now();
        let from = to.minus_days(timeframe.days());
        self.market.fetch_daily_series(symbol, from, to).await
    }

    pub async fn profile(&self, symbol: &Symbol) -> Result<CompanyProfile, DataSourceError> {
        self.market.fetch_profile(symbol).await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SymbolMatch>, DataSourceError> {
        self.market.search_symbols(query).await
    }

    /// Advisory next-close prediction, or `None` if any input or the oracle
    /// is unavailable.
    pub async fn forecast(&self, symbol: &Symbol) -> Option<Forecast> {
        let quote = self
            .quote(symbol)
            .await
            .map_err(|e| warn!(symbol = %symbol, error = %e, "Forecast skipped: no quote"))
            .ok()?;

        let to = TimeMs::now();
        let series = self
            .market
            .fetch_daily_series(symbol, to.minus_days(FORECAST_LOOKBACK_DAYS), to)
            .await
            .map_err(|e| warn!(symbol = %symbol, error = %e, "Forecast skipped: no history"))
            .ok()?;

        if series.len() < MIN_FORECAST_HISTORY {
            warn!(symbol = %symbol, points = series.len(), "Forecast skipped: history too short");
            return None;
        }

        // Fundamentals only enrich the prompt.
        let profile = match self.market.fetch_profile(symbol).await {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Forecasting without fundamentals");
                None
            }
        };

        let skip = series.len().saturating_sub(FORECAST_WINDOW);
        let recent_closes: Vec<Decimal> = series.iter().skip(skip).map(|p| p.close).collect();

        let input = PredictionInput {
            symbol: symbol.clone(),
            quote,
            profile,
            recent_closes,
        };

        match self.oracle.predict(&input).await {
            Ok(forecast) => Some(forecast),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Forecast unavailable");
                None
            }
        }
    }

    /// Last week's headlines with an advisory sentiment score.
    ///
    /// Fails only if the headlines themselves cannot be fetched.
    pub async fn news(&self, symbol: &Symbol) -> Result<NewsDigest, DataSourceError> {
        let to = TimeMs::now();
        let articles = self
            .market
            .fetch_news(symbol, to.minus_days(NEWS_LOOKBACK_DAYS), to)
            .await?;

        let sentiment = if articles.is_empty() {
            None
        } else {
            let headlines: Vec<String> = articles
                .iter()
                .take(SENTIMENT_HEADLINES)
                .map(|a| a.headline.clone())
                .collect();
            match self.oracle.sentiment(symbol, &headlines).await {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Sentiment unavailable");
                    None
                }
            }
        };

        Ok(NewsDigest {
            articles,
            sentiment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::{MockForecaster, MockMarketData};
    use crate::domain::{ForecastError, Impact, Risk, Trend};

    fn sym(s: &str) -> Symbol {
        s.parse().unwrap()
    }

    fn closes(n: u64) -> Vec<Decimal> {
        (1..=n).map(|i| Decimal::from(100 + i)).collect()
    }

    fn canned_forecast() -> Forecast {
        Forecast {
            predicted: Decimal::from(120u64),
            confidence: Decimal::from_str_canonical("0.55").unwrap(),
            trend: Trend::Up,
        }
    }

    #[tokio::test]
    async fn test_forecast_returns_oracle_result() {
        let market = MockMarketData::new()
            .with_quote("AAPL", Decimal::from(110u64))
            .with_closes("AAPL", &closes(12));
        let oracle = MockForecaster::new().with_forecast(Ok(canned_forecast()));
        let service = MarketService::new(Arc::new(market), Arc::new(oracle));

        assert_eq!(service.forecast(&sym("AAPL")).await, Some(canned_forecast()));
    }

    #[tokio::test]
    async fn test_forecast_skipped_on_short_history() {
        let market = MockMarketData::new()
            .with_quote("AAPL", Decimal::from(110u64))
            .with_closes("AAPL", &closes(4));
        let oracle = MockForecaster::new().with_forecast(Ok(canned_forecast()));
        let service = MarketService::new(Arc::new(market), Arc::new(oracle.clone()));

        assert_eq!(service.forecast(&sym("AAPL")).await, None);
        assert_eq!(oracle.predict_calls(), 0);
    }

    #[tokio::test]
    async fn test_forecast_degrades_on_malformed_output() {
        let market = MockMarketData::new()
            .with_quote("AAPL", Decimal::from(110u64))
            .with_closes("AAPL", &closes(6));
        let oracle = MockForecaster::new()
            .with_forecast(Err(ForecastError::SchemaViolation("trend".to_string())));
        let service = MarketService::new(Arc::new(market), Arc::new(oracle));

        assert_eq!(service.forecast(&sym("AAPL")).await, None);
    }

    #[tokio::test]
    async fn test_news_with_sentiment() {
        let sentiment = Sentiment {
            sentiment: Decimal::from_str_canonical("0.8").unwrap(),
            impact: Impact::Positive,
            risk: Risk::Low,
            summary: "Upbeat.".to_string(),
        };
        let market = MockMarketData::new().with_headlines("AAPL", &["Beats estimates"]);
        let oracle = MockForecaster::new().with_sentiment(Ok(sentiment.clone()));
        let service = MarketService::new(Arc::new(market), Arc::new(oracle));

        let digest = service.news(&sym("AAPL")).await.unwrap();
        assert_eq!(digest.articles.len(), 1);
        assert_eq!(digest.sentiment, Some(sentiment));
    }

    #[tokio::test]
    async fn test_news_without_oracle() {
        let market = MockMarketData::new().with_headlines("AAPL", &["Beats estimates"]);
        let service = MarketService::new(Arc::new(market), Arc::new(MockForecaster::new()));

        let digest = service.news(&sym("AAPL")).await.unwrap();
        assert_eq!(digest.articles.len(), 1);
        assert_eq!(digest.sentiment, None);
    }

    #[tokio::test]
    async fn test_news_fetch_failure_is_error() {
        let market = MockMarketData::new().unavailable();
        let service = MarketService::new(Arc::new(market), Arc::new(MockForecaster::new()));
        assert!(service.news(&sym("AAPL")).await.is_err());
    }
}
