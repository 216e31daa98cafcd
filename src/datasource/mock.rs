//! In-process collaborators for tests and offline runs.

use super::{DataSourceError, ForecastOracle, MarketData, PredictionInput};
use crate::domain::{
    CompanyProfile, Decimal, Forecast, ForecastError, NewsArticle, PricePoint, Quote, Sentiment,
    Symbol, SymbolMatch, TimeMs,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Market data served from predefined fixtures.
#[derive(Debug, Clone, Default)]
pub struct MockMarketData {
    quotes: HashMap<String, Decimal>,
    series: HashMap<String, Vec<PricePoint>>,
    profiles: HashMap<String, CompanyProfile>,
    news: HashMap<String, Vec<NewsArticle>>,
    matches: Vec<SymbolMatch>,
    unavailable: bool,
    quote_calls: Arc<AtomicUsize>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(mut self, symbol: &str, price: Decimal) -> Self {
        self.quotes.insert(fixture_symbol(symbol), price);
        self
    }

    /// Daily closes, oldest first, one day apart ending at `TimeMs::now()`.
    pub fn with_closes(mut self, symbol: &str, closes: &[Decimal]) -> Self {
        let now = TimeMs::now();
        let count = closes.len() as i64;
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, close)| PricePoint {
                time_ms: now.minus_days(count - 1 - i as i64),
                close: *close,
            })
            .collect();
        self.series.insert(fixture_symbol(symbol), points);
        self
    }

    pub fn with_profile(mut self, symbol: &str, profile: CompanyProfile) -> Self {
        self.profiles.insert(fixture_symbol(symbol), profile);
        self
    }

    pub fn with_headlines(mut self, symbol: &str, headlines: &[&str]) -> Self {
        let articles = headlines
            .iter()
            .map(|h| NewsArticle {
                headline: h.to_string(),
                source: None,
                url: None,
                summary: None,
                published_ms: None,
            })
            .collect();
        self.news.insert(fixture_symbol(symbol), articles);
        self
    }

    pub fn with_match(mut self, symbol: &str, description: &str) -> Self {
        self.matches.push(SymbolMatch {
            symbol: symbol.to_string(),
            description: description.to_string(),
            kind: "Common Stock".to_string(),
        });
        self
    }

    /// Make every call fail as if the upstream were unreachable.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Number of quote lookups served so far.
    pub fn quote_calls(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), DataSourceError> {
        if self.unavailable {
            return Err(DataSourceError::NetworkError(
                "mock upstream unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fixture keys are normalized the way request symbols are.
fn fixture_symbol(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[async_trait]
impl MarketData for MockMarketData {
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, DataSourceError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let current = self
            .quotes
            .get(symbol.as_str())
            .copied()
            .ok_or_else(|| DataSourceError::NoData(format!("no quote for {}", symbol)))?;
        Ok(Quote {
            symbol: symbol.clone(),
            current,
            open: None,
            high: None,
            low: None,
            prev_close: None,
            change: None,
            change_pct: None,
        })
    }

    async fn fetch_daily_series(
        &self,
        symbol: &Symbol,
        from: TimeMs,
        to: TimeMs,
    ) -> Result<Vec<PricePoint>, DataSourceError> {
        self.check()?;
        Ok(self
            .series
            .get(symbol.as_str())
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.time_ms >= from && p.time_ms <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_profile(&self, symbol: &Symbol) -> Result<CompanyProfile, DataSourceError> {
        self.check()?;
        Ok(self.profiles.get(symbol.as_str()).cloned().unwrap_or_default())
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, DataSourceError> {
        self.check()?;
        let needle = query.trim().to_uppercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .matches
            .iter()
            .filter(|m| {
                m.symbol.contains(&needle) || m.description.to_uppercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn fetch_news(
        &self,
        symbol: &Symbol,
        _from: TimeMs,
        _to: TimeMs,
    ) -> Result<Vec<NewsArticle>, DataSourceError> {
        self.check()?;
        Ok(self.news.get(symbol.as_str()).cloned().unwrap_or_default())
    }
}

/// Oracle replaying canned results.
#[derive(Debug, Clone)]
pub struct MockForecaster {
    forecast: Result<Forecast, ForecastError>,
    sentiment: Result<Sentiment, ForecastError>,
    predict_calls: Arc<AtomicUsize>,
}

impl MockForecaster {
    /// Every call fails with `Unavailable` until configured otherwise.
    pub fn new() -> Self {
        Self {
            forecast: Err(ForecastError::Unavailable("no canned forecast".to_string())),
            sentiment: Err(ForecastError::Unavailable("no canned sentiment".to_string())),
            predict_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_forecast(mut self, forecast: Result<Forecast, ForecastError>) -> Self {
        self.forecast = forecast;
        self
    }

    pub fn with_sentiment(mut self, sentiment: Result<Sentiment, ForecastError>) -> Self {
        self.sentiment = sentiment;
        self
    }

    pub fn predict_calls(&self) -> usize {
        self.predict_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockForecaster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ForecastOracle for MockForecaster {
    async fn predict(&self, _input: &PredictionInput) -> Result<Forecast, ForecastError> {
        self.predict_calls.fetch_add(1, Ordering::SeqCst);
        self.forecast.clone()
    }

    async fn sentiment(
        &self,
        _symbol: &Symbol,
        _headlines: &[String],
    ) -> Result<Sentiment, ForecastError> {
        self.sentiment.clone()
    }
}
