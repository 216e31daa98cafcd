//! REST market data: Finnhub for quotes, fundamentals, search and news;
//! Polygon for daily aggregates.

use super::http::{number, send_json, text};
use super::{DataSourceError, MarketData};
use crate::domain::{
    CompanyProfile, Decimal, NewsArticle, PricePoint, Quote, Symbol, SymbolMatch, TimeMs,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on articles returned per request.
pub const MAX_NEWS_ARTICLES: usize = 10;

const RETRY_BUDGET: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct RestMarketData {
    client: Client,
    finnhub_url: String,
    finnhub_key: String,
    polygon_url: String,
    polygon_key: String,
}

impl RestMarketData {
    pub fn new(
        finnhub_url: String,
        finnhub_key: String,
        polygon_url: String,
        polygon_key: String,
    ) -> Self {
        Self {
            client: Client::new(),
            finnhub_url,
            finnhub_key,
            polygon_url,
            polygon_key,
        }
    }

    async fn finnhub(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, DataSourceError> {
        let url = format!("{}/{}", self.finnhub_url, path);
        let request = self
            .client
            .get(&url)
            .query(query)
            .query(&[("token", self.finnhub_key.as_str())]);
        send_json(request, RETRY_BUDGET).await
    }
}

#[async_trait]
impl MarketData for RestMarketData {
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, DataSourceError> {
        debug!(symbol = %symbol, "Fetching quote");
        let body = self.finnhub("quote", &[("symbol", symbol.as_str())]).await?;
        parse_quote(symbol, &body)
    }

    async fn fetch_daily_series(
        &self,
        symbol: &Symbol,
        from: TimeMs,
        to: TimeMs,
    ) -> Result<Vec<PricePoint>, DataSourceError> {
        debug!(symbol = %symbol, from = from.as_ms(), to = to.as_ms(), "Fetching daily series");
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/1/day/{}/{}",
            self.polygon_url,
            symbol,
            from.to_date_string(),
            to.to_date_string()
        );
        let request = self.client.get(&url).query(&[
            ("adjusted", "true"),
            ("sort", "asc"),
            ("limit", "50000"),
            ("apiKey", self.polygon_key.as_str()),
        ]);
        let body = send_json(request, RETRY_BUDGET).await?;
        Ok(parse_daily_series(&body))
    }

    async fn fetch_profile(&self, symbol: &Symbol) -> Result<CompanyProfile, DataSourceError> {
        debug!(symbol = %symbol, "Fetching profile");
        let profile = self
            .finnhub("stock/profile2", &[("symbol", symbol.as_str())])
            .await?;
        let metrics = self
            .finnhub(
                "stock/metric",
                &[("symbol", symbol.as_str()), ("metric", "all")],
            )
            .await?;
        Ok(parse_profile(&profile, &metrics))
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, DataSourceError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let body = self.finnhub("search", &[("q", query)]).await?;
        Ok(parse_search(&body))
    }

    async fn fetch_news(
        &self,
        symbol: &Symbol,
        from: TimeMs,
        to: TimeMs,
    ) -> Result<Vec<NewsArticle>, DataSourceError> {
        let from = from.to_date_string();
        let to = to.to_date_string();
        let body = self
            .finnhub(
                "company-news",
                &[("symbol", symbol.as_str()), ("from", &from), ("to", &to)],
            )
            .await?;
        parse_news(&body)
    }
}

fn decimal(value: &Value, key: &str) -> Option<Decimal> {
    number(value, key).and_then(Decimal::from_f64)
}

/// Finnhub `/quote`: `{c, o, h, l, pc, d, dp}`. A zero or missing `c` means
/// the symbol is unknown.
fn parse_quote(symbol: &Symbol, body: &Value) -> Result<Quote, DataSourceError> {
    if !body.is_object() {
        return Err(DataSourceError::ParseError(
            "Expected object response".to_string(),
        ));
    }
    let current = decimal(body, "c")
        .filter(|c| c.is_positive())
        .ok_or_else(|| DataSourceError::NoData(format!("no quote for {}", symbol)))?;

    Ok(Quote {
        symbol: symbol.clone(),
        current,
        open: decimal(body, "o"),
        high: decimal(body, "h"),
        low: decimal(body, "l"),
        prev_close: decimal(body, "pc"),
        change: decimal(body, "d"),
        change_pct: decimal(body, "dp"),
    })
}

/// Polygon aggregates: `{results: [{t, c, ...}]}`. Missing `results` is an
/// empty series; malformed bars are skipped.
fn parse_daily_series(body: &Value) -> Vec<PricePoint> {
    let Some(results) = body.get("results").and_then(Value::as_array) else {
        return Vec::new();
    };

    results
        .iter()
        .filter_map(|bar| {
            let time_ms = bar.get("t").and_then(Value::as_i64);
            let close = decimal(bar, "c");
            match (time_ms, close) {
                (Some(t), Some(c)) => Some(PricePoint {
                    time_ms: TimeMs::new(t),
                    close: c,
                }),
                _ => {
                    warn!("Skipping malformed aggregate bar: {}", bar);
                    None
                }
            }
        })
        .collect()
}

fn parse_profile(profile: &Value, metrics: &Value) -> CompanyProfile {
    let empty = Value::Null;
    let metric = metrics.get("metric").unwrap_or(&empty);

    CompanyProfile {
        name: text(profile, "name"),
        exchange: text(profile, "exchange"),
        currency: text(profile, "currency"),
        market_cap: decimal(profile, "marketCapitalization"),
        pe_ttm: decimal(metric, "peTTM"),
        eps_ttm: decimal(metric, "epsTTM"),
        beta: decimal(metric, "beta"),
        week_high: decimal(metric, "52WeekHigh"),
        week_low: decimal(metric, "52WeekLow"),
        dividend_yield: decimal(metric, "dividendYieldIndicatedAnnual"),
    }
}

fn parse_search(body: &Value) -> Vec<SymbolMatch> {
    let Some(results) = body.get("result").and_then(Value::as_array) else {
        return Vec::new();
    };

    results
        .iter()
        .filter_map(|item| {
            let kind = text(item, "type")?;
            if kind != "Common Stock" && kind != "ETP" {
                return None;
            }
            Some(SymbolMatch {
                symbol: text(item, "symbol")?,
                description: text(item, "description").unwrap_or_default(),
                kind,
            })
        })
        .collect()
}

fn parse_news(body: &Value) -> Result<Vec<NewsArticle>, DataSourceError> {
    let items = body
        .as_array()
        .ok_or_else(|| DataSourceError::ParseError("Expected array response".to_string()))?;

    Ok(items
        .iter()
        .filter_map(|item| {
            Some(NewsArticle {
                headline: text(item, "headline")?,
                source: text(item, "source"),
                url: text(item, "url"),
                summary: text(item, "summary"),
                // Finnhub reports seconds.
                published_ms: item
                    .get("datetime")
                    .and_then(Value::as_i64)
                    .map(|s| TimeMs::new(s.saturating_mul(1000))),
            })
        })
        .take(MAX_NEWS_ARTICLES)
        .collect())
}
