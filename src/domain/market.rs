//! Display-only market data: quotes, price series, fundamentals, news.

use super::{Decimal, Symbol, TimeMs};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Latest quote for a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: Symbol,
    pub current: Decimal,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub prev_close: Option<Decimal>,
    pub change: Option<Decimal>,
    pub change_pct: Option<Decimal>,
}

/// One daily close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub time_ms: TimeMs,
    pub close: Decimal,
}

/// Company profile merged with headline fundamentals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub name: Option<String>,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    pub market_cap: Option<Decimal>,
    #[serde(rename = "peTTM")]
    pub pe_ttm: Option<Decimal>,
    #[serde(rename = "epsTTM")]
    pub eps_ttm: Option<Decimal>,
    pub beta: Option<Decimal>,
    pub week_high: Option<Decimal>,
    pub week_low: Option<Decimal>,
    pub dividend_yield: Option<Decimal>,
}

/// A search hit from the symbol lookup endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolMatch {
    pub symbol: String,
    pub description: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub headline: String,
    pub source: Option<String>,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub published_ms: Option<TimeMs>,
}

/// Chart window selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "6M")]
    SixMonths,
    #[default]
    #[serde(rename = "1Y")]
    OneYear,
}

impl Timeframe {
    /// Days of history covered. `1D` spans two days so a prior close is included.
    pub fn days(&self) -> i64 {
        match self {
            Timeframe::OneDay => 2,
            Timeframe::OneWeek => 7,
            Timeframe::OneMonth => 30,
            Timeframe::SixMonths => 180,
            Timeframe::OneYear => 365,
        }
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "1D" => Ok(Timeframe::OneDay),
            "1W" => Ok(Timeframe::OneWeek),
            "1M" => Ok(Timeframe::OneMonth),
            "6M" => Ok(Timeframe::SixMonths),
            "1Y" => Ok(Timeframe::OneYear),
            other => Err(format!("unknown timeframe {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_days() {
        assert_eq!("1d".parse::<Timeframe>().unwrap().days(), 2);
        assert_eq!("1W".parse::<Timeframe>().unwrap().days(), 7);
        assert_eq!("1M".parse::<Timeframe>().unwrap().days(), 30);
        assert_eq!("6M".parse::<Timeframe>().unwrap().days(), 180);
        assert_eq!(Timeframe::default().days(), 365);
        assert!("5Y".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_profile_field_names() {
        let profile = CompanyProfile {
            pe_ttm: Some(Decimal::from(30u64)),
            ..Default::default()
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["peTTM"], 30.0);
        assert!(json.get("weekHigh").is_some());
    }
}
