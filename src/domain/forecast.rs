//! Advisory forecast and sentiment signals, and the validation boundary that
//! turns free-form model output into them.
//!
//! Nothing here ever gates a ledger operation. Upstream text is parsed as JSON
//! first and then checked field by field; anything that fails either step is
//! reported as a [`ForecastError`] and callers degrade to "no result".

use super::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

/// Next-period price prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forecast {
    pub predicted: Decimal,
    /// In `[0, 1]`.
    pub confidence: Decimal,
    pub trend: Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Low,
    Medium,
    High,
}

/// News sentiment score for a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentiment {
    /// In `[0, 1]`, 1 being most positive.
    pub sentiment: Decimal,
    pub impact: Impact,
    pub risk: Risk,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForecastError {
    /// The oracle could not be reached or returned no content.
    #[error("forecast oracle unavailable: {0}")]
    Unavailable(String),
    /// The content was not JSON.
    #[error("forecast response is not valid JSON: {0}")]
    Parse(String),
    /// JSON was well-formed but did not match the expected schema.
    #[error("forecast response violates schema: {0}")]
    SchemaViolation(String),
}

/// Remove markdown code fences models like to wrap JSON in.
pub fn strip_code_fences(raw: &str) -> String {
    let mut out = raw.trim().to_string();
    for fence in ["```json", "```JSON", "```Json"] {
        out = out.replace(fence, "");
    }
    out.replace("```", "").trim().to_string()
}

fn parse_object(raw: &str) -> Result<serde_json::Map<String, Value>, ForecastError> {
    let cleaned = strip_code_fences(raw);
    let value: Value =
        serde_json::from_str(&cleaned).map_err(|e| ForecastError::Parse(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ForecastError::SchemaViolation(format!(
            "expected object, got {}",
            other
        ))),
    }
}

fn number_field(
    map: &serde_json::Map<String, Value>,
    name: &str,
) -> Result<Decimal, ForecastError> {
    map.get(name)
        .and_then(Value::as_f64)
        .and_then(Decimal::from_f64)
        .ok_or_else(|| ForecastError::SchemaViolation(format!("{} must be a number", name)))
}

fn unit_interval_field(
    map: &serde_json::Map<String, Value>,
    name: &str,
) -> Result<Decimal, ForecastError> {
    let value = number_field(map, name)?;
    if value.is_negative() || value > Decimal::from(1u64) {
        return Err(ForecastError::SchemaViolation(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )));
    }
    Ok(value)
}

fn enum_field<T: serde::de::DeserializeOwned>(
    map: &serde_json::Map<String, Value>,
    name: &str,
) -> Result<T, ForecastError> {
    let value = map
        .get(name)
        .ok_or_else(|| ForecastError::SchemaViolation(format!("missing {}", name)))?;
    serde_json::from_value(value.clone())
        .map_err(|_| ForecastError::SchemaViolation(format!("unexpected {}: {}", name, value)))
}

/// Parse and validate a prediction payload.
pub fn parse_forecast(raw: &str) -> Result<Forecast, ForecastError> {
    let map = parse_object(raw)?;
    let predicted = number_field(&map, "predicted")?;
    if predicted.is_negative() {
        return Err(ForecastError::SchemaViolation(
            "predicted must not be negative".to_string(),
        ));
    }
    Ok(Forecast {
        predicted,
        confidence: unit_interval_field(&map, "confidence")?,
        trend: enum_field(&map, "trend")?,
    })
}

/// Parse and validate a sentiment payload.
pub fn parse_sentiment(raw: &str) -> Result<Sentiment, ForecastError> {
    let map = parse_object(raw)?;
    let summary = map
        .get("summary")
        .and_then(Value::as_str)
        .ok_or_else(|| ForecastError::SchemaViolation("summary must be a string".to_string()))?
        .to_string();
    Ok(Sentiment {
        sentiment: unit_interval_field(&map, "sentiment")?,
        impact: enum_field(&map, "impact")?,
        risk: enum_field(&map, "risk")?,
        summary,
    })
}
