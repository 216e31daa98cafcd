//! Forecast oracle backed by an OpenAI-compatible chat completions endpoint.

use super::http::send_json;
use super::{ForecastOracle, PredictionInput};
use crate::domain::{parse_forecast, parse_sentiment, Forecast, ForecastError, Sentiment, Symbol};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::fmt::Write as _;
use std::time::Duration;
use tracing::debug;

/// Headlines shown to the model per sentiment request.
pub const SENTIMENT_HEADLINES: usize = 5;

const PREDICTION_TEMPERATURE: f64 = 0.3;
const SENTIMENT_TEMPERATURE: f64 = 0.2;
const RETRY_BUDGET: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ChatForecaster {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatForecaster {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
            model,
        }
    }

    async fn complete(&self, prompt: String, temperature: f64) -> Result<String, ForecastError> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = json!({
            "model": self.model,
            "temperature": temperature,
            "messages": [
                {
                    "role": "system",
                    "content": "You are a financial analyst. Reply with a single JSON object and nothing else."
                },
                { "role": "user", "content": prompt }
            ]
        });

        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload);
        let body = send_json(request, RETRY_BUDGET).await?;
        message_content(&body)
    }
}

#[async_trait]
impl ForecastOracle for ChatForecaster {
    async fn predict(&self, input: &PredictionInput) -> Result<Forecast, ForecastError> {
        debug!(symbol = %input.symbol, closes = input.recent_closes.len(), "Requesting forecast");
        let content = self
            .complete(prediction_prompt(input), PREDICTION_TEMPERATURE)
            .await?;
        parse_forecast(&content)
    }

    async fn sentiment(
        &self,
        symbol: &Symbol,
        headlines: &[String],
    ) -> Result<Sentiment, ForecastError> {
        debug!(symbol = %symbol, headlines = headlines.len(), "Requesting sentiment");
        let content = self
            .complete(sentiment_prompt(symbol, headlines), SENTIMENT_TEMPERATURE)
            .await?;
        parse_sentiment(&content)
    }
}

/// Stand-in used when no forecasting credentials are configured.
#[derive(Debug, Clone, Default)]
pub struct DisabledForecaster;

#[async_trait]
impl ForecastOracle for DisabledForecaster {
    async fn predict(&self, _input: &PredictionInput) -> Result<Forecast, ForecastError> {
        Err(ForecastError::Unavailable(
            "forecasting is not configured".to_string(),
        ))
    }

    async fn sentiment(
        &self,
        _symbol: &Symbol,
        _headlines: &[String],
    ) -> Result<Sentiment, ForecastError> {
        Err(ForecastError::Unavailable(
            "forecasting is not configured".to_string(),
        ))
    }
}

/// `choices[0].message.content` of a chat completion.
fn message_content(body: &Value) -> Result<String, ForecastError> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ForecastError::Unavailable("completion carried no content".to_string()))
}

fn prediction_prompt(input: &PredictionInput) -> String {
    let quote = &input.quote;
    let mut prompt = format!(
        "Predict the next trading day's closing price for {}.\nCurrent price: {}\n",
        input.symbol, quote.current
    );
    if let Some(change_pct) = quote.change_pct {
        let _ = writeln!(prompt, "Change today: {}%", change_pct);
    }
    if let Some(profile) = &input.profile {
        if let Some(name) = &profile.name {
            let _ = writeln!(prompt, "Company: {}", name);
        }
        if let Some(pe) = profile.pe_ttm {
            let _ = writeln!(prompt, "P/E (TTM): {}", pe);
        }
        if let Some(beta) = profile.beta {
            let _ = writeln!(prompt, "Beta: {}", beta);
        }
    }
    let closes: Vec<String> = input
        .recent_closes
        .iter()
        .map(|c| c.to_canonical_string())
        .collect();
    let _ = writeln!(prompt, "Recent closes (oldest first): {}", closes.join(", "));
    prompt.push_str(
        "Respond as {\"predicted\": number, \"confidence\": number between 0 and 1, \"trend\": \"UP\" | \"DOWN\" | \"FLAT\"}.",
    );
    prompt
}

fn sentiment_prompt(symbol: &Symbol, headlines: &[String]) -> String {
    let mut prompt = format!("Assess the news sentiment for {} from these headlines:\n", symbol);
    for headline in headlines.iter().take(SENTIMENT_HEADLINES) {
        let _ = writeln!(prompt, "- {}", headline);
    }
    prompt.push_str(
        "Respond as {\"sentiment\": number between 0 and 1, \"impact\": \"positive\" | \"negative\" | \"neutral\", \"risk\": \"low\" | \"medium\" | \"high\", \"summary\": string}.",
    );
    prompt
}
