use crate::domain::Decimal;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub finnhub_api_url: String,
    pub finnhub_api_key: String,
    pub polygon_api_url: String,
    pub polygon_api_key: String,
    pub forecast_api_url: String,
    /// Forecasting is disabled when absent.
    pub forecast_api_key: Option<String>,
    pub forecast_model: String,
    pub starting_balance: Decimal,
    /// Attempts per trade/watchlist write before giving up on version conflicts.
    pub trade_retry_limit: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

const DEFAULT_FINNHUB_API_URL: &str = "https://finnhub.io/api/v1";
const DEFAULT_POLYGON_API_URL: &str = "https://api.polygon.io";
const DEFAULT_FORECAST_API_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_FORECAST_MODEL: &str = "llama-3.1-8b-instant";

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = required(&env_map, "DATABASE_PATH")?;
        let finnhub_api_key = required(&env_map, "FINNHUB_API_KEY")?;
        let polygon_api_key = required(&env_map, "POLYGON_API_KEY")?;

        let finnhub_api_url = with_default(&env_map, "FINNHUB_API_URL", DEFAULT_FINNHUB_API_URL);
        let polygon_api_url = with_default(&env_map, "POLYGON_API_URL", DEFAULT_POLYGON_API_URL);
        let forecast_api_url =
            with_default(&env_map, "FORECAST_API_URL", DEFAULT_FORECAST_API_URL);
        let forecast_model = with_default(&env_map, "FORECAST_MODEL", DEFAULT_FORECAST_MODEL);

        let forecast_api_key = env_map
            .get("FORECAST_API_KEY")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let starting_balance = env_map
            .get("STARTING_BALANCE")
            .map(|s| s.as_str())
            .unwrap_or("100000")
            .parse::<Decimal>()
            .ok()
            .filter(|d| !d.is_negative())
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "STARTING_BALANCE".to_string(),
                    "must be a non-negative decimal".to_string(),
                )
            })?;

        let trade_retry_limit = env_map
            .get("TRADE_RETRY_LIMIT")
            .map(|s| s.as_str())
            .unwrap_or("5")
            .parse::<u32>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "TRADE_RETRY_LIMIT".to_string(),
                    "must be an integer >= 1".to_string(),
                )
            })?;

        Ok(Config {
            port,
            database_path,
            finnhub_api_url,
            finnhub_api_key,
            polygon_api_url,
            polygon_api_key,
            forecast_api_url,
            forecast_api_key,
            forecast_model,
            starting_balance,
            trade_retry_limit,
        })
    }
}

fn required(env_map: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    env_map
        .get(key)
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
}

fn with_default(env_map: &HashMap<String, String>, key: &str, default: &str) -> String {
    env_map
        .get(key)
        .map(|s| s.trim_end_matches('/').to_string())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map.insert("FINNHUB_API_KEY".to_string(), "fh-key".to_string());
        map.insert("POLYGON_API_KEY".to_string(), "pg-key".to_string());
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.finnhub_api_url, "https://finnhub.io/api/v1");
        assert_eq!(config.polygon_api_url, "https://api.polygon.io");
        assert_eq!(config.forecast_model, "llama-3.1-8b-instant");
        assert_eq!(config.forecast_api_key, None);
        assert_eq!(config.starting_balance, Decimal::from(100_000u64));
        assert_eq!(config.trade_retry_limit, 5);
    }

    #[test]
    fn test_missing_database_path() {
        let mut env_map = setup_required_env();
        env_map.remove("DATABASE_PATH");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_missing_finnhub_key() {
        let mut env_map = setup_required_env();
        env_map.remove("FINNHUB_API_KEY");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "FINNHUB_API_KEY"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_negative_starting_balance() {
        let mut env_map = setup_required_env();
        env_map.insert("STARTING_BALANCE".to_string(), "-1".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "STARTING_BALANCE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_zero_retry_limit() {
        let mut env_map = setup_required_env();
        env_map.insert("TRADE_RETRY_LIMIT".to_string(), "0".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "TRADE_RETRY_LIMIT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_blank_forecast_key_disables_forecasting() {
        let mut env_map = setup_required_env();
        env_map.insert("FORECAST_API_KEY".to_string(), "  ".to_string());
        env_map.insert(
            "FINNHUB_API_URL".to_string(),
            "http://localhost:9000/".to_string(),
        );
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.forecast_api_key, None);
        assert_eq!(config.finnhub_api_url, "http://localhost:9000");
    }
}
