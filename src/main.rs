use papertrade::datasource::{ChatForecaster, DisabledForecaster, RestMarketData};
use papertrade::{
    api, config::Config, db::init_db, AccountStore, ForecastOracle, LedgerSettings, MarketData,
    Repository,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    // Initialize database (runs schema and document migrations)
    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn AccountStore> = Arc::new(Repository::new(pool));
    let market: Arc<dyn MarketData> = Arc::new(RestMarketData::new(
        config.finnhub_api_url.clone(),
        config.finnhub_api_key.clone(),
        config.polygon_api_url.clone(),
        config.polygon_api_key.clone(),
    ));
    let oracle: Arc<dyn ForecastOracle> = match &config.forecast_api_key {
        Some(key) => Arc::new(ChatForecaster::new(
            config.forecast_api_url.clone(),
            key.clone(),
            config.forecast_model.clone(),
        )),
        None => {
            tracing::warn!("FORECAST_API_KEY not set; forecasts and sentiment are disabled");
            Arc::new(DisabledForecaster)
        }
    };

    let state = api::AppState::new(store, market, oracle, LedgerSettings::from(&config));
    let app = api::create_router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
