pub mod api;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use datasource::{DataSourceError, ForecastOracle, MarketData};
pub use db::{init_db, AccountStore, MemoryAccountStore, Repository, StoreError};
pub use domain::{Account, Decimal, Position, Side, Symbol, TimeMs, TradeRecord, UserId, Version};
pub use engine::LedgerError;
pub use error::AppError;
pub use orchestration::{LedgerSettings, TradeError};
