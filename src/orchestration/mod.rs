//! Services that sequence store reads, engine calls and conditional writes.

pub mod ensure;
pub mod market;
pub mod trading;
pub mod watchlist;

pub use ensure::{ensure_account, update_account, Change, Committed};
pub use market::{MarketService, NewsDigest};
pub use trading::{OrderRequest, TradeError, TradeOutcome, TradingService};
pub use watchlist::WatchlistService;

use crate::config::Config;
use crate::domain::Decimal;

/// Account-wide knobs shared by every service that writes account documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    pub starting_balance: Decimal,
    /// Read-compute-write attempts before giving up on version conflicts.
    pub retry_limit: u32,
}

impl From<&Config> for LedgerSettings {
    fn from(config: &Config) -> Self {
        Self {
            starting_balance: config.starting_balance,
            retry_limit: config.trade_retry_limit,
        }
    }
}
