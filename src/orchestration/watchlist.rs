use super::ensure::{update_account, Change};
use super::{LedgerSettings, TradeError};
use crate::db::AccountStore;
use crate::domain::{Symbol, UserId};
use crate::engine::LedgerError;
use std::sync::Arc;
use tracing::debug;

/// Per-user symbol list stored on the account document.
///
/// Edits go through the same conditional write as trades, so they never
/// overwrite a concurrently committed trade.
#[derive(Clone)]
pub struct WatchlistService {
    store: Arc<dyn AccountStore>,
    settings: LedgerSettings,
}

impl WatchlistService {
    pub fn new(store: Arc<dyn AccountStore>, settings: LedgerSettings) -> Self {
        Self { store, settings }
    }

    /// The watchlist, persisting a normalized document if the stored one was
    /// in a legacy shape.
    pub async fn get(&self, uid: &UserId) -> Result<Vec<Symbol>, TradeError> {
        let committed = update_account(self.store.as_ref(), uid, &self.settings, |account| {
            Ok(Change::Unchanged(account.watchlist.symbols().to_vec()))
        })
        .await?;
        Ok(committed.value)
    }

    /// Append `symbol` unless already present. Adding twice writes once.
    pub async fn add(&self, uid: &UserId, symbol: &str) -> Result<Vec<Symbol>, TradeError> {
        let symbol = parse_symbol(symbol)?;
        let committed = update_account(self.store.as_ref(), uid, &self.settings, |account| {
            let mut next = account.clone();
            if next.watchlist.add(symbol.clone()) {
                let symbols = next.watchlist.symbols().to_vec();
                Ok(Change::Write(next, symbols))
            } else {
                Ok(Change::Unchanged(account.watchlist.symbols().to_vec()))
            }
        })
        .await?;
        debug!(uid = %uid, symbol = %symbol, version = %committed.version, "Watchlist add");
        Ok(committed.value)
    }

    /// Remove `symbol` if present. Removing an absent symbol is not an error.
    pub async fn remove(&self, uid: &UserId, symbol: &str) -> Result<Vec<Symbol>, TradeError> {
        let symbol = parse_symbol(symbol)?;
        let committed = update_account(self.store.as_ref(), uid, &self.settings, |account| {
            let mut next = account.clone();
            if next.watchlist.remove(&symbol) {
                let symbols = next.watchlist.symbols().to_vec();
                Ok(Change::Write(next, symbols))
            } else {
                Ok(Change::Unchanged(account.watchlist.symbols().to_vec()))
            }
        })
        .await?;
        debug!(uid = %uid, symbol = %symbol, version = %committed.version, "Watchlist remove");
        Ok(committed.value)
    }
}

fn parse_symbol(raw: &str) -> Result<Symbol, TradeError> {
    raw.parse()
        .map_err(|_| TradeError::Ledger(LedgerError::InvalidSymbol))
}
