//! The per-user account aggregate: cash, positions, trade history, watchlist.

use super::{Decimal, Side, Symbol, TimeMs};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Store-assigned sequence number of an account document.
///
/// Every committed write increments it; writers must present the version they
/// read to have their write accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(pub i64);

impl Version {
    pub fn initial() -> Self {
        Version(1)
    }

    pub fn next(&self) -> Self {
        Version(self.0 + 1)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An open holding in one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Shares held; always > 0 while the position exists.
    pub qty: u64,
    /// Volume-weighted average cost over buys since the position was opened.
    pub avg_price: Decimal,
}

impl Position {
    /// Total cost basis (`qty * avg_price`), or None if it does not fit.
    pub fn cost_basis(&self) -> Option<Decimal> {
        Decimal::from(self.qty).checked_mul(self.avg_price)
    }
}

/// One committed buy or sell. Never edited after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    #[serde(rename = "type")]
    pub side: Side,
    pub symbol: Symbol,
    pub qty: u64,
    pub price: Decimal,
    /// Older documents used `time`; both are read, only `timestamp` is written.
    #[serde(alias = "time")]
    pub timestamp: TimeMs,
}

/// User-curated symbols, unique, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watchlist(Vec<Symbol>);

impl Watchlist {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.0.contains(symbol)
    }

    /// Append `symbol` unless present. Returns true if the list changed.
    pub fn add(&mut self, symbol: Symbol) -> bool {
        if self.contains(&symbol) {
            return false;
        }
        self.0.push(symbol);
        true
    }

    /// Remove `symbol` if present. Returns true if the list changed.
    pub fn remove(&mut self, symbol: &Symbol) -> bool {
        let before = self.0.len();
        self.0.retain(|s| s != symbol);
        self.0.len() != before
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drop duplicates left behind by older writers, keeping first occurrence.
    pub(crate) fn dedup(&mut self) -> bool {
        let before = self.0.len();
        let mut seen = Vec::with_capacity(before);
        self.0.retain(|s| {
            if seen.contains(s) {
                false
            } else {
                seen.push(s.clone());
                true
            }
        });
        self.0.len() != before
    }
}

impl FromIterator<Symbol> for Watchlist {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        let mut list = Watchlist::new();
        for symbol in iter {
            list.add(symbol);
        }
        list
    }
}

/// Account document as persisted per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub balance: Decimal,
    #[serde(rename = "portfolio", default)]
    pub positions: BTreeMap<Symbol, Position>,
    #[serde(default)]
    pub trades: Vec<TradeRecord>,
    #[serde(default)]
    pub watchlist: Watchlist,
}

impl Account {
    /// Fresh account holding only the starting allowance.
    pub fn opening(starting_balance: Decimal) -> Self {
        Self {
            balance: starting_balance,
            positions: BTreeMap::new(),
            trades: Vec::new(),
            watchlist: Watchlist::new(),
        }
    }

    pub fn position(&self, symbol: &Symbol) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// Shares held in `symbol`, zero when not held.
    pub fn held_qty(&self, symbol: &Symbol) -> u64 {
        self.position(symbol).map(|p| p.qty).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Symbol {
        s.parse().unwrap()
    }

    #[test]
    fn test_watchlist_add_remove() {
        let mut list = Watchlist::new();
        assert!(list.add(sym("AAPL")));
        assert!(list.add(sym("MSFT")));
        assert!(!list.add(sym("aapl")));
        assert_eq!(list.len(), 2);

        assert!(list.remove(&sym("AAPL")));
        assert!(!list.remove(&sym("AAPL")));
        assert_eq!(list.symbols(), &[sym("MSFT")]);
    }

    #[test]
    fn test_watchlist_dedup_keeps_first() {
        let mut list = Watchlist(vec![sym("TSLA"), sym("AAPL"), sym("TSLA")]);
        assert!(list.dedup());
        assert_eq!(list.symbols(), &[sym("TSLA"), sym("AAPL")]);
        assert!(!list.dedup());
    }

    #[test]
    fn test_account_document_shape() {
        let mut account = Account::opening(Decimal::from(100_000u64));
        account.positions.insert(
            sym("AAPL"),
            Position {
                qty: 10,
                avg_price: Decimal::from(150u64),
            },
        );
        account.trades.push(TradeRecord {
            side: Side::Buy,
            symbol: sym("AAPL"),
            qty: 10,
            price: Decimal::from(150u64),
            timestamp: TimeMs::new(1000),
        });
        account.watchlist.add(sym("NVDA"));

        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["balance"], 100000.0);
        assert_eq!(json["portfolio"]["AAPL"]["qty"], 10);
        assert_eq!(json["portfolio"]["AAPL"]["avgPrice"], 150.0);
        assert_eq!(json["trades"][0]["type"], "BUY");
        assert_eq!(json["trades"][0]["timestamp"], 1000);
        assert!(json["trades"][0].get("time").is_none());
        assert_eq!(json["watchlist"][0], "NVDA");
    }

    #[test]
    fn test_trade_record_accepts_legacy_time_field() {
        let record: TradeRecord = serde_json::from_value(serde_json::json!({
            "type": "SELL",
            "symbol": "aapl",
            "qty": 5,
            "price": 180,
            "time": 1700000000000i64
        }))
        .unwrap();
        assert_eq!(record.side, Side::Sell);
        assert_eq!(record.symbol, sym("AAPL"));
        assert_eq!(record.timestamp, TimeMs::new(1_700_000_000_000));
    }

    #[test]
    fn test_account_missing_collections_default_empty() {
        let account: Account = serde_json::from_str(r#"{"balance": 100000}"#).unwrap();
        assert!(account.positions.is_empty());
        assert!(account.trades.is_empty());
        assert!(account.watchlist.is_empty());
    }

    #[test]
    fn test_held_qty() {
        let mut account = Account::opening(Decimal::zero());
        assert_eq!(account.held_qty(&sym("AAPL")), 0);
        account.positions.insert(
            sym("AAPL"),
            Position {
                qty: 3,
                avg_price: Decimal::from(10u64),
            },
        );
        assert_eq!(account.held_qty(&sym("AAPL")), 3);
        assert_eq!(
            account.position(&sym("AAPL")).unwrap().cost_basis(),
            Some(Decimal::from(30u64))
        );
    }
}
