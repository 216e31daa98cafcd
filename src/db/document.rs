//! JSON codec for stored account documents.
//!
//! Canonical shape:
//! `{balance, portfolio: {SYM: {qty, avgPrice}}, trades: [{type, symbol, qty, price, timestamp}], watchlist: [SYM]}`.
//!
//! Older writers left documents without `watchlist` (or with a non-array one),
//! without `portfolio`/`trades`, and with trades stamped `time` instead of
//! `timestamp`. Those still decode; the caller is told the document needs
//! rewriting. A watchlist edit could also create the document before any
//! trade, leaving it without a `balance`; that decodes at a zero placeholder
//! and is reported as not yet opened.

use crate::domain::Account;
use serde_json::Value;

/// Decoded document plus whether the stored bytes were non-canonical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub account: Account,
    pub needs_normalization: bool,
    /// No balance was stored.
    pub needs_opening: bool,
}

/// Serialize an account in canonical form.
pub fn encode(account: &Account) -> Result<String, String> {
    serde_json::to_string(account).map_err(|e| e.to_string())
}

/// Parse a stored document, tolerating legacy shapes.
pub fn decode(raw: &str) -> Result<Decoded, String> {
    let mut value: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| "document is not a JSON object".to_string())?;

    let mut legacy = false;

    let needs_opening = object.get("balance").map_or(true, Value::is_null);
    if needs_opening {
        object.insert("balance".to_string(), Value::from(0));
        legacy = true;
    }

    if !object.get("watchlist").is_some_and(Value::is_array) {
        object.remove("watchlist");
        legacy = true;
    }
    if !object.get("portfolio").is_some_and(Value::is_object) {
        object.remove("portfolio");
        legacy = true;
    }
    if !object.get("trades").is_some_and(Value::is_array) {
        object.remove("trades");
        legacy = true;
    }
    if let Some(Value::Array(trades)) = object.get("trades") {
        legacy |= trades
            .iter()
            .any(|t| t.get("timestamp").is_none() && t.get("time").is_some());
    }

    let mut account: Account = serde_json::from_value(value).map_err(|e| e.to_string())?;
    legacy |= account.watchlist.dedup();

    Ok(Decoded {
        account,
        needs_normalization: legacy,
        needs_opening,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, Side, Symbol, TimeMs};

    #[test]
    fn test_canonical_document_is_not_legacy() {
        let account = Account::opening(Decimal::from(100_000u64));
        let raw = encode(&account).unwrap();
        let decoded = decode(&raw).unwrap();
        assert_eq!(decoded.account, account);
        assert!(!decoded.needs_normalization);
    }

    #[test]
    fn test_legacy_time_field_is_flagged_and_read() {
        let raw = r#"{
            "balance": 98500,
            "portfolio": {"AAPL": {"qty": 10, "avgPrice": 150}},
            "trades": [{"type": "BUY", "symbol": "AAPL", "qty": 10, "price": 150, "time": 1700000000000}],
            "watchlist": []
        }"#;
        let decoded = decode(raw).unwrap();
        assert!(decoded.needs_normalization);
        assert_eq!(decoded.account.trades[0].side, Side::Buy);
        assert_eq!(
            decoded.account.trades[0].timestamp,
            TimeMs::new(1_700_000_000_000)
        );

        let rewritten = encode(&decoded.account).unwrap();
        assert!(rewritten.contains("\"timestamp\""));
        assert!(!rewritten.contains("\"time\""));
        assert!(!decode(&rewritten).unwrap().needs_normalization);
    }

    #[test]
    fn test_missing_watchlist_is_flagged() {
        let raw = r#"{"balance": 100000, "portfolio": {}, "trades": []}"#;
        let decoded = decode(raw).unwrap();
        assert!(decoded.needs_normalization);
        assert!(decoded.account.watchlist.is_empty());
    }

    #[test]
    fn test_watchlist_only_document_needs_opening() {
        let raw = r#"{"watchlist": ["AAPL"]}"#;
        let decoded = decode(raw).unwrap();
        assert!(decoded.needs_opening);
        assert!(decoded.needs_normalization);
        assert!(decoded.account.balance.is_zero());
        assert!(decoded.account.positions.is_empty());
        assert!(decoded.account.trades.is_empty());
        assert_eq!(decoded.account.watchlist.symbols().len(), 1);

        let null_balance = decode(r#"{"balance": null, "portfolio": {}}"#).unwrap();
        assert!(null_balance.needs_opening);
    }

    #[test]
    fn test_stored_zero_balance_is_opened() {
        let raw = r#"{"balance": 0, "portfolio": {}, "trades": [], "watchlist": []}"#;
        let decoded = decode(raw).unwrap();
        assert!(!decoded.needs_opening);
        assert!(!decoded.needs_normalization);
    }

    #[test]
    fn test_non_array_watchlist_is_replaced() {
        let raw = r#"{"balance": 1, "portfolio": {}, "trades": [], "watchlist": "AAPL"}"#;
        let decoded = decode(raw).unwrap();
        assert!(decoded.needs_normalization);
        assert!(decoded.account.watchlist.is_empty());
    }

    #[test]
    fn test_duplicate_watchlist_entries_are_collapsed() {
        let raw = r#"{"balance": 1, "portfolio": {}, "trades": [], "watchlist": ["aapl", "AAPL", "MSFT"]}"#;
        let decoded = decode(raw).unwrap();
        assert!(decoded.needs_normalization);
        let symbols: Vec<&str> = decoded
            .account
            .watchlist
            .symbols()
            .iter()
            .map(Symbol::as_str)
            .collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(decode("not json").is_err());
        assert!(decode("[1,2]").is_err());
        assert!(decode(r#"{"balance": "lots"}"#).is_err());
    }
}
