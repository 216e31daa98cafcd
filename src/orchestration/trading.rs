use super::ensure::{ensure_account, update_account, Change};
use super::LedgerSettings;
use crate::datasource::{DataSourceError, MarketData};
use crate::db::{AccountRecord, AccountStore, AccountSubscription, StoreError};
use crate::domain::{Decimal, Side, Symbol, TimeMs, TradeRecord, UserId, Version};
use crate::engine::ledger::execute;
use crate::engine::{value_portfolio, LedgerError, Order, PortfolioValuation, ValuationOverflow};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum TradeError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Every attempt lost the race to a concurrent writer.
    #[error("account was modified concurrently; gave up after {attempts} attempts")]
    Conflict { attempts: u32 },
    #[error("market data unavailable: {0}")]
    Adapter(#[from] DataSourceError),
    #[error(transparent)]
    Valuation(#[from] ValuationOverflow),
}

/// An order as submitted, before validation.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub side: Side,
    pub symbol: String,
    pub qty: Decimal,
    /// Fill at the current quote when absent.
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub trade: TradeRecord,
    pub balance: Decimal,
    pub version: Version,
}

#[derive(Clone)]
pub struct TradingService {
    store: Arc<dyn AccountStore>,
    market: Arc<dyn MarketData>,
    settings: LedgerSettings,
}

impl TradingService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        market: Arc<dyn MarketData>,
        settings: LedgerSettings,
    ) -> Self {
        Self {
            store,
            market,
            settings,
        }
    }

    /// Current account snapshot, opening the account on first access.
    pub async fn account(&self, uid: &UserId) -> Result<AccountRecord, TradeError> {
        Ok(ensure_account(self.store.as_ref(), uid, &self.settings).await?)
    }

    /// Validate and execute an order.
    ///
    /// Validation that does not depend on account state happens once up front.
    /// Funds and holdings are checked against a fresh snapshot on every attempt.
    pub async fn submit(
        &self,
        uid: &UserId,
        request: OrderRequest,
    ) -> Result<TradeOutcome, TradeError> {
        let mut order = Order::new(
            request.side,
            &request.symbol,
            request.qty,
            request.price.unwrap_or_else(Decimal::zero),
        )?;

        if request.price.is_none() {
            let quote = self.market.fetch_quote(&order.symbol).await?;
            order = order.at_price(quote.current)?;
        }

        let committed = update_account(self.store.as_ref(), uid, &self.settings, |account| {
            let at = TimeMs::now();
            let next = execute(account, &order, at)?;
            Ok(Change::Write(next, order.record(at)))
        })
        .await?;

        info!(
            uid = %uid,
            side = %order.side,
            symbol = %order.symbol,
            qty = order.qty,
            price = %order.price,
            version = %committed.version,
            "Trade committed"
        );

        Ok(TradeOutcome {
            trade: committed.value,
            balance: committed.account.balance,
            version: committed.version,
        })
    }

    /// Trade history in execution order, optionally for one symbol.
    pub async fn trades(
        &self,
        uid: &UserId,
        symbol: Option<&Symbol>,
    ) -> Result<Vec<TradeRecord>, TradeError> {
        let record = self.account(uid).await?;
        Ok(record
            .account
            .trades
            .into_iter()
            .filter(|t| symbol.map_or(true, |s| &t.symbol == s))
            .collect())
    }

    /// Mark open positions to the latest quotes.
    ///
    /// A symbol whose quote cannot be fetched is valued at cost.
    pub async fn portfolio(&self, uid: &UserId) -> Result<PortfolioValuation, TradeError> {
        let record = self.account(uid).await?;
        let symbols: Vec<Symbol> = record.account.positions.keys().cloned().collect();

        let quotes = join_all(symbols.iter().map(|s| self.market.fetch_quote(s))).await;

        let mut prices = HashMap::new();
        for (symbol, quote) in symbols.into_iter().zip(quotes) {
            match quote {
                Ok(q) => {
                    prices.insert(symbol, q.current);
                }
                Err(e) => warn!(symbol = %symbol, error = %e, "Quote unavailable, valuing at cost"),
            }
        }

        Ok(value_portfolio(&record.account, &prices)?)
    }

    pub fn subscribe(&self, uid: &UserId) -> AccountSubscription {
        self.store.subscribe(uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockMarketData;
    use crate::db::MemoryAccountStore;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn uid(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    fn service(market: MockMarketData) -> (TradingService, Arc<MemoryAccountStore>) {
        let store = Arc::new(MemoryAccountStore::new());
        let service = TradingService::new(
            store.clone(),
            Arc::new(market),
            LedgerSettings {
                starting_balance: d("100000"),
                retry_limit: 5,
            },
        );
        (service, store)
    }

    fn order(side: Side, symbol: &str, qty: u64, price: Option<&str>) -> OrderRequest {
        OrderRequest {
            side,
            symbol: symbol.to_string(),
            qty: Decimal::from(qty),
            price: price.map(d),
        }
    }

    #[tokio::test]
    async fn test_buy_with_explicit_price() {
        let (service, _) = service(MockMarketData::new());
        let outcome = service
            .submit(&uid("u1"), order(Side::Buy, "aapl", 10, Some("150")))
            .await
            .unwrap();

        assert_eq!(outcome.balance, d("98500"));
        assert_eq!(outcome.trade.symbol.as_str(), "AAPL");
        // Opening the account is version 1, the trade version 2.
        assert_eq!(outcome.version, Version(2));
    }

    #[tokio::test]
    async fn test_missing_price_uses_quote() {
        let market = MockMarketData::new().with_quote("MSFT", d("400"));
        let (service, _) = service(market.clone());
        let outcome = service
            .submit(&uid("u1"), order(Side::Buy, "MSFT", 2, None))
            .await
            .unwrap();
        assert_eq!(outcome.trade.price, d("400"));
        assert_eq!(outcome.balance, d("99200"));
        assert_eq!(market.quote_calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_price_without_quote_is_adapter_error() {
        let (service, store) = service(MockMarketData::new());
        let err = service
            .submit(&uid("u1"), order(Side::Buy, "ZZZZ", 1, None))
            .await
            .unwrap_err();
        assert!(matches!(err, TradeError::Adapter(DataSourceError::NoData(_))));
        assert!(store.read(&uid("u1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_order_rejected_before_quote() {
        let market = MockMarketData::new().with_quote("AAPL", d("1"));
        let (service, _) = service(market.clone());
        let err = service
            .submit(&uid("u1"), order(Side::Buy, "AAPL", 0, None))
            .await
            .unwrap_err();
        assert!(matches!(err, TradeError::Ledger(LedgerError::InvalidQuantity(_))));
        assert_eq!(market.quote_calls(), 0);
    }

    #[tokio::test]
    async fn test_negative_quote_price_is_refused() {
        let market = MockMarketData::new().with_quote("X", d("-5"));
        let (service, store) = service(market);
        let err = service
            .submit(&uid("u1"), order(Side::Buy, "X", 10, None))
            .await
            .unwrap_err();
        assert!(matches!(err, TradeError::Ledger(LedgerError::InvalidPrice(_))));
        assert!(store.read(&uid("u1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejected_trade_leaves_account_untouched() {
        let (service, _) = service(MockMarketData::new());
        let err = service
            .submit(&uid("u1"), order(Side::Sell, "AAPL", 1, Some("10")))
            .await
            .unwrap_err();
        assert!(matches!(err, TradeError::Ledger(LedgerError::NoSuchPosition(_))));

        let record = service.account(&uid("u1")).await.unwrap();
        assert_eq!(record.account.balance, d("100000"));
        assert!(record.account.trades.is_empty());
        assert_eq!(record.version, Version::initial());
    }

    #[tokio::test]
    async fn test_trades_filter_by_symbol() {
        let (service, _) = service(MockMarketData::new());
        let u = uid("u1");
        service.submit(&u, order(Side::Buy, "AAPL", 1, Some("10"))).await.unwrap();
        service.submit(&u, order(Side::Buy, "MSFT", 1, Some("20"))).await.unwrap();
        service.submit(&u, order(Side::Sell, "AAPL", 1, Some("12"))).await.unwrap();

        assert_eq!(service.trades(&u, None).await.unwrap().len(), 3);
        let aapl: Symbol = "AAPL".parse().unwrap();
        let filtered = service.trades(&u, Some(&aapl)).await.unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[1].side, Side::Sell);
    }

    #[tokio::test]
    async fn test_portfolio_survives_oversized_position() {
        let market = MockMarketData::new().with_quote("X", d("10000000000"));
        let (service, _) = service(market);
        let u = uid("u1");
        service
            .submit(&u, order(Side::Buy, "X", u64::MAX, Some("0")))
            .await
            .unwrap();

        let valuation = service.portfolio(&u).await.unwrap();
        assert!(!valuation.fully_priced);
        assert_eq!(valuation.positions[0].market_value, None);
        assert_eq!(valuation.total_value, d("100000"));
    }

    #[tokio::test]
    async fn test_portfolio_falls_back_to_cost() {
        let market = MockMarketData::new().with_quote("AAPL", d("160"));
        let (service, _) = service(market);
        let u = uid("u1");
        service.submit(&u, order(Side::Buy, "AAPL", 10, Some("150"))).await.unwrap();
        service.submit(&u, order(Side::Buy, "MSFT", 1, Some("300"))).await.unwrap();

        let valuation = service.portfolio(&u).await.unwrap();
        assert!(!valuation.fully_priced);
        // 1600 at market + 300 at cost.
        assert_eq!(valuation.holdings_value, d("1900"));
        assert_eq!(valuation.total_value, d("100100"));
    }
}
