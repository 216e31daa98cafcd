use crate::domain::{Account, Decimal, Position, Side, Symbol, TimeMs, TradeRecord};
use thiserror::Error;

/// Reasons a buy or sell is refused. The account is never modified when one
/// of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("quantity must be a positive whole number, got {0}")]
    InvalidQuantity(String),
    #[error("price must be a non-negative finite number, got {0}")]
    InvalidPrice(String),
    #[error("symbol must not be empty")]
    InvalidSymbol,
    #[error("insufficient funds: order costs {required}, balance is {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },
    #[error("insufficient shares of {symbol}: requested {requested}, held {held}")]
    InsufficientShares {
        symbol: Symbol,
        requested: u64,
        held: u64,
    },
    #[error("no position in {0}")]
    NoSuchPosition(Symbol),
    #[error("order value is too large to represent")]
    Overflow,
}

impl LedgerError {
    /// Stable machine-readable code reported to clients.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidQuantity(_) => "INVALID_QUANTITY",
            LedgerError::InvalidPrice(_) => "INVALID_PRICE",
            LedgerError::InvalidSymbol => "INVALID_SYMBOL",
            LedgerError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            LedgerError::InsufficientShares { .. } => "INSUFFICIENT_SHARES",
            LedgerError::NoSuchPosition(_) => "NO_SUCH_POSITION",
            LedgerError::Overflow => "INVALID_INPUT",
        }
    }

    /// True for malformed requests, as opposed to well-formed orders the
    /// account cannot satisfy.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidQuantity(_)
                | LedgerError::InvalidPrice(_)
                | LedgerError::InvalidSymbol
                | LedgerError::Overflow
        )
    }
}

/// A validated order: normalized symbol, whole positive quantity, price >= 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub side: Side,
    pub symbol: Symbol,
    pub qty: u64,
    pub price: Decimal,
}

impl Order {
    /// Validate raw order fields.
    ///
    /// # Errors
    /// `InvalidSymbol`, `InvalidQuantity` or `InvalidPrice`.
    pub fn new(side: Side, symbol: &str, qty: Decimal, price: Decimal) -> Result<Self, LedgerError> {
        let symbol: Symbol = symbol.parse().map_err(|_| LedgerError::InvalidSymbol)?;
        let qty = qty
            .to_u64_exact()
            .filter(|q| *q > 0)
            .ok_or_else(|| LedgerError::InvalidQuantity(qty.to_string()))?;
        Ok(Order {
            side,
            symbol,
            qty,
            price: check_price(price)?,
        })
    }

    /// The same order filled at `price` instead, e.g. a live quote resolved
    /// after the other fields were validated.
    pub fn at_price(self, price: Decimal) -> Result<Self, LedgerError> {
        Ok(Order {
            price: check_price(price)?,
            ..self
        })
    }

    /// The trade history entry for this order filled at `at`.
    pub fn record(&self, at: TimeMs) -> TradeRecord {
        TradeRecord {
            side: self.side,
            symbol: self.symbol.clone(),
            qty: self.qty,
            price: self.price,
            timestamp: at,
        }
    }

    /// `qty * price`.
    pub fn notional(&self) -> Result<Decimal, LedgerError> {
        Decimal::from(self.qty)
            .checked_mul(self.price)
            .ok_or(LedgerError::Overflow)
    }
}

fn check_price(price: Decimal) -> Result<Decimal, LedgerError> {
    if price.is_negative() {
        return Err(LedgerError::InvalidPrice(price.to_string()));
    }
    Ok(price)
}

/// Buy `qty` shares of `symbol` at `price`.
pub fn buy(
    account: &Account,
    symbol: &str,
    qty: Decimal,
    price: Decimal,
    at: TimeMs,
) -> Result<Account, LedgerError> {
    let order = Order::new(Side::Buy, symbol, qty, price)?;
    execute(account, &order, at)
}

/// Sell `qty` shares of `symbol` at `price`.
pub fn sell(
    account: &Account,
    symbol: &str,
    qty: Decimal,
    price: Decimal,
    at: TimeMs,
) -> Result<Account, LedgerError> {
    let order = Order::new(Side::Sell, symbol, qty, price)?;
    execute(account, &order, at)
}

/// Apply a validated order to a snapshot and return the next account state.
///
/// The input is never mutated; on error the caller still holds the untouched
/// snapshot.
pub fn execute(account: &Account, order: &Order, at: TimeMs) -> Result<Account, LedgerError> {
    match order.side {
        Side::Buy => apply_buy(account, order, at),
        Side::Sell => apply_sell(account, order, at),
    }
}

fn apply_buy(account: &Account, order: &Order, at: TimeMs) -> Result<Account, LedgerError> {
    let cost = order.notional()?;
    if cost > account.balance {
        return Err(LedgerError::InsufficientFunds {
            required: cost,
            available: account.balance,
        });
    }

    let mut next = account.clone();
    next.balance = account.balance - cost;

    match next.positions.get_mut(&order.symbol) {
        Some(position) => {
            let new_qty = position
                .qty
                .checked_add(order.qty)
                .ok_or(LedgerError::Overflow)?;
            let old_value = Decimal::from(position.qty)
                .checked_mul(position.avg_price)
                .ok_or(LedgerError::Overflow)?;
            let total_value = old_value.checked_add(cost).ok_or(LedgerError::Overflow)?;
            // new_qty >= order.qty > 0
            position.avg_price = total_value
                .checked_div(Decimal::from(new_qty))
                .ok_or(LedgerError::Overflow)?;
            position.qty = new_qty;
        }
        None => {
            next.positions.insert(
                order.symbol.clone(),
                Position {
                    qty: order.qty,
                    avg_price: order.price,
                },
            );
        }
    }

    next.trades.push(order.record(at));
    Ok(next)
}

fn apply_sell(account: &Account, order: &Order, at: TimeMs) -> Result<Account, LedgerError> {
    let held = account
        .position(&order.symbol)
        .ok_or_else(|| LedgerError::NoSuchPosition(order.symbol.clone()))?
        .qty;
    if order.qty > held {
        return Err(LedgerError::InsufficientShares {
            symbol: order.symbol.clone(),
            requested: order.qty,
            held,
        });
    }
    let proceeds = order.notional()?;

    let mut next = account.clone();
    next.balance = account
        .balance
        .checked_add(proceeds)
        .ok_or(LedgerError::Overflow)?;

    let remaining = held - order.qty;
    if remaining == 0 {
        next.positions.remove(&order.symbol);
    } else if let Some(position) = next.positions.get_mut(&order.symbol) {
        position.qty = remaining;
    }

    next.trades.push(order.record(at));
    Ok(next)
}
