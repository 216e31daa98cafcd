//! Mark-to-market view of an account. Read-only; never feeds back into the ledger.

use crate::domain::{Account, Decimal, Position, Side, Symbol, TradeRecord};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// A cost basis or portfolio total does not fit in a `Decimal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("portfolio value is too large to represent")]
pub struct ValuationOverflow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionValuation {
    pub symbol: Symbol,
    pub qty: u64,
    pub avg_price: Decimal,
    pub cost_basis: Decimal,
    /// None when no quote was available for the symbol.
    pub last_price: Option<Decimal>,
    /// None when unquoted or when `qty * last_price` does not fit.
    pub market_value: Option<Decimal>,
    pub unrealized_pnl: Option<Decimal>,
    pub unrealized_pnl_pct: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioValuation {
    pub balance: Decimal,
    pub positions: Vec<PositionValuation>,
    /// Sum of market values, falling back to cost basis for unpriced positions.
    pub holdings_value: Decimal,
    pub total_value: Decimal,
    pub realized_pnl: Decimal,
    /// False if any position had to fall back to cost basis.
    pub fully_priced: bool,
}

/// Value every open position at the supplied prices.
pub fn value_portfolio(
    account: &Account,
    prices: &HashMap<Symbol, Decimal>,
) -> Result<PortfolioValuation, ValuationOverflow> {
    let positions = account
        .positions
        .iter()
        .map(|(symbol, position)| value_position(symbol, position, prices.get(symbol).copied()))
        .collect::<Result<Vec<_>, _>>()?;

    let holdings_value = positions
        .iter()
        .try_fold(Decimal::zero(), |acc, p| {
            acc.checked_add(p.market_value.unwrap_or(p.cost_basis))
        })
        .ok_or(ValuationOverflow)?;
    let fully_priced = positions.iter().all(|p| p.market_value.is_some());

    Ok(PortfolioValuation {
        balance: account.balance,
        holdings_value,
        total_value: account
            .balance
            .checked_add(holdings_value)
            .ok_or(ValuationOverflow)?,
        realized_pnl: realized_pnl(&account.trades)?,
        fully_priced,
        positions,
    })
}

fn value_position(
    symbol: &Symbol,
    position: &Position,
    last_price: Option<Decimal>,
) -> Result<PositionValuation, ValuationOverflow> {
    let cost_basis = position.cost_basis().ok_or(ValuationOverflow)?;
    let market_value = last_price.and_then(|px| Decimal::from(position.qty).checked_mul(px));
    let unrealized_pnl = market_value.and_then(|mv| mv.checked_sub(cost_basis));
    // checked_div yields None for a zero cost basis
    let unrealized_pnl_pct = unrealized_pnl.and_then(|pnl| {
        pnl.checked_div(cost_basis)
            .and_then(|ratio| ratio.checked_mul(Decimal::hundred()))
            .map(|pct| pct.round_dp(4))
    });

    Ok(PositionValuation {
        symbol: symbol.clone(),
        qty: position.qty,
        avg_price: position.avg_price,
        cost_basis,
        last_price,
        market_value,
        unrealized_pnl,
        unrealized_pnl_pct,
    })
}

/// Realized P&L implied by a trade history under weighted-average cost.
///
/// Replays the trades in order: each sell realizes `(price - avg) * qty`
/// against the running average for its symbol.
pub fn realized_pnl(trades: &[TradeRecord]) -> Result<Decimal, ValuationOverflow> {
    let mut books: BTreeMap<&Symbol, (u64, Decimal)> = BTreeMap::new();
    let mut realized = Decimal::zero();

    for trade in trades {
        let (qty, avg) = books.entry(&trade.symbol).or_insert((0, Decimal::zero()));
        match trade.side {
            Side::Buy => {
                let new_qty = qty.checked_add(trade.qty).ok_or(ValuationOverflow)?;
                let held = Decimal::from(*qty).checked_mul(*avg);
                let bought = Decimal::from(trade.qty).checked_mul(trade.price);
                let total = held
                    .zip(bought)
                    .and_then(|(held, bought)| held.checked_add(bought))
                    .ok_or(ValuationOverflow)?;
                if new_qty > 0 {
                    *avg = total
                        .checked_div(Decimal::from(new_qty))
                        .ok_or(ValuationOverflow)?;
                }
                *qty = new_qty;
            }
            Side::Sell => {
                let closed = trade.qty.min(*qty);
                let gain = trade
                    .price
                    .checked_sub(*avg)
                    .and_then(|per_share| per_share.checked_mul(Decimal::from(closed)))
                    .ok_or(ValuationOverflow)?;
                realized = realized.checked_add(gain).ok_or(ValuationOverflow)?;
                *qty -= closed;
                if *qty == 0 {
                    *avg = Decimal::zero();
                }
            }
        }
    }

    Ok(realized)
}
