//! Pure computation for ledger logic: order validation, buy/sell state
//! transitions and mark-to-market valuation. Nothing here performs I/O.

pub mod ledger;
pub mod valuation;

pub use ledger::{LedgerError, Order};
pub use valuation::{value_portfolio, PortfolioValuation, PositionValuation, ValuationOverflow};
