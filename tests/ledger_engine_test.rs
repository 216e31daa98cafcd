use papertrade::domain::{Account, Decimal, Side, Symbol, TimeMs};
use papertrade::engine::ledger::{buy, sell};
use papertrade::LedgerError;

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn sym(s: &str) -> Symbol {
    s.parse().unwrap()
}

fn opening() -> Account {
    Account::opening(d("100000"))
}

#[test]
fn test_round_trip_scenario() {
    let at = TimeMs::new(1_700_000_000_000);
    let aapl = sym("AAPL");

    let a1 = buy(&opening(), "AAPL", d("10"), d("150"), at).unwrap();
    assert_eq!(a1.balance, d("98500"));
    assert_eq!(a1.position(&aapl).unwrap().qty, 10);
    assert_eq!(a1.position(&aapl).unwrap().avg_price, d("150"));

    let a2 = buy(&a1, "AAPL", d("10"), d("170"), at).unwrap();
    assert_eq!(a2.balance, d("96800"));
    assert_eq!(a2.position(&aapl).unwrap().qty, 20);
    assert_eq!(a2.position(&aapl).unwrap().avg_price, d("160"));

    let a3 = sell(&a2, "AAPL", d("15"), d("180"), at).unwrap();
    assert_eq!(a3.balance, d("99500"));
    assert_eq!(a3.position(&aapl).unwrap().qty, 5);
    assert_eq!(a3.position(&aapl).unwrap().avg_price, d("160"));

    let a4 = sell(&a3, "aapl", d("5"), d("160"), at).unwrap();
    assert_eq!(a4.balance, d("100300"));
    assert!(a4.position(&aapl).is_none());

    let sides: Vec<Side> = a4.trades.iter().map(|t| t.side).collect();
    assert_eq!(sides, vec![Side::Buy, Side::Buy, Side::Sell, Side::Sell]);
}

#[test]
fn test_sell_unheld_symbol_leaves_account_untouched() {
    let account = buy(&opening(), "MSFT", d("1"), d("300"), TimeMs::new(1)).unwrap();
    let err = sell(&account, "AAPL", d("1"), d("10"), TimeMs::new(2)).unwrap_err();

    assert_eq!(err, LedgerError::NoSuchPosition(sym("AAPL")));
    assert_eq!(account.balance, d("99700"));
    assert_eq!(account.trades.len(), 1);
}

#[test]
fn test_refused_orders_report_numbers() {
    let err = buy(&opening(), "AAPL", d("1000"), d("150"), TimeMs::new(1)).unwrap_err();
    assert_eq!(
        err,
        LedgerError::InsufficientFunds {
            required: d("150000"),
            available: d("100000"),
        }
    );

    let held = buy(&opening(), "AAPL", d("3"), d("10"), TimeMs::new(1)).unwrap();
    let err = sell(&held, "AAPL", d("4"), d("10"), TimeMs::new(2)).unwrap_err();
    assert_eq!(
        err,
        LedgerError::InsufficientShares {
            symbol: sym("AAPL"),
            requested: 4,
            held: 3,
        }
    );
}

#[test]
fn test_cash_plus_cost_is_conserved_across_buys() {
    // Without sells, balance + sum(qty * avg) stays at the starting balance.
    // Prices are chosen so each average is exact.
    let prices = ["12", "13.5", "14", "14.5", "10"];
    let mut account = opening();
    for (i, price) in prices.iter().enumerate() {
        let symbol = if i % 2 == 0 { "AAPL" } else { "MSFT" };
        account = buy(&account, symbol, d("7"), d(price), TimeMs::new(i as i64)).unwrap();
    }

    let cost: Decimal = account.positions.values().map(|p| p.cost_basis().unwrap()).sum();
    assert_eq!(account.balance + cost, d("100000"));
    assert_eq!(account.position(&sym("AAPL")).unwrap().avg_price, d("12"));
    assert_eq!(account.position(&sym("MSFT")).unwrap().avg_price, d("14"));
}

#[test]
fn test_invalid_inputs_rejected() {
    let account = opening();
    assert!(matches!(
        buy(&account, "AAPL", d("0"), d("1"), TimeMs::new(1)),
        Err(LedgerError::InvalidQuantity(_))
    ));
    assert!(matches!(
        buy(&account, "AAPL", d("1.5"), d("1"), TimeMs::new(1)),
        Err(LedgerError::InvalidQuantity(_))
    ));
    assert!(matches!(
        sell(&account, "AAPL", d("-2"), d("1"), TimeMs::new(1)),
        Err(LedgerError::InvalidQuantity(_))
    ));
    assert!(matches!(
        buy(&account, "AAPL", d("1"), d("-0.01"), TimeMs::new(1)),
        Err(LedgerError::InvalidPrice(_))
    ));
    assert!(matches!(
        buy(&account, "  ", d("1"), d("1"), TimeMs::new(1)),
        Err(LedgerError::InvalidSymbol)
    ));
}
