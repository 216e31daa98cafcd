use papertrade::datasource::MockMarketData;
use papertrade::db::init_db;
use papertrade::orchestration::{OrderRequest, TradingService};
use papertrade::{AccountStore, Decimal, LedgerSettings, Repository, Side, TimeMs, UserId, Version};
use sqlx::Row;
use std::sync::Arc;
use tempfile::TempDir;

const LEGACY_DOC: &str = r#"{
    "balance": 98500,
    "portfolio": {"AAPL": {"qty": 10, "avgPrice": 150}},
    "trades": [{"type": "BUY", "symbol": "AAPL", "qty": 10, "price": 150, "time": 1700000000000}]
}"#;

fn uid(s: &str) -> UserId {
    UserId::parse(s).unwrap()
}

async fn seed(db_path: &str, uid: &str, raw: &str, version: i64) {
    let pool = init_db(db_path).await.expect("init_db failed");
    sqlx::query(
        "INSERT INTO accounts (uid, document, version, created_at, updated_at) VALUES (?, ?, ?, 0, 0)",
    )
    .bind(uid)
    .bind(raw)
    .bind(version)
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;
}

#[tokio::test]
async fn test_legacy_documents_are_migrated_on_startup() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("legacy.db")
        .to_string_lossy()
        .to_string();
    seed(&db_path, "old-user", LEGACY_DOC, 3).await;

    // Reopening runs the document migration.
    let pool = init_db(&db_path).await.expect("init_db failed");
    let raw: String = sqlx::query("SELECT document FROM accounts WHERE uid = ?")
        .bind("old-user")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("document");
    assert!(raw.contains("\"timestamp\":1700000000000"));
    assert!(!raw.contains("\"time\""));
    assert!(raw.contains("\"watchlist\":[]"));

    let repo = Repository::new(pool);
    let record = repo.read(&uid("old-user")).await.unwrap().unwrap();
    assert_eq!(record.version, Version(4));
    assert!(!record.needs_normalization);
    assert_eq!(
        record.account.trades[0].timestamp,
        TimeMs::new(1_700_000_000_000)
    );
}

#[tokio::test]
async fn test_trading_continues_on_migrated_account() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("legacy.db")
        .to_string_lossy()
        .to_string();
    seed(&db_path, "old-user", LEGACY_DOC, 3).await;

    let pool = init_db(&db_path).await.expect("init_db failed");
    let store = Arc::new(Repository::new(pool));
    let service = TradingService::new(
        store.clone(),
        Arc::new(MockMarketData::new()),
        LedgerSettings {
            starting_balance: Decimal::from(100_000u64),
            retry_limit: 5,
        },
    );

    let outcome = service
        .submit(
            &uid("old-user"),
            OrderRequest {
                side: Side::Sell,
                symbol: "AAPL".to_string(),
                qty: Decimal::from(10u64),
                price: Some(Decimal::from(160u64)),
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.balance, Decimal::from(100_100u64));
    assert_eq!(outcome.version, Version(5));

    let record = store.read(&uid("old-user")).await.unwrap().unwrap();
    assert!(record.account.positions.is_empty());
    assert_eq!(record.account.trades.len(), 2);
}

#[tokio::test]
async fn test_watchlist_only_document_opens_on_first_access() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("legacy.db")
        .to_string_lossy()
        .to_string();
    seed(&db_path, "watcher", r#"{"watchlist": ["AAPL"]}"#, 1).await;

    let pool = init_db(&db_path).await.expect("init_db failed");
    let store = Arc::new(Repository::new(pool));
    let service = TradingService::new(
        store.clone(),
        Arc::new(MockMarketData::new()),
        LedgerSettings {
            starting_balance: Decimal::from(2_500u64),
            retry_limit: 5,
        },
    );

    let record = service.account(&uid("watcher")).await.unwrap();
    assert_eq!(record.account.balance, Decimal::from(2_500u64));
    assert_eq!(record.account.watchlist.len(), 1);
    assert_eq!(record.version, Version(2));

    let outcome = service
        .submit(
            &uid("watcher"),
            OrderRequest {
                side: Side::Buy,
                symbol: "AAPL".to_string(),
                qty: Decimal::from(10u64),
                price: Some(Decimal::from(100u64)),
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.balance, Decimal::from(1_500u64));
    assert_eq!(outcome.version, Version(3));
}
