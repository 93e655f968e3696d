//! Integration tests for the profit fixer
//! Replays trades from several sessions through the public API

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use profit_fixer::*;
use rand::seq::SliceRandom;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

fn market() -> Market {
    Market::new("BTCUSDT", "BTC", "USDT")
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn trade(id: u64, exchange: &str, secs: i64, side: Side, quantity: Decimal, price: Decimal) -> Trade {
    Trade {
        id,
        order_id: id,
        exchange: exchange.to_string(),
        symbol: "BTCUSDT".to_string(),
        side,
        price,
        quantity,
        quote_quantity: Decimal::ZERO,
        fee: Decimal::ZERO,
        fee_currency: String::new(),
        is_maker: false,
        time: at(secs),
    }
}

fn buy(id: u64, exchange: &str, secs: i64) -> Trade {
    trade(id, exchange, secs, Side::Buy, dec!(1), dec!(100))
}

/// Records the order in which trades are replayed
#[derive(Default)]
struct Recorder {
    trades: Vec<(DateTime<Utc>, u64, String)>,
}

impl TradeAccumulator for Recorder {
    fn add_trade(&mut self, trade: &Trade) {
        self.trades.push((trade.time, trade.id, trade.exchange.clone()));
    }
}

/// Source that never answers until its context is cancelled
struct HangingSource {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl TradeHistoryService for HangingSource {
    async fn query_trades(
        &self,
        ctx: &CancellationToken,
        _symbol: &str,
        _options: &TradeQueryOptions,
    ) -> Result<Vec<Trade>, HistoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ctx.cancelled().await;
        Err(HistoryError::Cancelled)
    }
}

/// Source that fails after a short delay
struct FailingSource {
    delay: Duration,
}

#[async_trait]
impl TradeHistoryService for FailingSource {
    async fn query_trades(
        &self,
        _ctx: &CancellationToken,
        _symbol: &str,
        _options: &TradeQueryOptions,
    ) -> Result<Vec<Trade>, HistoryError> {
        tokio::time::sleep(self.delay).await;
        Err(HistoryError::Network {
            message: "connection reset by peer".to_string(),
        })
    }
}

#[tokio::test]
async fn test_replay_order_depends_only_on_time() {
    let mut fixer = ProfitFixer::new(market());
    // Session A reports T2 before T1
    fixer.add_exchange(
        "A",
        Arc::new(MemoryTradeHistory::new(vec![buy(20, "A", 2), buy(10, "A", 1)])),
    );
    fixer.add_exchange("B", Arc::new(MemoryTradeHistory::new(vec![buy(5, "B", 3)])));

    let mut stats = Recorder::default();
    let mut position = Recorder::default();
    let report = assert_ok!(
        fixer
            .fix(&CancellationToken::new(), at(0), at(10), &mut stats, &mut position)
            .await
    );

    let expected = vec![
        (at(1), 10, "A".to_string()),
        (at(2), 20, "A".to_string()),
        (at(3), 5, "B".to_string()),
    ];
    assert_eq!(report.trades, 3);
    assert_eq!(report.sessions, 2);
    assert_eq!(stats.trades, expected);
    assert_eq!(position.trades, expected);
}

#[tokio::test]
async fn test_union_replayed_once_in_reproducible_order() {
    let mut rng = rand::thread_rng();
    let mut all = Vec::new();
    let mut fixer = ProfitFixer::with_batch_config(
        market(),
        BatchQueryConfig {
            page_limit: 7,
            page_delay_ms: 0,
        },
    );

    for (n, name) in ["binance", "max", "okx", "bybit"].iter().enumerate() {
        // Plenty of shared timestamps across sessions
        let mut trades: Vec<Trade> = (0..40u64)
            .map(|i| buy(i * 4 + n as u64, name, (i / 3) as i64))
            .collect();
        all.extend(trades.clone());
        trades.shuffle(&mut rng);
        fixer.add_exchange(name, Arc::new(MemoryTradeHistory::new(trades)));
    }

    let mut first = Recorder::default();
    fixer
        .fix(&CancellationToken::new(), at(0), at(1000), &mut first, &mut Recorder::default())
        .await
        .unwrap();

    let mut second = Recorder::default();
    fixer
        .fix(&CancellationToken::new(), at(0), at(1000), &mut second, &mut Recorder::default())
        .await
        .unwrap();

    assert_eq!(first.trades.len(), all.len());
    assert!(first.trades.windows(2).all(|w| w[0].0 <= w[1].0));
    assert_eq!(first.trades, second.trades);

    let mut replayed: Vec<(String, u64)> =
        first.trades.iter().map(|(_, id, ex)| (ex.clone(), *id)).collect();
    let mut expected: Vec<(String, u64)> = all.iter().map(|t| (t.exchange.clone(), t.id)).collect();
    replayed.sort();
    expected.sort();
    assert_eq!(replayed, expected);
}

#[tokio::test]
async fn test_failed_session_leaves_accumulators_untouched() {
    let mut fixer = ProfitFixer::new(market());
    fixer.add_exchange(
        "A",
        Arc::new(FailingSource {
            delay: Duration::from_millis(10),
        }),
    );
    fixer.add_exchange(
        "B",
        Arc::new(MemoryTradeHistory::new(vec![buy(1, "B", 1), buy(2, "B", 2)])),
    );

    let mut stats = ProfitStats::new(&market());
    let mut position = Position::new(&market());
    let err = assert_err!(
        fixer
            .fix(&CancellationToken::new(), at(0), at(10), &mut stats, &mut position)
            .await
    );

    assert_eq!(err.session(), Some("A"));
    assert!(err.to_string().contains("connection reset by peer"));
    assert_eq!(stats.trade_count, 0);
    assert_eq!(position.trade_count, 0);
    assert!(position.is_closed());
}

#[tokio::test]
async fn test_first_failure_cancels_other_sessions() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut fixer = ProfitFixer::new(market());
    fixer.add_exchange(
        "slow",
        Arc::new(HangingSource {
            calls: calls.clone(),
        }),
    );
    fixer.add_exchange(
        "broken",
        Arc::new(FailingSource {
            delay: Duration::from_millis(20),
        }),
    );

    let mut stats = Recorder::default();
    let mut position = Recorder::default();
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        fixer.fix(&CancellationToken::new(), at(0), at(10), &mut stats, &mut position),
    )
    .await
    .expect("join should finish once the failure cancels the hanging session");

    let err = result.unwrap_err();
    assert!(matches!(err, FixError::Fetch { ref session, .. } if session == "broken"));
    assert!(stats.trades.is_empty());
    assert!(position.trades.is_empty());
}

#[tokio::test]
async fn test_cancel_before_fix() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut fixer = ProfitFixer::new(market());
    fixer.add_exchange("slow", Arc::new(HangingSource { calls: calls.clone() }));

    let ctx = CancellationToken::new();
    ctx.cancel();

    let mut stats = Recorder::default();
    let mut position = Recorder::default();
    let err = fixer
        .fix(&ctx, at(0), at(10), &mut stats, &mut position)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(stats.trades.is_empty());
}

#[tokio::test]
async fn test_cancel_while_fetching() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut fixer = ProfitFixer::new(market());
    fixer.add_exchange("slow", Arc::new(HangingSource { calls: calls.clone() }));
    fixer.add_exchange("fast", Arc::new(MemoryTradeHistory::new(vec![buy(1, "fast", 1)])));

    let ctx = CancellationToken::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let mut stats = Recorder::default();
    let mut position = Recorder::default();
    let err = tokio::time::timeout(
        Duration::from_secs(5),
        fixer.fix(&ctx, at(0), at(10), &mut stats, &mut position),
    )
    .await
    .expect("cancellation should end the run")
    .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(stats.trades.is_empty());
    assert!(position.trades.is_empty());
}

#[tokio::test]
async fn test_reregistering_replaces_source() {
    let mut fixer = ProfitFixer::new(market());
    fixer.add_exchange(
        "A",
        Arc::new(FailingSource {
            delay: Duration::ZERO,
        }),
    );
    fixer.add_exchange("A", Arc::new(MemoryTradeHistory::new(vec![buy(1, "A", 1)])));

    let mut stats = Recorder::default();
    let report = fixer
        .fix(&CancellationToken::new(), at(0), at(10), &mut stats, &mut Recorder::default())
        .await
        .unwrap();

    assert_eq!(report.sessions, 1);
    assert_eq!(stats.trades.len(), 1);
}

#[tokio::test]
async fn test_repeated_runs_are_additive() {
    let mut fixer = ProfitFixer::new(market());
    fixer.add_exchange("A", Arc::new(MemoryTradeHistory::new(vec![buy(1, "A", 1), buy(2, "A", 2)])));

    let mut stats = ProfitStats::new(&market());
    let mut position = Position::new(&market());
    for _ in 0..2 {
        fixer
            .fix(&CancellationToken::new(), at(0), at(10), &mut stats, &mut position)
            .await
            .unwrap();
    }

    assert_eq!(stats.trade_count, 4);
    assert_eq!(position.base, dec!(4));
}

#[tokio::test]
async fn test_concurrent_runs_share_one_fixer() {
    let mut fixer = ProfitFixer::new(market());
    fixer.add_exchange("A", Arc::new(MemoryTradeHistory::new(vec![buy(1, "A", 1), buy(2, "A", 5)])));
    fixer.add_exchange("B", Arc::new(MemoryTradeHistory::new(vec![buy(3, "B", 3)])));

    let windows = [(0, 10), (0, 4), (4, 10)];
    let runs = windows.iter().map(|&(since, until)| {
        let fixer = &fixer;
        async move {
            let mut stats = ProfitStats::new(fixer.market());
            let mut position = Position::new(fixer.market());
            fixer
                .fix(&CancellationToken::new(), at(since), at(until), &mut stats, &mut position)
                .await
                .map(|_| stats.trade_count)
        }
    });

    let counts: Vec<u64> = futures::future::join_all(runs)
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(counts, vec![3, 2, 1]);
}

#[tokio::test]
async fn test_file_sessions_rebuild_position() {
    let binance = r#"[
        {"id": 1, "exchange": "binance", "symbol": "BTCUSDT", "side": "BUY",
         "price": "100", "quantity": "2", "fee": "0.2", "fee_currency": "USDT",
         "time": "2024-01-01T00:00:00Z"},
        {"id": 3, "exchange": "binance", "symbol": "BTCUSDT", "side": "SELL",
         "price": "130", "quantity": "1", "fee": "0.13", "fee_currency": "USDT",
         "time": "2024-01-01T00:02:00Z"}
    ]"#;
    let max = r#"[
        {"id": 2, "exchange": "max", "symbol": "BTCUSDT", "side": "BUY",
         "price": "110", "quantity": "2", "fee": "0.22", "fee_currency": "USDT",
         "time": "2024-01-01T00:01:00Z"},
        {"id": 9, "exchange": "max", "symbol": "ETHUSDT", "side": "BUY",
         "price": "10", "quantity": "1", "time": "2024-01-01T00:01:30Z"}
    ]"#;

    let dir = tempfile::tempdir().unwrap();
    let mut sessions = Vec::new();
    for (name, content) in [("binance", binance), ("max", max)] {
        let path = dir.path().join(format!("{}.json", name));
        std::fs::File::create(&path)
            .unwrap()
            .write_all(content.as_bytes())
            .unwrap();
        sessions.push((name, path));
    }

    let mut fixer = ProfitFixer::new(market());
    for (name, path) in &sessions {
        fixer.add_exchange(name, Arc::new(FileTradeHistory::new(path)));
    }

    let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let until = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let mut stats = ProfitStats::new(&market());
    let mut position = Position::new(&market());
    let report = fixer
        .fix(&CancellationToken::new(), since, until, &mut stats, &mut position)
        .await
        .unwrap();

    // buy 2 @ 100, buy 2 @ 110, sell 1 @ 130: average cost 105, realized 25
    assert_eq!(report.trades, 3);
    assert_eq!(stats.accumulated_volume, dec!(5));
    assert_eq!(stats.accumulated_fees.get("USDT"), Some(&dec!(0.55)));
    assert_eq!(position.base, dec!(3));
    assert_eq!(position.average_cost, dec!(105));
    assert_eq!(position.accumulated_profit, dec!(25));
    assert_eq!(position.net_profit(), dec!(24.45));
}
