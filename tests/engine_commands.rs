//! User-command behavior: switches, watchlist edits, settings.

mod mock_clients;

use std::sync::atomic::Ordering;
use std::time::Duration;

use candlescan::inference::types::Signal;
use candlescan::notify::NotifyConfig;
use candlescan::settings::Settings;

use mock_clients::{analysis, spawn_engine, wait_until};

const INTERVAL_MS: i64 = 15 * 60_000;
const BOUNDARY: i64 = 1_800_000_000_000;
const MID_INTERVAL: i64 = BOUNDARY - INTERVAL_MS / 2;
const CANDLE_TIME: i64 = BOUNDARY - 300_000;

fn settings(watchlist: &[&str]) -> Settings {
    Settings {
        watchlist: watchlist.iter().map(|s| s.to_string()).collect(),
        interval_min: 15,
        notify: NotifyConfig::default(),
    }
}

#[tokio::test]
async fn results_for_a_symbol_the_user_left_are_discarded() {
    let h = spawn_engine(settings(&["AAA", "BBB"]), MID_INTERVAL, CANDLE_TIME);
    wait_until("initial AAA analysis", || h.analyzer.analyses("AAA") >= 1).await;

    h.analyzer.set_result("AAA", analysis(Signal::Buy, 95.0));
    h.analyzer.set_result("BBB", analysis(Signal::Sell, 85.0));

    // A manual refresh of AAA parks inside inference...
    let gate = h.analyzer.block_next("AAA");
    h.handle.analyze_now().await.unwrap();
    wait_until("forced AAA analysis parked", || h.analyzer.analyses("AAA") >= 2).await;

    // ...and the user switches away while it is in flight.
    h.handle.set_symbol("BBB").await.unwrap();
    wait_until("BBB analysis published", || {
        h.handle
            .view()
            .last_analysis
            .as_ref()
            .is_some_and(|a| a.signal == Signal::Sell)
    })
    .await;

    let ok_before = h.counters.analyses_ok.load(Ordering::SeqCst);
    gate.notify_one();
    wait_until("stale AAA analysis completed", || {
        h.counters.analyses_ok.load(Ordering::SeqCst) > ok_before
    })
    .await;

    // The stale AAA result was discarded, not published.
    let view = h.handle.view();
    assert_eq!(view.symbol, "BBB");
    assert_eq!(view.last_analysis.unwrap().signal, Signal::Sell);
}

#[tokio::test]
async fn add_symbol_switches_foreground_and_persists() {
    let h = spawn_engine(settings(&["BTC"]), MID_INTERVAL, CANDLE_TIME);
    wait_until("initial BTC analysis", || h.analyzer.analyses("BTC") >= 1).await;

    h.handle.add_symbol("sol").await.unwrap();

    wait_until("forced SOL load", || h.market.fetches("SOL") >= 1).await;
    wait_until("view switched", || h.handle.view().symbol == "SOL").await;

    let saved = h.store.saved().expect("settings persisted");
    assert_eq!(saved.watchlist, vec!["BTC", "SOL"]);
}

#[tokio::test]
async fn removing_the_foreground_reassigns_the_first_remaining() {
    let h = spawn_engine(settings(&["BTC", "ETH", "SOL"]), MID_INTERVAL, CANDLE_TIME);
    wait_until("initial BTC analysis", || h.analyzer.analyses("BTC") >= 1).await;

    h.handle.remove_symbol("BTC").await.unwrap();

    wait_until("view switched", || h.handle.view().symbol == "ETH").await;
    wait_until("forced ETH load", || h.market.fetches("ETH") >= 1).await;

    let saved = h.store.saved().expect("settings persisted");
    assert_eq!(saved.watchlist, vec!["ETH", "SOL"]);
}

#[tokio::test]
async fn removing_the_last_symbol_reseeds_the_default() {
    let h = spawn_engine(settings(&["ETH"]), MID_INTERVAL, CANDLE_TIME);
    wait_until("initial ETH analysis", || h.analyzer.analyses("ETH") >= 1).await;

    h.handle.remove_symbol("eth").await.unwrap();

    wait_until("default became foreground", || h.handle.view().symbol == "BTC").await;
    wait_until("forced BTC load", || h.market.fetches("BTC") >= 1).await;

    let saved = h.store.saved().expect("settings persisted");
    assert_eq!(saved.watchlist, vec!["BTC"]);
}

#[tokio::test]
async fn switching_to_an_unknown_symbol_is_ignored() {
    let h = spawn_engine(settings(&["BTC", "ETH"]), MID_INTERVAL, CANDLE_TIME);
    wait_until("initial BTC analysis", || h.analyzer.analyses("BTC") >= 1).await;

    h.handle.set_symbol("XRP").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(h.handle.view().symbol, "BTC");
    assert_eq!(h.market.fetches("XRP"), 0);
}

#[tokio::test]
async fn interval_changes_are_validated_and_persisted() {
    let h = spawn_engine(settings(&["BTC"]), MID_INTERVAL, CANDLE_TIME);
    wait_until("initial BTC analysis", || h.analyzer.analyses("BTC") >= 1).await;

    h.handle.set_interval_min(5).await.unwrap();
    wait_until("interval persisted", || {
        h.store.saved().is_some_and(|s| s.interval_min == 5)
    })
    .await;

    // 7 minutes never aligns with a minute-of-hour grid; rejected.
    h.handle.set_interval_min(7).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.store.saved().unwrap().interval_min, 5);
}

#[tokio::test]
async fn notifier_test_reports_into_the_view() {
    let h = spawn_engine(settings(&["BTC"]), MID_INTERVAL, CANDLE_TIME);
    wait_until("initial BTC analysis", || h.analyzer.analyses("BTC") >= 1).await;

    // Without credentials the test cannot run.
    h.handle.test_notifier().await.unwrap();
    wait_until("missing credentials notice", || {
        h.handle.view().notice.as_deref() == Some("notifier credentials are not configured")
    })
    .await;

    let cfg = NotifyConfig {
        bot_token: "token".into(),
        chat_id: "chat".into(),
        ..NotifyConfig::default()
    };
    h.handle.set_notify_config(cfg).await.unwrap();
    h.handle.test_notifier().await.unwrap();

    wait_until("test message sent", || {
        h.notifier.sent().iter().any(|m| m.contains("Connection test"))
    })
    .await;
    wait_until("delivery notice", || {
        h.handle.view().notice.as_deref() == Some("test message delivered")
    })
    .await;
}
