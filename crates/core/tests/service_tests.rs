// ═══════════════════════════════════════════════════════════════════
// Service Tests — streak estimation, portfolio aggregation,
// request gateway, cancellable task slot
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fund_tracker_core::errors::CoreError;
use fund_tracker_core::models::api::ApiResponse;
use fund_tracker_core::models::cache::ResponseCache;
use fund_tracker_core::models::fund::FundQuote;
use fund_tracker_core::models::holding::{Holding, HoldingsMap};
use fund_tracker_core::models::account::Account;
use fund_tracker_core::models::settings::Settings;
use fund_tracker_core::models::state::NameHints;
use fund_tracker_core::providers::traits::UpstreamSource;
use fund_tracker_core::services::data_gateway::{cache_key, DataGateway, SharedCache};
use fund_tracker_core::services::portfolio_service::PortfolioService;
use fund_tracker_core::services::streak_service::{parse_kline_closes, streak_from_closes};
use fund_tracker_core::services::tasks::TaskSlot;
use fund_tracker_core::storage::store::Store;

// ═══════════════════════════════════════════════════════════════════
// Test helpers
// ═══════════════════════════════════════════════════════════════════

/// What a mock source answers with.
#[derive(Clone)]
enum MockAnswer {
    Ok(serde_json::Value),
    FailurePayload(String),
    Error(String),
}

/// An upstream source scripted for one (module, action) pair, counting
/// how many times the gateway consulted it.
struct MockSource {
    module: &'static str,
    action: &'static str,
    answer: MockAnswer,
    calls: Arc<AtomicUsize>,
}

impl MockSource {
    fn boxed(
        module: &'static str,
        action: &'static str,
        answer: MockAnswer,
    ) -> (Box<dyn UpstreamSource>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Self {
                module,
                action,
                answer,
                calls: Arc::clone(&calls),
            }),
            calls,
        )
    }
}

#[async_trait]
impl UpstreamSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn handles(&self, module: &str, action: &str) -> bool {
        module == self.module && action == self.action
    }

    async fn fetch(&self, _params: &[(&str, &str)]) -> Result<ApiResponse, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            MockAnswer::Ok(data) => Ok(ApiResponse::ok(data.clone())),
            MockAnswer::FailurePayload(msg) => Ok(ApiResponse::failure(msg.clone())),
            MockAnswer::Error(msg) => Err(CoreError::Upstream {
                source_name: "mock".to_string(),
                message: msg.clone(),
            }),
        }
    }
}

/// Settings pointed at a port nothing listens on, with a short timeout.
fn offline_settings() -> Settings {
    Settings {
        api_base: "http://127.0.0.1:9/api".to_string(),
        backend_timeout_secs: 2,
        ..Settings::default()
    }
}

fn gateway_with(
    settings: &Settings,
    sources: Vec<Box<dyn UpstreamSource>>,
) -> (DataGateway, SharedCache) {
    let cache = SharedCache::new(ResponseCache::new(64), Store::in_memory());
    let gateway = DataGateway::new(settings, cache.clone(), sources).unwrap();
    (gateway, cache)
}

/// Serve exactly one canned HTTP response on an ephemeral port.
async fn serve_once(response: &'static str) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        if let Ok((mut sock, _)) = listener.accept().await {
            let mut buf = [0u8; 2048];
            let _ = sock.read(&mut buf).await;
            let _ = sock.write_all(response.as_bytes()).await;
        }
    });
    addr
}

fn http_json(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

// ═══════════════════════════════════════════════════════════════════
// Streak estimation
// ═══════════════════════════════════════════════════════════════════

mod streak {
    use super::*;

    #[test]
    fn three_up_days() {
        assert_eq!(streak_from_closes(&[10.0, 11.0, 12.0, 13.0]), 3);
    }

    #[test]
    fn three_down_days() {
        assert_eq!(streak_from_closes(&[13.0, 12.0, 11.0, 10.0]), -3);
    }

    #[test]
    fn alternation_breaks_after_most_recent_day() {
        assert_eq!(streak_from_closes(&[10.0, 11.0, 10.0, 11.0]), 1);
        assert_eq!(streak_from_closes(&[11.0, 10.0, 11.0, 10.0]), -1);
    }

    #[test]
    fn short_series_yields_zero() {
        assert_eq!(streak_from_closes(&[5.0]), 0);
        assert_eq!(streak_from_closes(&[]), 0);
    }

    #[test]
    fn flat_most_recent_transition_is_indeterminate() {
        assert_eq!(streak_from_closes(&[10.0, 11.0, 11.0]), 0);
    }

    #[test]
    fn flat_day_terminates_an_established_streak() {
        // …, 12→12 flat, then 12→13 up: only the trailing up-day counts.
        assert_eq!(streak_from_closes(&[12.0, 12.0, 13.0]), 1);
    }

    #[test]
    fn long_uniform_series() {
        let closes: Vec<f64> = (0..10).map(f64::from).collect();
        assert_eq!(streak_from_closes(&closes), 9);
    }
}

mod kline_parsing {
    use super::*;

    #[test]
    fn extracts_closes_in_order() {
        let klines = vec![
            "2025-08-01,100.0,101.5,102.0,99.0,1000".to_string(),
            "2025-08-04,101.5,103.0,104.0,101.0,1200".to_string(),
        ];
        assert_eq!(parse_kline_closes(&klines), vec![101.5, 103.0]);
    }

    #[test]
    fn malformed_records_skipped_individually() {
        let klines = vec![
            "2025-08-01,100.0,101.5".to_string(),
            "short,row".to_string(),
            "2025-08-04,101.5,not-a-number,104.0".to_string(),
            "2025-08-05,103.0,104.5,105.0".to_string(),
        ];
        assert_eq!(parse_kline_closes(&klines), vec![101.5, 104.5]);
    }

    #[test]
    fn collapsed_series_degrades_to_zero_streak() {
        let klines = vec!["garbage".to_string(), "also,garbage".to_string()];
        let closes = parse_kline_closes(&klines);
        assert_eq!(streak_from_closes(&closes), 0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Portfolio aggregation
// ═══════════════════════════════════════════════════════════════════

mod portfolio {
    use super::*;

    fn quote(code: &str, change: &str) -> FundQuote {
        FundQuote {
            code: code.to_string(),
            name: format!("Fund {code}"),
            estimate_change: change.to_string(),
            ..FundQuote::default()
        }
    }

    fn quotes(pairs: &[(&str, &str)]) -> HashMap<String, FundQuote> {
        pairs
            .iter()
            .map(|(code, change)| (code.to_string(), quote(code, change)))
            .collect()
    }

    fn holding(code: &str, amount: f64, profit: f64) -> Holding {
        Holding {
            code: code.to_string(),
            name: String::new(),
            amount,
            profit,
        }
    }

    #[test]
    fn day_profit_from_estimate_change() {
        let service = PortfolioService::new();
        let stats = service.aggregate(
            &[holding("000001", 10_000.0, 0.0)],
            &quotes(&[("000001", "+1.50")]),
        );
        assert!((stats.day_profit - 150.0).abs() < 1e-9);
        assert!((stats.day_profit_pct - 1.5).abs() < 1e-9);
        assert_eq!(stats.up_count, 1);
        assert_eq!(stats.down_count, 0);
    }

    #[test]
    fn missing_quote_contributes_zero() {
        let service = PortfolioService::new();
        let stats = service.aggregate(
            &[holding("000001", 10_000.0, 0.0), holding("000002", 5_000.0, 0.0)],
            &quotes(&[("000001", "-2.00")]),
        );
        assert!((stats.day_profit + 200.0).abs() < 1e-9);
        assert_eq!(stats.asset, 15_000.0);
        assert_eq!(stats.up_count, 0);
        assert_eq!(stats.down_count, 1);
    }

    #[test]
    fn hold_profit_relative_to_cost_basis() {
        let service = PortfolioService::new();
        let stats = service.aggregate(&[holding("000001", 1_100.0, 100.0)], &HashMap::new());
        assert!((stats.hold_profit - 100.0).abs() < 1e-9);
        // 100 profit on a 1000 cost basis.
        assert!((stats.hold_profit_pct - 10.0).abs() < 1e-9);
    }

    #[test]
    fn empty_holdings_are_all_zero() {
        let service = PortfolioService::new();
        let stats = service.aggregate(&[], &HashMap::new());
        assert_eq!(stats.asset, 0.0);
        assert_eq!(stats.day_profit_pct, 0.0);
        assert_eq!(stats.hold_profit_pct, 0.0);
    }

    #[test]
    fn merge_doubles_shared_codes_when_applied_to_duplicates() {
        let service = PortfolioService::new();
        let accounts = vec![
            Account {
                id: "a".into(),
                name: "A".into(),
            },
            Account {
                id: "b".into(),
                name: "B".into(),
            },
        ];
        let mut map: HoldingsMap = HashMap::new();
        map.insert(
            "a".into(),
            vec![holding("000001", 1_000.0, 50.0), holding("000002", 300.0, 0.0)],
        );
        map.insert("b".into(), vec![holding("000001", 1_000.0, 50.0)]);

        let merged = service.merge_all(&map, &accounts);
        assert_eq!(merged.len(), 2);
        let shared = merged.iter().find(|h| h.code == "000001").unwrap();
        assert_eq!(shared.amount, 2_000.0);
        assert_eq!(shared.profit, 100.0);
        let unique = merged.iter().find(|h| h.code == "000002").unwrap();
        assert_eq!(unique.amount, 300.0);
    }

    #[test]
    fn merge_leaves_per_account_records_untouched() {
        let service = PortfolioService::new();
        let accounts = vec![Account {
            id: "a".into(),
            name: "A".into(),
        }];
        let mut map: HoldingsMap = HashMap::new();
        map.insert("a".into(), vec![holding("000001", 1_000.0, 10.0)]);
        let _ = service.merge_all(&map, &accounts);
        assert_eq!(map["a"][0].amount, 1_000.0);
        assert_eq!(map["a"][0].profit, 10.0);
    }

    #[test]
    fn upsert_replaces_in_place() {
        let service = PortfolioService::new();
        let mut map: HoldingsMap = HashMap::new();
        service
            .upsert_holding(&mut map, "a", holding("000001", 500.0, 0.0))
            .unwrap();
        service
            .upsert_holding(&mut map, "a", holding("000002", 800.0, 0.0))
            .unwrap();
        service
            .upsert_holding(&mut map, "a", holding("000001", 900.0, 20.0))
            .unwrap();

        let list = &map["a"];
        assert_eq!(list.len(), 2);
        // Position preserved on update.
        assert_eq!(list[0].code, "000001");
        assert_eq!(list[0].amount, 900.0);
        assert_eq!(list[0].profit, 20.0);
    }

    #[test]
    fn upsert_rejects_nonpositive_amounts() {
        let service = PortfolioService::new();
        let mut map: HoldingsMap = HashMap::new();
        assert!(service
            .upsert_holding(&mut map, "a", holding("000001", 0.0, 0.0))
            .is_err());
        assert!(service
            .upsert_holding(&mut map, "a", holding("000001", -5.0, 0.0))
            .is_err());
        assert!(service
            .upsert_holding(&mut map, "a", holding("", 10.0, 0.0))
            .is_err());
    }

    #[test]
    fn remove_unknown_holding_errors() {
        let service = PortfolioService::new();
        let mut map: HoldingsMap = HashMap::new();
        service
            .upsert_holding(&mut map, "a", holding("000001", 500.0, 0.0))
            .unwrap();
        assert!(service.remove_holding(&mut map, "a", "999999").is_err());
        assert!(service.remove_holding(&mut map, "missing", "000001").is_err());
        service.remove_holding(&mut map, "a", "000001").unwrap();
        assert!(map["a"].is_empty());
    }

    #[test]
    fn enrich_resolves_names_from_hints() {
        let service = PortfolioService::new();
        let mut hints = NameHints::default();
        hints.learn("000001", "Hinted Name");

        let rows = service.enrich(
            &[holding("000001", 100.0, 0.0), holding("000002", 100.0, 0.0)],
            &HashMap::new(),
            &hints,
        );
        assert_eq!(rows[0].name, "Hinted Name");
        // No stored name, no hint: fall back to the code.
        assert_eq!(rows[1].name, "000002");
    }
}

// ═══════════════════════════════════════════════════════════════════
// Request gateway
// ═══════════════════════════════════════════════════════════════════

mod gateway {
    use super::*;

    #[test]
    fn cache_key_is_order_insensitive() {
        let a = cache_key("fund", "batch", &[("codes", "1,2"), ("extra", "x")]);
        let b = cache_key("fund", "batch", &[("extra", "x"), ("codes", "1,2")]);
        assert_eq!(a, b);
        assert!(a.starts_with("fund/batch?"));
    }

    #[tokio::test]
    async fn unreachable_backend_resolves_to_failure_payload() {
        let (gateway, _cache) = gateway_with(&offline_settings(), Vec::new());
        let resp = gateway.fetch("market", "indices", &[], false).await;
        assert!(!resp.success);
        assert!(resp.message.is_some());
    }

    #[tokio::test]
    async fn invalid_backend_json_resolves_to_failure_payload() {
        let addr = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 9\r\nconnection: close\r\n\r\nnot json!",
        )
        .await;
        let settings = Settings {
            api_base: format!("http://{addr}/api"),
            backend_timeout_secs: 2,
            ..Settings::default()
        };
        let (gateway, cache) = gateway_with(&settings, Vec::new());

        let resp = gateway.fetch("news", "list", &[], false).await;
        assert!(!resp.success);
        assert!(resp.message.unwrap().contains("invalid backend response"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn http_error_status_resolves_to_failure_payload() {
        let addr =
            serve_once("HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await;
        let settings = Settings {
            api_base: format!("http://{addr}/api"),
            backend_timeout_secs: 2,
            ..Settings::default()
        };
        let (gateway, _cache) = gateway_with(&settings, Vec::new());

        let resp = gateway.fetch("news", "list", &[], false).await;
        assert!(!resp.success);
        assert!(resp.message.unwrap().contains("HTTP 500"));
    }

    #[tokio::test]
    async fn backend_success_is_written_through() {
        let body = json!({"success": true, "data": [{"name": "Composite", "value": "3300"}]}).to_string();
        let response: &'static str = Box::leak(http_json(&body).into_boxed_str());
        let addr = serve_once(response).await;
        let settings = Settings {
            api_base: format!("http://{addr}/api"),
            backend_timeout_secs: 2,
            ..Settings::default()
        };
        let (gateway, cache) = gateway_with(&settings, Vec::new());

        let resp = gateway.fetch("market", "indices", &[], false).await;
        assert!(resp.success);
        assert!(cache.contains(&cache_key("market", "indices", &[])));

        // Second call is served from cache — the one-shot server is gone.
        let again = gateway.fetch("market", "indices", &[], false).await;
        assert!(again.success);
    }

    #[tokio::test]
    async fn backend_failure_payload_is_returned_but_not_cached() {
        let body = json!({"success": false, "message": "no such action"}).to_string();
        let response: &'static str = Box::leak(http_json(&body).into_boxed_str());
        let addr = serve_once(response).await;
        let settings = Settings {
            api_base: format!("http://{addr}/api"),
            backend_timeout_secs: 2,
            ..Settings::default()
        };
        let (gateway, cache) = gateway_with(&settings, Vec::new());

        let resp = gateway.fetch("fund", "hot", &[], false).await;
        assert!(!resp.success);
        assert_eq!(resp.message.as_deref(), Some("no such action"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn source_success_short_circuits_backend() {
        let (source, calls) =
            MockSource::boxed("sector", "list", MockAnswer::Ok(json!([{"code": "BK1", "name": "X"}])));
        let (gateway, cache) = gateway_with(&offline_settings(), vec![source]);

        let resp = gateway.fetch("sector", "list", &[], false).await;
        assert!(resp.success);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.contains(&cache_key("sector", "list", &[])));

        // Cache hit: the source is not consulted again.
        let again = gateway.fetch("sector", "list", &[], false).await;
        assert!(again.success);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn source_error_falls_back_to_backend() {
        let (source, calls) =
            MockSource::boxed("sector", "list", MockAnswer::Error("upstream flaked".into()));
        let (gateway, cache) = gateway_with(&offline_settings(), vec![source]);

        let resp = gateway.fetch("sector", "list", &[], false).await;
        // Source failed, backend unreachable: normalized failure payload.
        assert!(!resp.success);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn source_failure_payload_also_falls_back() {
        let (bad, bad_calls) =
            MockSource::boxed("sector", "list", MockAnswer::FailurePayload("empty".into()));
        let (good, good_calls) =
            MockSource::boxed("sector", "list", MockAnswer::Ok(json!([{"code": "BK2"}])));
        let (gateway, _cache) = gateway_with(&offline_settings(), vec![bad, good]);

        let resp = gateway.fetch("sector", "list", &[], false).await;
        assert!(resp.success);
        assert_eq!(bad_calls.load(Ordering::SeqCst), 1);
        assert_eq!(good_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sources_only_consulted_for_their_pairs() {
        let (source, calls) = MockSource::boxed("sector", "list", MockAnswer::Ok(json!([])));
        let (gateway, _cache) = gateway_with(&offline_settings(), vec![source]);

        let _ = gateway.fetch("fund", "hot", &[], false).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn force_bypasses_cache_and_revalidates() {
        let (source, calls) = MockSource::boxed("sector", "list", MockAnswer::Ok(json!([1, 2, 3])));
        let (gateway, cache) = gateway_with(&offline_settings(), vec![source]);
        let key = cache_key("sector", "list", &[]);

        let first = gateway.fetch("sector", "list", &[], false).await;
        assert!(first.success);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Forced revalidation consults the source again.
        let second = gateway.fetch("sector", "list", &[], true).await;
        assert!(second.success);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.contains(&key));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Cancellable task slot
// ═══════════════════════════════════════════════════════════════════

mod task_slot {
    use super::*;

    #[tokio::test]
    async fn newer_task_aborts_older() {
        let slot = Arc::new(TaskSlot::new());

        let slow = slot.run(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            "slow"
        });
        let fast = slot.run(async { "fast" });

        let (slow_result, fast_result) = tokio::join!(slow, fast);
        assert_eq!(slow_result, None);
        assert_eq!(fast_result, Some("fast"));
    }

    #[tokio::test]
    async fn uncontended_task_completes() {
        let slot = TaskSlot::new();
        assert_eq!(slot.run(async { 41 + 1 }).await, Some(42));
    }

    #[tokio::test]
    async fn cancel_aborts_in_flight_task() {
        let slot = TaskSlot::new();
        let handle = slot.spawn(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            "never"
        });
        slot.cancel();
        let err = handle.await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
