//! Integration tests for API routes.
//!
//! Uses `tower::ServiceExt` to test Axum routes without a real HTTP server.
//! The price/market APIs and the ticker socket are simulated in-process.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;

use merger_api::routes::create_router;
use merger_api::state::AppState;
use merger_common::config::AppConfig;
use merger_common::types::{SupplySource, TokenConfig};

const TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================
// Helpers
// ============================================================

async fn spot(State(hits): State<Arc<AtomicUsize>>, Path(product): Path<String>) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    let amount = match product.as_str() {
        "AERO-USD" => "1.00",
        "VELO-USD" => "0.10",
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    Json(json!({ "data": { "amount": amount, "currency": "USD" } })).into_response()
}

async fn coin(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "aerodrome-finance" | "velodrome-finance" => Json(json!({
            "id": id,
            "market_data": { "total_supply": 1_000_000_000.0 }
        }))
        .into_response(),
        _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// Start the mock REST upstream and return its base URL.
async fn start_rest_upstream() -> String {
    start_counting_rest_upstream().await.0
}

/// Start the mock REST upstream, counting spot price requests.
async fn start_counting_rest_upstream() -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/v2/prices/{product}/spot", get(spot))
        .route("/coins/{id}", get(coin))
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), hits)
}

fn token(symbol: &str, coingecko_id: &str, fraction: f64) -> TokenConfig {
    TokenConfig {
        symbol: symbol.to_string(),
        quote_currency: "USD".to_string(),
        coingecko_id: coingecko_id.to_string(),
        contract_address: None,
        rpc_url: None,
        allocation_fraction: fraction,
    }
}

/// Create a test AppConfig pointing at local upstreams.
fn test_config(rest_url: &str, ws_url: &str) -> AppConfig {
    AppConfig {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        coinbase_api_url: rest_url.to_string(),
        coingecko_api_url: rest_url.to_string(),
        ticker_ws_url: ws_url.to_string(),
        ticker_channel: "ticker".to_string(),
        supply_source: SupplySource::Market,
        token_a: token("AERO", "aerodrome-finance", 0.945),
        token_b: token("VELO", "velodrome-finance", 0.055),
        total_new_tokens: 2_000_000_000.0,
        default_amount: 10_000.0,
        log_json: false,
    }
}

fn build_app(config: AppConfig) -> Router {
    create_router(AppState::from_config(config).unwrap())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn post_amount(view_id: &str, side: &str, value: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/live/{}/amount", view_id))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "side": side, "value": value }).to_string()))
        .unwrap()
}

/// Read SSE chunks until `needle` shows up, returning everything read.
async fn read_until<S>(body: &mut S, needle: &str) -> String
where
    S: futures_util::Stream<Item = Result<axum::body::Bytes, axum::Error>> + Unpin,
{
    let mut received = String::new();
    while !received.contains(needle) {
        let chunk = tokio::time::timeout(TIMEOUT, body.next())
            .await
            .expect("timed out waiting for live event")
            .expect("stream ended early")
            .unwrap();
        received.push_str(&String::from_utf8_lossy(&chunk));
    }
    received
}

/// Pull the view id out of the `mounted` event.
fn mounted_view_id(received: &str) -> String {
    let mut lines = received.lines();
    while let Some(line) = lines.next() {
        if line == "event: mounted" {
            let data = lines.next().unwrap().strip_prefix("data: ").unwrap();
            let payload: serde_json::Value = serde_json::from_str(data).unwrap();
            return payload["view_id"].as_str().unwrap().to_string();
        }
    }
    panic!("no mounted event in {:?}", received);
}

// ============================================================
// Routes
// ============================================================

#[tokio::test]
async fn test_health_endpoint() {
    let rest = start_rest_upstream().await;
    let app = build_app(test_config(&rest, "ws://127.0.0.1:1"));

    let (status, json) = get_json(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "merger-calc-api");
}

#[tokio::test]
async fn test_quote_computes_allocation_figures() {
    let rest = start_rest_upstream().await;
    let app = build_app(test_config(&rest, "ws://127.0.0.1:1"));

    let (status, json) = get_json(app, "/api/quote?amount=10000").await;
    assert_eq!(status, StatusCode::OK);

    let aero = &json["rows"][0];
    assert_eq!(aero["symbol"], "AERO");
    assert_eq!(aero["display"]["exchange_ratio"], "0.529101");
    assert_eq!(aero["display"]["implied_price"], "$0.5291");
    assert_eq!(aero["display"]["new_tokens"], "18.9");
    assert!((aero["new_tokens"].as_f64().unwrap() - 18.9).abs() < 1e-9);

    assert_eq!(json["allocations"][0]["display"], "1,890,000,000");
    assert_eq!(json["allocations"][1]["display"], "110,000,000");
}

#[tokio::test]
async fn test_quote_per_token_amounts_and_total_override() {
    let rest = start_rest_upstream().await;
    let app = build_app(test_config(&rest, "ws://127.0.0.1:1"));

    let (status, json) =
        get_json(app, "/api/quote?amount_a=abc&amount_b=1000&total=1000000000").await;
    assert_eq!(status, StatusCode::OK);

    // Unparsable input is coerced to zero
    assert_eq!(json["rows"][0]["amount"], 0.0);
    assert_eq!(json["rows"][0]["new_tokens"], 0.0);

    // 1000 / 1e9 × (1e9 × 0.055) = 55
    assert!((json["rows"][1]["new_tokens"].as_f64().unwrap() - 55.0).abs() < 1e-9);
    assert_eq!(json["total_new_tokens"], 1_000_000_000.0);
}

#[tokio::test]
async fn test_quote_falls_back_to_zeros_on_upstream_failure() {
    let rest = start_rest_upstream().await;
    let mut config = test_config(&rest, "ws://127.0.0.1:1");
    config.token_b.coingecko_id = "delisted".to_string();
    let app = build_app(config);

    let (status, json) = get_json(app, "/api/quote").await;
    assert_eq!(status, StatusCode::OK);

    for row in json["rows"].as_array().unwrap() {
        assert_eq!(row["price"], 0.0);
        assert_eq!(row["supply"], 0.0);
        assert_eq!(row["exchange_ratio"], 0.0);
        // amount / 0 supply is unguarded and non-finite
        assert!(row["new_tokens"].is_null());
        assert_eq!(row["display"]["new_tokens"], "n/a");
    }
    assert_eq!(json["market_data_available"], false);
}

#[tokio::test]
async fn test_page_renders_table() {
    let rest = start_rest_upstream().await;
    let app = build_app(test_config(&rest, "ws://127.0.0.1:1"));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();

    assert!(html.contains("<h1>AERO/VELO Merger Calculator</h1>"));
    assert!(html.contains("Tokens Needed for 1 New Token"));
    assert!(html.contains(">0.529101</td>"));
    assert!(html.contains(">$1.0000</td>"));
    assert!(html.contains("AERO Allocation: 1,890,000,000 tokens (94.5%)"));
    assert!(html.contains("VELO Allocation: 110,000,000 tokens (5.5%)"));
    assert!(html.contains("name=\"amount_a\" value=\"10000\""));
    assert!(html.contains("new EventSource('/api/live'"));
}

// ============================================================
// Live view
// ============================================================

#[tokio::test]
async fn test_live_view_streams_ticks_and_closes_upstream_on_disconnect() {
    let rest = start_rest_upstream().await;

    let (closed_tx, closed_rx) = oneshot::channel::<()>();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let ws_url = format!("ws://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        // Subscribe frame, then one tracked and one untracked tick
        let _ = ws.next().await;
        for frame in [
            json!({"type": "ticker", "product_id": "BTC-USD", "price": "65000"}),
            json!({"type": "ticker", "product_id": "AERO-USD", "price": "2.00"}),
        ] {
            ws.send(Message::Text(frame.to_string().into())).await.unwrap();
        }

        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                _ => {}
            }
        }
        let _ = closed_tx.send(());
    });

    let app = build_app(test_config(&rest, &ws_url));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/live?amount=10000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body().into_data_stream();
    let mut received = String::new();
    while !received.contains("\"price\":\"$2.0000\"") {
        let chunk = tokio::time::timeout(TIMEOUT, body.next())
            .await
            .expect("timed out waiting for live update")
            .expect("stream ended early")
            .unwrap();
        received.push_str(&String::from_utf8_lossy(&chunk));
    }

    assert!(received.starts_with("event: mounted\n"));
    assert!(received.contains("event: view\n"));
    assert!(received.contains("\"price\":\"$1.0000\""));
    assert!(received.contains("\"implied_price\":\"$1.0582\""));
    assert!(!received.contains("65000"));

    // Client leaves: the upstream socket must be closed
    drop(body);
    tokio::time::timeout(TIMEOUT, closed_rx).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_live_view_reports_closed_feed_and_stays_open() {
    let rest = start_rest_upstream().await;
    let app = build_app(test_config(&rest, "ws://127.0.0.1:1"));

    let response = app
        .oneshot(Request::builder().uri("/api/live").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body().into_data_stream();
    let mut received = String::new();
    while !received.contains("\"state\":\"closed\"") {
        let chunk = tokio::time::timeout(TIMEOUT, body.next())
            .await
            .expect("timed out waiting for feed state")
            .expect("stream ended early")
            .unwrap();
        received.push_str(&String::from_utf8_lossy(&chunk));
    }

    assert!(received.contains("event: view\n"));
    assert!(received.contains("event: feed\n"));
    // Frozen prices stay as loaded
    assert!(received.contains("\"price\":\"$1.0000\""));
}

#[tokio::test]
async fn test_amount_change_keeps_live_price_without_reloading() {
    let (rest, hits) = start_counting_rest_upstream().await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let ws_url = format!("ws://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let _ = ws.next().await;
        let frame = json!({"type": "ticker", "product_id": "AERO-USD", "price": "2.00"});
        ws.send(Message::Text(frame.to_string().into())).await.unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                break;
            }
        }
    });

    let config = test_config(&rest, &ws_url);
    let state = AppState::from_config(config).unwrap();
    let app = create_router(state.clone());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/live?amount=10000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let mut body = response.into_body().into_data_stream();

    let received = read_until(&mut body, "\"price\":\"$2.0000\"").await;
    let view_id = mounted_view_id(&received);
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    let response = app
        .clone()
        .oneshot(post_amount(&view_id, "a", "5000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // 5000 / 1e9 × 1.89e9 = 9.45, recomputed at the ticked price
    let update = read_until(&mut body, "\"new_tokens\":\"9.45\"").await;
    let last_view = update.rsplit("event: view\n").next().unwrap();
    assert!(last_view.contains("\"price\":\"$2.0000\""));
    assert!(!last_view.contains("\"price\":\"$1.0000\""));

    // The loader ran once for the whole view
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    drop(body);
    tokio::time::timeout(TIMEOUT, async {
        while state.live_views.count().await > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_amount_change_for_unknown_view_is_not_found() {
    let rest = start_rest_upstream().await;
    let app = build_app(test_config(&rest, "ws://127.0.0.1:1"));

    let response = app
        .oneshot(post_amount(
            "6f1c2d3e-0000-4000-8000-000000000000",
            "a",
            "5",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
