//! Ticker feed wire format.
//!
//! Outbound: a single subscribe frame naming the channel and products.
//! Inbound: either the flat exchange frame
//!
//! ```json
//! {"type": "ticker", "product_id": "AERO-USD", "price": "1.2345"}
//! ```
//!
//! or the advanced-trade envelope carrying a batch of tickers
//!
//! ```json
//! {"channel": "ticker", "events": [{"type": "update", "tickers": [{"product_id": "AERO-USD", "price": "1.2345"}]}]}
//! ```
//!
//! Anything else (subscription acks, heartbeats, malformed frames) yields no ticks.

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use merger_common::types::Tick;

/// Build the subscribe frame sent once the socket is open.
pub fn subscribe_frame(channel: &str, product_ids: &[String]) -> String {
    json!({
        "type": "subscribe",
        "product_ids": product_ids,
        "channel": channel,
    })
    .to_string()
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: Option<String>,
    channel: Option<String>,
    product_id: Option<String>,
    price: Option<String>,
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    tickers: Vec<RawTicker>,
}

#[derive(Debug, Deserialize)]
struct RawTicker {
    product_id: Option<String>,
    price: Option<String>,
}

/// Decode one inbound text frame into zero or more ticks, in frame order.
pub fn parse_ticker_frame(text: &str) -> Vec<Tick> {
    let frame: RawFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::trace!(error = %e, "Ignoring malformed ticker frame");
            return Vec::new();
        }
    };

    if frame.kind.as_deref() == Some("ticker") {
        return to_tick(frame.product_id, frame.price).into_iter().collect();
    }

    if frame.channel.as_deref() == Some("ticker") {
        return frame
            .events
            .into_iter()
            .flat_map(|event| event.tickers)
            .filter_map(|t| to_tick(t.product_id, t.price))
            .collect();
    }

    Vec::new()
}

fn to_tick(product_id: Option<String>, price: Option<String>) -> Option<Tick> {
    let product_id = product_id?;
    let price: f64 = price?.trim().parse().ok()?;
    if !price.is_finite() || price < 0.0 {
        return None;
    }
    Some(Tick {
        product_id,
        price,
        received_at: Utc::now(),
    })
}
