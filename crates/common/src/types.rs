use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Where total supply figures are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplySource {
    /// REST market-data API (CoinGecko).
    Market,
    /// ERC-20 `totalSupply()` read against the token's RPC node.
    OnChain,
}

impl std::fmt::Display for SupplySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupplySource::Market => write!(f, "market"),
            SupplySource::OnChain => write!(f, "onchain"),
        }
    }
}

impl FromStr for SupplySource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "market" | "api" | "coingecko" => Ok(SupplySource::Market),
            "onchain" | "chain" | "rpc" => Ok(SupplySource::OnChain),
            other => Err(AppError::Config(format!(
                "unknown supply source '{}' (expected 'market' or 'onchain')",
                other
            ))),
        }
    }
}

/// One of the two tokens taking part in the merger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Ticker symbol (e.g., "AERO")
    pub symbol: String,
    /// Quote currency used for spot prices and ticker products (e.g., "USD")
    pub quote_currency: String,
    /// Market-data API coin identifier (e.g., "aerodrome-finance")
    pub coingecko_id: String,
    /// ERC-20 contract address, required for on-chain supply reads
    pub contract_address: Option<String>,
    /// JSON-RPC endpoint of the chain the contract lives on
    pub rpc_url: Option<String>,
    /// Share of the new token pool assigned to holders of this token
    pub allocation_fraction: f64,
}

impl TokenConfig {
    /// Exchange product identifier, e.g. `AERO-USD`.
    pub fn product_id(&self) -> String {
        format!("{}-{}", self.symbol, self.quote_currency)
    }
}

/// Latest known USD spot price for a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub symbol: String,
    pub usd: f64,
}

/// Total supply for a token, fixed for the lifetime of a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyFigure {
    pub symbol: String,
    pub total: f64,
}

/// The four numbers the Data Loader produces for a token pair.
///
/// Index 0 is token A, index 1 is token B.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub prices: [PriceQuote; 2],
    pub supplies: [SupplyFigure; 2],
}

impl MarketSnapshot {
    /// The all-zero fallback bundle used when any fetch fails.
    pub fn zeroed(a: &TokenConfig, b: &TokenConfig) -> Self {
        Self {
            prices: [
                PriceQuote {
                    symbol: a.symbol.clone(),
                    usd: 0.0,
                },
                PriceQuote {
                    symbol: b.symbol.clone(),
                    usd: 0.0,
                },
            ],
            supplies: [
                SupplyFigure {
                    symbol: a.symbol.clone(),
                    total: 0.0,
                },
                SupplyFigure {
                    symbol: b.symbol.clone(),
                    total: 0.0,
                },
            ],
        }
    }

    pub fn is_zeroed(&self) -> bool {
        self.prices.iter().all(|p| p.usd == 0.0) && self.supplies.iter().all(|s| s.total == 0.0)
    }
}

/// A single price update received from the live ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Product the update is for (e.g., "AERO-USD")
    pub product_id: String,
    pub price: f64,
    pub received_at: DateTime<Utc>,
}

/// Lifecycle of a live ticker subscription.
///
/// `Disconnected → Connecting → Subscribed → Closed`. There is no error state:
/// a failing connection goes straight to `Closed` and prices stay frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedState {
    Disconnected,
    Connecting,
    Subscribed,
    Closed,
}

impl std::fmt::Display for FeedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedState::Disconnected => write!(f, "disconnected"),
            FeedState::Connecting => write!(f, "connecting"),
            FeedState::Subscribed => write!(f, "subscribed"),
            FeedState::Closed => write!(f, "closed"),
        }
    }
}
