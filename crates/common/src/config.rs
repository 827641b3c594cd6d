use std::net::SocketAddr;

use serde::Deserialize;

use crate::types::{SupplySource, TokenConfig};

/// AERO on Base.
const DEFAULT_TOKEN_A_CONTRACT: &str = "0x940181a94A35A4569E4529A3CDfB74e38FD98631";
/// VELO (v2) on Optimism.
const DEFAULT_TOKEN_B_CONTRACT: &str = "0x9560e827aF36c94D2Ac33a39bCE1Fe78631088Db";

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub listen_addr: SocketAddr,

    /// Base URL of the spot price API (Coinbase)
    pub coinbase_api_url: String,

    /// Base URL of the market-data API (CoinGecko)
    pub coingecko_api_url: String,

    /// WebSocket URL of the live ticker feed
    pub ticker_ws_url: String,

    /// Ticker channel name sent in the subscribe frame
    pub ticker_channel: String,

    /// Which backend supplies total supply figures
    pub supply_source: SupplySource,

    /// Token receiving the larger share (default: AERO, 94.5%)
    pub token_a: TokenConfig,

    /// Token receiving the smaller share (default: VELO, 5.5%)
    pub token_b: TokenConfig,

    /// Size of the new token pool (default: 2 billion)
    pub total_new_tokens: f64,

    /// Pre-filled input amount shown on first render
    pub default_amount: f64,

    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let quote_currency = env_or("QUOTE_CURRENCY", "USD");

        Ok(Self {
            listen_addr: env_or("LISTEN_ADDR", "0.0.0.0:3000")
                .parse()
                .map_err(|_| anyhow::anyhow!("LISTEN_ADDR must be a valid socket address"))?,
            coinbase_api_url: env_or("COINBASE_API_URL", "https://api.coinbase.com"),
            coingecko_api_url: env_or("COINGECKO_API_URL", "https://api.coingecko.com/api/v3"),
            ticker_ws_url: env_or("TICKER_WS_URL", "wss://advanced-trade-ws.coinbase.com"),
            ticker_channel: env_or("TICKER_CHANNEL", "ticker"),
            supply_source: env_or("SUPPLY_SOURCE", "market").parse()?,
            token_a: TokenConfig {
                symbol: env_or("TOKEN_A_SYMBOL", "AERO"),
                quote_currency: quote_currency.clone(),
                coingecko_id: env_or("TOKEN_A_COINGECKO_ID", "aerodrome-finance"),
                contract_address: Some(env_or("TOKEN_A_CONTRACT", DEFAULT_TOKEN_A_CONTRACT)),
                rpc_url: Some(env_or("TOKEN_A_RPC_URL", "https://mainnet.base.org")),
                allocation_fraction: parse_env("TOKEN_A_FRACTION", "0.945")?,
            },
            token_b: TokenConfig {
                symbol: env_or("TOKEN_B_SYMBOL", "VELO"),
                quote_currency,
                coingecko_id: env_or("TOKEN_B_COINGECKO_ID", "velodrome-finance"),
                contract_address: Some(env_or("TOKEN_B_CONTRACT", DEFAULT_TOKEN_B_CONTRACT)),
                rpc_url: Some(env_or("TOKEN_B_RPC_URL", "https://mainnet.optimism.io")),
                allocation_fraction: parse_env("TOKEN_B_FRACTION", "0.055")?,
            },
            total_new_tokens: parse_env("TOTAL_NEW_TOKENS", "2000000000")?,
            default_amount: parse_env("DEFAULT_AMOUNT", "10000")?,
            log_json: parse_env("LOG_JSON", "false")?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: &str) -> anyhow::Result<T> {
    env_or(key, default).trim().parse().map_err(|_| {
        anyhow::anyhow!(
            "{} must be a valid {}",
            key,
            std::any::type_name::<T>()
        )
    })
}
