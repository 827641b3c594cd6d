//! Data Loader — one-shot retrieval of the two spot prices and two total
//! supplies a view needs.
//!
//! All four values load together or not at all: the first failure is logged
//! and the whole bundle falls back to zeros. Nothing is retried.

pub mod coinbase;
pub mod coingecko;
pub mod onchain;

use std::future::Future;

use merger_common::config::AppConfig;
use merger_common::error::AppError;
use merger_common::types::{MarketSnapshot, PriceQuote, SupplyFigure, SupplySource, TokenConfig};

use crate::coinbase::CoinbaseSpot;
use crate::coingecko::CoingeckoSupply;
use crate::onchain::OnChainSupply;

/// Source of USD spot prices.
pub trait PriceProvider: Send + Sync {
    fn spot_price(
        &self,
        token: &TokenConfig,
    ) -> impl Future<Output = Result<PriceQuote, AppError>> + Send;

    /// Human-readable name for logs.
    fn name(&self) -> &'static str;
}

/// Source of total supply figures.
pub trait SupplyProvider: Send + Sync {
    fn total_supply(
        &self,
        token: &TokenConfig,
    ) -> impl Future<Output = Result<SupplyFigure, AppError>> + Send;

    /// Human-readable name for logs.
    fn name(&self) -> &'static str;
}

/// Fetch both prices and both supplies concurrently.
///
/// Returns the zeroed bundle if any of the four fetches fails.
pub async fn load_snapshot<P, S>(
    prices: &P,
    supplies: &S,
    token_a: &TokenConfig,
    token_b: &TokenConfig,
) -> MarketSnapshot
where
    P: PriceProvider,
    S: SupplyProvider,
{
    let result = tokio::try_join!(
        prices.spot_price(token_a),
        prices.spot_price(token_b),
        supplies.total_supply(token_a),
        supplies.total_supply(token_b),
    );

    match result {
        Ok((price_a, price_b, supply_a, supply_b)) => {
            tracing::info!(
                price_source = prices.name(),
                supply_source = supplies.name(),
                price_a = price_a.usd,
                price_b = price_b.usd,
                supply_a = supply_a.total,
                supply_b = supply_b.total,
                "Loaded market data"
            );
            MarketSnapshot {
                prices: [price_a, price_b],
                supplies: [supply_a, supply_b],
            }
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                price_source = prices.name(),
                supply_source = supplies.name(),
                "Error fetching market data, falling back to zero values"
            );
            MarketSnapshot::zeroed(token_a, token_b)
        }
    }
}

/// Reject negative and non-finite figures coming back from an upstream.
pub(crate) fn ensure_non_negative(symbol: &str, field: &str, value: f64) -> Result<f64, AppError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::Decode(format!(
            "{} {} must be a non-negative number, got {}",
            symbol, field, value
        )));
    }
    Ok(value)
}

/// Shared HTTP client for the REST sources.
pub fn http_client() -> Result<reqwest::Client, AppError> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("merger-calc/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Supply backend selected by configuration.
pub enum SupplyBackend {
    Market(CoingeckoSupply),
    OnChain(OnChainSupply),
}

impl SupplyProvider for SupplyBackend {
    async fn total_supply(&self, token: &TokenConfig) -> Result<SupplyFigure, AppError> {
        match self {
            SupplyBackend::Market(source) => source.total_supply(token).await,
            SupplyBackend::OnChain(source) => source.total_supply(token).await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            SupplyBackend::Market(source) => source.name(),
            SupplyBackend::OnChain(source) => source.name(),
        }
    }
}

/// Configured Data Loader for the token pair.
pub struct DataLoader {
    prices: CoinbaseSpot,
    supplies: SupplyBackend,
    token_a: TokenConfig,
    token_b: TokenConfig,
}

impl DataLoader {
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let client = http_client()?;
        let supplies = match config.supply_source {
            SupplySource::Market => SupplyBackend::Market(CoingeckoSupply::new(
                client.clone(),
                config.coingecko_api_url.clone(),
            )),
            SupplySource::OnChain => SupplyBackend::OnChain(OnChainSupply::new()),
        };

        tracing::info!(supply_source = %config.supply_source, "Data loader configured");

        Ok(Self {
            prices: CoinbaseSpot::new(client, config.coinbase_api_url.clone()),
            supplies,
            token_a: config.token_a.clone(),
            token_b: config.token_b.clone(),
        })
    }

    /// Run the four fetches once. Never fails; see [`load_snapshot`].
    pub async fn load(&self) -> MarketSnapshot {
        load_snapshot(&self.prices, &self.supplies, &self.token_a, &self.token_b).await
    }

    pub fn token_a(&self) -> &TokenConfig {
        &self.token_a
    }

    pub fn token_b(&self) -> &TokenConfig {
        &self.token_b
    }
}
