use serde::Deserialize;

use merger_common::error::AppError;
use merger_common::types::{SupplyFigure, TokenConfig};

use crate::{SupplyProvider, ensure_non_negative};

/// CoinGecko coin endpoint, used for total supply.
///
/// `GET {base}/coins/{id}` → `{"market_data": {"total_supply": 1234.5, ...}, ...}`
pub struct CoingeckoSupply {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CoinResponse {
    market_data: Option<MarketData>,
}

#[derive(Debug, Deserialize)]
struct MarketData {
    total_supply: Option<f64>,
}

impl CoingeckoSupply {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn coin_url(&self, coin_id: &str) -> String {
        format!("{}/coins/{}", self.base_url.trim_end_matches('/'), coin_id)
    }
}

impl SupplyProvider for CoingeckoSupply {
    async fn total_supply(&self, token: &TokenConfig) -> Result<SupplyFigure, AppError> {
        let body: CoinResponse = self
            .client
            .get(self.coin_url(&token.coingecko_id))
            .query(&[
                ("localization", "false"),
                ("tickers", "false"),
                ("community_data", "false"),
                ("developer_data", "false"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let total = body
            .market_data
            .and_then(|m| m.total_supply)
            .ok_or_else(|| {
                AppError::Decode(format!(
                    "market_data.total_supply missing for {}",
                    token.coingecko_id
                ))
            })?;
        let total = ensure_non_negative(&token.symbol, "total supply", total)?;

        tracing::debug!(symbol = %token.symbol, total, "Fetched total supply");

        Ok(SupplyFigure {
            symbol: token.symbol.clone(),
            total,
        })
    }

    fn name(&self) -> &'static str {
        "coingecko"
    }
}
