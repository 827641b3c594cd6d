use serde::Deserialize;

use merger_common::error::AppError;
use merger_common::types::{PriceQuote, TokenConfig};

use crate::{PriceProvider, ensure_non_negative};

/// Coinbase public spot price API.
///
/// `GET {base}/v2/prices/{product_id}/spot` → `{"data": {"amount": "1.2345", ...}}`
pub struct CoinbaseSpot {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SpotResponse {
    data: SpotData,
}

#[derive(Debug, Deserialize)]
struct SpotData {
    /// Decimal price encoded as a string
    amount: String,
}

impl CoinbaseSpot {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn spot_url(&self, product_id: &str) -> String {
        format!(
            "{}/v2/prices/{}/spot",
            self.base_url.trim_end_matches('/'),
            product_id
        )
    }
}

impl PriceProvider for CoinbaseSpot {
    async fn spot_price(&self, token: &TokenConfig) -> Result<PriceQuote, AppError> {
        let url = self.spot_url(&token.product_id());
        let body: SpotResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let usd = body.data.amount.trim().parse::<f64>().map_err(|e| {
            AppError::Decode(format!(
                "invalid {} spot amount '{}': {}",
                token.symbol, body.data.amount, e
            ))
        })?;
        let usd = ensure_non_negative(&token.symbol, "spot price", usd)?;

        tracing::debug!(symbol = %token.symbol, usd, "Fetched spot price");

        Ok(PriceQuote {
            symbol: token.symbol.clone(),
            usd,
        })
    }

    fn name(&self) -> &'static str {
        "coinbase"
    }
}
