use alloy::primitives::utils::format_units;
use alloy::primitives::{Address, U256};
use alloy::providers::ProviderBuilder;
use alloy::sol;

use merger_common::error::AppError;
use merger_common::types::{SupplyFigure, TokenConfig};

use crate::{SupplyProvider, ensure_non_negative};

/// Fixed-point scale of the ERC-20 supply value.
pub const TOKEN_DECIMALS: u8 = 18;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function totalSupply() external view returns (uint256);
    }
}

/// Reads `totalSupply()` straight from the token contract.
///
/// Each token carries its own RPC URL since the pair may live on different chains.
#[derive(Debug, Default)]
pub struct OnChainSupply;

impl OnChainSupply {
    pub fn new() -> Self {
        Self
    }
}

impl SupplyProvider for OnChainSupply {
    async fn total_supply(&self, token: &TokenConfig) -> Result<SupplyFigure, AppError> {
        let rpc_url = token.rpc_url.as_deref().ok_or_else(|| {
            AppError::Config(format!("no RPC URL configured for {}", token.symbol))
        })?;
        let contract = token.contract_address.as_deref().ok_or_else(|| {
            AppError::Config(format!("no contract address configured for {}", token.symbol))
        })?;

        let address: Address = contract.parse().map_err(|e| {
            AppError::Config(format!("invalid contract address for {}: {}", token.symbol, e))
        })?;
        let url: reqwest::Url = rpc_url.parse().map_err(|e| {
            AppError::Config(format!("invalid RPC URL for {}: {}", token.symbol, e))
        })?;

        let provider = ProviderBuilder::new().connect_http(url);
        let erc20 = IERC20::new(address, provider);

        let raw = erc20
            .totalSupply()
            .call()
            .await
            .map_err(|e| AppError::Rpc(format!("totalSupply() failed for {}: {}", token.symbol, e)))?;

        let total = scale_fixed_point(raw, TOKEN_DECIMALS)?;
        let total = ensure_non_negative(&token.symbol, "total supply", total)?;

        tracing::debug!(
            symbol = %token.symbol,
            contract = %address,
            raw = %raw,
            total,
            "Read on-chain total supply"
        );

        Ok(SupplyFigure {
            symbol: token.symbol.clone(),
            total,
        })
    }

    fn name(&self) -> &'static str {
        "onchain"
    }
}

/// Convert a fixed-point integer with `decimals` places into a float.
pub fn scale_fixed_point(raw: U256, decimals: u8) -> Result<f64, AppError> {
    let text = format_units(raw, decimals)
        .map_err(|e| AppError::Decode(format!("cannot scale {}: {}", raw, e)))?;
    text.parse::<f64>()
        .map_err(|e| AppError::Decode(format!("cannot parse scaled value '{}': {}", text, e)))
}
