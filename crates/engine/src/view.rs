//! Allocation View — the state container behind one rendered calculator.
//!
//! Holds the loaded supplies, the current prices (overwritten by live ticks)
//! and the user's input amounts. Derived ratios are never stored; every
//! `render()` recomputes them from the current state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use merger_common::error::AppError;
use merger_common::types::{MarketSnapshot, Tick, TokenConfig};

use crate::allocation::{self, AllocationConfig};
use crate::format;

/// Which of the two tokens an input refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    A,
    B,
}

impl Side {
    fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }
}

/// Parse user text into a non-negative amount. Anything unusable becomes 0.
pub fn parse_amount(text: &str) -> f64 {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value,
        _ => 0.0,
    }
}

/// Raw, unvalidated inputs as they arrive from the page form or query string.
///
/// `amount` is the single-input form and applies to both tokens; `amount_a` /
/// `amount_b` override it per token. `total` overrides the new token pool size.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawViewInputs {
    pub amount: Option<String>,
    pub amount_a: Option<String>,
    pub amount_b: Option<String>,
    pub total: Option<String>,
}

/// Resolved user inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewInputs {
    pub amount_a: f64,
    pub amount_b: f64,
    pub total_new_tokens: f64,
}

impl ViewInputs {
    pub fn resolve(raw: &RawViewInputs, default_amount: f64, default_total: f64) -> Self {
        let shared = raw.amount.as_deref().map(parse_amount).unwrap_or(default_amount);
        Self {
            amount_a: raw.amount_a.as_deref().map(parse_amount).unwrap_or(shared),
            amount_b: raw.amount_b.as_deref().map(parse_amount).unwrap_or(shared),
            total_new_tokens: raw.total.as_deref().map(parse_amount).unwrap_or(default_total),
        }
    }
}

#[derive(Debug, Clone)]
struct TrackedToken {
    symbol: String,
    product_id: String,
    supply: f64,
    price: f64,
}

/// Mutable state for one view: prices, supplies, amounts, allocation.
#[derive(Debug, Clone)]
pub struct AllocationView {
    tokens: [TrackedToken; 2],
    allocation: AllocationConfig,
    amounts: [f64; 2],
    market_data_available: bool,
    last_tick_at: Option<DateTime<Utc>>,
}

impl AllocationView {
    pub fn new(
        snapshot: &MarketSnapshot,
        token_a: &TokenConfig,
        token_b: &TokenConfig,
        allocation: AllocationConfig,
        inputs: &ViewInputs,
    ) -> Result<Self, AppError> {
        let allocation = allocation.with_total(inputs.total_new_tokens)?;
        let tracked = |i: usize, token: &TokenConfig| TrackedToken {
            symbol: token.symbol.clone(),
            product_id: token.product_id(),
            supply: snapshot.supplies[i].total,
            price: snapshot.prices[i].usd,
        };

        Ok(Self {
            tokens: [tracked(0, token_a), tracked(1, token_b)],
            allocation,
            amounts: [inputs.amount_a, inputs.amount_b],
            market_data_available: !snapshot.is_zeroed(),
            last_tick_at: None,
        })
    }

    /// Products to subscribe to on the live feed, token A first.
    pub fn product_ids(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.product_id.clone()).collect()
    }

    pub fn price(&self, side: Side) -> f64 {
        self.tokens[side.index()].price
    }

    pub fn amount(&self, side: Side) -> f64 {
        self.amounts[side.index()]
    }

    /// Overwrite the matching tracked price with a live tick.
    ///
    /// Returns `true` when a tracked price actually changed. Ticks for other
    /// products leave the view untouched.
    pub fn apply_tick(&mut self, tick: &Tick) -> bool {
        let Some(token) = self
            .tokens
            .iter_mut()
            .find(|t| t.product_id == tick.product_id)
        else {
            return false;
        };

        self.last_tick_at = Some(tick.received_at);
        if token.price == tick.price {
            return false;
        }

        tracing::trace!(
            product_id = %tick.product_id,
            old = token.price,
            new = tick.price,
            "Live price updated"
        );
        token.price = tick.price;
        true
    }

    /// Re-parse a user-entered amount.
    pub fn set_amount(&mut self, side: Side, text: &str) {
        self.amounts[side.index()] = parse_amount(text);
    }

    /// Recompute every derived figure from the current state.
    pub fn render(&self) -> ViewSnapshot {
        let allocations = [self.allocation.allocation_a(), self.allocation.allocation_b()];
        let fractions = [self.allocation.fraction_a(), self.allocation.fraction_b()];

        let rows = self
            .tokens
            .iter()
            .zip(allocations)
            .zip(self.amounts)
            .map(|((token, alloc), amount)| {
                let exchange_ratio = allocation::exchange_ratio(token.supply, alloc);
                let implied_price = allocation::implied_price(exchange_ratio, token.price);
                let new_tokens = allocation::new_tokens_for_input(amount, token.supply, alloc);
                TokenRow {
                    symbol: token.symbol.clone(),
                    product_id: token.product_id.clone(),
                    amount,
                    supply: token.supply,
                    price: token.price,
                    exchange_ratio,
                    implied_price,
                    new_tokens,
                    display: RowDisplay {
                        amount: format::grouped(amount, 3),
                        supply: format::grouped(token.supply, 3),
                        price: format::usd(token.price, 4),
                        exchange_ratio: format::fixed(exchange_ratio, 6),
                        implied_price: format::usd(implied_price, 4),
                        new_tokens: format::grouped(new_tokens, 2),
                    },
                }
            })
            .collect();

        let allocation_lines = self
            .tokens
            .iter()
            .zip(allocations)
            .zip(fractions)
            .map(|((token, tokens), fraction)| AllocationLine {
                symbol: token.symbol.clone(),
                tokens,
                fraction,
                display: format::grouped(tokens, 3),
                percent: format!("{}%", format::grouped(fraction * 100.0, 2)),
            })
            .collect();

        ViewSnapshot {
            rows,
            allocations: allocation_lines,
            total_new_tokens: self.allocation.total_new_tokens(),
            total_new_tokens_display: format::grouped(self.allocation.total_new_tokens(), 3),
            market_data_available: self.market_data_available,
            last_tick_at: self.last_tick_at,
        }
    }
}

/// Everything the page shows, recomputed on each state change.
///
/// Non-finite numbers serialize as JSON `null`; their display strings read `n/a`.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub rows: Vec<TokenRow>,
    pub allocations: Vec<AllocationLine>,
    pub total_new_tokens: f64,
    pub total_new_tokens_display: String,
    /// `false` when the loader fell back to the zeroed bundle.
    pub market_data_available: bool,
    pub last_tick_at: Option<DateTime<Utc>>,
}

/// One line of the six-column results table.
#[derive(Debug, Clone, Serialize)]
pub struct TokenRow {
    pub symbol: String,
    pub product_id: String,
    pub amount: f64,
    pub supply: f64,
    pub price: f64,
    pub exchange_ratio: f64,
    pub implied_price: f64,
    pub new_tokens: f64,
    pub display: RowDisplay,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowDisplay {
    pub amount: String,
    pub supply: String,
    pub price: String,
    pub exchange_ratio: String,
    pub implied_price: String,
    pub new_tokens: String,
}

/// Summary line for one side of the new token pool.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationLine {
    pub symbol: String,
    pub tokens: f64,
    pub fraction: f64,
    pub display: String,
    pub percent: String,
}
