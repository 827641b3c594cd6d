//! Allocation math — how the new token pool is split and what that implies
//! for each existing token.
//!
//! ```text
//! allocation     = total × fraction
//! exchange_ratio = supply / allocation
//! implied_price  = exchange_ratio × price
//! new_tokens     = (amount / supply) × allocation
//! ```
//!
//! All arithmetic is plain IEEE-754. A zero supply or zero allocation yields
//! non-finite results which are carried through to the view as-is.

use serde::Serialize;

use merger_common::error::AppError;

/// Tolerance when checking that the two fractions add up to one.
const FRACTION_SUM_TOLERANCE: f64 = 1e-9;

/// Fixed split of the new token pool between token A and token B.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AllocationConfig {
    total_new_tokens: f64,
    fraction_a: f64,
    fraction_b: f64,
}

impl AllocationConfig {
    /// Validate and build an allocation config.
    ///
    /// Fractions must be finite, non-negative and sum to 1. The total must be
    /// finite and non-negative.
    pub fn new(total_new_tokens: f64, fraction_a: f64, fraction_b: f64) -> Result<Self, AppError> {
        validate_total(total_new_tokens)?;

        for (name, fraction) in [("fraction_a", fraction_a), ("fraction_b", fraction_b)] {
            if !fraction.is_finite() || fraction < 0.0 {
                return Err(AppError::Validation(format!(
                    "{} must be a non-negative number, got {}",
                    name, fraction
                )));
            }
        }

        let sum = fraction_a + fraction_b;
        if (sum - 1.0).abs() > FRACTION_SUM_TOLERANCE {
            return Err(AppError::Validation(format!(
                "allocation fractions must sum to 1, got {}",
                sum
            )));
        }

        Ok(Self {
            total_new_tokens,
            fraction_a,
            fraction_b,
        })
    }

    /// Same split, different pool size (user override).
    pub fn with_total(self, total_new_tokens: f64) -> Result<Self, AppError> {
        validate_total(total_new_tokens)?;
        Ok(Self {
            total_new_tokens,
            ..self
        })
    }

    pub fn total_new_tokens(&self) -> f64 {
        self.total_new_tokens
    }

    pub fn fraction_a(&self) -> f64 {
        self.fraction_a
    }

    pub fn fraction_b(&self) -> f64 {
        self.fraction_b
    }

    /// New tokens reserved for holders of token A.
    pub fn allocation_a(&self) -> f64 {
        self.total_new_tokens * self.fraction_a
    }

    /// New tokens reserved for holders of token B.
    pub fn allocation_b(&self) -> f64 {
        self.total_new_tokens * self.fraction_b
    }
}

fn validate_total(total: f64) -> Result<(), AppError> {
    if !total.is_finite() || total < 0.0 {
        return Err(AppError::Validation(format!(
            "total new tokens must be a non-negative number, got {}",
            total
        )));
    }
    Ok(())
}

/// Existing-token units that convert into one new token.
pub fn exchange_ratio(supply: f64, allocation: f64) -> f64 {
    supply / allocation
}

/// USD price of one new token implied by the existing token's price.
pub fn implied_price(exchange_ratio: f64, price: f64) -> f64 {
    exchange_ratio * price
}

/// New tokens received for `amount` units of the existing token.
pub fn new_tokens_for_input(amount: f64, supply: f64, allocation: f64) -> f64 {
    (amount / supply) * allocation
}
