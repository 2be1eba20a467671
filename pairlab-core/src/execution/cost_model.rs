//! Cost model: per-share commission with a floor, and directional slippage.
//!
//! Slippage is directional: buyers pay more, sellers receive less.

use crate::domain::OrderSide;
use crate::error::{require_non_negative, ParamsError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionParams {
    /// Commission per share.
    pub commission_per_share: f64,
    /// Minimum commission charged on any fill.
    pub min_commission: f64,
    /// Fixed fraction of price lost on every fill (5 bps = 0.0005).
    pub spread_penalty: f64,
    /// Standard deviation of the random component of slippage.
    pub slippage_std: f64,
    /// Venue label stamped on fills.
    pub exchange: String,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            commission_per_share: 0.005,
            min_commission: 1.0,
            spread_penalty: 0.0005,
            slippage_std: 1e-4,
            exchange: "ARCA_SIM".to_string(),
        }
    }
}

impl ExecutionParams {
    /// No commission and no slippage.
    pub fn frictionless() -> Self {
        Self {
            commission_per_share: 0.0,
            min_commission: 0.0,
            spread_penalty: 0.0,
            slippage_std: 0.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        require_non_negative("commission_per_share", self.commission_per_share)?;
        require_non_negative("min_commission", self.min_commission)?;
        require_non_negative("spread_penalty", self.spread_penalty)?;
        require_non_negative("slippage_std", self.slippage_std)?;
        if self.spread_penalty >= 1.0 {
            return Err(ParamsError::invalid("spread_penalty", "must be below 1.0"));
        }
        if self.exchange.trim().is_empty() {
            return Err(ParamsError::invalid("exchange", "must not be empty"));
        }
        Ok(())
    }
}

/// `max(min_commission, per_share · |quantity|)`.
pub fn commission(params: &ExecutionParams, quantity: u64) -> f64 {
    (params.commission_per_share * quantity as f64).max(params.min_commission)
}

/// Apply a slippage fraction against the order's side.
///
/// Negative fractions are floored at zero, so a fill is never better than
/// the reference price.
pub fn slipped_price(price: f64, side: OrderSide, fraction: f64) -> f64 {
    let fraction = fraction.max(0.0);
    match side {
        OrderSide::Buy => price * (1.0 + fraction),
        OrderSide::Sell => price * (1.0 - fraction),
    }
}
