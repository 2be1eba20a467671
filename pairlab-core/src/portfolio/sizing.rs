//! Risk-parity sizing.
//!
//! Turns a signal's volatility estimate into a share count.
//!
//! # Formula
//! ```text
//! dollars  = equity * target_risk_fraction / max(est_volatility, volatility_floor)
//! dollars  = min(dollars, max_position_fraction * equity * target_leverage)
//! quantity = floor(dollars / price)
//! ```
//!
//! # Example
//! - Equity: $100,000, target risk 2% ($2,000)
//! - Spread volatility: 0.50 → $4,000 target exposure
//! - Cap: 10% of $100,000 × 2.0 = $20,000 (not binding)
//! - Price $40 → 100 shares

use super::vol_target::VolTargetParams;
use crate::error::{require_positive, ParamsError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskParams {
    /// Fraction of equity risked per unit of signal volatility.
    pub target_risk_fraction: f64,
    /// Lower bound on the volatility used as a divisor.
    pub volatility_floor: f64,
    /// Leverage the per-line cap is scaled by.
    pub target_leverage: f64,
    /// Hard cap: no new position while gross leverage is at or above this.
    pub max_leverage: f64,
    /// Largest single line as a fraction of `equity * target_leverage`.
    pub max_position_fraction: f64,
    pub vol_target: VolTargetParams,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            target_risk_fraction: 0.02,
            volatility_floor: 0.01,
            target_leverage: 2.0,
            max_leverage: 3.0,
            max_position_fraction: 0.10,
            vol_target: VolTargetParams::default(),
        }
    }
}

impl RiskParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        require_positive("target_risk_fraction", self.target_risk_fraction)?;
        require_positive("volatility_floor", self.volatility_floor)?;
        require_positive("target_leverage", self.target_leverage)?;
        require_positive("max_leverage", self.max_leverage)?;
        require_positive("max_position_fraction", self.max_position_fraction)?;
        if self.max_position_fraction > 1.0 {
            return Err(ParamsError::invalid(
                "max_position_fraction",
                "must not exceed 1.0",
            ));
        }
        self.vol_target.validate()
    }
}

/// Share count for a new position, or 0 when the order should be suppressed.
///
/// Zero, negative or non-finite prices and equity size to 0.
pub fn risk_parity_quantity(
    equity: f64,
    price: f64,
    est_volatility: f64,
    target_leverage: f64,
    params: &RiskParams,
) -> u64 {
    if !(price.is_finite() && price > 0.0) || !(equity.is_finite() && equity > 0.0) {
        return 0;
    }

    // f64::max ignores a NaN operand, so a NaN estimate falls back to the floor.
    let vol = est_volatility.max(params.volatility_floor);
    let target = equity * params.target_risk_fraction / vol;
    let cap = params.max_position_fraction * equity * target_leverage;
    let dollars = target.min(cap);
    if !(dollars.is_finite() && dollars > 0.0) {
        return 0;
    }
    (dollars / price).floor() as u64
}
