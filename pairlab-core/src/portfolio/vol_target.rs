//! Volatility targeting: scales the sizing leverage so realized portfolio
//! volatility tracks an annual target.

use crate::error::{require_positive, ParamsError};
use crate::stats::population_std;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolTargetParams {
    pub enabled: bool,
    /// Annualized volatility the book aims for.
    pub target_vol: f64,
    /// Daily returns needed before the factor departs from 1.0.
    pub lookback: usize,
    pub min_leverage: f64,
    pub periods_per_year: f64,
}

impl Default for VolTargetParams {
    fn default() -> Self {
        Self {
            enabled: false,
            target_vol: 0.15,
            lookback: 20,
            min_leverage: 0.1,
            periods_per_year: 252.0,
        }
    }
}

impl VolTargetParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        require_positive("vol_target.target_vol", self.target_vol)?;
        require_positive("vol_target.min_leverage", self.min_leverage)?;
        require_positive("vol_target.periods_per_year", self.periods_per_year)?;
        if self.lookback < 2 {
            return Err(ParamsError::invalid("vol_target.lookback", "must be at least 2"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct VolTargeter {
    params: VolTargetParams,
    max_leverage: f64,
    returns: VecDeque<f64>,
    last_equity: Option<f64>,
}

impl VolTargeter {
    pub fn new(params: VolTargetParams, max_leverage: f64) -> Self {
        Self {
            params,
            max_leverage,
            returns: VecDeque::with_capacity(params.lookback),
            last_equity: None,
        }
    }

    /// Record one end-of-step equity value.
    pub fn observe(&mut self, equity: f64) {
        if let Some(prev) = self.last_equity {
            if prev > 0.0 && equity.is_finite() {
                if self.returns.len() == self.params.lookback {
                    self.returns.pop_front();
                }
                self.returns.push_back((equity - prev) / prev);
            }
        }
        self.last_equity = Some(equity);
    }

    /// Leverage multiplier: 1.0 until `lookback` returns exist or when
    /// realized volatility is zero, otherwise `target / realized` clamped
    /// to `[min_leverage, max_leverage]`.
    pub fn leverage_factor(&self) -> f64 {
        if self.returns.len() < self.params.lookback {
            return 1.0;
        }
        let recent: Vec<f64> = self.returns.iter().copied().collect();
        let sd = population_std(&recent).unwrap_or(0.0);
        if !(sd.is_finite() && sd > 0.0) {
            return 1.0;
        }
        let realized = sd * self.params.periods_per_year.sqrt();
        (self.params.target_vol / realized).clamp(
            self.params.min_leverage,
            self.max_leverage.max(self.params.min_leverage),
        )
    }

    pub fn observed_returns(&self) -> usize {
        self.returns.len()
    }
}
