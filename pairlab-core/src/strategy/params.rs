//! Strategy parameters with serde defaults, so a config file may omit any knob.

use super::StrategyKind;
use crate::error::{require_non_negative, require_positive, ParamsError};
use crate::estimators::{KalmanParams, DEFAULT_OLS_WINDOW};
use crate::stats::DEFAULT_MAX_LAG;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    pub kind: StrategyKind,

    /// Lower bound of the entry band on |z|.
    pub z_entry: f64,
    /// Exit once z crosses back past this level toward zero.
    pub z_exit: f64,
    /// Upper bound of the entry band on |z|; larger deviations are treated as anomalies.
    pub z_max_entry: f64,
    /// Adverse |z| that forces both legs flat.
    pub z_stop_loss: f64,

    /// Trailing spreads used for the z-score.
    pub zscore_window: usize,
    /// Spreads required before any signal logic runs.
    pub min_history: usize,
    /// Bounded spread history length.
    pub spread_capacity: usize,

    pub kalman: KalmanParams,
    pub ols_window: usize,

    pub hurst_max_lag: usize,
    /// Entries are allowed only at or below this exponent.
    pub hurst_max: f64,
    pub half_life_min: f64,
    pub half_life_max: f64,

    /// Lower entry band used by the meta-filtered kind.
    pub meta_z_entry: f64,
    /// Minimum success probability reported by the meta labeler.
    pub meta_threshold: f64,
    /// Closes of the dependent leg the labeler needs before it is consulted.
    pub meta_min_history: usize,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            kind: StrategyKind::Kalman,
            z_entry: 2.5,
            z_exit: 0.0,
            z_max_entry: 3.5,
            z_stop_loss: 4.5,
            zscore_window: 30,
            min_history: 30,
            spread_capacity: 100,
            kalman: KalmanParams::default(),
            ols_window: DEFAULT_OLS_WINDOW,
            hurst_max_lag: DEFAULT_MAX_LAG,
            hurst_max: 0.5,
            half_life_min: 1.0,
            half_life_max: 25.0,
            meta_z_entry: 0.75,
            meta_threshold: 0.65,
            meta_min_history: 50,
        }
    }
}

impl StrategyParams {
    /// Lower entry band in effect for the configured kind.
    pub fn entry_threshold(&self) -> f64 {
        match self.kind {
            StrategyKind::KalmanMetaFiltered => self.meta_z_entry,
            _ => self.z_entry,
        }
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        require_non_negative("z_exit", self.z_exit)?;
        require_positive("z_entry", self.z_entry)?;
        require_positive("meta_z_entry", self.meta_z_entry)?;
        let entry = self.entry_threshold();
        if self.z_exit >= entry {
            return Err(ParamsError::invalid(
                "z_exit",
                format!("must be below the entry threshold {entry}"),
            ));
        }
        if self.z_max_entry <= entry {
            return Err(ParamsError::invalid(
                "z_max_entry",
                format!("must exceed the entry threshold {entry}"),
            ));
        }
        if !(self.z_stop_loss.is_finite() && self.z_stop_loss > entry) {
            return Err(ParamsError::invalid(
                "z_stop_loss",
                format!("must exceed the entry threshold {entry}"),
            ));
        }

        if self.zscore_window < 2 {
            return Err(ParamsError::invalid("zscore_window", "must be at least 2"));
        }
        if self.min_history < self.zscore_window {
            return Err(ParamsError::invalid(
                "min_history",
                format!("must be at least zscore_window ({})", self.zscore_window),
            ));
        }
        if self.spread_capacity < self.min_history {
            return Err(ParamsError::invalid(
                "spread_capacity",
                format!("must be at least min_history ({})", self.min_history),
            ));
        }

        require_positive("kalman.delta", self.kalman.delta)?;
        require_positive("kalman.r", self.kalman.r)?;
        if self.ols_window < 2 {
            return Err(ParamsError::invalid("ols_window", "must be at least 2"));
        }

        if self.hurst_max_lag < 4 {
            return Err(ParamsError::invalid("hurst_max_lag", "must be at least 4"));
        }
        require_positive("hurst_max", self.hurst_max)?;
        require_non_negative("half_life_min", self.half_life_min)?;
        if !(self.half_life_max.is_finite() && self.half_life_max > self.half_life_min) {
            return Err(ParamsError::invalid(
                "half_life_max",
                format!("must exceed half_life_min ({})", self.half_life_min),
            ));
        }

        if !(0.0..=1.0).contains(&self.meta_threshold) {
            return Err(ParamsError::invalid("meta_threshold", "must lie in [0, 1]"));
        }
        Ok(())
    }
}
