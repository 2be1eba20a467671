//! Mean-reversion half-life of a spread series.
//!
//! Fits `Δs_t = -θ·(s_{t-1} - mean(s_lag))` by least squares without intercept.
//! The half-life is `ln 2 / θ`. A non-positive θ means the series does not
//! revert, which is reported distinctly from a numeric half-life.

use super::moments::mean;
use serde::{Deserialize, Serialize};
use std::f64::consts::LN_2;

/// Fewest points accepted for a fit.
pub const MIN_POINTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HalfLife {
    /// Expected number of steps for a deviation to halve.
    Finite(f64),
    /// θ ≤ 0: the series drifts away from its mean or does not move back.
    NonReverting,
    /// Too few points or zero variance in the lagged level.
    Indeterminate,
}

impl HalfLife {
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Finite(h) => Some(h),
            _ => None,
        }
    }

    /// True only for a finite half-life inside `[min, max]`.
    pub fn within(self, min: f64, max: f64) -> bool {
        matches!(self, Self::Finite(h) if h >= min && h <= max)
    }
}

pub fn half_life(series: &[f64]) -> HalfLife {
    if series.len() < MIN_POINTS {
        return HalfLife::Indeterminate;
    }

    let lagged = &series[..series.len() - 1];
    let Some(lag_mean) = mean(lagged) else {
        return HalfLife::Indeterminate;
    };

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (prev, next) in lagged.iter().zip(&series[1..]) {
        let x = prev - lag_mean;
        let dy = next - prev;
        sxy += x * dy;
        sxx += x * x;
    }
    if sxx == 0.0 || !sxx.is_finite() {
        return HalfLife::Indeterminate;
    }

    let theta = -sxy / sxx;
    if !theta.is_finite() {
        return HalfLife::Indeterminate;
    }
    if theta <= 0.0 {
        return HalfLife::NonReverting;
    }
    HalfLife::Finite(LN_2 / theta)
}
