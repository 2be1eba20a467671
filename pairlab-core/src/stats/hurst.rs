//! Long-memory exponent of a spread series.
//!
//! For each lag in `2..max_lag`, tau(lag) is the square root of the population
//! standard deviation of the lag-differenced series. The exponent is the
//! least-squares slope of `ln tau` against `ln lag`. Values at or below 0.5
//! are read as anti-persistent (mean reverting).

use super::moments::{mean, population_std};

/// Upper lag bound (exclusive).
pub const DEFAULT_MAX_LAG: usize = 20;

/// Exponent returned when the series is too short or degenerate.
pub const NEUTRAL_EXPONENT: f64 = 0.5;

pub fn hurst_exponent(series: &[f64], max_lag: usize) -> f64 {
    if max_lag < 4 || series.len() < max_lag {
        return NEUTRAL_EXPONENT;
    }

    let mut log_lags = Vec::with_capacity(max_lag - 2);
    let mut log_tau = Vec::with_capacity(max_lag - 2);

    for lag in 2..max_lag {
        let diffs: Vec<f64> = series[lag..]
            .iter()
            .zip(series)
            .map(|(later, earlier)| later - earlier)
            .collect();
        let Some(sd) = population_std(&diffs) else {
            return NEUTRAL_EXPONENT;
        };
        let tau = sd.sqrt();
        if !(tau.is_finite() && tau > 0.0) {
            return NEUTRAL_EXPONENT;
        }
        log_lags.push((lag as f64).ln());
        log_tau.push(tau.ln());
    }

    match slope(&log_lags, &log_tau) {
        Some(h) if h.is_finite() => h,
        _ => NEUTRAL_EXPONENT,
    }
}

/// Least-squares slope of `ys` on `xs` with intercept.
fn slope(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx) * (x - mx);
    }
    if sxx == 0.0 {
        return None;
    }
    Some(sxy / sxx)
}
