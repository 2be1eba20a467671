//! Synthetic cointegrated price pairs.
//!
//! Developer-only data for smoke runs, benchmarks and tests. The explanatory
//! leg is a Gaussian random walk; the dependent leg is `alpha + beta·x` plus an
//! AR(1) spread that reverts at rate `theta`. Generation is fully determined
//! by the seed.

use super::source::InMemorySource;
use crate::domain::PricePoint;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;

/// Lowest price the generator will emit.
const PRICE_FLOOR: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticPairParams {
    pub start: NaiveDate,
    /// Business days to generate.
    pub days: usize,
    pub x_start: f64,
    /// Daily step volatility of the explanatory leg.
    pub x_step_std: f64,
    pub alpha: f64,
    pub beta: f64,
    /// Per-step reversion speed of the spread, in (0, 1).
    pub theta: f64,
    pub spread_std: f64,
}

impl Default for SyntheticPairParams {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            days: 750,
            x_start: 100.0,
            x_step_std: 0.8,
            alpha: 5.0,
            beta: 0.8,
            theta: 0.2,
            spread_std: 0.5,
        }
    }
}

/// Weekdays starting at `start` (inclusive if it is a weekday).
pub fn business_days(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut out = Vec::with_capacity(count);
    let mut day = start;
    while out.len() < count {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            out.push(day);
        }
        day += Duration::days(1);
    }
    out
}

/// `(y, x)` close series for one synthetic pair.
pub fn cointegrated_pair(
    params: &SyntheticPairParams,
    seed: u64,
) -> (Vec<PricePoint>, Vec<PricePoint>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let x_noise = Normal::new(0.0, params.x_step_std.max(f64::MIN_POSITIVE)).ok();
    let s_noise = Normal::new(0.0, params.spread_std.max(f64::MIN_POSITIVE)).ok();

    let mut x = params.x_start;
    let mut spread = 0.0;
    let mut ys = Vec::with_capacity(params.days);
    let mut xs = Vec::with_capacity(params.days);

    for date in business_days(params.start, params.days) {
        if let Some(n) = &x_noise {
            x = (x + n.sample(&mut rng)).max(PRICE_FLOOR);
        }
        if let Some(n) = &s_noise {
            spread = (1.0 - params.theta) * spread + n.sample(&mut rng);
        }
        let y = (params.alpha + params.beta * x + spread).max(PRICE_FLOOR);
        ys.push(PricePoint::new(date, y));
        xs.push(PricePoint::new(date, x));
    }
    (ys, xs)
}

/// An in-memory source holding one synthetic pair under `y` and `x`.
pub fn cointegrated_source(
    y: &str,
    x: &str,
    params: &SyntheticPairParams,
    seed: u64,
) -> InMemorySource {
    let (ys, xs) = cointegrated_pair(params, seed);
    InMemorySource::new().with_series(y, ys).with_series(x, xs)
}
