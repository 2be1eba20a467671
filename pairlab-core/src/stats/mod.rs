//! Mean-reversion quality statistics used as trade-admission gates.

pub mod half_life;
pub mod hurst;
pub mod moments;

pub use half_life::{half_life, HalfLife};
pub use hurst::{hurst_exponent, DEFAULT_MAX_LAG, NEUTRAL_EXPONENT};
pub use moments::{
    mean, population_covariance, population_std, population_variance, zscore_of_last,
};
