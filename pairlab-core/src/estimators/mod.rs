//! Hedge-ratio estimators.
//!
//! A pair's spread is `y - (β·x + α)`. The estimator supplies α and β and is
//! owned by exactly one pair.

pub mod kalman;
pub mod rolling_ols;

pub use kalman::{KalmanFilter, KalmanParams};
pub use rolling_ols::{RollingOls, DEFAULT_OLS_WINDOW};

#[derive(Debug, Clone, PartialEq)]
pub enum HedgeEstimator {
    Kalman(KalmanFilter),
    RollingOls(RollingOls),
}

impl HedgeEstimator {
    pub fn kalman(params: KalmanParams) -> Self {
        Self::Kalman(KalmanFilter::new(params))
    }

    pub fn rolling_ols(window: usize) -> Self {
        Self::RollingOls(RollingOls::new(window))
    }

    pub fn update(&mut self, x: f64, y: f64) {
        match self {
            Self::Kalman(kf) => kf.update(x, y),
            Self::RollingOls(ols) => ols.update(x, y),
        }
    }

    /// Current `(α, β)`, or `None` while the estimator is still warming up.
    pub fn params(&self) -> Option<(f64, f64)> {
        match self {
            Self::Kalman(kf) => Some((kf.alpha(), kf.beta())),
            Self::RollingOls(ols) => ols.params(),
        }
    }

    pub fn alpha(&self) -> Option<f64> {
        self.params().map(|(a, _)| a)
    }

    pub fn beta(&self) -> Option<f64> {
        self.params().map(|(_, b)| b)
    }

    /// Residual of `(x, y)` under the current fit.
    pub fn spread(&self, x: f64, y: f64) -> Option<f64> {
        self.params().map(|(alpha, beta)| y - (beta * x + alpha))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Kalman(_) => "kalman",
            Self::RollingOls(_) => "rolling_ols",
        }
    }
}
