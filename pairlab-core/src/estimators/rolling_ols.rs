//! Fixed-window least-squares hedge ratio.

use crate::stats::{mean, population_covariance, population_variance};
use std::collections::VecDeque;

pub const DEFAULT_OLS_WINDOW: usize = 30;

/// Refits `y = α + β·x` over the last `window` observations.
///
/// Estimates are unavailable until the window has filled once.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingOls {
    window: usize,
    xs: VecDeque<f64>,
    ys: VecDeque<f64>,
    alpha: f64,
    beta: f64,
    ready: bool,
}

impl RollingOls {
    pub fn new(window: usize) -> Self {
        let window = window.max(2);
        Self {
            window,
            xs: VecDeque::with_capacity(window),
            ys: VecDeque::with_capacity(window),
            alpha: 0.0,
            beta: 0.0,
            ready: false,
        }
    }

    pub fn update(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        if self.xs.len() == self.window {
            self.xs.pop_front();
            self.ys.pop_front();
        }
        self.xs.push_back(x);
        self.ys.push_back(y);

        if self.xs.len() == self.window {
            self.ready = true;
            self.refit();
        }
    }

    fn refit(&mut self) {
        let xs: Vec<f64> = self.xs.iter().copied().collect();
        let ys: Vec<f64> = self.ys.iter().copied().collect();

        let var_x = population_variance(&xs).unwrap_or(0.0);
        let cov = population_covariance(&xs, &ys).unwrap_or(0.0);
        self.beta = if var_x == 0.0 { 0.0 } else { cov / var_x };
        self.alpha = mean(&ys).unwrap_or(0.0) - self.beta * mean(&xs).unwrap_or(0.0);
    }

    /// `(α, β)` once the window is full.
    pub fn params(&self) -> Option<(f64, f64)> {
        self.ready.then_some((self.alpha, self.beta))
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn window(&self) -> usize {
        self.window
    }
}
