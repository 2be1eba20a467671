//! Online hedge-ratio estimation with a random-walk Kalman filter.
//!
//! State θ = [α, β] follows a random walk with process noise Q = δ·I. Each
//! observation is `y = α + β·x + ε` with measurement variance R, so the
//! observation row is H = [1, x]. There is no window: every observation updates
//! the estimate.

use serde::{Deserialize, Serialize};

/// Filter tuning. `delta` trades tracking speed against noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KalmanParams {
    /// Process noise per step (Q = delta·I).
    pub delta: f64,
    /// Measurement noise variance.
    pub r: f64,
}

impl Default for KalmanParams {
    fn default() -> Self {
        Self {
            delta: 1e-6,
            r: 1e-3,
        }
    }
}

type Mat2 = [[f64; 2]; 2];

/// Initial state covariance scale (P₀ = 10·I).
const INITIAL_COVARIANCE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct KalmanFilter {
    params: KalmanParams,
    theta: [f64; 2],
    p: Mat2,
    updates: u64,
}

impl KalmanFilter {
    pub fn new(params: KalmanParams) -> Self {
        Self {
            params,
            theta: [0.0, 0.0],
            p: [[INITIAL_COVARIANCE, 0.0], [0.0, INITIAL_COVARIANCE]],
            updates: 0,
        }
    }

    /// Incorporate one observation.
    ///
    /// Non-finite inputs are ignored so one bad print cannot poison the state.
    pub fn update(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }

        let q = self.params.delta;
        // Predict: θ̂ = θ, P̂ = P + Q
        let pp: Mat2 = [
            [self.p[0][0] + q, self.p[0][1]],
            [self.p[1][0], self.p[1][1] + q],
        ];

        // H = [1, x]
        let h = [1.0, x];
        let predicted = self.theta[0] + self.theta[1] * x;
        let innovation = y - predicted;

        // P̂·Hᵀ
        let ph = [
            pp[0][0] * h[0] + pp[0][1] * h[1],
            pp[1][0] * h[0] + pp[1][1] * h[1],
        ];
        let s = h[0] * ph[0] + h[1] * ph[1] + self.params.r;
        if !(s.is_finite() && s > 0.0) {
            return;
        }
        let k = [ph[0] / s, ph[1] / s];

        self.theta[0] += k[0] * innovation;
        self.theta[1] += k[1] * innovation;

        // P = (I - K·H)·P̂
        let ikh: Mat2 = [
            [1.0 - k[0] * h[0], -k[0] * h[1]],
            [-k[1] * h[0], 1.0 - k[1] * h[1]],
        ];
        self.p = mat_mul(&ikh, &pp);
        self.updates += 1;
    }

    pub fn alpha(&self) -> f64 {
        self.theta[0]
    }

    pub fn beta(&self) -> f64 {
        self.theta[1]
    }

    /// Current state covariance.
    pub fn covariance(&self) -> Mat2 {
        self.p
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn params(&self) -> KalmanParams {
        self.params
    }
}

fn mat_mul(a: &Mat2, b: &Mat2) -> Mat2 {
    let mut out = [[0.0; 2]; 2];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = a[i][0] * b[0][j] + a[i][1] * b[1][j];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero_with_wide_prior() {
        let kf = KalmanFilter::new(KalmanParams::default());
        assert_eq!(kf.alpha(), 0.0);
        assert_eq!(kf.beta(), 0.0);
        assert_eq!(kf.covariance(), [[10.0, 0.0], [0.0, 10.0]]);
    }

    #[test]
    fn converges_on_exact_linear_relation() {
        let mut kf = KalmanFilter::new(KalmanParams::default());
        for i in 0..50 {
            let x = 10.0 + i as f64 * 0.5;
            kf.update(x, 2.0 * x + 1.0);
        }
        assert!((kf.beta() - 2.0).abs() < 1e-3, "beta = {}", kf.beta());
        assert!((kf.alpha() - 1.0).abs() < 1e-2, "alpha = {}", kf.alpha());
    }

    #[test]
    fn covariance_shrinks_with_information() {
        let mut kf = KalmanFilter::new(KalmanParams::default());
        for i in 0..20 {
            let x = 50.0 + (i % 7) as f64;
            kf.update(x, 1.5 * x);
        }
        let p = kf.covariance();
        assert!(p[1][1] < 10.0);
        assert!(p[0][0] > 0.0 && p[1][1] > 0.0);
    }

    #[test]
    fn non_finite_observation_is_ignored() {
        let mut kf = KalmanFilter::new(KalmanParams::default());
        kf.update(10.0, 21.0);
        let before = kf.clone();
        kf.update(f64::NAN, 3.0);
        kf.update(4.0, f64::INFINITY);
        assert_eq!(kf, before);
    }

    #[test]
    fn larger_delta_tracks_a_regime_shift_faster() {
        let run = |delta: f64| {
            let mut kf = KalmanFilter::new(KalmanParams { delta, r: 1e-3 });
            for i in 0..200 {
                let x = 20.0 + (i % 11) as f64;
                let beta = if i < 100 { 1.0 } else { 1.5 };
                kf.update(x, beta * x);
            }
            kf.beta()
        };
        let slow = run(1e-8);
        let fast = run(1e-3);
        assert!((fast - 1.5).abs() < (slow - 1.5).abs());
    }
}
