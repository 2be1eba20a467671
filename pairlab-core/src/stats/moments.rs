//! Population moments over slices.
//!
//! All functions divide by `n`, not `n - 1`. Empty input yields `None`.

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn population_variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some(ss / values.len() as f64)
}

pub fn population_std(values: &[f64]) -> Option<f64> {
    population_variance(values).map(f64::sqrt)
}

/// Population covariance of two equal-length slices.
pub fn population_covariance(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let sum: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    Some(sum / xs.len() as f64)
}

/// Z-score of the last element of `window` relative to the whole window.
///
/// `None` when the window is empty or has zero (or non-finite) dispersion.
pub fn zscore_of_last(window: &[f64]) -> Option<f64> {
    let last = *window.last()?;
    let m = mean(window)?;
    let sd = population_std(window)?;
    if !(sd.is_finite() && sd > 0.0) {
        return None;
    }
    Some((last - m) / sd)
}
