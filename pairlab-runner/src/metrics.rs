//! Performance metrics: pure functions over the equity curve and fill tape.

use pairlab_core::domain::FillEvent;
use serde::{Deserialize, Serialize};

/// Trading days per year used for annualization.
pub const TRADING_DAYS: f64 = 252.0;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    pub max_drawdown: f64,
    /// Annualized standard deviation of daily returns.
    pub volatility: f64,
    pub fill_count: usize,
    /// Traded notional per unit of starting capital per year.
    pub turnover: f64,
    pub commission_paid: f64,
}

impl PerformanceMetrics {
    pub fn compute(equity_curve: &[f64], fills: &[FillEvent], initial_capital: f64) -> Self {
        let days = equity_curve.len();
        Self {
            total_return: total_return(equity_curve),
            cagr: cagr(equity_curve),
            sharpe: sharpe_ratio(equity_curve),
            sortino: sortino_ratio(equity_curve),
            calmar: calmar_ratio(equity_curve),
            max_drawdown: max_drawdown(equity_curve),
            volatility: std_dev(&daily_returns(equity_curve)) * TRADING_DAYS.sqrt(),
            fill_count: fills.len(),
            turnover: turnover(fills, initial_capital, days),
            commission_paid: fills.iter().map(|f| f.commission).sum(),
        }
    }
}

fn endpoints(equity_curve: &[f64]) -> Option<(f64, f64)> {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&first), Some(&last)) if equity_curve.len() >= 2 => Some((first, last)),
        _ => None,
    }
}

/// (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match endpoints(equity_curve) {
        Some((initial, last)) if initial > 0.0 => (last - initial) / initial,
        _ => 0.0,
    }
}

/// Compound annual growth rate, one trading day per curve point.
pub fn cagr(equity_curve: &[f64]) -> f64 {
    let Some((initial, last)) = endpoints(equity_curve) else {
        return 0.0;
    };
    if initial <= 0.0 || last <= 0.0 {
        return 0.0;
    }
    let years = equity_curve.len() as f64 / TRADING_DAYS;
    (last / initial).powf(1.0 / years) - 1.0
}

/// Annualized Sharpe ratio of daily returns, zero risk-free rate.
pub fn sharpe_ratio(equity_curve: &[f64]) -> f64 {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let sd = std_dev(&returns);
    if sd < 1e-15 {
        return 0.0;
    }
    mean(&returns) / sd * TRADING_DAYS.sqrt()
}

/// Like Sharpe, but divides by downside deviation only.
pub fn sortino_ratio(equity_curve: &[f64]) -> f64 {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let downside: f64 = returns.iter().filter(|r| **r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean(&returns) / downside_std * TRADING_DAYS.sqrt()
}

/// CAGR / |max drawdown|; zero without a drawdown or without growth.
pub fn calmar_ratio(equity_curve: &[f64]) -> f64 {
    let c = cagr(equity_curve);
    let dd = max_drawdown(equity_curve);
    if dd >= 0.0 || c <= 0.0 {
        return 0.0;
    }
    c / dd.abs()
}

/// Deepest peak-to-trough decline as a negative fraction (-0.15 = 15%).
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        if peak > 0.0 {
            worst = worst.min((eq - peak) / peak);
        }
    }
    worst
}

/// Σ |qty·price| / capital / years.
pub fn turnover(fills: &[FillEvent], initial_capital: f64, days: usize) -> f64 {
    if fills.is_empty() || initial_capital <= 0.0 || days < 2 {
        return 0.0;
    }
    let notional: f64 = fills
        .iter()
        .map(|f| f.quantity as f64 * f.fill_price)
        .sum();
    notional / initial_capital / (days as f64 / TRADING_DAYS)
}

pub fn daily_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}
