//! Signal generation.
//!
//! A strategy reads the feed once per `Market` event and returns zero or more
//! signals. Sizing and risk limits are applied downstream; the strategy only
//! sees the book after a tick has drained, to learn which entries were
//! refused.

pub mod pair;
pub mod pairs;
pub mod params;

pub use pair::{PairDiagnostics, PairSpec, PairState, PairTick, PairUnit, SpreadHistory};
pub use pairs::PairsStrategy;
pub use params::StrategyParams;

use crate::data::BarFeed;
use crate::domain::{PairId, SignalEvent};
use crate::portfolio::Portfolio;
use crate::stats::HalfLife;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Consumes one market step and produces signals.
pub trait Strategy: Send {
    fn name(&self) -> &str;

    fn on_market(&mut self, feed: &BarFeed) -> Vec<SignalEvent>;

    /// Called once per tick after every event has been processed.
    fn reconcile(&mut self, _book: &Portfolio) {}
}

/// Hedge model and admission policy of a pair strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Kalman hedge ratio with long-memory and half-life gates.
    #[default]
    Kalman,
    /// Fixed-window OLS hedge ratio with the same gates.
    RollingOls,
    /// Kalman hedge ratio whose entries also need a meta labeler's approval.
    KalmanMetaFiltered,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kalman => "kalman",
            Self::RollingOls => "rolling_ols",
            Self::KalmanMetaFiltered => "kalman_meta_filtered",
        }
    }
}

/// What a meta labeler sees when a candidate entry has passed every gate.
#[derive(Debug, Clone, Copy)]
pub struct MetaContext<'a> {
    pub pair: &'a PairId,
    pub date: NaiveDate,
    pub zscore: f64,
    pub hurst: f64,
    pub half_life: HalfLife,
    /// Recent closes of the dependent leg, oldest first.
    pub y_closes: &'a [f64],
}

/// Secondary model that scores a candidate entry.
///
/// Returns the probability that the trade succeeds, or `None` when it cannot
/// score the context. `None` vetoes the entry.
pub trait MetaLabeler: Send + Sync {
    fn success_probability(&self, ctx: &MetaContext<'_>) -> Option<f64>;
}
