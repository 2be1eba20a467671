//! Multi-pair strategy: one independent `PairUnit` per configured pair.

use super::{
    MetaLabeler, PairSpec, PairState, PairTick, PairUnit, Strategy, StrategyKind, StrategyParams,
};
use crate::data::BarFeed;
use crate::domain::{PairId, SignalEvent};
use crate::error::ParamsError;
use crate::portfolio::Portfolio;
use std::collections::HashSet;
use tracing::trace;

pub struct PairsStrategy {
    params: StrategyParams,
    units: Vec<PairUnit>,
    labeler: Option<Box<dyn MetaLabeler>>,
}

impl std::fmt::Debug for PairsStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairsStrategy")
            .field("kind", &self.params.kind)
            .field("pairs", &self.units.len())
            .field("labeler", &self.labeler.is_some())
            .finish()
    }
}

impl PairsStrategy {
    /// Build a strategy for `pairs`.
    ///
    /// The meta-filtered kind is rejected here; build it with
    /// [`PairsStrategy::with_meta_labeler`].
    pub fn new(pairs: &[PairSpec], params: StrategyParams) -> Result<Self, ParamsError> {
        if params.kind == StrategyKind::KalmanMetaFiltered {
            return Err(ParamsError::MissingMetaLabeler(params.kind.as_str()));
        }
        Self::build(pairs, params, None)
    }

    pub fn with_meta_labeler(
        pairs: &[PairSpec],
        params: StrategyParams,
        labeler: Box<dyn MetaLabeler>,
    ) -> Result<Self, ParamsError> {
        Self::build(pairs, params, Some(labeler))
    }

    fn build(
        pairs: &[PairSpec],
        params: StrategyParams,
        labeler: Option<Box<dyn MetaLabeler>>,
    ) -> Result<Self, ParamsError> {
        params.validate()?;
        if pairs.is_empty() {
            return Err(ParamsError::NoPairs);
        }

        let mut seen = HashSet::new();
        let mut units = Vec::with_capacity(pairs.len());
        for spec in pairs {
            let id = spec.id();
            if spec.y == spec.x {
                return Err(ParamsError::SameLeg(id.to_string()));
            }
            if !seen.insert(id.clone()) {
                return Err(ParamsError::DuplicatePair(id.to_string()));
            }
            units.push(PairUnit::new(spec.clone(), &params));
        }

        Ok(Self {
            params,
            units,
            labeler,
        })
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    pub fn units(&self) -> &[PairUnit] {
        &self.units
    }

    pub fn unit(&self, id: &PairId) -> Option<&PairUnit> {
        self.units.iter().find(|u| u.id() == id)
    }

    /// Every symbol traded by any pair, first occurrence order, no duplicates.
    pub fn symbols(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for unit in &self.units {
            for symbol in [&unit.spec().y, &unit.spec().x] {
                if seen.insert(symbol.as_str()) {
                    out.push(symbol.clone());
                }
            }
        }
        out
    }
}

impl Strategy for PairsStrategy {
    fn name(&self) -> &str {
        self.params.kind.as_str()
    }

    fn on_market(&mut self, feed: &BarFeed) -> Vec<SignalEvent> {
        let Some(date) = feed.current_date() else {
            return Vec::new();
        };
        let labeler = self.labeler.as_deref();
        let wants_history = self.params.kind == StrategyKind::KalmanMetaFiltered;
        let mut signals = Vec::new();

        for unit in &mut self.units {
            let (Some(y_bar), Some(x_bar)) =
                (feed.latest(&unit.spec().y), feed.latest(&unit.spec().x))
            else {
                trace!(pair = %unit.id(), %date, "missing bar, skipping pair");
                continue;
            };

            let y_history: Vec<f64> = match (wants_history, feed.history(&unit.spec().y)) {
                (true, Some(bars)) => bars.iter().map(|b| b.close).collect(),
                _ => Vec::new(),
            };

            let tick = PairTick {
                date,
                y_close: y_bar.close,
                x_close: x_bar.close,
                y_history: &y_history,
            };
            signals.extend(unit.on_tick(tick, &self.params, labeler));
        }
        signals
    }

    /// A pair that believes it is open while the book holds none of its
    /// shares had its entry refused; it goes back to neutral.
    fn reconcile(&mut self, book: &Portfolio) {
        for unit in &mut self.units {
            if unit.state() != PairState::Neutral && book.open_legs(unit.id()) == 0 {
                unit.abandon_entry();
            }
        }
    }
}
