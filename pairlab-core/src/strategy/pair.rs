//! One traded pair: its estimator, spread history and position state.
//!
//! A `PairUnit` owns everything it mutates and never looks at another pair,
//! so it can be driven directly from tests with plain prices.

use super::{MetaContext, MetaLabeler, StrategyKind, StrategyParams};
use crate::domain::{Leg, LegGroup, PairId, SignalDirection, SignalEvent};
use crate::estimators::HedgeEstimator;
use crate::stats::{half_life, hurst_exponent, population_std, zscore_of_last, HalfLife};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Volatility reported with a signal when the spread has no dispersion.
const VOLATILITY_FALLBACK: f64 = 0.01;

/// A configured pair: `y` is the dependent leg, `x` the explanatory one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSpec {
    pub y: String,
    pub x: String,
}

impl PairSpec {
    pub fn new(y: impl Into<String>, x: impl Into<String>) -> Self {
        Self {
            y: y.into(),
            x: x.into(),
        }
    }

    pub fn id(&self) -> PairId {
        PairId::new(&self.y, &self.x)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairState {
    Neutral,
    /// Long y, short x: entered on a negative z.
    LongSpread,
    /// Short y, long x: entered on a positive z.
    ShortSpread,
}

/// Bounded spread history; the oldest value is evicted when full.
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadHistory {
    values: VecDeque<f64>,
    capacity: usize,
}

impl SpreadHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<f64> {
        self.values.back().copied()
    }

    /// The most recent `n` values, oldest first.
    pub fn trailing(&self, n: usize) -> Vec<f64> {
        let skip = self.values.len().saturating_sub(n);
        self.values.iter().skip(skip).copied().collect()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}

/// Counters describing what a pair did over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairDiagnostics {
    /// Entries signalled and accepted by the book.
    pub entries: u64,
    pub exits: u64,
    pub stop_losses: u64,
    pub hurst_rejections: u64,
    pub half_life_rejections: u64,
    pub meta_rejections: u64,
    /// Entries the portfolio refused to fill.
    #[serde(default)]
    pub refused_entries: u64,
}

/// Prices for one step, as seen by a single pair.
#[derive(Debug, Clone, Copy)]
pub struct PairTick<'a> {
    pub date: NaiveDate,
    pub y_close: f64,
    pub x_close: f64,
    /// Recent closes of the dependent leg, oldest first (meta labeler input).
    pub y_history: &'a [f64],
}

#[derive(Debug, Clone)]
pub struct PairUnit {
    spec: PairSpec,
    id: PairId,
    estimator: HedgeEstimator,
    spreads: SpreadHistory,
    state: PairState,
    last_z: Option<f64>,
    diagnostics: PairDiagnostics,
}

impl PairUnit {
    pub fn new(spec: PairSpec, params: &StrategyParams) -> Self {
        let estimator = match params.kind {
            StrategyKind::RollingOls => HedgeEstimator::rolling_ols(params.ols_window),
            StrategyKind::Kalman | StrategyKind::KalmanMetaFiltered => {
                HedgeEstimator::kalman(params.kalman)
            }
        };
        Self {
            id: spec.id(),
            spec,
            estimator,
            spreads: SpreadHistory::new(params.spread_capacity),
            state: PairState::Neutral,
            last_z: None,
            diagnostics: PairDiagnostics::default(),
        }
    }

    pub fn id(&self) -> &PairId {
        &self.id
    }

    pub fn spec(&self) -> &PairSpec {
        &self.spec
    }

    pub fn state(&self) -> PairState {
        self.state
    }

    pub fn estimator(&self) -> &HedgeEstimator {
        &self.estimator
    }

    pub fn spreads(&self) -> &SpreadHistory {
        &self.spreads
    }

    /// Z-score computed on the most recent step that reached the z-score stage.
    pub fn last_z(&self) -> Option<f64> {
        self.last_z
    }

    pub fn diagnostics(&self) -> PairDiagnostics {
        self.diagnostics
    }

    /// Return to neutral after the book refused the entry just signalled.
    pub fn abandon_entry(&mut self) {
        if self.state == PairState::Neutral {
            return;
        }
        debug!(pair = %self.id, state = ?self.state, "entry refused by the book, back to neutral");
        self.state = PairState::Neutral;
        self.diagnostics.entries = self.diagnostics.entries.saturating_sub(1);
        self.diagnostics.refused_entries += 1;
    }

    /// Run one step of the state machine.
    ///
    /// Returns either nothing or exactly two signals, one per leg.
    pub fn on_tick(
        &mut self,
        tick: PairTick<'_>,
        params: &StrategyParams,
        labeler: Option<&dyn MetaLabeler>,
    ) -> Vec<SignalEvent> {
        if !(tick.y_close.is_finite() && tick.x_close.is_finite()) {
            return Vec::new();
        }

        self.estimator.update(tick.x_close, tick.y_close);
        match self.estimator.spread(tick.x_close, tick.y_close) {
            Some(spread) => self.on_spread(spread, tick, params, labeler),
            None => Vec::new(),
        }
    }

    /// Steps after the hedge fit: history, z-score, then the state machine.
    fn on_spread(
        &mut self,
        spread: f64,
        tick: PairTick<'_>,
        params: &StrategyParams,
        labeler: Option<&dyn MetaLabeler>,
    ) -> Vec<SignalEvent> {
        self.spreads.push(spread);
        if self.spreads.len() < params.min_history {
            return Vec::new();
        }

        let window = self.spreads.trailing(params.zscore_window);
        let Some(z) = zscore_of_last(&window) else {
            return Vec::new();
        };
        self.last_z = Some(z);
        let volatility = match population_std(&window) {
            Some(sd) if sd > 0.0 => sd,
            _ => VOLATILITY_FALLBACK,
        };

        match self.state {
            PairState::Neutral => self.try_enter(tick, z, volatility, &window, params, labeler),
            open => self.manage_open(open, tick.date, z, volatility, params),
        }
    }

    fn manage_open(
        &mut self,
        open: PairState,
        date: NaiveDate,
        z: f64,
        volatility: f64,
        params: &StrategyParams,
    ) -> Vec<SignalEvent> {
        // Stop-loss takes priority over the regular exit.
        let stopped = match open {
            PairState::LongSpread => z < -params.z_stop_loss,
            PairState::ShortSpread => z > params.z_stop_loss,
            PairState::Neutral => false,
        };
        if stopped {
            warn!(pair = %self.id, %date, z, "stop-loss, flattening both legs");
            self.diagnostics.stop_losses += 1;
            self.state = PairState::Neutral;
            return self.exit_signals(date, volatility);
        }

        let reverted = match open {
            PairState::LongSpread => z > -params.z_exit,
            PairState::ShortSpread => z < params.z_exit,
            PairState::Neutral => false,
        };
        if reverted {
            info!(pair = %self.id, %date, z, "spread reverted, exiting");
            self.diagnostics.exits += 1;
            self.state = PairState::Neutral;
            return self.exit_signals(date, volatility);
        }
        Vec::new()
    }

    /// Band check, then the gates: Hurst on the whole history, half-life on
    /// the z-score window.
    fn try_enter(
        &mut self,
        tick: PairTick<'_>,
        z: f64,
        volatility: f64,
        window: &[f64],
        params: &StrategyParams,
        labeler: Option<&dyn MetaLabeler>,
    ) -> Vec<SignalEvent> {
        let magnitude = z.abs();
        if !(magnitude > params.entry_threshold() && magnitude < params.z_max_entry) {
            return Vec::new();
        }

        let history = self.spreads.to_vec();
        let hurst = hurst_exponent(&history, params.hurst_max_lag);
        if hurst > params.hurst_max {
            debug!(pair = %self.id, date = %tick.date, hurst, "entry gated: trending spread");
            self.diagnostics.hurst_rejections += 1;
            return Vec::new();
        }
        let hl = half_life(window);
        if !hl.within(params.half_life_min, params.half_life_max) {
            debug!(pair = %self.id, date = %tick.date, half_life = ?hl, "entry gated: half-life");
            self.diagnostics.half_life_rejections += 1;
            return Vec::new();
        }

        if params.kind == StrategyKind::KalmanMetaFiltered
            && !self.meta_confirms(tick, z, hurst, hl, params, labeler)
        {
            self.diagnostics.meta_rejections += 1;
            return Vec::new();
        }

        let (state, y_dir, x_dir) = if z < 0.0 {
            (PairState::LongSpread, SignalDirection::Long, SignalDirection::Short)
        } else {
            (PairState::ShortSpread, SignalDirection::Short, SignalDirection::Long)
        };
        info!(pair = %self.id, date = %tick.date, z, hurst, ?state, "entering spread");
        self.state = state;
        self.diagnostics.entries += 1;
        vec![
            self.signal(Leg::Y, tick.date, y_dir, volatility),
            self.signal(Leg::X, tick.date, x_dir, volatility),
        ]
    }

    fn meta_confirms(
        &self,
        tick: PairTick<'_>,
        z: f64,
        hurst: f64,
        half_life: HalfLife,
        params: &StrategyParams,
        labeler: Option<&dyn MetaLabeler>,
    ) -> bool {
        let Some(labeler) = labeler else {
            return false;
        };
        if tick.y_history.len() < params.meta_min_history {
            return false;
        }
        let ctx = MetaContext {
            pair: &self.id,
            date: tick.date,
            zscore: z,
            hurst,
            half_life,
            y_closes: tick.y_history,
        };
        match labeler.success_probability(&ctx) {
            Some(p) if p >= params.meta_threshold => true,
            p => {
                debug!(pair = %self.id, date = %tick.date, probability = ?p, "entry vetoed by meta labeler");
                false
            }
        }
    }

    fn exit_signals(&self, date: NaiveDate, volatility: f64) -> Vec<SignalEvent> {
        vec![
            self.signal(Leg::Y, date, SignalDirection::Exit, volatility),
            self.signal(Leg::X, date, SignalDirection::Exit, volatility),
        ]
    }

    fn signal(
        &self,
        leg: Leg,
        date: NaiveDate,
        direction: SignalDirection,
        volatility: f64,
    ) -> SignalEvent {
        let symbol = match leg {
            Leg::Y => self.spec.y.clone(),
            Leg::X => self.spec.x.clone(),
        };
        SignalEvent {
            symbol,
            date,
            direction,
            strength: 1.0,
            est_volatility: volatility,
            group: Some(LegGroup {
                pair: self.id.clone(),
                leg,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(i as i64)
    }

    fn tick(i: usize) -> PairTick<'static> {
        PairTick {
            date: date(i),
            y_close: 50.0,
            x_close: 40.0,
            y_history: &[],
        }
    }

    /// Loose gates so the state machine can be driven by hand-made spreads.
    fn open_gates() -> StrategyParams {
        StrategyParams {
            hurst_max: 10.0,
            half_life_min: 0.0,
            half_life_max: 1e9,
            ..StrategyParams::default()
        }
    }

    /// 29 alternating spreads of +1/-1: mean near zero, unit dispersion.
    fn primed(params: &StrategyParams) -> PairUnit {
        let mut unit = PairUnit::new(PairSpec::new("KO", "PEP"), params);
        for i in 0..29 {
            let s = if i % 2 == 0 { 1.0 } else { -1.0 };
            assert!(unit.on_spread(s, tick(i), params, None).is_empty());
        }
        unit
    }

    struct FixedLabeler(Option<f64>);

    impl MetaLabeler for FixedLabeler {
        fn success_probability(&self, _ctx: &MetaContext<'_>) -> Option<f64> {
            self.0
        }
    }

    #[test]
    fn spread_history_is_bounded() {
        let mut h = SpreadHistory::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            h.push(v);
        }
        assert_eq!(h.to_vec(), vec![2.0, 3.0, 4.0]);
        assert_eq!(h.trailing(2), vec![3.0, 4.0]);
        assert_eq!(h.trailing(10).len(), 3);
    }

    #[test]
    fn no_signal_before_min_history() {
        let params = open_gates();
        let unit = primed(&params);
        assert_eq!(unit.spreads().len(), 29);
        assert_eq!(unit.state(), PairState::Neutral);
        assert_eq!(unit.last_z(), None);
    }

    #[test]
    fn flat_spread_is_a_no_op() {
        let params = open_gates();
        let mut unit = PairUnit::new(PairSpec::new("KO", "PEP"), &params);
        for i in 0..40 {
            assert!(unit.on_spread(0.5, tick(i), &params, None).is_empty());
        }
        assert_eq!(unit.last_z(), None);
    }

    #[test]
    fn negative_z_in_band_goes_long_the_spread() {
        let params = open_gates();
        let mut unit = primed(&params);

        // z ≈ -3.2
        let signals = unit.on_spread(-4.0, tick(29), &params, None);

        assert_eq!(unit.state(), PairState::LongSpread);
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].symbol, "KO");
        assert_eq!(signals[0].direction, SignalDirection::Long);
        assert_eq!(signals[1].symbol, "PEP");
        assert_eq!(signals[1].direction, SignalDirection::Short);
        for s in &signals {
            assert_eq!(s.strength, 1.0);
            assert!(s.est_volatility > 1.0);
            assert_eq!(s.group.as_ref().unwrap().pair, PairId::new("KO", "PEP"));
        }
        assert_eq!(unit.diagnostics().entries, 1);
    }

    #[test]
    fn positive_z_in_band_goes_short_the_spread() {
        let params = open_gates();
        let mut unit = primed(&params);
        let signals = unit.on_spread(4.0, tick(29), &params, None);

        assert_eq!(unit.state(), PairState::ShortSpread);
        assert_eq!(signals[0].direction, SignalDirection::Short);
        assert_eq!(signals[1].direction, SignalDirection::Long);
    }

    #[test]
    fn deviation_beyond_max_entry_is_ignored() {
        let params = open_gates();
        let mut unit = primed(&params);

        // z ≈ -4.7: outside the band
        assert!(unit.on_spread(-10.0, tick(29), &params, None).is_empty());
        assert_eq!(unit.state(), PairState::Neutral);
    }

    #[test]
    fn reversion_exits_both_legs() {
        let params = open_gates();
        let mut unit = primed(&params);
        unit.on_spread(-4.0, tick(29), &params, None);

        let signals = unit.on_spread(1.0, tick(30), &params, None);

        assert_eq!(unit.state(), PairState::Neutral);
        assert_eq!(signals.len(), 2);
        assert!(signals.iter().all(|s| s.direction == SignalDirection::Exit));
        assert_eq!(unit.diagnostics().exits, 1);
    }

    #[test]
    fn stop_loss_flattens_on_adverse_move() {
        let params = open_gates();
        let mut unit = primed(&params);
        unit.on_spread(-4.0, tick(29), &params, None);

        // z ≈ -5.3 against a long spread
        let signals = unit.on_spread(-40.0, tick(30), &params, None);

        assert_eq!(unit.state(), PairState::Neutral);
        assert_eq!(signals.len(), 2);
        assert!(signals.iter().all(|s| s.direction == SignalDirection::Exit));
        assert_eq!(unit.diagnostics().stop_losses, 1);
        assert_eq!(unit.diagnostics().exits, 0);
    }

    #[test]
    fn open_position_holds_while_spread_stays_wide() {
        let params = open_gates();
        let mut unit = primed(&params);
        unit.on_spread(-4.0, tick(29), &params, None);

        assert!(unit.on_spread(-3.0, tick(30), &params, None).is_empty());
        assert_eq!(unit.state(), PairState::LongSpread);
    }

    #[test]
    fn half_life_gate_blocks_entry() {
        // The alternating spread reverts in well under one step.
        let params = StrategyParams {
            half_life_min: 5.0,
            ..open_gates()
        };
        let mut unit = primed(&params);

        assert!(unit.on_spread(-4.0, tick(29), &params, None).is_empty());
        assert_eq!(unit.state(), PairState::Neutral);
        assert_eq!(unit.diagnostics().half_life_rejections, 1);
    }

    #[test]
    fn half_life_is_fitted_on_the_zscore_window() {
        let params = StrategyParams {
            half_life_max: 2.0,
            ..open_gates()
        };
        let mut unit = PairUnit::new(PairSpec::new("KO", "PEP"), &params);
        // A slow ramp ahead of the window stretches a whole-history fit to
        // about ten steps; the alternating window reverts in under one.
        for i in 0..40 {
            unit.spreads.push(i as f64 * 10.0);
        }
        for i in 0..29 {
            unit.spreads.push(if i % 2 == 0 { 1.0 } else { -1.0 });
        }
        assert!(matches!(half_life(&unit.spreads.to_vec()), HalfLife::Finite(h) if h > 2.0));

        let signals = unit.on_spread(-4.0, tick(69), &params, None);
        assert_eq!(signals.len(), 2);
        assert_eq!(unit.state(), PairState::LongSpread);
        assert_eq!(unit.diagnostics().half_life_rejections, 0);
    }

    #[test]
    fn abandoned_entry_returns_to_neutral() {
        let params = open_gates();
        let mut unit = primed(&params);
        assert_eq!(unit.on_spread(-4.0, tick(29), &params, None).len(), 2);

        unit.abandon_entry();
        assert_eq!(unit.state(), PairState::Neutral);
        assert_eq!(unit.diagnostics().entries, 0);
        assert_eq!(unit.diagnostics().refused_entries, 1);

        unit.abandon_entry();
        assert_eq!(unit.diagnostics().refused_entries, 1);
    }

    #[test]
    fn hurst_gate_blocks_entry() {
        let params = StrategyParams {
            hurst_max: -10.0,
            ..open_gates()
        };
        let mut unit = primed(&params);

        assert!(unit.on_spread(-4.0, tick(29), &params, None).is_empty());
        assert_eq!(unit.diagnostics().hurst_rejections, 1);
    }

    #[test]
    fn meta_filter_needs_a_confident_labeler() {
        let params = StrategyParams {
            kind: StrategyKind::KalmanMetaFiltered,
            ..open_gates()
        };
        let closes = [50.0; 60];
        let with_history = |i| PairTick {
            y_history: &closes,
            ..tick(i)
        };

        let mut unit = primed(&params);
        let doubtful = FixedLabeler(Some(0.5));
        assert!(unit
            .on_spread(-4.0, with_history(29), &params, Some(&doubtful))
            .is_empty());
        assert_eq!(unit.diagnostics().meta_rejections, 1);

        let mut unit = primed(&params);
        assert!(unit.on_spread(-4.0, with_history(29), &params, None).is_empty());

        let mut unit = primed(&params);
        let confident = FixedLabeler(Some(0.9));
        assert!(unit
            .on_spread(-4.0, tick(29), &params, Some(&confident))
            .is_empty());

        let mut unit = primed(&params);
        let signals = unit.on_spread(-4.0, with_history(29), &params, Some(&confident));
        assert_eq!(signals.len(), 2);
        assert_eq!(unit.state(), PairState::LongSpread);
    }

    #[test]
    fn non_finite_price_is_a_no_op() {
        let params = open_gates();
        let mut unit = PairUnit::new(PairSpec::new("KO", "PEP"), &params);
        let bad = PairTick {
            y_close: f64::NAN,
            ..tick(0)
        };
        assert!(unit.on_tick(bad, &params, None).is_empty());
        assert!(unit.spreads().is_empty());
    }

    #[test]
    fn rolling_ols_waits_for_its_window() {
        let params = StrategyParams {
            kind: StrategyKind::RollingOls,
            ols_window: 10,
            ..open_gates()
        };
        let mut unit = PairUnit::new(PairSpec::new("KO", "PEP"), &params);
        for i in 0..9 {
            let t = PairTick {
                y_close: 50.0 + i as f64,
                x_close: 40.0 + (i * i) as f64,
                ..tick(i)
            };
            unit.on_tick(t, &params, None);
        }
        assert!(unit.spreads().is_empty());
        unit.on_tick(tick(9), &params, None);
        assert_eq!(unit.spreads().len(), 1);
    }
}
