//! Portfolio and risk manager.
//!
//! Converts signals into orders under a hard leverage cap, applies fills to
//! cash and positions, and marks the book to market once per step.
//!
//! Entry legs of a pair are sized together: the first leg's order is held
//! until its sibling arrives, and both are released only if both could be
//! sized. Exit legs are never held back.
//!
//! Pair-tagged fills are also booked per pair, so a pair's exit closes only
//! the shares that pair opened, even when another pair trades the same
//! symbol.

pub mod sizing;
pub mod vol_target;

pub use sizing::{risk_parity_quantity, RiskParams};
pub use vol_target::{VolTargetParams, VolTargeter};

use crate::data::PriceView;
use crate::domain::{FillEvent, Leg, OrderEvent, OrderSide, PairId, SignalDirection, SignalEvent};
use crate::error::{require_positive, ParamsError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// One row of the equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquitySnapshot {
    pub date: NaiveDate,
    pub equity: f64,
    pub cash: f64,
    pub positions_value: f64,
}

/// Counters over the life of a portfolio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioStats {
    pub signals: u64,
    pub orders: u64,
    pub fills: u64,
    /// Entries refused by the leverage circuit breaker.
    pub rejected_leverage: u64,
    /// Entries that sized to zero shares or had no usable price.
    pub rejected_size: u64,
    /// Entry legs dropped because their sibling leg was rejected.
    pub rejected_sibling: u64,
    /// Exit signals for a symbol with no position.
    pub flat_exits: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Leverage,
    Size,
}

/// First entry leg of a pair waiting for its sibling.
#[derive(Debug, Clone)]
struct HeldLeg {
    leg: Leg,
    date: NaiveDate,
    order: Option<OrderEvent>,
}

#[derive(Debug, Clone)]
pub struct Portfolio {
    initial_capital: f64,
    cash: f64,
    positions: BTreeMap<String, i64>,
    exposure: BTreeMap<String, f64>,
    risk: RiskParams,
    vol_targeter: Option<VolTargeter>,
    held: HashMap<PairId, HeldLeg>,
    /// Signed quantity per symbol opened by each pair.
    pair_legs: BTreeMap<PairId, BTreeMap<String, i64>>,
    equity_curve: Vec<EquitySnapshot>,
    commission_paid: f64,
    stats: PortfolioStats,
}

impl Portfolio {
    pub fn new(initial_capital: f64, risk: RiskParams) -> Result<Self, ParamsError> {
        require_positive("initial_capital", initial_capital)?;
        risk.validate()?;
        let vol_targeter = risk
            .vol_target
            .enabled
            .then(|| VolTargeter::new(risk.vol_target, risk.max_leverage));
        Ok(Self {
            initial_capital,
            cash: initial_capital,
            positions: BTreeMap::new(),
            exposure: BTreeMap::new(),
            risk,
            vol_targeter,
            held: HashMap::new(),
            pair_legs: BTreeMap::new(),
            equity_curve: Vec::new(),
            commission_paid: 0.0,
            stats: PortfolioStats::default(),
        })
    }

    /// Convert a signal into zero, one or two orders.
    ///
    /// An unpaired entry yields at most one order. The first entry leg of a
    /// pair yields nothing; its sibling yields both orders or none. A pair's
    /// exit closes that pair's shares only; an unpaired exit flattens the
    /// whole symbol.
    pub fn on_signal<P>(&mut self, signal: &SignalEvent, prices: &P) -> Vec<OrderEvent>
    where
        P: PriceView + ?Sized,
    {
        self.stats.signals += 1;

        let side = match signal.direction {
            SignalDirection::Exit => {
                let order = match &signal.group {
                    Some(group) => self.close_pair_leg(&group.pair, &signal.symbol),
                    None => self.flatten(&signal.symbol),
                };
                return order.into_iter().collect();
            }
            SignalDirection::Long => OrderSide::Buy,
            SignalDirection::Short => OrderSide::Sell,
        };

        let sized = self.size_entry(signal, side, prices);
        if let Err(reason) = &sized {
            match reason {
                Rejection::Leverage => self.stats.rejected_leverage += 1,
                Rejection::Size => self.stats.rejected_size += 1,
            }
            debug!(symbol = %signal.symbol, date = %signal.date, ?reason, "entry rejected");
        }

        let orders = match &signal.group {
            None => sized.ok().into_iter().collect(),
            Some(group) => self.pair_entry(&group.pair, group.leg, signal.date, sized.ok()),
        };
        self.stats.orders += orders.len() as u64;
        orders
    }

    fn size_entry<P>(
        &self,
        signal: &SignalEvent,
        side: OrderSide,
        prices: &P,
    ) -> Result<OrderEvent, Rejection>
    where
        P: PriceView + ?Sized,
    {
        if self.leverage(prices) >= self.risk.max_leverage {
            return Err(Rejection::Leverage);
        }
        let price = prices.latest_close(&signal.symbol).unwrap_or(0.0);
        let quantity = risk_parity_quantity(
            self.equity(prices),
            price,
            signal.est_volatility,
            self.target_leverage(),
            &self.risk,
        );
        if quantity == 0 {
            return Err(Rejection::Size);
        }
        let order = OrderEvent::market(signal.symbol.clone(), quantity, side);
        Ok(match &signal.group {
            Some(group) => order.for_pair(group.pair.clone()),
            None => order,
        })
    }

    fn pair_entry(
        &mut self,
        pair: &PairId,
        leg: Leg,
        date: NaiveDate,
        order: Option<OrderEvent>,
    ) -> Vec<OrderEvent> {
        match self.held.remove(pair) {
            Some(first) if first.date == date && first.leg != leg => match (first.order, order) {
                (Some(first), Some(second)) => vec![first, second],
                (first, second) => {
                    self.stats.rejected_sibling +=
                        u64::from(first.is_some()) + u64::from(second.is_some());
                    debug!(%pair, %date, "pair entry dropped: one leg could not be sized");
                    Vec::new()
                }
            },
            stale => {
                if let Some(stale) = stale {
                    warn!(%pair, date = %stale.date, "discarding unmatched entry leg");
                    if stale.order.is_some() {
                        self.stats.rejected_sibling += 1;
                    }
                }
                self.held.insert(pair.clone(), HeldLeg { leg, date, order });
                Vec::new()
            }
        }
    }

    fn flatten(&mut self, symbol: &str) -> Option<OrderEvent> {
        let held = self.position(symbol);
        self.closing_order(symbol, held)
    }

    fn close_pair_leg(&mut self, pair: &PairId, symbol: &str) -> Option<OrderEvent> {
        let held = self.pair_quantity(pair, symbol);
        self.closing_order(symbol, held).map(|order| order.for_pair(pair.clone()))
    }

    fn closing_order(&mut self, symbol: &str, held: i64) -> Option<OrderEvent> {
        if held == 0 {
            self.stats.flat_exits += 1;
            return None;
        }
        let side = if held > 0 {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        };
        self.stats.orders += 1;
        Some(OrderEvent::market(symbol, held.unsigned_abs(), side))
    }

    /// Apply an execution to cash and positions.
    pub fn on_fill(&mut self, fill: &FillEvent) {
        let delta = fill.signed_quantity();
        let position = self.positions.entry(fill.symbol.clone()).or_insert(0);
        *position += delta;

        if *position == 0 {
            self.positions.remove(&fill.symbol);
            self.exposure.remove(&fill.symbol);
        } else {
            *self.exposure.entry(fill.symbol.clone()).or_insert(0.0) +=
                delta as f64 * fill.fill_price;
        }

        if let Some(pair) = &fill.pair {
            let legs = self.pair_legs.entry(pair.clone()).or_default();
            let held = legs.entry(fill.symbol.clone()).or_insert(0);
            *held += delta;
            if *held == 0 {
                legs.remove(&fill.symbol);
            }
            if legs.is_empty() {
                self.pair_legs.remove(pair);
            }
        }

        self.cash -= fill.cash_outflow();
        self.commission_paid += fill.commission;
        self.stats.fills += 1;
        debug!(
            symbol = %fill.symbol,
            side = ?fill.side,
            quantity = fill.quantity,
            price = fill.fill_price,
            commission = fill.commission,
            cash = self.cash,
            "fill applied"
        );
    }

    /// Value the book at the latest prices and append a snapshot.
    pub fn mark_to_market<P>(&mut self, date: NaiveDate, prices: &P) -> EquitySnapshot
    where
        P: PriceView + ?Sized,
    {
        let positions_value = self.positions_value(prices);
        let snapshot = EquitySnapshot {
            date,
            equity: self.cash + positions_value,
            cash: self.cash,
            positions_value,
        };
        self.equity_curve.push(snapshot);
        if let Some(vt) = self.vol_targeter.as_mut() {
            vt.observe(snapshot.equity);
        }
        snapshot
    }

    /// Σ position·price over symbols with a usable price.
    pub fn positions_value<P>(&self, prices: &P) -> f64
    where
        P: PriceView + ?Sized,
    {
        self.positions
            .iter()
            .filter_map(|(symbol, qty)| usable_price(prices, symbol).map(|p| *qty as f64 * p))
            .sum()
    }

    /// Cash plus positions at the latest prices.
    pub fn equity<P>(&self, prices: &P) -> f64
    where
        P: PriceView + ?Sized,
    {
        self.cash + self.positions_value(prices)
    }

    /// Σ |position·price| over symbols with a usable price.
    pub fn gross_exposure<P>(&self, prices: &P) -> f64
    where
        P: PriceView + ?Sized,
    {
        self.positions
            .iter()
            .filter_map(|(symbol, qty)| {
                usable_price(prices, symbol).map(|p| (*qty as f64 * p).abs())
            })
            .sum()
    }

    /// Gross exposure over equity; infinite when equity is not positive.
    pub fn leverage<P>(&self, prices: &P) -> f64
    where
        P: PriceView + ?Sized,
    {
        let equity = self.equity(prices);
        if equity <= 0.0 || !equity.is_finite() {
            return f64::INFINITY;
        }
        self.gross_exposure(prices) / equity
    }

    /// Leverage the sizing cap currently scales with.
    pub fn target_leverage(&self) -> f64 {
        match &self.vol_targeter {
            Some(vt) => vt.leverage_factor(),
            None => self.risk.target_leverage,
        }
    }

    pub fn position(&self, symbol: &str) -> i64 {
        self.positions.get(symbol).copied().unwrap_or(0)
    }

    pub fn positions(&self) -> &BTreeMap<String, i64> {
        &self.positions
    }

    /// Shares of `symbol` currently attributed to `pair`.
    pub fn pair_quantity(&self, pair: &PairId, symbol: &str) -> i64 {
        self.pair_legs
            .get(pair)
            .and_then(|legs| legs.get(symbol))
            .copied()
            .unwrap_or(0)
    }

    /// Number of symbols in which `pair` holds shares.
    pub fn open_legs(&self, pair: &PairId) -> usize {
        self.pair_legs.get(pair).map_or(0, BTreeMap::len)
    }

    /// Signed notional at fill prices accumulated since the symbol was last flat.
    pub fn exposure(&self, symbol: &str) -> f64 {
        self.exposure.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn equity_curve(&self) -> &[EquitySnapshot] {
        &self.equity_curve
    }

    pub fn commission_paid(&self) -> f64 {
        self.commission_paid
    }

    pub fn stats(&self) -> PortfolioStats {
        self.stats
    }

    pub fn risk(&self) -> &RiskParams {
        &self.risk
    }
}

fn usable_price<P>(prices: &P, symbol: &str) -> Option<f64>
where
    P: PriceView + ?Sized,
{
    prices
        .latest_close(symbol)
        .filter(|p| p.is_finite() && *p > 0.0)
}
