//! Simulated broker: fills market orders at the current close.

use super::cost_model::{commission, slipped_price, ExecutionParams};
use crate::data::PriceView;
use crate::domain::{FillEvent, OrderEvent};
use crate::error::ParamsError;
use chrono::NaiveDate;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use statrs::distribution::Normal;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub struct ExecutionSimulator {
    params: ExecutionParams,
    rng: StdRng,
    noise: Option<Normal>,
    filled: u64,
    dropped: u64,
}

impl ExecutionSimulator {
    pub fn new(params: ExecutionParams, seed: u64) -> Result<Self, ParamsError> {
        Self::with_rng(params, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(params: ExecutionParams, rng: StdRng) -> Result<Self, ParamsError> {
        params.validate()?;
        let noise = if params.slippage_std > 0.0 {
            let normal = Normal::new(0.0, params.slippage_std)
                .map_err(|e| ParamsError::invalid("slippage_std", e.to_string()))?;
            Some(normal)
        } else {
            None
        };
        Ok(Self {
            params,
            rng,
            noise,
            filled: 0,
            dropped: 0,
        })
    }

    /// Fill `order` at the latest close for its symbol.
    ///
    /// Returns `None` when there is no usable close for the symbol.
    pub fn execute<P>(
        &mut self,
        order: &OrderEvent,
        date: NaiveDate,
        prices: &P,
    ) -> Option<FillEvent>
    where
        P: PriceView + ?Sized,
    {
        let price = match prices.latest_close(&order.symbol) {
            Some(p) if p.is_finite() && p > 0.0 => p,
            _ => {
                trace!(symbol = %order.symbol, %date, "no bar for order, dropping");
                self.dropped += 1;
                return None;
            }
        };

        let fraction = self.params.spread_penalty + self.draw_noise();
        let fill_price = slipped_price(price, order.side, fraction);
        let fill = FillEvent {
            date,
            symbol: order.symbol.clone(),
            exchange: self.params.exchange.clone(),
            quantity: order.quantity,
            side: order.side,
            fill_price,
            commission: commission(&self.params, order.quantity),
            pair: order.pair.clone(),
        };
        self.filled += 1;
        debug!(
            symbol = %fill.symbol,
            side = ?fill.side,
            quantity = fill.quantity,
            reference = price,
            fill_price,
            "order filled"
        );
        Some(fill)
    }

    fn draw_noise(&mut self) -> f64 {
        match &self.noise {
            Some(normal) => normal.sample(&mut self.rng),
            None => 0.0,
        }
    }

    pub fn params(&self) -> &ExecutionParams {
        &self.params
    }

    pub fn filled(&self) -> u64 {
        self.filled
    }

    /// Orders dropped because their symbol had no usable price.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderSide;
    use std::collections::HashMap;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn prices() -> HashMap<String, f64> {
        [("KO".to_string(), 60.0)].into_iter().collect()
    }

    #[test]
    fn absent_bar_produces_no_fill() {
        let mut sim = ExecutionSimulator::new(ExecutionParams::default(), 1).unwrap();
        let order = OrderEvent::market("XOM", 10, OrderSide::Buy);
        assert!(sim.execute(&order, date(), &prices()).is_none());
        assert_eq!(sim.dropped(), 1);
    }

    #[test]
    fn frictionless_fill_is_at_close() {
        let mut sim = ExecutionSimulator::new(ExecutionParams::frictionless(), 1).unwrap();
        let fill = sim
            .execute(&OrderEvent::market("KO", 10, OrderSide::Sell), date(), &prices())
            .unwrap();
        assert_eq!(fill.fill_price, 60.0);
        assert_eq!(fill.commission, 0.0);
        assert_eq!(fill.exchange, "ARCA_SIM");
        assert_eq!(fill.quantity, 10);
    }

    #[test]
    fn buys_fill_above_and_sells_below_the_close() {
        let mut sim = ExecutionSimulator::new(ExecutionParams::default(), 9).unwrap();
        for _ in 0..200 {
            let buy = sim
                .execute(&OrderEvent::market("KO", 100, OrderSide::Buy), date(), &prices())
                .unwrap();
            let sell = sim
                .execute(&OrderEvent::market("KO", 100, OrderSide::Sell), date(), &prices())
                .unwrap();
            assert!(buy.fill_price >= 60.0);
            assert!(sell.fill_price <= 60.0);
            assert_eq!(buy.commission, 1.0);
        }
    }

    #[test]
    fn same_seed_same_fills() {
        let run = |seed| {
            let mut sim = ExecutionSimulator::new(ExecutionParams::default(), seed).unwrap();
            (0..10)
                .map(|_| {
                    sim.execute(&OrderEvent::market("KO", 5, OrderSide::Buy), date(), &prices())
                        .unwrap()
                        .fill_price
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(3), run(3));
        assert_ne!(run(3), run(4));
    }
}
