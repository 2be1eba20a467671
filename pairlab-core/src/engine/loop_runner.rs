//! Event loop: the heart of the backtester.
//!
//! One clock tick is one `Market` event. Every event it causes is handled
//! before the clock moves again, strictly in FIFO order:
//!
//! 1. `Market`: the strategy reads the feed and may emit signals, then the
//!    portfolio is marked to market
//! 2. `Signal`: the portfolio sizes it into zero, one or two orders
//! 3. `Order`: the simulator fills it at the current close
//! 4. `Fill`: the portfolio books it
//!
//! Once the queue is empty the strategy is reconciled with the book, so a
//! pair whose entry was refused does not stay open on paper. A fill from this
//! tick is never visible to this tick's signals.

use super::queue::EventQueue;
use crate::data::BarFeed;
use crate::domain::{Event, FillEvent};
use crate::execution::ExecutionSimulator;
use crate::portfolio::{EquitySnapshot, Portfolio, PortfolioStats};
use crate::strategy::Strategy;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, trace};

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub strategy: String,
    pub steps: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub initial_capital: f64,
    /// Equity after the last tick's fills, at the last known prices.
    pub final_equity: f64,
    pub equity_curve: Vec<EquitySnapshot>,
    pub fills: Vec<FillEvent>,
    pub signal_count: u64,
    pub commission_paid: f64,
    pub portfolio: PortfolioStats,
    /// Orders the simulator could not fill for lack of a price.
    pub unfilled_orders: u64,
    /// Events refused by the queue for naming a symbol outside the universe.
    pub dropped_events: usize,
}

impl RunResult {
    pub fn total_return(&self) -> f64 {
        if self.initial_capital <= 0.0 {
            return 0.0;
        }
        self.final_equity / self.initial_capital - 1.0
    }
}

/// Wires feed, strategy, portfolio and execution around one event queue.
pub struct Backtest<S: Strategy> {
    feed: BarFeed,
    strategy: S,
    portfolio: Portfolio,
    execution: ExecutionSimulator,
}

impl<S: Strategy> Backtest<S> {
    pub fn new(
        feed: BarFeed,
        strategy: S,
        portfolio: Portfolio,
        execution: ExecutionSimulator,
    ) -> Self {
        Self {
            feed,
            strategy,
            portfolio,
            execution,
        }
    }

    /// Replay the feed to exhaustion.
    pub fn run(&mut self) -> RunResult {
        let mut queue = EventQueue::new(self.feed.symbols().iter().cloned());
        let mut fills = Vec::new();
        let mut signal_count = 0u64;
        let mut first_date = None;
        let mut today = None;

        info!(
            strategy = self.strategy.name(),
            symbols = self.feed.symbols().len(),
            steps = self.feed.total_steps(),
            "backtest starting"
        );

        while self.feed.advance(&mut queue) {
            while let Some(event) = queue.pop() {
                match event {
                    Event::Market(market) => {
                        first_date.get_or_insert(market.date);
                        today = Some(market.date);

                        let signals = self.strategy.on_market(&self.feed);
                        signal_count += signals.len() as u64;
                        queue.extend(signals.into_iter().map(Event::Signal));

                        let snapshot = self.portfolio.mark_to_market(market.date, &self.feed);
                        trace!(date = %market.date, equity = snapshot.equity, "tick");
                    }
                    Event::Signal(signal) => {
                        let orders = self.portfolio.on_signal(&signal, &self.feed);
                        queue.extend(orders.into_iter().map(Event::Order));
                    }
                    Event::Order(order) => {
                        let Some(date) = today else { continue };
                        if let Some(fill) = self.execution.execute(&order, date, &self.feed) {
                            queue.push(Event::Fill(fill));
                        }
                    }
                    Event::Fill(fill) => {
                        self.portfolio.on_fill(&fill);
                        fills.push(fill);
                    }
                }
            }
            self.strategy.reconcile(&self.portfolio);
        }

        let result = RunResult {
            strategy: self.strategy.name().to_string(),
            steps: self.feed.steps(),
            first_date,
            last_date: today,
            initial_capital: self.portfolio.initial_capital(),
            final_equity: self.portfolio.equity(&self.feed),
            equity_curve: self.portfolio.equity_curve().to_vec(),
            fills,
            signal_count,
            commission_paid: self.portfolio.commission_paid(),
            portfolio: self.portfolio.stats(),
            unfilled_orders: self.execution.dropped(),
            dropped_events: queue.dropped(),
        };

        info!(
            strategy = %result.strategy,
            steps = result.steps,
            fills = result.fills.len(),
            final_equity = result.final_equity,
            total_return = result.total_return(),
            "backtest finished"
        );
        result
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn feed(&self) -> &BarFeed {
        &self.feed
    }
}
