//! Tick-by-tick agreement between each pair's state and the shares the book
//! attributes to it.

use pairlab_core::data::synthetic::{business_days, cointegrated_pair, SyntheticPairParams};
use pairlab_core::data::{BarFeed, FeedOptions, InMemorySource};
use pairlab_core::domain::{Event, FillEvent, OrderSide, PricePoint};
use pairlab_core::engine::EventQueue;
use pairlab_core::execution::{ExecutionParams, ExecutionSimulator};
use pairlab_core::portfolio::{Portfolio, RiskParams};
use pairlab_core::strategy::{
    PairSpec, PairState, PairsStrategy, Strategy, StrategyKind, StrategyParams,
};

const CAPITAL: f64 = 100_000.0;

fn ungated() -> StrategyParams {
    StrategyParams {
        kind: StrategyKind::Kalman,
        hurst_max: 2.0,
        half_life_min: 0.0,
        half_life_max: 1e9,
        ..StrategyParams::default()
    }
}

/// The loop's per-tick sequence, driven by hand so the book can be inspected
/// between ticks.
struct Stepper {
    feed: BarFeed,
    queue: EventQueue,
    strategy: PairsStrategy,
    book: Portfolio,
    execution: ExecutionSimulator,
}

impl Stepper {
    fn new(feed: BarFeed, pairs: &[PairSpec], book: Portfolio) -> Self {
        let queue = EventQueue::new(feed.symbols().iter().cloned());
        Self {
            feed,
            queue,
            strategy: PairsStrategy::new(pairs, ungated()).unwrap(),
            book,
            execution: ExecutionSimulator::new(ExecutionParams::default(), 3).unwrap(),
        }
    }

    fn step(&mut self) -> bool {
        if !self.feed.advance(&mut self.queue) {
            return false;
        }
        let mut today = None;
        while let Some(event) = self.queue.pop() {
            match event {
                Event::Market(market) => {
                    today = Some(market.date);
                    let signals = self.strategy.on_market(&self.feed);
                    self.queue.extend(signals.into_iter().map(Event::Signal));
                    self.book.mark_to_market(market.date, &self.feed);
                }
                Event::Signal(signal) => {
                    let orders = self.book.on_signal(&signal, &self.feed);
                    self.queue.extend(orders.into_iter().map(Event::Order));
                }
                Event::Order(order) => {
                    let date = today.unwrap();
                    if let Some(fill) = self.execution.execute(&order, date, &self.feed) {
                        self.queue.push(Event::Fill(fill));
                    }
                }
                Event::Fill(fill) => self.book.on_fill(&fill),
            }
        }
        self.strategy.reconcile(&self.book);
        true
    }

    fn assert_states_match_book(&self) {
        let date = self.feed.current_date();
        for unit in self.strategy.units() {
            let y = self.book.pair_quantity(unit.id(), &unit.spec().y);
            let x = self.book.pair_quantity(unit.id(), &unit.spec().x);
            let consistent = match unit.state() {
                PairState::Neutral => y == 0 && x == 0,
                PairState::LongSpread => y > 0 && x < 0,
                PairState::ShortSpread => y < 0 && x > 0,
            };
            assert!(
                consistent,
                "{} on {date:?}: state {:?} with legs y={y} x={x}",
                unit.id(),
                unit.state()
            );
        }
    }
}

fn source_with_shared_leg() -> InMemorySource {
    let params = SyntheticPairParams::default();
    let (ys, xs) = cointegrated_pair(&params, 42);
    let (ws, _) = cointegrated_pair(&params, 43);
    InMemorySource::new()
        .with_series("YYY", ys)
        .with_series("XXX", xs)
        .with_series("WWW", ws)
}

#[test]
fn pair_state_matches_the_book_on_every_tick() {
    let pairs = [PairSpec::new("YYY", "XXX"), PairSpec::new("WWW", "XXX")];
    let symbols: Vec<String> = ["YYY", "XXX", "WWW"].map(String::from).to_vec();
    let feed =
        BarFeed::from_source(&source_with_shared_leg(), &symbols, FeedOptions::default()).unwrap();
    let book = Portfolio::new(CAPITAL, RiskParams::default()).unwrap();
    let mut stepper = Stepper::new(feed, &pairs, book);

    while stepper.step() {
        stepper.assert_states_match_book();

        let attributed: i64 = stepper
            .strategy
            .units()
            .iter()
            .map(|u| stepper.book.pair_quantity(u.id(), "XXX"))
            .sum();
        assert_eq!(stepper.book.position("XXX"), attributed);
    }

    let entries: u64 = stepper
        .strategy
        .units()
        .iter()
        .map(|u| u.diagnostics().entries)
        .sum();
    assert!(entries >= 1);
}

#[test]
fn breaker_refusal_returns_the_pair_to_neutral() {
    let params = SyntheticPairParams::default();
    let (ys, xs) = cointegrated_pair(&params, 42);
    let flat: Vec<PricePoint> = business_days(params.start, params.days)
        .into_iter()
        .map(|d| PricePoint::new(d, 100.0))
        .collect();
    let source = InMemorySource::new()
        .with_series("YYY", ys)
        .with_series("XXX", xs)
        .with_series("ZZZ", flat);
    let symbols: Vec<String> = ["YYY", "XXX", "ZZZ"].map(String::from).to_vec();
    let feed = BarFeed::from_source(&source, &symbols, FeedOptions::default()).unwrap();

    // 4x gross before the first bar: every new entry hits the breaker.
    let mut book = Portfolio::new(CAPITAL, RiskParams::default()).unwrap();
    book.on_fill(&FillEvent {
        date: params.start,
        symbol: "ZZZ".into(),
        exchange: "ARCA_SIM".into(),
        quantity: 4_000,
        side: OrderSide::Buy,
        fill_price: 100.0,
        commission: 0.0,
        pair: None,
    });
    let mut stepper = Stepper::new(feed, &[PairSpec::new("YYY", "XXX")], book);

    while stepper.step() {
        stepper.assert_states_match_book();
        assert_eq!(stepper.strategy.units()[0].state(), PairState::Neutral);
    }

    let d = stepper.strategy.units()[0].diagnostics();
    assert!(d.refused_entries >= 1);
    assert_eq!(d.entries, 0);
    assert!(stepper.book.stats().rejected_leverage >= 1);
    assert_eq!(stepper.book.position("YYY"), 0);
    assert_eq!(stepper.book.position("XXX"), 0);
    assert_eq!(stepper.book.position("ZZZ"), 4_000);
}
