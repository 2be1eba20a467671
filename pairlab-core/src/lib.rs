//! PairLab Core: event model, bar feed, hedge-ratio estimators, pair strategy,
//! portfolio and execution simulator.
//!
//! - Domain types (bars, events, pair ids)
//! - Forward-filled multi-symbol bar feed
//! - Kalman and rolling-OLS hedge ratios
//! - Long-memory exponent and half-life gates
//! - Per-pair state machine behind a `Strategy` trait
//! - Risk-parity sizing under a hard leverage cap
//! - Seeded execution simulator and the FIFO event loop

pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod estimators;
pub mod execution;
pub mod portfolio;
pub mod rng;
pub mod stats;
pub mod strategy;

pub use error::ParamsError;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a sweep worker owns is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Event>();
        require_sync::<domain::Event>();
        require_send::<domain::PairId>();
        require_sync::<domain::PairId>();

        require_send::<data::BarFeed>();
        require_sync::<data::BarFeed>();
        require_send::<engine::EventQueue>();
        require_sync::<engine::EventQueue>();
        require_send::<engine::RunResult>();
        require_sync::<engine::RunResult>();

        require_send::<estimators::HedgeEstimator>();
        require_sync::<estimators::HedgeEstimator>();
        require_send::<strategy::PairUnit>();
        require_sync::<strategy::PairUnit>();
        require_send::<strategy::PairsStrategy>();
        require_sync::<strategy::PairsStrategy>();

        require_send::<portfolio::Portfolio>();
        require_sync::<portfolio::Portfolio>();
        require_send::<execution::ExecutionSimulator>();
        require_sync::<execution::ExecutionSimulator>();
        require_send::<rng::SeedHierarchy>();
        require_sync::<rng::SeedHierarchy>();
    }

    /// Architecture contract: strategies see the feed, never the portfolio.
    #[test]
    fn strategy_trait_has_no_portfolio_parameter() {
        fn _check_trait_object_builds(
            strategy: &mut dyn strategy::Strategy,
            feed: &data::BarFeed,
        ) -> Vec<domain::SignalEvent> {
            strategy.on_market(feed)
        }
    }
}
