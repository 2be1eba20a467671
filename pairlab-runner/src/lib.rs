//! PairLab Runner: backtest orchestration on top of `pairlab-core`.
//!
//! - TOML configuration with a content-addressed run id
//! - CSV price loading, with a seeded synthetic fallback
//! - Single-run orchestration and performance metrics
//! - Parallel threshold sweeps
//! - JSON, CSV and Markdown artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod sweep;

pub use config::{BacktestConfig, BacktestSection, ConfigError, RunId};
pub use data_loader::{load_data, CsvPriceSource, LoadError, LoadedData};
pub use export::{load_artifacts, save_artifacts};
pub use metrics::PerformanceMetrics;
pub use runner::{run_backtest_from_data, run_single_backtest, BacktestResult, PairReport, RunError};
pub use sweep::{ParamGrid, ParamSweep, SweepResults};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn results_are_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
        assert_send::<PerformanceMetrics>();
        assert_sync::<PerformanceMetrics>();
    }

    #[test]
    fn config_and_data_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
        assert_send::<LoadedData>();
        assert_sync::<LoadedData>();
    }

    #[test]
    fn errors_are_send() {
        assert_send::<RunError>();
        assert_send::<LoadError>();
    }
}
