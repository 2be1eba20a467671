//! Backtest runner: wires config, data, engine and metrics.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads data, then runs. Used by the CLI.
//! - `run_backtest_from_data()`: takes pre-loaded data. Used by sweeps so the
//!   series are read once.

use pairlab_core::data::{FeedError, FeedOptions};
use pairlab_core::domain::PairId;
use pairlab_core::engine::{Backtest, RunResult};
use pairlab_core::execution::ExecutionSimulator;
use pairlab_core::portfolio::Portfolio;
use pairlab_core::rng::SeedHierarchy;
use pairlab_core::strategy::{PairDiagnostics, PairState, PairUnit, PairsStrategy};
use pairlab_core::ParamsError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{load_data, LoadError, LoadedData};
use crate::metrics::PerformanceMetrics;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("parameter error: {0}")]
    Params(#[from] ParamsError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Scenario label the execution simulator's seed is derived under.
pub const EXECUTION_SCENARIO: &str = "execution";

/// End-of-run snapshot of one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairReport {
    pub pair: PairId,
    pub y: String,
    pub x: String,
    pub estimator: String,
    pub state: PairState,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub last_z: Option<f64>,
    pub diagnostics: PairDiagnostics,
}

impl PairReport {
    fn from_unit(unit: &PairUnit) -> Self {
        let estimator = unit.estimator();
        Self {
            pair: unit.id().clone(),
            y: unit.spec().y.clone(),
            x: unit.spec().x.clone(),
            estimator: estimator.name().to_string(),
            state: unit.state(),
            alpha: estimator.alpha(),
            beta: estimator.beta(),
            last_z: unit.last_z(),
            diagnostics: unit.diagnostics(),
        }
    }
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub config: BacktestConfig,
    pub metrics: PerformanceMetrics,
    pub pairs: Vec<PairReport>,
    pub run: RunResult,
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn equity_values(&self) -> Vec<f64> {
        self.run.equity_curve.iter().map(|s| s.equity).collect()
    }
}

/// Validate `config`, load its data and run it once.
pub fn run_single_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let data = load_data(config)?;
    run_backtest_from_data(config, &data, 0)
}

/// Run against pre-loaded data, no I/O.
///
/// `iteration` selects the execution seed under the config's master seed, so
/// parallel runs do not share or race for random state.
pub fn run_backtest_from_data(
    config: &BacktestConfig,
    data: &LoadedData,
    iteration: u64,
) -> Result<BacktestResult, RunError> {
    let run_id = config.run_id()?;
    let feed = data.feed(FeedOptions {
        start_date: config.backtest.start_date,
        history_capacity: config.backtest.history_capacity,
    })?;
    let strategy = PairsStrategy::new(&config.pairs, config.strategy.clone())?;
    let portfolio = Portfolio::new(config.backtest.initial_capital, config.risk)?;
    let seeds = SeedHierarchy::new(config.backtest.seed);
    let execution = ExecutionSimulator::with_rng(
        config.execution.clone(),
        seeds.rng_for(EXECUTION_SCENARIO, iteration),
    )?;

    let mut backtest = Backtest::new(feed, strategy, portfolio, execution);
    let run = backtest.run();

    let pairs: Vec<PairReport> = backtest
        .strategy()
        .units()
        .iter()
        .map(PairReport::from_unit)
        .collect();
    let equity: Vec<f64> = run.equity_curve.iter().map(|s| s.equity).collect();
    let metrics = PerformanceMetrics::compute(&equity, &run.fills, run.initial_capital);

    info!(
        run_id = %&run_id[..12],
        sharpe = metrics.sharpe,
        max_drawdown = metrics.max_drawdown,
        fills = metrics.fill_count,
        "run complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        config: config.clone(),
        metrics,
        pairs,
        run,
        dataset_hash: data.dataset_hash.clone(),
        has_synthetic: data.has_synthetic,
    })
}
