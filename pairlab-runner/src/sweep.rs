//! Grid sweeps over entry and exit thresholds.
//!
//! Data is loaded once; each grid point is an independent backtest run on its
//! own rayon task with its own execution seed.

use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::config::BacktestConfig;
use crate::data_loader::load_data;
use crate::runner::{run_backtest_from_data, BacktestResult, RunError};

/// Threshold grid. An empty axis keeps the base config's value.
#[derive(Debug, Clone, Default)]
pub struct ParamGrid {
    pub z_entry: Vec<f64>,
    pub z_exit: Vec<f64>,
}

impl ParamGrid {
    /// Number of points before invalid combinations are dropped.
    pub fn size(&self) -> usize {
        self.z_entry.len().max(1) * self.z_exit.len().max(1)
    }

    /// One config per valid `(z_entry, z_exit)` combination.
    ///
    /// Combinations whose strategy parameters fail validation (for example an
    /// exit at or above the entry) are skipped.
    pub fn generate_configs(&self, base: &BacktestConfig) -> Vec<BacktestConfig> {
        let entries = axis(&self.z_entry, base.strategy.z_entry);
        let exits = axis(&self.z_exit, base.strategy.z_exit);

        let mut configs = Vec::with_capacity(entries.len() * exits.len());
        for &entry in &entries {
            for &exit in &exits {
                let mut config = base.clone();
                config.strategy.z_entry = entry;
                config.strategy.z_exit = exit;
                match config.strategy.validate() {
                    Ok(()) => configs.push(config),
                    Err(e) => warn!(z_entry = entry, z_exit = exit, error = %e, "skipping grid point"),
                }
            }
        }
        configs
    }
}

fn axis(values: &[f64], fallback: f64) -> Vec<f64> {
    if values.is_empty() {
        vec![fallback]
    } else {
        values.to_vec()
    }
}

/// Runs every grid point against one data load.
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn sweep(
        &self,
        grid: &ParamGrid,
        base: &BacktestConfig,
    ) -> Result<SweepResults, RunError> {
        base.validate()?;
        let data = load_data(base)?;
        let configs = grid.generate_configs(base);
        info!(points = configs.len(), parallel = self.parallel, "sweep starting");

        // Seeds follow the grid index, never the thread that runs the point.
        let run = |(i, config): (usize, &BacktestConfig)| {
            run_backtest_from_data(config, &data, i as u64)
        };
        let results = if self.parallel {
            configs
                .par_iter()
                .enumerate()
                .map(run)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            configs
                .iter()
                .enumerate()
                .map(run)
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(SweepResults::new(results))
    }
}

/// Results in grid order, indexed by run id.
#[derive(Debug)]
pub struct SweepResults {
    results: Vec<BacktestResult>,
    by_run_id: HashMap<String, usize>,
}

impl SweepResults {
    fn new(results: Vec<BacktestResult>) -> Self {
        let by_run_id = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.run_id.clone(), i))
            .collect();
        Self { results, by_run_id }
    }

    pub fn all(&self) -> &[BacktestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, run_id: &str) -> Option<&BacktestResult> {
        self.by_run_id.get(run_id).map(|&i| &self.results[i])
    }

    /// Results by Sharpe ratio, best first.
    pub fn sorted_by_sharpe(&self) -> Vec<&BacktestResult> {
        let mut sorted: Vec<_> = self.results.iter().collect();
        sorted.sort_by(|a, b| b.metrics.sharpe.total_cmp(&a.metrics.sharpe));
        sorted
    }

    pub fn best(&self) -> Option<&BacktestResult> {
        self.sorted_by_sharpe().into_iter().next()
    }
}
