//! Serializable backtest configuration.
//!
//! One TOML file describes a complete, reproducible run:
//!
//! ```toml
//! [backtest]
//! initial_capital = 100000.0
//! data_dir = "data"
//! seed = 42
//!
//! [[pairs]]
//! y = "KO"
//! x = "PEP"
//!
//! [strategy]
//! z_entry = 2.0
//! ```
//!
//! Every section except `[[pairs]]` may be omitted; missing knobs take their
//! defaults.

use chrono::NaiveDate;
use pairlab_core::data::DEFAULT_HISTORY_CAPACITY;
use pairlab_core::execution::ExecutionParams;
use pairlab_core::portfolio::RiskParams;
use pairlab_core::strategy::{PairSpec, StrategyParams};
use pairlab_core::ParamsError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config is not serializable: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Params(#[from] ParamsError),
}

/// The `[backtest]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub initial_capital: f64,
    /// Rows before this date are ignored.
    pub start_date: Option<NaiveDate>,
    /// Directory holding one `<SYMBOL>.csv` per symbol.
    pub data_dir: PathBuf,
    /// Master seed; every stochastic component derives its seed from it.
    pub seed: u64,
    /// Bars of history the feed keeps per symbol.
    pub history_capacity: usize,
    /// Generate seeded cointegrated series instead of reading `data_dir`.
    pub synthetic: bool,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            start_date: None,
            data_dir: PathBuf::from("data"),
            seed: 42,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            synthetic: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default)]
    pub backtest: BacktestSection,
    #[serde(default)]
    pub pairs: Vec<PairSpec>,
    #[serde(default)]
    pub strategy: StrategyParams,
    #[serde(default)]
    pub risk: RiskParams,
    #[serde(default)]
    pub execution: ExecutionParams,
}

impl BacktestConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Check every section; the first problem found is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let capital = self.backtest.initial_capital;
        if !(capital.is_finite() && capital > 0.0) {
            return Err(ParamsError::Invalid {
                field: "initial_capital",
                reason: format!("must be > 0, got {capital}"),
            }
            .into());
        }
        if self.backtest.history_capacity == 0 {
            return Err(ParamsError::Invalid {
                field: "history_capacity",
                reason: "must be at least 1".into(),
            }
            .into());
        }
        if self.pairs.is_empty() {
            return Err(ParamsError::NoPairs.into());
        }
        self.strategy.validate()?;
        self.risk.validate()?;
        self.execution.validate()?;
        Ok(())
    }

    /// Every symbol named by a pair, deduplicated, in first-seen order.
    pub fn symbols(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.pairs
            .iter()
            .flat_map(|p| [&p.y, &p.x])
            .filter(|s| seen.insert(s.as_str()))
            .cloned()
            .collect()
    }

    /// Deterministic hash of the canonical JSON form of this configuration.
    ///
    /// Two identical configurations share a run id.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_vec(self)?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }
}
