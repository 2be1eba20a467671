//! Price loading for the runner.
//!
//! Series come from one of two places:
//! 1. `<data_dir>/<SYMBOL>.csv` with a `date,close` header (extra columns ignored)
//! 2. With `synthetic = true`, seeded cointegrated series generated per pair
//!
//! Synthetic data is a developer-only mode. Results produced on it are tagged
//! and the CLI prints a warning.

use chrono::NaiveDate;
use pairlab_core::data::synthetic::{cointegrated_pair, SyntheticPairParams};
use pairlab_core::data::{BarFeed, FeedError, FeedOptions, PriceSource, SourceError};
use pairlab_core::domain::PricePoint;
use pairlab_core::rng::SeedHierarchy;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::BacktestConfig;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("data directory '{0}' does not exist (set [backtest] synthetic = true for synthetic data)")]
    MissingDataDir(PathBuf),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Feed(#[from] FeedError),
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    close: f64,
}

/// Reads `<dir>/<SYMBOL>.csv` files.
#[derive(Debug, Clone)]
pub struct CsvPriceSource {
    dir: PathBuf,
}

impl CsvPriceSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PriceSource for CsvPriceSource {
    fn name(&self) -> &str {
        "csv"
    }

    /// Rows are returned sorted by date. Duplicate dates are left in place
    /// for the feed to reject.
    fn load(&self, symbol: &str) -> Result<Vec<PricePoint>, SourceError> {
        let path = self.path_for(symbol);
        if !path.is_file() {
            return Err(SourceError::NotFound {
                symbol: symbol.to_string(),
            });
        }
        let mut reader = csv::Reader::from_path(&path).map_err(|e| SourceError::Io {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        })?;

        let mut points = Vec::new();
        for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
            let row = row.map_err(|e| SourceError::Parse {
                symbol: symbol.to_string(),
                reason: format!("row {}: {e}", i + 1),
            })?;
            points.push(PricePoint::new(row.date, row.close));
        }
        points.sort_by_key(|p| p.date);
        debug!(%symbol, rows = points.len(), path = %path.display(), "csv loaded");
        Ok(points)
    }
}

/// Raw series for every configured symbol, plus provenance.
///
/// Held separately from the feed so one load can serve many runs.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub series: HashMap<String, Vec<PricePoint>>,
    pub symbols: Vec<String>,
    /// BLAKE3 over every `(symbol, date, close)` in symbol order.
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

impl LoadedData {
    /// A fresh feed over a copy of the series.
    pub fn feed(&self, opts: FeedOptions) -> Result<BarFeed, FeedError> {
        BarFeed::new(self.series.clone(), &self.symbols, opts)
    }
}

/// Load every symbol the config names.
pub fn load_data(config: &BacktestConfig) -> Result<LoadedData, LoadError> {
    let symbols = config.symbols();
    let series = if config.backtest.synthetic {
        warn!("generating synthetic data; results will be tagged as synthetic");
        synthetic_series(config)
    } else {
        let dir = &config.backtest.data_dir;
        if !dir.is_dir() {
            return Err(LoadError::MissingDataDir(dir.clone()));
        }
        let source = CsvPriceSource::new(dir);
        let mut series = HashMap::with_capacity(symbols.len());
        for symbol in &symbols {
            series.insert(symbol.clone(), source.load(symbol)?);
        }
        series
    };

    let dataset_hash = dataset_hash(&series, &symbols);
    info!(
        symbols = symbols.len(),
        synthetic = config.backtest.synthetic,
        hash = %&dataset_hash[..12],
        "data loaded"
    );
    Ok(LoadedData {
        series,
        symbols,
        dataset_hash,
        has_synthetic: config.backtest.synthetic,
    })
}

/// One seeded cointegrated pair per configured pair. A symbol shared by
/// several pairs keeps the series of the first pair that named it.
fn synthetic_series(config: &BacktestConfig) -> HashMap<String, Vec<PricePoint>> {
    let seeds = SeedHierarchy::new(config.backtest.seed);
    let params = SyntheticPairParams::default();
    let mut series = HashMap::new();
    for (i, pair) in config.pairs.iter().enumerate() {
        let (ys, xs) = cointegrated_pair(&params, seeds.sub_seed("synthetic", i as u64));
        series.entry(pair.y.clone()).or_insert(ys);
        series.entry(pair.x.clone()).or_insert(xs);
    }
    series
}

fn dataset_hash(series: &HashMap<String, Vec<PricePoint>>, symbols: &[String]) -> String {
    let mut hasher = blake3::Hasher::new();
    for symbol in symbols {
        hasher.update(symbol.as_bytes());
        for point in series.get(symbol).map(Vec::as_slice).unwrap_or(&[]) {
            hasher.update(point.date.to_string().as_bytes());
            hasher.update(&point.close.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, symbol: &str, body: &str) {
        fs::write(dir.join(format!("{symbol}.csv")), body).unwrap();
    }

    #[test]
    fn reads_and_sorts_rows() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "KO",
            "date,close,volume\n2024-01-03,61.0,100\n2024-01-02,60.0,200\n",
        );
        let points = CsvPriceSource::new(dir.path()).load("KO").unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].close, 60.0);
        assert_eq!(points[1].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvPriceSource::new(dir.path()).load("NOPE").unwrap_err();
        assert!(matches!(err, SourceError::NotFound { .. }));
    }

    #[test]
    fn bad_row_reports_its_position() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "KO", "date,close\n2024-01-02,60.0\nnot-a-date,1.0\n");
        match CsvPriceSource::new(dir.path()).load("KO") {
            Err(SourceError::Parse { reason, .. }) => assert!(reason.starts_with("row 2")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn synthetic_load_is_seeded() {
        let config = BacktestConfig::from_toml(
            "[backtest]\nsynthetic = true\nseed = 3\n[[pairs]]\ny = \"A\"\nx = \"B\"\n",
        )
        .unwrap();
        let a = load_data(&config).unwrap();
        let b = load_data(&config).unwrap();
        assert!(a.has_synthetic);
        assert_eq!(a.dataset_hash, b.dataset_hash);
        assert_eq!(a.symbols, vec!["A", "B"]);
        assert!(a.feed(FeedOptions::default()).is_ok());
    }

    #[test]
    fn missing_data_dir_is_reported() {
        let config = BacktestConfig::from_toml(
            "[backtest]\ndata_dir = \"/definitely/not/here\"\n[[pairs]]\ny = \"A\"\nx = \"B\"\n",
        )
        .unwrap();
        assert!(matches!(load_data(&config), Err(LoadError::MissingDataDir(_))));
    }
}
