//! TOML file -> CSV data -> backtest -> artifacts, all on disk.

use chrono::NaiveDate;
use std::fmt::Write as _;
use std::path::Path;

use pairlab_core::data::synthetic::{cointegrated_pair, SyntheticPairParams};
use pairlab_core::data::SourceError;
use pairlab_core::domain::PricePoint;
use pairlab_runner::{
    run_single_backtest, save_artifacts, BacktestConfig, LoadError, ParamGrid, ParamSweep,
    RunError,
};

fn write_csv(dir: &Path, symbol: &str, points: &[PricePoint]) {
    let mut body = String::from("date,close\n");
    for p in points {
        writeln!(body, "{},{}", p.date, p.close).unwrap();
    }
    std::fs::write(dir.join(format!("{symbol}.csv")), body).unwrap();
}

/// KO/PEP as a synthetic pair; PEP starts 20 rows late.
fn write_universe(dir: &Path) -> (Vec<PricePoint>, Vec<PricePoint>) {
    let params = SyntheticPairParams {
        days: 300,
        ..SyntheticPairParams::default()
    };
    let (ys, xs) = cointegrated_pair(&params, 99);
    write_csv(dir, "KO", &ys);
    write_csv(dir, "PEP", &xs[20..]);
    (ys, xs)
}

fn write_config(dir: &Path, extra: &str) -> BacktestConfig {
    let toml = format!(
        "[backtest]\ninitial_capital = 250000.0\ndata_dir = \"{}\"\nseed = 9\n\n\
         [[pairs]]\ny = \"KO\"\nx = \"PEP\"\n\n{extra}",
        dir.display()
    );
    let path = dir.join("pairlab.toml");
    std::fs::write(&path, toml).unwrap();
    BacktestConfig::from_file(&path).unwrap()
}

#[test]
fn csv_run_starts_when_every_symbol_has_data() {
    let dir = tempfile::tempdir().unwrap();
    let (_, xs) = write_universe(dir.path());
    let config = write_config(dir.path(), "");

    let result = run_single_backtest(&config).unwrap();
    assert_eq!(result.run.steps, 280);
    assert_eq!(result.run.first_date, Some(xs[20].date));
    assert_eq!(result.run.initial_capital, 250_000.0);
    assert!(!result.has_synthetic);
    assert_eq!(result.dataset_hash.len(), 64);
}

#[test]
fn start_date_trims_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let (ys, _) = write_universe(dir.path());
    let start = ys[100].date;
    let mut config = write_config(dir.path(), "");
    config.backtest.start_date = Some(start);

    let result = run_single_backtest(&config).unwrap();
    assert_eq!(result.run.first_date, Some(start));
    assert_eq!(result.run.steps, 200);
}

#[test]
fn strategy_table_reaches_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    write_universe(dir.path());
    let config = write_config(dir.path(), "[strategy]\nkind = \"rolling_ols\"\n");
    let result = run_single_backtest(&config).unwrap();
    assert_eq!(result.run.strategy, "rolling_ols");
    assert_eq!(result.pairs[0].estimator, "rolling_ols");
}

#[test]
fn missing_symbol_file_is_a_data_error() {
    let dir = tempfile::tempdir().unwrap();
    write_universe(dir.path());
    std::fs::remove_file(dir.path().join("PEP.csv")).unwrap();
    let config = write_config(dir.path(), "");

    match run_single_backtest(&config) {
        Err(RunError::Data(LoadError::Source(SourceError::NotFound { symbol }))) => {
            assert_eq!(symbol, "PEP")
        }
        other => panic!("expected a missing-symbol error, got {other:?}"),
    }
}

#[test]
fn duplicate_dates_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_universe(dir.path());
    let d = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    write_csv(
        dir.path(),
        "KO",
        &[PricePoint::new(d, 10.0), PricePoint::new(d, 11.0)],
    );
    let config = write_config(dir.path(), "");
    assert!(matches!(
        run_single_backtest(&config),
        Err(RunError::Feed(_))
    ));
}

#[test]
fn artifacts_land_under_the_run_id() {
    let dir = tempfile::tempdir().unwrap();
    write_universe(dir.path());
    let config = write_config(dir.path(), "");
    let result = run_single_backtest(&config).unwrap();

    let out = tempfile::tempdir().unwrap();
    let run_dir = save_artifacts(&result, out.path()).unwrap();
    assert!(result.run_id.starts_with(
        run_dir.file_name().unwrap().to_str().unwrap()
    ));
    let equity = std::fs::read_to_string(run_dir.join("equity.csv")).unwrap();
    assert_eq!(equity.lines().count(), result.run.steps + 1);
}

#[test]
fn sweep_over_csv_data_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    write_universe(dir.path());
    let config = write_config(dir.path(), "");
    let grid = ParamGrid {
        z_entry: vec![2.0, 3.0],
        z_exit: vec![0.0],
    };
    let a = ParamSweep::new().sweep(&grid, &config).unwrap();
    let b = ParamSweep::new().sweep(&grid, &config).unwrap();
    assert_eq!(a.len(), 2);
    let ids: Vec<_> = a.all().iter().map(|r| r.run_id.clone()).collect();
    assert_ne!(ids[0], ids[1]);
    for (x, y) in a.all().iter().zip(b.all()) {
        assert_eq!(x.run, y.run);
    }
}
