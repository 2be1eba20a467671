//! Artifact export: JSON result, CSV tapes and a Markdown report.
//!
//! `result.json` carries a `schema_version`; unknown versions are rejected on
//! load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use pairlab_core::domain::FillEvent;
use pairlab_core::portfolio::EquitySnapshot;

use crate::runner::{BacktestResult, SCHEMA_VERSION};
use crate::sweep::SweepResults;

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Parse a result, rejecting schema versions newer than this build.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Columns: date, equity, cash, positions_value.
pub fn export_equity_csv(curve: &[EquitySnapshot]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "equity", "cash", "positions_value"])?;
    for s in curve {
        wtr.write_record([
            s.date.to_string(),
            format!("{:.2}", s.equity),
            format!("{:.2}", s.cash),
            format!("{:.2}", s.positions_value),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: date, symbol, side, quantity, fill_price, commission, exchange, pair.
pub fn export_fills_csv(fills: &[FillEvent]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "symbol",
        "side",
        "quantity",
        "fill_price",
        "commission",
        "exchange",
        "pair",
    ])?;
    for f in fills {
        wtr.write_record([
            f.date.to_string(),
            f.symbol.clone(),
            format!("{:?}", f.side),
            f.quantity.to_string(),
            format!("{:.6}", f.fill_price),
            format!("{:.2}", f.commission),
            f.exchange.clone(),
            f.pair.as_ref().map_or_else(String::new, |p| p.to_string()),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per grid point, in grid order.
pub fn export_sweep_csv(results: &SweepResults) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "run_id",
        "z_entry",
        "z_exit",
        "total_return",
        "sharpe",
        "max_drawdown",
        "fills",
    ])?;
    for r in results.all() {
        wtr.write_record([
            r.run_id.clone(),
            r.config.strategy.z_entry.to_string(),
            r.config.strategy.z_exit.to_string(),
            format!("{:.6}", r.metrics.total_return),
            format!("{:.4}", r.metrics.sharpe),
            format!("{:.6}", r.metrics.max_drawdown),
            r.metrics.fill_count.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `result.json`, `equity.csv`, `fills.csv` and `report.md` into
/// `<output_dir>/<run id prefix>/` and return that directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let prefix = result.run_id.get(..12).unwrap_or(&result.run_id);
    let run_dir = output_dir.join(prefix);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("result.json"), export_json(result)?)?;
    std::fs::write(
        run_dir.join("equity.csv"),
        export_equity_csv(&result.run.equity_curve)?,
    )?;
    std::fs::write(run_dir.join("fills.csv"), export_fills_csv(&result.run.fills)?)?;
    std::fs::write(run_dir.join("report.md"), generate_report(result))?;
    Ok(run_dir)
}

pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown ───────────────────────────────────────────────────────

pub fn generate_report(result: &BacktestResult) -> String {
    let run = &result.run;
    let m = &result.metrics;
    let mut md = String::with_capacity(2048);

    md.push_str("# Backtest Report\n\n");
    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n| --- | --- |\n");
    md.push_str(&format!("| Run ID | {} |\n", result.run_id));
    md.push_str(&format!("| Strategy | {} |\n", run.strategy));
    md.push_str(&format!(
        "| Period | {} to {} |\n",
        fmt_date(run.first_date),
        fmt_date(run.last_date)
    ));
    md.push_str(&format!("| Steps | {} |\n", run.steps));
    md.push_str(&format!("| Initial Capital | ${:.0} |\n", run.initial_capital));
    md.push_str(&format!("| Signals | {} |\n", run.signal_count));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    md.push_str("## Performance\n\n");
    md.push_str("| Metric | Value |\n| --- | --- |\n");
    md.push_str(&format!("| Final Equity | ${:.2} |\n", run.final_equity));
    md.push_str(&format!("| Total Return | {:.2}% |\n", m.total_return * 100.0));
    md.push_str(&format!("| CAGR | {:.2}% |\n", m.cagr * 100.0));
    md.push_str(&format!("| Sharpe | {:.3} |\n", m.sharpe));
    md.push_str(&format!("| Sortino | {:.3} |\n", m.sortino));
    md.push_str(&format!("| Calmar | {:.3} |\n", m.calmar));
    md.push_str(&format!("| Max Drawdown | {:.2}% |\n", m.max_drawdown * 100.0));
    md.push_str(&format!("| Volatility | {:.2}% |\n", m.volatility * 100.0));
    md.push_str(&format!("| Fills | {} |\n", m.fill_count));
    md.push_str(&format!("| Turnover | {:.1}x |\n", m.turnover));
    md.push_str(&format!("| Commission | ${:.2} |\n", m.commission_paid));
    md.push('\n');

    let p = &run.portfolio;
    md.push_str("## Risk\n\n");
    md.push_str("| Counter | Value |\n| --- | --- |\n");
    md.push_str(&format!("| Leverage rejections | {} |\n", p.rejected_leverage));
    md.push_str(&format!("| Zero-size rejections | {} |\n", p.rejected_size));
    md.push_str(&format!("| Sibling rejections | {} |\n", p.rejected_sibling));
    md.push_str(&format!("| Unfilled orders | {} |\n", run.unfilled_orders));
    md.push('\n');

    md.push_str("## Pairs\n\n");
    md.push_str("| Pair | Estimator | State | Beta | Entries | Exits | Stops | Refused | Hurst rej. | Half-life rej. |\n");
    md.push_str("| --- | --- | --- | --- | --- | --- | --- | --- | --- | --- |\n");
    for pair in &result.pairs {
        let d = &pair.diagnostics;
        md.push_str(&format!(
            "| {} | {} | {:?} | {} | {} | {} | {} | {} | {} | {} |\n",
            pair.pair,
            pair.estimator,
            pair.state,
            pair.beta.map_or_else(|| "-".to_string(), |b| format!("{b:.4}")),
            d.entries,
            d.exits,
            d.stop_losses,
            d.refused_entries,
            d.hurst_rejections,
            d.half_life_rejections,
        ));
    }
    md
}

fn fmt_date(date: Option<chrono::NaiveDate>) -> String {
    date.map_or_else(|| "-".to_string(), |d| d.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BacktestConfig;
    use crate::runner::run_single_backtest;

    fn sample_result() -> BacktestResult {
        let config = BacktestConfig::from_toml(
            "[backtest]\nsynthetic = true\nseed = 5\n[[pairs]]\ny = \"YY\"\nx = \"XX\"\n",
        )
        .unwrap();
        run_single_backtest(&config).unwrap()
    }

    #[test]
    fn json_roundtrip() {
        let result = sample_result();
        let back = import_json(&export_json(&result).unwrap()).unwrap();
        assert_eq!(back.run_id, result.run_id);
        assert_eq!(back.config.pairs, result.config.pairs);
        assert_eq!(back.run.steps, result.run.steps);
        assert_eq!(back.run.fills.len(), result.run.fills.len());
        assert_eq!(back.pairs.len(), result.pairs.len());
        assert_eq!(back.pairs[0].diagnostics, result.pairs[0].diagnostics);
    }

    #[test]
    fn json_rejects_unknown_version() {
        let mut result = sample_result();
        result.schema_version = SCHEMA_VERSION + 1;
        let json = serde_json::to_string(&result).unwrap();
        assert!(import_json(&json).is_err());
    }

    #[test]
    fn equity_csv_has_one_row_per_step() {
        let result = sample_result();
        let csv = export_equity_csv(&result.run.equity_curve).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("date,equity,cash,positions_value"));
        assert_eq!(lines.count(), result.run.steps);
    }

    #[test]
    fn fills_csv_header_and_rows() {
        let result = sample_result();
        let csv = export_fills_csv(&result.run.fills).unwrap();
        assert!(csv.starts_with("date,symbol,side,quantity,fill_price,commission,exchange,pair"));
        assert_eq!(csv.lines().count(), result.run.fills.len() + 1);
    }

    #[test]
    fn report_lists_pairs() {
        let md = generate_report(&sample_result());
        assert!(md.contains("# Backtest Report"));
        assert!(md.contains("| YY_XX | kalman |"));
        assert!(md.contains("**SYNTHETIC**"));
    }

    #[test]
    fn save_load_artifacts_roundtrip() {
        let result = sample_result();
        let dir = tempfile::tempdir().unwrap();
        let run_dir = save_artifacts(&result, dir.path()).unwrap();

        for file in ["result.json", "equity.csv", "fills.csv", "report.md"] {
            assert!(run_dir.join(file).exists(), "{file} missing");
        }
        let loaded = load_artifacts(&run_dir).unwrap();
        assert_eq!(loaded.run_id, result.run_id);
        assert_eq!(loaded.schema_version, SCHEMA_VERSION);
    }
}
