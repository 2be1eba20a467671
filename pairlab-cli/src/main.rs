//! PairLab CLI: single backtests and threshold sweeps.
//!
//! Commands:
//! - `run`: execute one backtest from a TOML config and save its artifacts
//! - `sweep`: run a z_entry x z_exit grid over one data load

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pairlab_runner::export::export_sweep_csv;
use pairlab_runner::{
    run_single_backtest, save_artifacts, BacktestConfig, BacktestResult, ParamGrid, ParamSweep,
};

#[derive(Parser)]
#[command(name = "pairlab", about = "PairLab: statistical-arbitrage pairs backtester")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Generate seeded cointegrated series instead of reading CSVs.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Drop data before this date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Sweep entry/exit z thresholds over one data load.
    Sweep {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Comma-separated entry thresholds, e.g. 2.0,2.5,3.0.
        #[arg(long, value_delimiter = ',')]
        z_entry: Vec<f64>,

        /// Comma-separated exit thresholds.
        #[arg(long, value_delimiter = ',')]
        z_exit: Vec<f64>,

        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Run grid points one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            synthetic,
            start,
            output_dir,
        } => run_backtest_cmd(&config, synthetic, start, &output_dir),
        Commands::Sweep {
            config,
            z_entry,
            z_exit,
            synthetic,
            sequential,
            output_dir,
        } => run_sweep_cmd(
            &config,
            ParamGrid { z_entry, z_exit },
            synthetic,
            sequential,
            &output_dir,
        ),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pairlab_core=info,pairlab_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: &Path, synthetic: bool) -> Result<BacktestConfig> {
    let mut config = BacktestConfig::from_file(path)?;
    if synthetic {
        config.backtest.synthetic = true;
    }
    Ok(config)
}

fn run_backtest_cmd(
    config_path: &Path,
    synthetic: bool,
    start: Option<NaiveDate>,
    output_dir: &Path,
) -> Result<()> {
    let mut config = load_config(config_path, synthetic)?;
    if start.is_some() {
        config.backtest.start_date = start;
    }

    let result = run_single_backtest(&config)?;
    print_summary(&result);

    let run_dir = save_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_sweep_cmd(
    config_path: &Path,
    grid: ParamGrid,
    synthetic: bool,
    sequential: bool,
    output_dir: &Path,
) -> Result<()> {
    let config = load_config(config_path, synthetic)?;
    if grid.z_entry.is_empty() && grid.z_exit.is_empty() {
        bail!("a sweep needs at least one of --z-entry or --z-exit");
    }

    let results = ParamSweep::new()
        .with_parallelism(!sequential)
        .sweep(&grid, &config)?;
    if results.is_empty() {
        bail!("no valid grid points out of {}", grid.size());
    }

    println!();
    println!(
        "{:<14} {:>8} {:>8} {:>10} {:>8} {:>10} {:>6}",
        "Run", "z_entry", "z_exit", "Return", "Sharpe", "Max DD", "Fills"
    );
    println!("{}", "-".repeat(70));
    for r in results.sorted_by_sharpe() {
        println!(
            "{:<14} {:>8.2} {:>8.2} {:>9.2}% {:>8.3} {:>9.2}% {:>6}",
            &r.run_id[..12],
            r.config.strategy.z_entry,
            r.config.strategy.z_exit,
            r.metrics.total_return * 100.0,
            r.metrics.sharpe,
            r.metrics.max_drawdown * 100.0,
            r.metrics.fill_count,
        );
    }

    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join("sweep.csv");
    std::fs::write(&path, export_sweep_csv(&results)?)?;
    println!();
    println!("Sweep saved to: {}", path.display());
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let run = &result.run;
    let m = &result.metrics;

    println!();
    println!("=== Backtest Summary ===");
    println!("Run ID:       {}", &result.run_id[..12]);
    println!("Strategy:     {}", run.strategy);
    println!(
        "Period:       {} to {} ({} steps)",
        fmt_date(run.first_date),
        fmt_date(run.last_date),
        run.steps
    );
    if result.has_synthetic {
        println!("Data:         SYNTHETIC (not market data)");
    }
    println!();
    println!("Initial:      ${:.2}", run.initial_capital);
    println!("Final:        ${:.2}", run.final_equity);
    println!("Return:       {:.2}%", m.total_return * 100.0);
    println!("CAGR:         {:.2}%", m.cagr * 100.0);
    println!("Sharpe:       {:.3}", m.sharpe);
    println!("Sortino:      {:.3}", m.sortino);
    println!("Max DD:       {:.2}%", m.max_drawdown * 100.0);
    println!("Fills:        {}", m.fill_count);
    println!("Commission:   ${:.2}", m.commission_paid);
    println!();

    println!(
        "{:<14} {:<20} {:<12} {:>9} {:>8} {:>6} {:>6}",
        "Pair", "Estimator", "State", "Beta", "Entries", "Exits", "Stops"
    );
    println!("{}", "-".repeat(81));
    for p in &result.pairs {
        let beta = p.beta.map_or_else(|| "-".to_string(), |b| format!("{b:.4}"));
        println!(
            "{:<14} {:<20} {:<12} {:>9} {:>8} {:>6} {:>6}",
            p.pair.as_str(),
            p.estimator,
            format!("{:?}", p.state),
            beta,
            p.diagnostics.entries,
            p.diagnostics.exits,
            p.diagnostics.stop_losses,
        );
    }
    println!();
}

fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "-".to_string(), |d| d.to_string())
}
