//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{
    read_bool, read_double, read_int, validate_backtest_config, validate_turtle_config,
};
use crate::domain::error::TurtleError;
use crate::domain::indicator_helpers::turtle_indicator_types;
use crate::domain::metrics::Metrics;
use crate::domain::strategy::{BreakoutWindows, Subsystem};
use crate::domain::transaction::{extract_transactions, TradeStats, Transaction};
use crate::domain::universe::{parse_codes, validate_universe};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_OUTPUT_DIR: &str = "report";

#[derive(Parser, Debug)]
#[command(name = "turtletrader", about = "Turtle trend-following backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of <CODE>.csv files; overrides [data] dir
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Report directory; overrides [report] output_dir
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List instruments available in a data directory
    ListSymbols {
        #[arg(long)]
        data_dir: PathBuf,
    },
    /// Show data range for symbol(s)
    Info {
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data_dir,
            output,
            code,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(
                    &config,
                    code.as_deref(),
                    data_dir.as_deref(),
                    output.as_deref(),
                )
            } else {
                run_backtest(&config, data_dir.as_deref(), output.as_deref(), code.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { data_dir } => run_list_symbols(&data_dir),
        Command::Info {
            code,
            data_dir,
            config,
        } => run_info(code.as_deref(), data_dir.as_deref(), config.as_deref()),
    }
}

fn fail(err: &TurtleError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

fn run_backtest(
    config_path: &Path,
    data_dir: Option<&Path>,
    output_path: Option<&Path>,
    code_override: Option<&str>,
) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Validate raw config
    if let Err(e) = validate_backtest_config(&adapter).and_then(|_| validate_turtle_config(&adapter)) {
        return fail(&e);
    }

    // Stage 3: Build BacktestConfig
    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    // Stage 4: Resolve codes and data source
    let codes = match resolve_codes(code_override, &adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let data_dir = match resolve_data_dir(data_dir, &adapter) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };
    let output = resolve_output_dir(output_path, &adapter);

    eprintln!("Validating {} codes in {}...", codes.len(), data_dir.display());
    let data_port = CsvAdapter::new(data_dir);

    // Stages 5-8: Data port dependent pipeline
    match run_backtest_pipeline(&data_port, &bt_config, &codes) {
        Ok(outcome) => {
            print_summary(&outcome);
            let written = CsvReportAdapter::new().write(
                &outcome.result,
                &outcome.metrics,
                &outcome.transactions,
                &output.to_string_lossy(),
            );
            match written {
                Ok(()) => {
                    eprintln!("\nReport written to: {}", output.display());
                    ExitCode::SUCCESS
                }
                Err(e) => fail(&e),
            }
        }
        Err(e) => fail(&e),
    }
}

/// Everything a completed run produces.
#[derive(Debug, Clone)]
pub struct BacktestOutcome {
    pub result: BacktestResult,
    pub metrics: Metrics,
    pub transactions: Vec<Transaction>,
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    bt_config: &BacktestConfig,
    codes: &[String],
) -> Result<BacktestOutcome, TurtleError> {
    // Stage 5: Validate universe and load bars
    let universe = validate_universe(
        data_port,
        codes.to_vec(),
        bt_config.start_date,
        bt_config.end_date,
        bt_config.longest_lookback(),
    )?;

    // Stage 6: Align, compute indicators and simulate
    bt_config.validate()?;
    let prepared = backtest_engine::prepare_universe(&universe.data, bt_config);
    eprintln!(
        "Running backtest: {} codes, {} to {}",
        prepared.series.len(),
        bt_config.start_date,
        bt_config.end_date,
    );
    eprintln!("  Processing: {} dates", prepared.timeline.len());
    let result = backtest_engine::simulate(prepared, bt_config)?;

    // Stage 7: Metrics and transactions
    let metrics = Metrics::compute(&result.equity_curve(), bt_config.risk_free_rate);
    let transactions = extract_transactions(&result.history, &result.universe);

    Ok(BacktestOutcome {
        result,
        metrics,
        transactions,
    })
}

fn print_summary(outcome: &BacktestOutcome) {
    let metrics = &outcome.metrics;
    let stats = TradeStats::from_transactions(&outcome.transactions);

    eprintln!("\n=== Results ===");
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("Annual Return:    {:.2}%", metrics.annual_return * 100.0);
    eprintln!("Volatility:       {:.2}%", metrics.annual_volatility * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", metrics.sortino_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!("Max DD Duration:  {} days", metrics.max_drawdown_duration);
    eprintln!("Final Value:      {:.2}", outcome.result.final_value);
    eprintln!("Total Trades:     {}", stats.total);
    eprintln!("Win Rate:         {:.1}%", stats.win_rate * 100.0);

    let codes = outcome.result.history.codes.clone();
    if codes.len() > 1 && !outcome.transactions.is_empty() {
        eprintln!("\n=== Per-Code Summary ===");
        for code in &codes {
            let trades: Vec<Transaction> = outcome
                .transactions
                .iter()
                .filter(|t| &t.code == code)
                .cloned()
                .collect();
            let s = TradeStats::from_transactions(&trades);
            eprintln!(
                "  {}:  {} trades, {:.1}% win rate",
                code,
                s.total,
                s.win_rate * 100.0
            );
        }
    }
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, TurtleError> {
    let defaults = BacktestConfig::default();

    let s1 = BreakoutWindows {
        entry: get_count(adapter, "s1_entry", defaults.s1.entry)?,
        exit: get_count(adapter, "s1_exit", defaults.s1.exit)?,
    };
    let s2 = BreakoutWindows {
        entry: get_count(adapter, "s2_entry", defaults.s2.entry)?,
        exit: get_count(adapter, "s2_exit", defaults.s2.exit)?,
    };
    let unit_limit = get_count(adapter, "unit_limit", defaults.unit_limit as usize)?;
    let unit_limit = u32::try_from(unit_limit).map_err(|_| TurtleError::ConfigInvalid {
        section: "turtle".into(),
        key: "unit_limit".into(),
        reason: "unit_limit is too large".into(),
    })?;

    Ok(BacktestConfig {
        start_date: get_date(adapter, "start_date", defaults.start_date)?,
        end_date: get_date(adapter, "end_date", defaults.end_date)?,
        initial_capital: read_double(
            adapter,
            "backtest",
            "initial_capital",
            defaults.initial_capital,
        )?,
        risk_free_rate: read_double(
            adapter,
            "backtest",
            "risk_free_rate",
            defaults.risk_free_rate,
        )?,
        risk_level: read_double(adapter, "turtle", "risk_level", defaults.risk_level)?,
        r_max: read_double(adapter, "turtle", "r_max", defaults.r_max)?,
        s1,
        s2,
        atr_periods: get_count(adapter, "atr_periods", defaults.atr_periods)?,
        s1_allocation: read_double(adapter, "turtle", "s1_allocation", defaults.s1_allocation)?,
        risk_reduction_rate: read_double(
            adapter,
            "turtle",
            "risk_reduction_rate",
            defaults.risk_reduction_rate,
        )?,
        risk_reduction_level: read_double(
            adapter,
            "turtle",
            "risk_reduction_level",
            defaults.risk_reduction_level,
        )?,
        unit_limit,
        allow_shorting: read_bool(adapter, "turtle", "allow_shorting", defaults.allow_shorting)?,
    })
}

fn get_count(adapter: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, TurtleError> {
    let value = read_int(adapter, "turtle", key, default as i64)?;
    usize::try_from(value)
        .ok()
        .filter(|v| *v >= 1)
        .ok_or_else(|| TurtleError::ConfigInvalid {
            section: "turtle".into(),
            key: key.into(),
            reason: format!("{key} must be at least 1"),
        })
}

fn get_date(adapter: &dyn ConfigPort, key: &str, default: NaiveDate) -> Result<NaiveDate, TurtleError> {
    match adapter.get_string("backtest", key) {
        None => Ok(default),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            TurtleError::ConfigInvalid {
                section: "backtest".into(),
                key: key.into(),
                reason: "invalid date format (expected YYYY-MM-DD)".into(),
            }
        }),
    }
}

/// `--code` wins over `codes`, which wins over `code`.
pub fn resolve_codes(
    code_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, TurtleError> {
    let (key, raw) = if let Some(c) = code_override {
        ("code", c.to_string())
    } else if let Some(c) = config
        .get_string("backtest", "codes")
        .filter(|c| !c.trim().is_empty())
    {
        ("codes", c)
    } else if let Some(c) = config
        .get_string("backtest", "code")
        .filter(|c| !c.trim().is_empty())
    {
        ("code", c)
    } else {
        return Err(TurtleError::ConfigMissing {
            section: "backtest".into(),
            key: "codes".into(),
        });
    };

    parse_codes(&raw).map_err(|e| TurtleError::ConfigInvalid {
        section: "backtest".into(),
        key: key.into(),
        reason: e.to_string(),
    })
}

pub fn resolve_data_dir(
    data_dir: Option<&Path>,
    config: &dyn ConfigPort,
) -> Result<PathBuf, TurtleError> {
    if let Some(d) = data_dir {
        return Ok(d.to_path_buf());
    }
    config
        .get_string("data", "dir")
        .filter(|d| !d.trim().is_empty())
        .map(|d| PathBuf::from(d.trim()))
        .ok_or_else(|| TurtleError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        })
}

/// `-o` wins over `[report] output_dir`, which wins over `report/`.
pub fn resolve_output_dir(output_path: Option<&Path>, config: &dyn ConfigPort) -> PathBuf {
    output_path
        .map(Path::to_path_buf)
        .or_else(|| {
            config
                .get_string("report", "output_dir")
                .filter(|d| !d.trim().is_empty())
                .map(|d| PathBuf::from(d.trim()))
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

pub fn run_dry_run(
    config_path: &Path,
    code_override: Option<&str>,
    data_dir: Option<&Path>,
    output_path: Option<&Path>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_backtest_config(&adapter).and_then(|_| validate_turtle_config(&adapter)) {
        return fail(&e);
    }
    let bt_config = match build_backtest_config(&adapter).and_then(|c| c.validate().map(|_| c)) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    eprintln!("Config validated successfully");

    eprintln!("\nBacktest:");
    eprintln!("  period:          {} to {}", bt_config.start_date, bt_config.end_date);
    eprintln!("  initial capital: {:.2}", bt_config.initial_capital);
    eprintln!("  risk-free rate:  {}", bt_config.risk_free_rate);

    eprintln!("\nTurtle parameters:");
    for subsystem in Subsystem::ALL {
        let w = bt_config.windows(subsystem);
        eprintln!(
            "  {}: entry {}, exit {}, allocation {:.2}",
            subsystem,
            w.entry,
            w.exit,
            bt_config.allocation(subsystem)
        );
    }
    eprintln!("  N: ATR({})", bt_config.atr_periods);
    eprintln!(
        "  risk level {}, r_max {}, unit limit {}, shorting {}",
        bt_config.risk_level,
        bt_config.r_max,
        bt_config.unit_limit,
        if bt_config.allow_shorting { "on" } else { "off" }
    );

    eprintln!("\nIndicators to compute:");
    for ind in turtle_indicator_types(&bt_config) {
        eprintln!("  {}", ind);
    }

    eprintln!("\nUniverse:");
    match resolve_codes(code_override, &adapter) {
        Ok(codes) => eprintln!("  codes: {}", codes.join(", ")),
        Err(e) => return fail(&e),
    }
    eprintln!("  minimum bars: {}", bt_config.longest_lookback());

    eprintln!("\nPaths:");
    match resolve_data_dir(data_dir, &adapter) {
        Ok(dir) => eprintln!("  data dir:   {}", dir.display()),
        Err(e) => return fail(&e),
    }
    eprintln!(
        "  report dir: {}",
        resolve_output_dir(output_path, &adapter).display()
    );

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let checks = validate_backtest_config(&adapter)
        .and_then(|_| validate_turtle_config(&adapter))
        .and_then(|_| build_backtest_config(&adapter))
        .and_then(|c| c.validate())
        .and_then(|_| resolve_codes(None, &adapter).map(|_| ()));
    if let Err(e) = checks {
        return fail(&e);
    }

    eprintln!("Configuration is valid.");
    ExitCode::SUCCESS
}

fn run_list_symbols(data_dir: &Path) -> ExitCode {
    let adapter = CsvAdapter::new(data_dir.to_path_buf());
    let symbols = match adapter.list_symbols() {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    if symbols.is_empty() {
        eprintln!("No symbols found in {}", data_dir.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}

fn run_info(code: Option<&str>, data_dir: Option<&Path>, config_path: Option<&Path>) -> ExitCode {
    let config = match config_path.map(load_config).transpose() {
        Ok(c) => c,
        Err(code) => return code,
    };

    let (codes, dir) = match &config {
        Some(c) => {
            let codes = resolve_codes(code, c);
            let dir = resolve_data_dir(data_dir, c);
            match codes.and_then(|codes| dir.map(|dir| (codes, dir))) {
                Ok(v) => v,
                Err(e) => return fail(&e),
            }
        }
        None => match (code, data_dir) {
            (Some(c), Some(d)) => (vec![c.to_uppercase()], d.to_path_buf()),
            _ => {
                eprintln!("error: --code and --data-dir are required without --config");
                return ExitCode::from(1);
            }
        },
    };

    let adapter = CsvAdapter::new(dir);
    for c in &codes {
        match adapter.get_data_range(c) {
            Ok(Some((min_date, max_date, count))) => {
                println!("{}: {} bars, {} to {}", c, count, min_date, max_date);
            }
            Ok(None) => {
                eprintln!("{}: no data found", c);
            }
            Err(e) => {
                eprintln!("error querying {}: {}", c, e);
            }
        }
    }
    ExitCode::SUCCESS
}
