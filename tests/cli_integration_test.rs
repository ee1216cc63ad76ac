//! CLI integration tests for the backtest command orchestration.
//!
//! Tests cover:
//! - Config parsing (build_backtest_config)
//! - Code and data directory resolution
//! - Dry-run mode with real INI files on disk
//! - Full pipeline over a CSV data directory
//! - End-to-end `backtest` command writing a report

mod common;

use clap::Parser;
use common::*;
use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use turtletrader::adapters::csv_adapter::CsvAdapter;
use turtletrader::adapters::csv_report_adapter::{
    CsvReportAdapter, EQUITY_FILE, SUMMARY_FILE, TRANSACTIONS_FILE,
};
use turtletrader::adapters::file_config_adapter::FileConfigAdapter;
use turtletrader::cli::{self, Cli};
use turtletrader::domain::error::TurtleError;
use turtletrader::ports::report_port::ReportPort;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn same_code(a: ExitCode, b: ExitCode) -> bool {
    format!("{a:?}") == format!("{b:?}")
}

/// Writes `<CODE>.csv` with a steady uptrend starting 2024-01-01.
fn write_uptrend_csv(dir: &Path, code: &str, days: usize, start_price: f64) {
    let mut body = String::from("date,open,high,low,close,volume\n");
    for bar in generate_bars(code, date(2024, 1, 1), days, start_price) {
        writeln!(
            body,
            "{},{},{},{},{},{}",
            bar.date, bar.open, bar.high, bar.low, bar.close, bar.volume
        )
        .unwrap();
    }
    fs::write(dir.join(format!("{code}.csv")), body).unwrap();
}

const VALID_INI: &str = r#"
[data]
dir = /var/lib/turtle/bars

[backtest]
initial_capital = 250000.0
risk_free_rate = 0.03
start_date = 2020-01-01
end_date = 2024-12-31
codes = bhp, cba,WBC

[turtle]
risk_level = 1.5
r_max = 0.01
s1_entry = 15
s1_exit = 8
s2_entry = 40
s2_exit = 15
atr_periods = 14
s1_allocation = 0.6
risk_reduction_rate = 0.2
risk_reduction_level = 0.1
unit_limit = 4
allow_shorting = no
"#;

mod config_loading {
    use super::*;

    #[test]
    fn build_backtest_config_valid_full() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let config = cli::build_backtest_config(&adapter).unwrap();

        assert_eq!(config.start_date, date(2020, 1, 1));
        assert_eq!(config.end_date, date(2024, 12, 31));
        assert!((config.initial_capital - 250_000.0).abs() < f64::EPSILON);
        assert!((config.risk_free_rate - 0.03).abs() < f64::EPSILON);
        assert!((config.risk_level - 1.5).abs() < f64::EPSILON);
        assert!((config.r_max - 0.01).abs() < f64::EPSILON);
        assert_eq!((config.s1.entry, config.s1.exit), (15, 8));
        assert_eq!((config.s2.entry, config.s2.exit), (40, 15));
        assert_eq!(config.atr_periods, 14);
        assert!((config.s1_allocation - 0.6).abs() < f64::EPSILON);
        assert!((config.risk_reduction_rate - 0.2).abs() < f64::EPSILON);
        assert!((config.risk_reduction_level - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.unit_limit, 4);
        assert!(!config.allow_shorting);
        assert_eq!(config.longest_lookback(), 40);
    }

    #[test]
    fn build_backtest_config_uses_defaults() {
        let adapter = FileConfigAdapter::from_string("[backtest]\ncodes = BHP\n").unwrap();
        let config = cli::build_backtest_config(&adapter).unwrap();

        assert_eq!(config.s1.entry, 20);
        assert_eq!(config.s2.entry, 55);
        assert_eq!(config.atr_periods, 20);
        assert_eq!(config.unit_limit, 5);
        assert!(config.allow_shorting);
        assert!((config.initial_capital - 10_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn build_backtest_config_rejects_bad_date() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\nstart_date = 01/02/2020\n").unwrap();
        let err = cli::build_backtest_config(&adapter).unwrap_err();
        assert!(matches!(err, TurtleError::ConfigInvalid { ref key, .. } if key == "start_date"));
    }

    #[test]
    fn build_backtest_config_rejects_mistyped_values() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\ncode = BHP\ninitial_capital = 1O0000\n[turtle]\nr_max = 0.0x2\n",
        )
        .unwrap();
        let err = cli::build_backtest_config(&adapter).unwrap_err();
        assert!(matches!(err, TurtleError::ConfigInvalid { ref key, .. } if key == "initial_capital"));
    }

    #[test]
    fn build_backtest_config_rejects_zero_window() {
        let adapter = FileConfigAdapter::from_string("[turtle]\ns2_exit = 0\n").unwrap();
        let err = cli::build_backtest_config(&adapter).unwrap_err();
        assert!(matches!(err, TurtleError::ConfigInvalid { ref key, .. } if key == "s2_exit"));
    }
}

mod resolution {
    use super::*;

    #[test]
    fn codes_from_config_are_normalised() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let codes = cli::resolve_codes(None, &adapter).unwrap();
        assert_eq!(codes, vec!["BHP", "CBA", "WBC"]);
    }

    #[test]
    fn code_override_wins() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let codes = cli::resolve_codes(Some("rio"), &adapter).unwrap();
        assert_eq!(codes, vec!["RIO"]);
    }

    #[test]
    fn single_code_key_is_a_fallback() {
        let adapter = FileConfigAdapter::from_string("[backtest]\ncode = nab\n").unwrap();
        assert_eq!(cli::resolve_codes(None, &adapter).unwrap(), vec!["NAB"]);
    }

    #[test]
    fn missing_codes_is_an_error() {
        let adapter = FileConfigAdapter::from_string("[backtest]\ninitial_capital = 1\n").unwrap();
        let err = cli::resolve_codes(None, &adapter).unwrap_err();
        assert!(matches!(err, TurtleError::ConfigMissing { ref key, .. } if key == "codes"));
    }

    #[test]
    fn duplicate_codes_are_rejected() {
        let adapter = FileConfigAdapter::from_string("[backtest]\ncodes = BHP,bhp\n").unwrap();
        let err = cli::resolve_codes(None, &adapter).unwrap_err();
        assert!(matches!(err, TurtleError::ConfigInvalid { .. }));
    }

    #[test]
    fn data_dir_flag_overrides_config() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let flag = PathBuf::from("/tmp/elsewhere");
        assert_eq!(
            cli::resolve_data_dir(Some(flag.as_path()), &adapter).unwrap(),
            flag
        );
        assert_eq!(
            cli::resolve_data_dir(None, &adapter).unwrap(),
            PathBuf::from("/var/lib/turtle/bars")
        );
    }

    #[test]
    fn data_dir_missing_is_an_error() {
        let adapter = FileConfigAdapter::from_string("[backtest]\ncodes = BHP\n").unwrap();
        let err = cli::resolve_data_dir(None, &adapter).unwrap_err();
        assert!(matches!(err, TurtleError::ConfigMissing { ref section, .. } if section == "data"));
    }
}

mod dry_run {
    use super::*;

    fn dry_run(path: &Path, code: Option<&str>) -> ExitCode {
        cli::run_dry_run(path, code, None, None)
    }

    #[test]
    fn valid_config_succeeds() {
        let file = write_temp_ini(VALID_INI);
        assert!(same_code(dry_run(file.path(), None), ExitCode::SUCCESS));
    }

    #[test]
    fn valid_config_with_override_succeeds() {
        let file = write_temp_ini(VALID_INI);
        assert!(same_code(dry_run(file.path(), Some("RIO")), ExitCode::SUCCESS));
    }

    #[test]
    fn missing_file_fails() {
        let code = dry_run(Path::new("/nonexistent/turtle.ini"), None);
        assert!(!same_code(code, ExitCode::SUCCESS));
    }

    #[test]
    fn invalid_turtle_section_is_a_config_error() {
        let file = write_temp_ini("[backtest]\ncodes = BHP\n\n[turtle]\nr_max = 1.5\n");
        assert!(same_code(dry_run(file.path(), None), ExitCode::from(2)));
    }

    #[test]
    fn inverted_dates_are_a_config_error() {
        let file = write_temp_ini(
            "[backtest]\ncodes = BHP\nstart_date = 2024-01-01\nend_date = 2023-01-01\n",
        );
        assert!(same_code(dry_run(file.path(), None), ExitCode::from(2)));
    }

    #[test]
    fn mistyped_values_are_config_errors() {
        for (backtest, turtle) in [
            ("initial_capital = 1O0000", ""),
            ("risk_free_rate = two percent", ""),
            ("", "r_max = 0.0x2"),
            ("", "s1_entry = twenty"),
            ("", "atr_periods = 20.5"),
            ("", "allow_shorting = nope"),
        ] {
            let ini = format!(
                "[data]\ndir = /tmp/bars\n\n[backtest]\ncodes = BHP\n{backtest}\n\n[turtle]\n{turtle}\n"
            );
            let file = write_temp_ini(&ini);
            assert!(
                same_code(dry_run(file.path(), None), ExitCode::from(2)),
                "accepted: {backtest}{turtle}"
            );
        }
    }

    #[test]
    fn missing_data_dir_is_a_config_error() {
        let file = write_temp_ini("[backtest]\ncodes = BHP\n");
        assert!(same_code(dry_run(file.path(), None), ExitCode::from(2)));
    }

    #[test]
    fn data_dir_and_output_flags_are_honoured() {
        let file = write_temp_ini("[backtest]\ncodes = BHP\n");
        let code = cli::run_dry_run(
            file.path(),
            None,
            Some(Path::new("/tmp/bars")),
            Some(Path::new("/tmp/out")),
        );
        assert!(same_code(code, ExitCode::SUCCESS));
    }

    #[test]
    fn dry_run_flag_does_not_write_report() {
        let out = tempfile::tempdir().unwrap();
        let report_dir = out.path().join("never");
        let file = write_temp_ini(VALID_INI);
        let args = Cli::parse_from([
            "turtletrader",
            "backtest",
            "-c",
            file.path().to_str().unwrap(),
            "--data-dir",
            out.path().to_str().unwrap(),
            "-o",
            report_dir.to_str().unwrap(),
            "--dry-run",
        ]);
        assert!(same_code(cli::run(args), ExitCode::SUCCESS));
        assert!(!report_dir.exists());
    }
}

mod pipeline {
    use super::*;

    fn short_config() -> turtletrader::domain::backtest::BacktestConfig {
        turtletrader::domain::backtest::BacktestConfig {
            start_date: date(2024, 1, 1),
            end_date: date(2024, 12, 31),
            ..sample_config()
        }
    }

    #[test]
    fn csv_directory_feeds_the_pipeline() {
        let data = tempfile::tempdir().unwrap();
        write_uptrend_csv(data.path(), "BHP", 60, 100.0);
        write_uptrend_csv(data.path(), "CBA", 60, 40.0);
        let port = CsvAdapter::new(data.path().to_path_buf());

        let codes = vec!["BHP".to_string(), "CBA".to_string()];
        let outcome = cli::run_backtest_pipeline(&port, &short_config(), &codes).unwrap();

        assert_eq!(outcome.result.history.codes, codes);
        assert_eq!(outcome.result.history.len(), 60);
        assert!(outcome.result.final_value > outcome.result.history.snapshots[0].cash);
    }

    #[test]
    fn missing_csv_is_skipped_not_fatal() {
        let data = tempfile::tempdir().unwrap();
        write_uptrend_csv(data.path(), "BHP", 60, 100.0);
        let port = CsvAdapter::new(data.path().to_path_buf());

        let codes = vec!["BHP".to_string(), "ZZZ".to_string()];
        let outcome = cli::run_backtest_pipeline(&port, &short_config(), &codes).unwrap();
        assert_eq!(outcome.result.history.codes, vec!["BHP"]);
    }

    #[test]
    fn report_written_from_pipeline_outcome() {
        let data = tempfile::tempdir().unwrap();
        write_uptrend_csv(data.path(), "BHP", 60, 100.0);
        let port = CsvAdapter::new(data.path().to_path_buf());
        let outcome =
            cli::run_backtest_pipeline(&port, &short_config(), &["BHP".to_string()]).unwrap();

        let out = tempfile::tempdir().unwrap();
        CsvReportAdapter::new()
            .write(
                &outcome.result,
                &outcome.metrics,
                &outcome.transactions,
                out.path().to_str().unwrap(),
            )
            .unwrap();

        let equity = fs::read_to_string(out.path().join(EQUITY_FILE)).unwrap();
        assert_eq!(equity.lines().count(), 61);
        assert!(equity.lines().nth(1).unwrap().starts_with("2024-01-01,"));
        let summary = fs::read_to_string(out.path().join(SUMMARY_FILE)).unwrap();
        assert!(summary.contains("total_trades,0\n"));
    }
}

mod end_to_end {
    use super::*;

    #[test]
    fn backtest_command_writes_report() {
        let data = tempfile::tempdir().unwrap();
        write_uptrend_csv(data.path(), "BHP", 80, 100.0);
        write_uptrend_csv(data.path(), "CBA", 80, 40.0);
        let out = tempfile::tempdir().unwrap();
        let report_dir = out.path().join("run");

        let ini = format!(
            "[data]\ndir = {}\n\n[backtest]\ninitial_capital = 100000\nstart_date = 2024-01-01\nend_date = 2024-12-31\ncodes = BHP,CBA\n\n[turtle]\ns1_entry = 5\ns1_exit = 3\ns2_entry = 10\ns2_exit = 5\natr_periods = 5\n\n[report]\noutput_dir = {}\n",
            data.path().display(),
            report_dir.display()
        );
        let file = write_temp_ini(&ini);

        let args = Cli::parse_from([
            "turtletrader",
            "backtest",
            "-c",
            file.path().to_str().unwrap(),
        ]);
        assert!(same_code(cli::run(args), ExitCode::SUCCESS));

        assert!(report_dir.join(EQUITY_FILE).exists());
        assert!(report_dir.join(TRANSACTIONS_FILE).exists());
        let summary = fs::read_to_string(report_dir.join(SUMMARY_FILE)).unwrap();
        assert!(summary.starts_with("metric,value\n"));
    }

    #[test]
    fn backtest_command_fails_on_empty_data_dir() {
        let data = tempfile::tempdir().unwrap();
        let ini = format!("[backtest]\ncodes = BHP\n\n[data]\ndir = {}\n", data.path().display());
        let file = write_temp_ini(&ini);
        let out = tempfile::tempdir().unwrap();

        let args = Cli::parse_from([
            "turtletrader",
            "backtest",
            "-c",
            file.path().to_str().unwrap(),
            "-o",
            out.path().to_str().unwrap(),
        ]);
        assert!(same_code(cli::run(args), ExitCode::from(5)));
    }

    #[test]
    fn validate_command_accepts_good_config() {
        let file = write_temp_ini(VALID_INI);
        let args = Cli::parse_from(["turtletrader", "validate", "-c", file.path().to_str().unwrap()]);
        assert!(same_code(cli::run(args), ExitCode::SUCCESS));
    }
}
