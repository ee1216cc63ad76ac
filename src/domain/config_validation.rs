//! Configuration validation.
//!
//! Raw INI checks run before a [`BacktestConfig`] is built; `validate_params`
//! re-checks a built record so programmatic construction gets the same
//! guarantees.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::TurtleError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    validate_initial_capital(read_double(config, "backtest", "initial_capital", 10_000.0)?)?;
    validate_risk_free_rate(read_double(config, "backtest", "risk_free_rate", 0.02)?)?;
    validate_dates(config)?;
    validate_codes(config)?;
    Ok(())
}

pub fn validate_turtle_config(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    for key in ["s1_entry", "s1_exit", "s2_entry", "s2_exit", "atr_periods", "unit_limit"] {
        let value = read_int(config, "turtle", key, 1)?;
        if value < 1 {
            return Err(invalid("turtle", key, format!("{key} must be at least 1")));
        }
    }
    validate_risk_level(read_double(config, "turtle", "risk_level", 2.0)?)?;
    validate_r_max(read_double(config, "turtle", "r_max", 0.02)?)?;
    validate_fraction("s1_allocation", read_double(config, "turtle", "s1_allocation", 0.5)?)?;
    validate_fraction(
        "risk_reduction_rate",
        read_double(config, "turtle", "risk_reduction_rate", 0.1)?,
    )?;
    validate_reduction_level(read_double(config, "turtle", "risk_reduction_level", 0.2)?)?;
    read_bool(config, "turtle", "allow_shorting", true)?;
    Ok(())
}

/// `true/yes/on/1` or `false/no/off/0`, case-insensitive.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Like [`ConfigPort::get_double`], but a present value that is not a
/// number is an error instead of the default.
pub fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, TurtleError> {
    match config.get_string(section, key) {
        Some(raw) if raw.trim().parse::<f64>().is_err() => Err(invalid(
            section,
            key,
            format!("{key} is not a number: '{}'", raw.trim()),
        )),
        _ => Ok(config.get_double(section, key, default)),
    }
}

/// Like [`ConfigPort::get_int`], but a present non-integer is an error.
pub fn read_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, TurtleError> {
    match config.get_string(section, key) {
        Some(raw) if raw.trim().parse::<i64>().is_err() => Err(invalid(
            section,
            key,
            format!("{key} is not an integer: '{}'", raw.trim()),
        )),
        _ => Ok(config.get_int(section, key, default)),
    }
}

/// Like [`ConfigPort::get_bool`], but an unrecognised spelling is an error.
pub fn read_bool(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: bool,
) -> Result<bool, TurtleError> {
    match config.get_string(section, key) {
        Some(raw) if parse_bool(&raw).is_none() => Err(invalid(
            section,
            key,
            format!("{key} is not a boolean: '{}'", raw.trim()),
        )),
        _ => Ok(config.get_bool(section, key, default)),
    }
}

/// Checks on an already built configuration record.
pub fn validate_params(config: &BacktestConfig) -> Result<(), TurtleError> {
    validate_initial_capital(config.initial_capital)?;
    validate_risk_free_rate(config.risk_free_rate)?;
    if config.start_date >= config.end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date".to_string(),
        ));
    }
    let windows = [
        ("s1_entry", config.s1.entry),
        ("s1_exit", config.s1.exit),
        ("s2_entry", config.s2.entry),
        ("s2_exit", config.s2.exit),
        ("atr_periods", config.atr_periods),
    ];
    for (key, value) in windows {
        if value < 1 {
            return Err(invalid("turtle", key, format!("{key} must be at least 1")));
        }
    }
    if config.unit_limit < 1 {
        return Err(invalid(
            "turtle",
            "unit_limit",
            "unit_limit must be at least 1".to_string(),
        ));
    }
    validate_risk_level(config.risk_level)?;
    validate_r_max(config.r_max)?;
    validate_fraction("s1_allocation", config.s1_allocation)?;
    validate_fraction("risk_reduction_rate", config.risk_reduction_rate)?;
    validate_reduction_level(config.risk_reduction_level)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: String) -> TurtleError {
    TurtleError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    }
}

fn validate_initial_capital(value: f64) -> Result<(), TurtleError> {
    if !(value > 0.0 && value.is_finite()) {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive".to_string(),
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(value: f64) -> Result<(), TurtleError> {
    if !value.is_finite() {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be a finite number".to_string(),
        ));
    }
    Ok(())
}

fn validate_risk_level(value: f64) -> Result<(), TurtleError> {
    if !(value > 0.0 && value.is_finite()) {
        return Err(invalid(
            "turtle",
            "risk_level",
            "risk_level must be positive".to_string(),
        ));
    }
    Ok(())
}

fn validate_r_max(value: f64) -> Result<(), TurtleError> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(invalid(
            "turtle",
            "r_max",
            "r_max must be in (0, 1]".to_string(),
        ));
    }
    Ok(())
}

fn validate_fraction(key: &str, value: f64) -> Result<(), TurtleError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid("turtle", key, format!("{key} must be between 0 and 1")));
    }
    Ok(())
}

fn validate_reduction_level(value: f64) -> Result<(), TurtleError> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(invalid(
            "turtle",
            "risk_reduction_level",
            "risk_reduction_level must be in (0, 1]".to_string(),
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let start_date = parse_date(config.get_string("backtest", "start_date").as_deref(), "start_date")?;
    let end_date = parse_date(config.get_string("backtest", "end_date").as_deref(), "end_date")?;

    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start >= end {
            return Err(invalid(
                "backtest",
                "start_date",
                "start_date must be before end_date".to_string(),
            ));
        }
    }
    Ok(())
}

/// Absent dates fall back to defaults; present ones must parse.
fn parse_date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, TurtleError> {
    match value {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                invalid(
                    "backtest",
                    field,
                    format!("invalid {} format, expected YYYY-MM-DD", field),
                )
            }),
    }
}

fn validate_codes(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let codes = config.get_string("backtest", "codes");
    let code = config.get_string("backtest", "code");

    match (codes, code) {
        (Some(c), _) if !c.trim().is_empty() => Ok(()),
        (_, Some(c)) if !c.trim().is_empty() => Ok(()),
        _ => Err(TurtleError::ConfigMissing {
            section: "backtest".to_string(),
            key: "codes".to_string(),
        }),
    }
}
