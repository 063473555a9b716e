//! Configuration validation.
//!
//! Runs before any workflow touches the store so a bad multiplier never
//! reaches the classifier.

use crate::domain::atr::ATR_PERIOD;
use crate::domain::error::TradeEvalError;
use crate::ports::config_port::ConfigPort;

/// Upper bound for any `lookback_days` setting (ten years).
pub const MAX_LOOKBACK_DAYS: i64 = 3650;
/// Upper bound for `[evaluation] min_age_hours` (one year).
pub const MAX_MIN_AGE_HOURS: i64 = 24 * 365;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TradeEvalError> {
    validate_data_source(config)?;
    validate_backfill(config)?;
    validate_reconcile(config)?;
    validate_evaluation(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TradeEvalError {
    TradeEvalError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_data_source(config: &dyn ConfigPort) -> Result<(), TradeEvalError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "sqlite".to_string());
    match source.trim() {
        "sqlite" => Ok(()),
        "csv" => config.require_string("data", "csv_dir").map(|_| ()),
        other => Err(invalid(
            "data",
            "source",
            format!("unknown data source '{other}', expected sqlite or csv"),
        )),
    }
}

fn validate_backfill(config: &dyn ConfigPort) -> Result<(), TradeEvalError> {
    let lookback = config.get_int("backfill", "lookback_days", 40);
    if lookback <= ATR_PERIOD as i64 {
        return Err(invalid(
            "backfill",
            "lookback_days",
            format!("lookback_days must exceed the ATR period ({ATR_PERIOD})"),
        ));
    }
    if lookback > MAX_LOOKBACK_DAYS {
        return Err(invalid(
            "backfill",
            "lookback_days",
            format!("lookback_days must be at most {MAX_LOOKBACK_DAYS}"),
        ));
    }
    if config.get_int("backfill", "limit", 500) <= 0 {
        return Err(invalid("backfill", "limit", "limit must be positive"));
    }
    Ok(())
}

fn validate_reconcile(config: &dyn ConfigPort) -> Result<(), TradeEvalError> {
    let lookback = config.get_int("reconcile", "lookback_days", 7);
    if lookback <= 0 || lookback > MAX_LOOKBACK_DAYS {
        return Err(invalid(
            "reconcile",
            "lookback_days",
            format!("lookback_days must be between 1 and {MAX_LOOKBACK_DAYS}"),
        ));
    }
    if config.get_int("reconcile", "limit", 500) <= 0 {
        return Err(invalid("reconcile", "limit", "limit must be positive"));
    }
    Ok(())
}

fn validate_evaluation(config: &dyn ConfigPort) -> Result<(), TradeEvalError> {
    for (key, default) in [("win_multiplier", 2.0), ("lose_multiplier", 1.5)] {
        let value = config.get_double("evaluation", key, default);
        if !(value.is_finite() && value > 0.0) {
            return Err(invalid(
                "evaluation",
                key,
                format!("{key} must be positive"),
            ));
        }
    }
    let min_age = config.get_int("evaluation", "min_age_hours", 24);
    if !(0..=MAX_MIN_AGE_HOURS).contains(&min_age) {
        return Err(invalid(
            "evaluation",
            "min_age_hours",
            format!("min_age_hours must be between 0 and {MAX_MIN_AGE_HOURS}"),
        ));
    }
    Ok(())
}
