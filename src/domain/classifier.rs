//! Volatility-normalized trade classification.
//!
//! A trade's favourable move is measured in ATR units. `WIN` needs a move of
//! at least `win_multiplier` ATRs in the trade's direction, `LOSE` an adverse
//! move of at least `lose_multiplier` ATRs; everything in between is `HOLD`.
//!
//! `return_pct` is always taken from the raw price change, so a sell whose
//! price rose reports a positive return even though it classifies against
//! the trade. Historical rows were produced this way.

use crate::domain::error::EvalError;
use crate::domain::trade::{Side, TradeResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub win_multiplier: f64,
    pub lose_multiplier: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            win_multiplier: 2.0,
            lose_multiplier: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub result: TradeResult,
    pub return_pct: f64,
}

/// Price change in the trade's favour.
pub fn signed_move(side: Side, entry_price: f64, exit_price: f64) -> f64 {
    match side {
        Side::Buy => exit_price - entry_price,
        Side::Sell => entry_price - exit_price,
    }
}

/// Raw percentage change from entry to exit, rounded half away from zero to
/// two decimals.
pub fn return_pct(entry_price: f64, exit_price: f64) -> f64 {
    let pct = (exit_price - entry_price) / entry_price * 100.0;
    (pct * 100.0).round() / 100.0
}

pub fn classify(
    side: Side,
    entry_price: f64,
    exit_price: f64,
    atr: f64,
    thresholds: &Thresholds,
) -> Result<Evaluation, EvalError> {
    check_thresholds(thresholds)?;
    if !(entry_price.is_finite() && entry_price > 0.0) {
        return Err(EvalError::invalid(format!(
            "entry price must be positive, got {entry_price}"
        )));
    }
    if !(exit_price.is_finite() && exit_price > 0.0) {
        return Err(EvalError::invalid(format!(
            "exit price must be positive, got {exit_price}"
        )));
    }
    if !(atr.is_finite() && atr > 0.0) {
        return Err(EvalError::invalid(format!("ATR must be positive, got {atr}")));
    }

    let moved = signed_move(side, entry_price, exit_price);
    let result = if moved >= atr * thresholds.win_multiplier {
        TradeResult::Win
    } else if moved <= -(atr * thresholds.lose_multiplier) {
        TradeResult::Lose
    } else {
        TradeResult::Hold
    };

    Ok(Evaluation {
        result,
        return_pct: return_pct(entry_price, exit_price),
    })
}

fn check_thresholds(thresholds: &Thresholds) -> Result<(), EvalError> {
    for (name, value) in [
        ("win_multiplier", thresholds.win_multiplier),
        ("lose_multiplier", thresholds.lose_multiplier),
    ] {
        if !(value.is_finite() && value > 0.0) {
            return Err(EvalError::precondition(format!(
                "{name} must be positive, got {value}"
            )));
        }
    }
    Ok(())
}
