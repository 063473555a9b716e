//! Batch classification of closed trades.

use crate::domain::batch::{BatchReport, SkipReason};
use crate::domain::classifier::{Evaluation, Thresholds, classify};
use crate::domain::error::{EvalError, TradeEvalError};
use crate::domain::trade::Trade;
use crate::ports::trade_store_port::TradeStore;
use chrono::{DateTime, TimeDelta, Utc};

/// Which evaluable trades a run touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationScope {
    /// Unclassified trades placed before the cutoff; never overwrites.
    Pending { placed_before: DateTime<Utc> },
    /// Every evaluable trade; replaces earlier results.
    All,
}

impl EvaluationScope {
    /// Pending scope for trades at least `min_age_hours` old at `as_of`.
    ///
    /// An age the calendar cannot represent is a `ConfigInvalid` on
    /// `[evaluation] min_age_hours`.
    pub fn pending(as_of: DateTime<Utc>, min_age_hours: i64) -> Result<Self, TradeEvalError> {
        let placed_before = TimeDelta::try_hours(min_age_hours)
            .and_then(|age| as_of.checked_sub_signed(age))
            .ok_or_else(|| TradeEvalError::ConfigInvalid {
                section: "evaluation".into(),
                key: "min_age_hours".into(),
                reason: format!("{min_age_hours} hours is out of range"),
            })?;
        Ok(EvaluationScope::Pending { placed_before })
    }

    pub fn overwrites(&self) -> bool {
        matches!(self, EvaluationScope::All)
    }
}

pub fn evaluate_trades(
    store: &dyn TradeStore,
    thresholds: &Thresholds,
    scope: &EvaluationScope,
) -> Result<BatchReport, TradeEvalError> {
    let trades = store.evaluable_trades(scope)?;
    tracing::info!(
        count = trades.len(),
        win_multiplier = thresholds.win_multiplier,
        lose_multiplier = thresholds.lose_multiplier,
        full = scope.overwrites(),
        "evaluating trades"
    );

    let mut report = BatchReport::default();
    for trade in &trades {
        report.examined += 1;
        let evaluation = match evaluate_one(trade, thresholds) {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(session_id = %trade.session_id, "not evaluable: {err}");
                report.skip(&trade.session_id, SkipReason::Invalid(err));
                continue;
            }
        };
        tracing::debug!(
            session_id = %trade.session_id,
            result = %evaluation.result,
            return_pct = evaluation.return_pct,
            "classified"
        );
        report.record_write(store.write_evaluation(
            &trade.session_id,
            &evaluation,
            scope.overwrites(),
        )?);
    }
    Ok(report)
}

fn evaluate_one(trade: &Trade, thresholds: &Thresholds) -> Result<Evaluation, EvalError> {
    let exit = trade
        .exit_price
        .ok_or_else(|| EvalError::invalid("exit price missing"))?;
    let atr = trade
        .atr_at_execution
        .ok_or_else(|| EvalError::invalid("ATR at execution missing"))?;
    classify(trade.side, trade.filled_avg_price, exit, atr, thresholds)
}
