//! ATR-at-execution backfill.
//!
//! For each trade without an ATR snapshot, fetch the daily bars leading up
//! to (and including) the trade date, compute the 14-period ATR and store it
//! if the trade still has none.

use crate::domain::atr::{ATR_PERIOD, compute_atr};
use crate::domain::batch::{BatchReport, SkipReason};
use crate::domain::error::{EvalError, TradeEvalError};
use crate::domain::trade::Trade;
use crate::ports::data_port::DataPort;
use crate::ports::trade_store_port::TradeStore;
use chrono::Days;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillOptions {
    /// Calendar days of history fetched before the trade date.
    pub lookback_days: u64,
    /// Maximum trades handled per run.
    pub limit: usize,
}

impl Default for BackfillOptions {
    fn default() -> Self {
        Self {
            lookback_days: 40,
            limit: 500,
        }
    }
}

pub fn backfill_atr(
    store: &dyn TradeStore,
    data: &dyn DataPort,
    options: &BackfillOptions,
) -> Result<BatchReport, TradeEvalError> {
    let trades = store.trades_missing_atr(options.limit)?;
    tracing::info!(count = trades.len(), "trades needing ATR backfill");

    let mut report = BatchReport::default();
    for (i, trade) in trades.iter().enumerate() {
        report.examined += 1;
        tracing::debug!(
            "processing trade {}/{}: {} ({})",
            i + 1,
            trades.len(),
            trade.symbol,
            trade.session_id
        );

        match atr_for_trade(data, trade, options) {
            Ok(atr) => {
                tracing::info!(
                    session_id = %trade.session_id,
                    date = %trade.timestamp.date_naive(),
                    "ATR {:.4}",
                    atr
                );
                report.record_write(store.set_atr_if_null(&trade.session_id, atr)?);
            }
            Err(reason) => {
                tracing::warn!(
                    session_id = %trade.session_id,
                    symbol = %trade.symbol,
                    "skipping: {reason}"
                );
                report.skip(&trade.session_id, reason);
            }
        }
    }
    Ok(report)
}

fn atr_for_trade(
    data: &dyn DataPort,
    trade: &Trade,
    options: &BackfillOptions,
) -> Result<f64, SkipReason> {
    let end = trade.timestamp.date_naive();
    let start = end
        .checked_sub_days(Days::new(options.lookback_days))
        .ok_or_else(|| {
            SkipReason::Invalid(EvalError::precondition(format!(
                "lookback of {} days before {end} is out of range",
                options.lookback_days
            )))
        })?;

    let bars = data
        .fetch_daily_bars(&trade.symbol, start, end)
        .map_err(|e| SkipReason::FetchFailed {
            reason: e.to_string(),
        })?;

    match compute_atr(&bars, ATR_PERIOD) {
        Ok(Some(atr)) if atr > 0.0 => Ok(atr),
        Ok(Some(atr)) => Err(SkipReason::NonPositiveAtr { atr }),
        Ok(None) => Err(SkipReason::InsufficientHistory { bars: bars.len() }),
        Err(e) => Err(SkipReason::Invalid(e)),
    }
}
