//! Trade journal storage port.
//!
//! Every write that fills in a one-time field is conditional on the field
//! still being absent, so concurrent or repeated runs are idempotent without
//! locking. Writes report whether a row actually changed.

use crate::domain::classifier::Evaluation;
use crate::domain::error::TradeEvalError;
use crate::domain::evaluation::EvaluationScope;
use crate::domain::trade::Trade;

pub trait TradeStore {
    /// Trades without an ATR snapshot, newest first.
    fn trades_missing_atr(&self, limit: usize) -> Result<Vec<Trade>, TradeEvalError>;

    fn set_atr_if_null(&self, session_id: &str, atr: f64) -> Result<bool, TradeEvalError>;

    fn set_exit_price_if_null(&self, session_id: &str, price: f64)
        -> Result<bool, TradeEvalError>;

    /// Trades with an exit price, a positive entry price and a positive ATR,
    /// narrowed by `scope`.
    fn evaluable_trades(&self, scope: &EvaluationScope) -> Result<Vec<Trade>, TradeEvalError>;

    /// With `overwrite == false` the write only lands if no result is stored yet.
    fn write_evaluation(
        &self,
        session_id: &str,
        evaluation: &Evaluation,
        overwrite: bool,
    ) -> Result<bool, TradeEvalError>;
}
