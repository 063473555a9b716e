//! Historical price data port.

use crate::domain::error::TradeEvalError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily bars for `symbol` with `start <= date <= end`, oldest first.
    fn fetch_daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TradeEvalError>;
}
