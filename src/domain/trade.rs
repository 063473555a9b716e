//! Journal trade records.

use crate::domain::error::EvalError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl FromStr for Side {
    type Err = EvalError;

    /// Only the exact lowercase tokens are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(EvalError::precondition(format!(
                "side must be 'buy' or 'sell', got '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for Side {
    type Error = EvalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeResult {
    Win,
    Lose,
    Hold,
}

impl TradeResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeResult::Win => "WIN",
            TradeResult::Lose => "LOSE",
            TradeResult::Hold => "HOLD",
        }
    }
}

impl FromStr for TradeResult {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WIN" => Ok(TradeResult::Win),
            "LOSE" => Ok(TradeResult::Lose),
            "HOLD" => Ok(TradeResult::Hold),
            other => Err(EvalError::invalid(format!("unknown trade result '{other}'"))),
        }
    }
}

impl fmt::Display for TradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A journal entry keyed by the client-assigned session id, which is also
/// the `client_order_id` of the broker order that opened it.
///
/// `atr_at_execution` and `exit_price` are set once and never overwritten;
/// `result` and `return_pct` may be rewritten by a full re-evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub session_id: String,
    pub symbol: String,
    pub side: Side,
    pub timestamp: DateTime<Utc>,
    pub filled_avg_price: f64,
    pub exit_price: Option<f64>,
    pub atr_at_execution: Option<f64>,
    pub result: Option<TradeResult>,
    pub return_pct: Option<f64>,
}

impl Trade {
    /// A freshly placed trade: nothing backfilled, reconciled or evaluated.
    pub fn opened(
        session_id: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        timestamp: DateTime<Utc>,
        filled_avg_price: f64,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            symbol: symbol.into(),
            side,
            timestamp,
            filled_avg_price,
            exit_price: None,
            atr_at_execution: None,
            result: None,
            return_pct: None,
        }
    }

    pub fn needs_atr(&self) -> bool {
        self.atr_at_execution.is_none()
    }

    /// Exit price known, positive entry and a positive ATR snapshot.
    pub fn is_evaluable(&self) -> bool {
        self.exit_price.is_some()
            && self.filled_avg_price > 0.0
            && self.atr_at_execution.is_some_and(|atr| atr > 0.0)
    }
}
