//! Per-run outcome of a batch workflow.
//!
//! Workflows never abort on a single bad trade; each one that could not be
//! processed lands in `skipped` with its reason.

use crate::domain::error::EvalError;
use std::fmt;

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub examined: usize,
    /// Rows whose target field actually changed.
    pub updated: usize,
    /// Conditional writes that matched no row (already set or unknown id).
    pub unchanged: usize,
    pub skipped: Vec<SkippedTrade>,
}

impl BatchReport {
    pub fn skip(&mut self, id: impl Into<String>, reason: SkipReason) {
        self.skipped.push(SkippedTrade {
            id: id.into(),
            reason,
        });
    }

    pub(crate) fn record_write(&mut self, changed: bool) {
        if changed {
            self.updated += 1;
        } else {
            self.unchanged += 1;
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkippedTrade {
    /// Session id, or the broker order id when no session id is known.
    pub id: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    InsufficientHistory { bars: usize },
    NonPositiveAtr { atr: f64 },
    FetchFailed { reason: String },
    MissingClientOrderId,
    Invalid(EvalError),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientHistory { bars } => {
                write!(f, "insufficient history ({bars} bars)")
            }
            SkipReason::NonPositiveAtr { atr } => write!(f, "non-positive ATR {atr:.4}"),
            SkipReason::FetchFailed { reason } => write!(f, "fetch failed: {reason}"),
            SkipReason::MissingClientOrderId => write!(f, "order has no client order id"),
            SkipReason::Invalid(err) => write!(f, "{err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_write_splits_counts() {
        let mut report = BatchReport::default();
        report.record_write(true);
        report.record_write(false);
        report.record_write(true);
        assert_eq!(report.updated, 2);
        assert_eq!(report.unchanged, 1);
    }

    #[test]
    fn skip_reason_display() {
        assert_eq!(
            SkipReason::InsufficientHistory { bars: 9 }.to_string(),
            "insufficient history (9 bars)"
        );
        assert_eq!(
            SkipReason::Invalid(EvalError::invalid("ATR must be positive")).to_string(),
            "invalid input: ATR must be positive"
        );
    }
}
