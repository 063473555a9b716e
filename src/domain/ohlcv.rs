//! Daily OHLCV bar representation.

use chrono::NaiveDate;
use serde::Deserialize;

/// One trading day for a symbol. Series are ordered oldest to newest.
///
/// Upstream data may violate `low <= open/close <= high`; nothing here
/// validates that.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OhlcvBar {
    #[serde(default)]
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: i64,
}

impl OhlcvBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// High, low and close are all finite. Open is not part of the true range.
    pub fn has_finite_range(&self) -> bool {
        self.high.is_finite() && self.low.is_finite() && self.close.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bar(high: f64, low: f64, close: f64) -> OhlcvBar {
        OhlcvBar {
            symbol: "SPY".into(),
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 75_000,
        }
    }

    #[test]
    fn true_range_takes_widest_span() {
        // (high, low, prev_close, expected)
        let cases = [
            (101.0, 99.0, 100.0, 2.0),
            (104.0, 102.5, 100.0, 4.0),
            (97.0, 95.5, 100.0, 4.5),
            (100.0, 100.0, 100.0, 0.0),
        ];
        for (high, low, prev_close, expected) in cases {
            let tr = bar(high, low, (high + low) / 2.0).true_range(prev_close);
            assert_relative_eq!(tr, expected);
        }
    }

    #[test]
    fn true_range_tolerates_inverted_bar() {
        // low above high; only the distances to the previous close count
        let tr = bar(99.0, 101.0, 100.0).true_range(100.0);
        assert_relative_eq!(tr, 1.0);
    }

    #[test]
    fn finite_range_ignores_open() {
        let mut b = bar(101.0, 99.0, 100.0);
        b.open = f64::NAN;
        assert!(b.has_finite_range());

        b.close = f64::INFINITY;
        assert!(!b.has_finite_range());
    }

    #[test]
    fn nan_low_is_not_finite() {
        let mut b = bar(101.0, 99.0, 100.0);
        b.low = f64::NAN;
        assert!(!b.has_finite_range());
    }
}
