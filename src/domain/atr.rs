//! Average True Range with Wilder's smoothing.
//!
//! True Range is defined from the second bar onward, so a series of `n` bars
//! yields `n - 1` samples. The samples are smoothed with an exponential
//! average of factor `α = 1/period` seeded with the first sample:
//!
//! ```text
//! atr[0] = tr[0]
//! atr[i] = α·tr[i] + (1 − α)·atr[i−1]
//! ```
//!
//! The value is only defined once `period + 1` bars are available. Shorter
//! histories yield `None`, never zero.

use crate::domain::error::EvalError;
use crate::domain::ohlcv::OhlcvBar;

/// The single supported smoothing period.
pub const ATR_PERIOD: usize = 14;

/// True Range samples for bars `1..len`.
pub fn true_ranges(bars: &[OhlcvBar]) -> Vec<f64> {
    true_range_samples(bars).collect()
}

fn true_range_samples(bars: &[OhlcvBar]) -> impl Iterator<Item = f64> + '_ {
    bars.windows(2).map(|pair| pair[1].true_range(pair[0].close))
}

/// Full smoothed series over `samples`, same length as the input.
pub fn wilder_smooth(samples: &[f64], period: usize) -> Vec<f64> {
    let alpha = smoothing_factor(period);
    let mut series = Vec::with_capacity(samples.len());
    let mut iter = samples.iter().copied();
    if let Some(first) = iter.next() {
        series.push(first);
        let mut atr = first;
        for tr in iter {
            atr = step(alpha, atr, tr);
            series.push(atr);
        }
    }
    series
}

/// ATR as of the last bar.
///
/// Returns `Ok(None)` when fewer than `period + 1` bars are available,
/// `Err(PreconditionViolation)` for a zero period and `Err(InvalidInput)` if
/// any bar carries a non-finite high, low or close.
pub fn compute_atr(bars: &[OhlcvBar], period: usize) -> Result<Option<f64>, EvalError> {
    if !check_series(bars, period)? {
        return Ok(None);
    }

    let alpha = smoothing_factor(period);
    let mut samples = true_range_samples(bars);
    let atr = samples
        .next()
        .map(|first| samples.fold(first, |atr, tr| step(alpha, atr, tr)));
    Ok(atr)
}

/// Every intermediate ATR value, for inspection. Same validation as
/// [`compute_atr`]; `Ok(None)` on insufficient history.
pub fn atr_series(bars: &[OhlcvBar], period: usize) -> Result<Option<Vec<f64>>, EvalError> {
    if !check_series(bars, period)? {
        return Ok(None);
    }
    Ok(Some(wilder_smooth(&true_ranges(bars), period)))
}

fn smoothing_factor(period: usize) -> f64 {
    1.0 / period as f64
}

fn step(alpha: f64, prev: f64, tr: f64) -> f64 {
    alpha * tr + (1.0 - alpha) * prev
}

// Ok(false) means insufficient history.
fn check_series(bars: &[OhlcvBar], period: usize) -> Result<bool, EvalError> {
    if period == 0 {
        return Err(EvalError::precondition("ATR period must be positive"));
    }
    // at least period + 1 bars
    if bars.len() <= period {
        return Ok(false);
    }
    if let Some((index, bar)) = bars.iter().enumerate().find(|(_, b)| !b.has_finite_range()) {
        return Err(EvalError::invalid(format!(
            "non-finite price in bar {index} ({} {})",
            bar.symbol, bar.date
        )));
    }
    Ok(true)
}
