//! Exit price reconciliation from broker fills.

use crate::domain::batch::{BatchReport, SkipReason};
use crate::domain::error::{EvalError, TradeEvalError};
use crate::ports::broker_port::BrokerPort;
use crate::ports::trade_store_port::TradeStore;
use chrono::{DateTime, TimeDelta, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Only orders closed within this many days of `as_of` are considered.
    pub lookback_days: i64,
    pub limit: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            lookback_days: 7,
            limit: 500,
        }
    }
}

/// Copy the fill price of recently closed sell orders into the matching
/// trade's `exit_price`, unless it already has one.
pub fn reconcile_exit_prices(
    store: &dyn TradeStore,
    broker: &dyn BrokerPort,
    options: &ReconcileOptions,
    as_of: DateTime<Utc>,
) -> Result<BatchReport, TradeEvalError> {
    let after = TimeDelta::try_days(options.lookback_days)
        .and_then(|window| as_of.checked_sub_signed(window))
        .ok_or_else(|| TradeEvalError::ConfigInvalid {
            section: "reconcile".into(),
            key: "lookback_days".into(),
            reason: format!("{} days is out of range", options.lookback_days),
        })?;
    let orders = broker.closed_orders(after, options.limit)?;
    tracing::info!(count = orders.len(), %after, "fetched closed orders");

    let mut report = BatchReport::default();
    for order in orders.iter().filter(|o| o.closes_position()) {
        report.examined += 1;

        let Some(session_id) = order.client_order_id.as_deref() else {
            tracing::warn!(order_id = %order.order_id, "skipping order without client order id");
            report.skip(&order.order_id, SkipReason::MissingClientOrderId);
            continue;
        };

        let Some(price) = order.filled_avg_price.filter(|p| p.is_finite() && *p > 0.0) else {
            let err = EvalError::invalid(format!(
                "fill price must be positive, got {:?}",
                order.filled_avg_price
            ));
            tracing::warn!(session_id, "skipping: {err}");
            report.skip(session_id, SkipReason::Invalid(err));
            continue;
        };

        let changed = store.set_exit_price_if_null(session_id, price)?;
        if changed {
            tracing::info!(session_id, symbol = %order.symbol, price, "exit price set");
        } else {
            tracing::debug!(session_id, "no update needed (exit price present or unknown session)");
        }
        report.record_write(changed);
    }
    Ok(report)
}
