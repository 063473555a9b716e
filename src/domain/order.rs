//! Closed broker orders used to reconcile exit prices.

use crate::domain::trade::Side;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClosedOrder {
    pub order_id: String,
    /// Client-assigned id; matches the journal's session id when present.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub client_order_id: Option<String>,
    pub symbol: String,
    pub side: Side,
    pub filled_avg_price: Option<f64>,
    pub filled_at: DateTime<Utc>,
}

impl ClosedOrder {
    /// Sell fills are the ones that close a journal position.
    pub fn closes_position(&self) -> bool {
        self.side == Side::Sell && self.filled_avg_price.is_some()
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn order(side: Side, price: Option<f64>) -> ClosedOrder {
        ClosedOrder {
            order_id: "ord-1".into(),
            client_order_id: Some("sess-1".into()),
            symbol: "MSFT".into(),
            side,
            filled_avg_price: price,
            filled_at: Utc.with_ymd_and_hms(2024, 6, 3, 15, 0, 0).unwrap(),
        }
    }

    #[test]
    fn filled_sell_closes_position() {
        assert!(order(Side::Sell, Some(410.5)).closes_position());
    }

    #[test]
    fn buys_and_unfilled_sells_do_not() {
        assert!(!order(Side::Buy, Some(410.5)).closes_position());
        assert!(!order(Side::Sell, None).closes_position());
    }
}
