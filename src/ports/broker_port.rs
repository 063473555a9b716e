//! Broker order history port.

use crate::domain::error::TradeEvalError;
use crate::domain::order::ClosedOrder;
use chrono::{DateTime, Utc};

pub trait BrokerPort {
    /// Orders closed strictly after `after`, most recent first, at most `limit`.
    fn closed_orders(
        &self,
        after: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ClosedOrder>, TradeEvalError>;
}
