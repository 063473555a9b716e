#![allow(dead_code)]

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use std::cell::RefCell;
use std::collections::HashMap;
use tradeeval::adapters::sqlite_adapter::SqliteAdapter;
use tradeeval::domain::error::TradeEvalError;
pub use tradeeval::domain::ohlcv::OhlcvBar;
use tradeeval::domain::order::ClosedOrder;
use tradeeval::domain::trade::{Side, Trade};
use tradeeval::ports::broker_port::BrokerPort;
use tradeeval::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
    pub requests: RefCell<Vec<(String, NaiveDate, NaiveDate)>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TradeEvalError> {
        self.requests
            .borrow_mut()
            .push((symbol.to_string(), start, end));
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TradeEvalError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start && b.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

pub struct MockBroker {
    pub orders: Vec<ClosedOrder>,
    pub fail: bool,
}

impl MockBroker {
    pub fn new(orders: Vec<ClosedOrder>) -> Self {
        Self {
            orders,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            orders: Vec::new(),
            fail: true,
        }
    }
}

impl BrokerPort for MockBroker {
    fn closed_orders(
        &self,
        after: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ClosedOrder>, TradeEvalError> {
        if self.fail {
            return Err(TradeEvalError::DataSource {
                reason: "broker unavailable".into(),
            });
        }
        let mut orders: Vec<ClosedOrder> = self
            .orders
            .iter()
            .filter(|o| o.filled_at > after)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.filled_at.cmp(&a.filled_at));
        orders.truncate(limit);
        Ok(orders)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn make_bar(symbol: &str, date: NaiveDate, high: f64, low: f64, close: f64) -> OhlcvBar {
    OhlcvBar {
        symbol: symbol.to_string(),
        date,
        open: close,
        high,
        low,
        close,
        volume: 1_000,
    }
}

/// `count` consecutive daily bars ending on `last`, each spanning
/// `close - half_range ..= close + half_range` around a constant close.
/// The resulting ATR is exactly `2 * half_range`.
pub fn flat_bars(
    symbol: &str,
    last: NaiveDate,
    count: usize,
    close: f64,
    half_range: f64,
) -> Vec<OhlcvBar> {
    (0..count)
        .rev()
        .map(|back| {
            let d = last.checked_sub_days(Days::new(back as u64)).unwrap();
            make_bar(symbol, d, close + half_range, close - half_range, close)
        })
        .collect()
}

pub fn open_trade(id: &str, symbol: &str, side: Side, at: DateTime<Utc>, entry: f64) -> Trade {
    Trade::opened(id, symbol, side, at, entry)
}

pub fn closed_trade(
    id: &str,
    side: Side,
    at: DateTime<Utc>,
    entry: f64,
    exit: f64,
    atr: f64,
) -> Trade {
    let mut trade = Trade::opened(id, "AAPL", side, at, entry);
    trade.exit_price = Some(exit);
    trade.atr_at_execution = Some(atr);
    trade
}

pub fn sell_order(
    order_id: &str,
    session: Option<&str>,
    price: Option<f64>,
    at: DateTime<Utc>,
) -> ClosedOrder {
    ClosedOrder {
        order_id: order_id.to_string(),
        client_order_id: session.map(str::to_string),
        symbol: "AAPL".to_string(),
        side: Side::Sell,
        filled_avg_price: price,
        filled_at: at,
    }
}

pub fn seeded_store(trades: &[Trade]) -> SqliteAdapter {
    let store = SqliteAdapter::in_memory().unwrap();
    store.initialize_schema().unwrap();
    store.insert_trades(trades).unwrap();
    store
}
