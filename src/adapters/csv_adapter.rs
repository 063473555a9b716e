//! CSV file adapters: daily bars, broker fill exports and journal imports.

use crate::domain::error::TradeEvalError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::order::ClosedOrder;
use crate::domain::trade::{Side, Trade};
use crate::ports::broker_port::BrokerPort;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, TradeEvalError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| TradeEvalError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

    rdr.deserialize()
        .enumerate()
        .map(|(i, row)| {
            row.map_err(|e| TradeEvalError::DataSource {
                reason: format!("{} row {}: {}", path.display(), i + 1, e),
            })
        })
        .collect()
}

/// One `<SYMBOL>.csv` per symbol under `base_path`, columns
/// `date,open,high,low,close[,volume]`.
pub struct CsvBarAdapter {
    base_path: PathBuf,
}

impl CsvBarAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol.to_uppercase()))
    }
}

impl DataPort for CsvBarAdapter {
    fn fetch_daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TradeEvalError> {
        let mut bars: Vec<OhlcvBar> = read_records::<OhlcvBar>(&self.csv_path(symbol))?
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .map(|mut b| {
                b.symbol = symbol.to_string();
                b
            })
            .collect();

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

/// Broker closed-order export, columns
/// `order_id,client_order_id,symbol,side,filled_avg_price,filled_at`.
pub struct CsvOrderAdapter {
    path: PathBuf,
}

impl CsvOrderAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl BrokerPort for CsvOrderAdapter {
    fn closed_orders(
        &self,
        after: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ClosedOrder>, TradeEvalError> {
        let mut orders: Vec<ClosedOrder> = read_records::<ClosedOrder>(&self.path)?
            .into_iter()
            .filter(|o| o.filled_at > after)
            .collect();

        orders.sort_by(|a, b| b.filled_at.cmp(&a.filled_at));
        orders.truncate(limit);
        Ok(orders)
    }
}

#[derive(Debug, Deserialize)]
struct TradeRecord {
    session_id: String,
    symbol: String,
    side: Side,
    timestamp: DateTime<Utc>,
    filled_avg_price: f64,
    exit_price: Option<f64>,
    atr_at_execution: Option<f64>,
}

/// Journal export, columns
/// `session_id,symbol,side,timestamp,filled_avg_price[,exit_price][,atr_at_execution]`.
///
/// Results are never imported; they are always derived by evaluation.
pub fn read_trades(path: &Path) -> Result<Vec<Trade>, TradeEvalError> {
    Ok(read_records::<TradeRecord>(path)?
        .into_iter()
        .map(|r| {
            let mut trade = Trade::opened(
                r.session_id,
                r.symbol.to_uppercase(),
                r.side,
                r.timestamp,
                r.filled_avg_price,
            );
            trade.exit_price = r.exit_price;
            trade.atr_at_execution = r.atr_at_execution;
            trade
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn bars_filtered_sorted_and_tagged() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("AAPL.csv"),
            "date,open,high,low,close,volume\n\
             2024-01-03,101,103,100,102,1200\n\
             2024-01-01,99,101,98,100,1000\n\
             2024-01-02,100,102,99,101,1100\n\
             2024-01-04,102,104,101,103,1300\n",
        )
        .unwrap();

        let adapter = CsvBarAdapter::new(dir.path().to_path_buf());
        let bars = adapter
            .fetch_daily_bars("aapl", date(2024, 1, 1), date(2024, 1, 3))
            .unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, date(2024, 1, 1));
        assert_eq!(bars[2].date, date(2024, 1, 3));
        assert_eq!(bars[1].symbol, "aapl");
        assert_eq!(bars[2].close, 102.0);
    }

    #[test]
    fn volume_column_is_optional() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("SPY.csv"),
            "date,open,high,low,close\n2024-01-02,470,472,468,471\n",
        )
        .unwrap();
        let adapter = CsvBarAdapter::new(dir.path().to_path_buf());
        let bars = adapter
            .fetch_daily_bars("SPY", date(2024, 1, 1), date(2024, 1, 31))
            .unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].volume, 0);
    }

    #[test]
    fn missing_bar_file_is_data_source_error() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvBarAdapter::new(dir.path().to_path_buf());
        let err = adapter
            .fetch_daily_bars("NONE", date(2024, 1, 1), date(2024, 1, 31))
            .unwrap_err();
        assert!(matches!(err, TradeEvalError::DataSource { .. }));
    }

    #[test]
    fn malformed_bar_row_reports_row() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("BAD.csv"),
            "date,open,high,low,close\n2024-01-02,1,2,abc,1\n",
        )
        .unwrap();
        let adapter = CsvBarAdapter::new(dir.path().to_path_buf());
        match adapter.fetch_daily_bars("BAD", date(2024, 1, 1), date(2024, 1, 31)) {
            Err(TradeEvalError::DataSource { reason }) => assert!(reason.contains("row 1")),
            other => panic!("expected DataSource error, got {other:?}"),
        }
    }

    const ORDERS: &str = "order_id,client_order_id,symbol,side,filled_avg_price,filled_at\n\
        o1,sess-1,AAPL,sell,190.25,2024-06-03T15:00:00Z\n\
        o2,,MSFT,sell,410.00,2024-06-04T15:00:00Z\n\
        o3,sess-3,NVDA,buy,120.50,2024-06-05T15:00:00Z\n\
        o4,sess-4,TSLA,sell,,2024-06-06T15:00:00Z\n\
        o5,sess-5,AMD,sell,150.00,2024-05-01T15:00:00Z\n";

    #[test]
    fn orders_filtered_newest_first() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(&path, ORDERS).unwrap();

        let adapter = CsvOrderAdapter::new(path);
        let after = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let orders = adapter.closed_orders(after, 10).unwrap();

        let ids: Vec<&str> = orders.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["o4", "o3", "o2", "o1"]);
        assert_eq!(orders[2].client_order_id, None);
        assert_eq!(orders[0].filled_avg_price, None);
        assert_eq!(orders[1].side, Side::Buy);
    }

    #[test]
    fn orders_respect_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(&path, ORDERS).unwrap();

        let adapter = CsvOrderAdapter::new(path);
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let orders = adapter.closed_orders(after, 2).unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_id, "o4");
    }

    #[test]
    fn order_with_bad_side_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(
            &path,
            "order_id,client_order_id,symbol,side,filled_avg_price,filled_at\n\
             o1,s1,AAPL,short,1.0,2024-06-03T15:00:00Z\n",
        )
        .unwrap();
        let adapter = CsvOrderAdapter::new(path);
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(adapter.closed_orders(after, 10).is_err());
    }

    #[test]
    fn trades_import_with_optional_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trades.csv");
        fs::write(
            &path,
            "session_id,symbol,side,timestamp,filled_avg_price,exit_price,atr_at_execution\n\
             s1,aapl,buy,2024-06-03T14:30:00Z,100.0,,\n\
             s2,MSFT,sell,2024-06-04T14:30:00Z,400.0,395.5,6.25\n",
        )
        .unwrap();

        let trades = read_trades(&path).unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].symbol, "AAPL");
        assert_eq!(trades[0].exit_price, None);
        assert_eq!(trades[0].atr_at_execution, None);
        assert_eq!(trades[1].side, Side::Sell);
        assert_eq!(trades[1].exit_price, Some(395.5));
        assert_eq!(trades[1].atr_at_execution, Some(6.25));
        assert_eq!(trades[1].result, None);
    }
}
