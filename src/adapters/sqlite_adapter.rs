//! SQLite trade journal and bar store.
//!
//! One-time fields are filled with conditional updates
//! (`... WHERE <col> IS NULL`); the affected row count tells the caller
//! whether the write landed.

use crate::domain::classifier::Evaluation;
use crate::domain::error::TradeEvalError;
use crate::domain::evaluation::EvaluationScope;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::trade::{Side, Trade, TradeResult};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::trade_store_port::TradeStore;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Row, params};

const TRADE_COLUMNS: &str = "session_id, symbol, side, timestamp, filled_avg_price, \
                             exit_price, atr_at_execution, result, return_pct";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn db_err(e: r2d2::Error) -> TradeEvalError {
    TradeEvalError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> TradeEvalError {
    TradeEvalError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn conversion_err<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

/// RFC 3339 UTC with whole seconds, so text order is chronological.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<Trade> {
    let side: String = row.get(2)?;
    let side = side.parse::<Side>().map_err(|e| conversion_err(2, e))?;

    let ts: String = row.get(3)?;
    let timestamp = DateTime::parse_from_rfc3339(&ts)
        .map_err(|e| conversion_err(3, e))?
        .with_timezone(&Utc);

    let result = row
        .get::<_, Option<String>>(7)?
        .map(|r| r.parse::<TradeResult>())
        .transpose()
        .map_err(|e| conversion_err(7, e))?;

    Ok(Trade {
        session_id: row.get(0)?,
        symbol: row.get(1)?,
        side,
        timestamp,
        filled_avg_price: row.get(4)?,
        exit_price: row.get(5)?,
        atr_at_execution: row.get(6)?,
        result,
        return_pct: row.get(8)?,
    })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TradeEvalError> {
        let db_path = config.require_string("sqlite", "path")?;
        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_err)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, TradeEvalError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(db_err)?;
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, TradeEvalError> {
        self.pool.get().map_err(db_err)
    }

    pub fn initialize_schema(&self) -> Result<(), TradeEvalError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS trades (
                    session_id TEXT PRIMARY KEY,
                    symbol TEXT NOT NULL,
                    side TEXT NOT NULL CHECK (side IN ('buy', 'sell')),
                    timestamp TEXT NOT NULL,
                    filled_avg_price REAL NOT NULL,
                    exit_price REAL,
                    atr_at_execution REAL,
                    result TEXT CHECK (result IN ('WIN', 'LOSE', 'HOLD')),
                    return_pct REAL
                );
                CREATE INDEX IF NOT EXISTS idx_trades_timestamp ON trades(timestamp);
                CREATE TABLE IF NOT EXISTS ohlcv (
                    symbol TEXT NOT NULL,
                    date TEXT NOT NULL,
                    open REAL NOT NULL,
                    high REAL NOT NULL,
                    low REAL NOT NULL,
                    close REAL NOT NULL,
                    volume INTEGER NOT NULL,
                    PRIMARY KEY (symbol, date)
                );",
            )
            .map_err(query_err)
    }

    /// Upsert bars keyed by (symbol, date).
    pub fn insert_bars(&self, bars: &[OhlcvBar]) -> Result<(), TradeEvalError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO ohlcv (symbol, date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    bar.symbol,
                    format_date(bar.date),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)
    }

    /// Insert journal rows. Existing session ids are left untouched; returns
    /// the number of rows added.
    pub fn insert_trades(&self, trades: &[Trade]) -> Result<usize, TradeEvalError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        let mut inserted = 0;
        for trade in trades {
            inserted += tx
                .execute(
                    "INSERT OR IGNORE INTO trades
                     (session_id, symbol, side, timestamp, filled_avg_price,
                      exit_price, atr_at_execution, result, return_pct)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        trade.session_id,
                        trade.symbol,
                        trade.side.as_str(),
                        format_timestamp(&trade.timestamp),
                        trade.filled_avg_price,
                        trade.exit_price,
                        trade.atr_at_execution,
                        trade.result.map(|r| r.as_str()),
                        trade.return_pct
                    ],
                )
                .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)?;
        Ok(inserted)
    }

    pub fn get_trade(&self, session_id: &str) -> Result<Option<Trade>, TradeEvalError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {TRADE_COLUMNS} FROM trades WHERE session_id = ?1"
            ))
            .map_err(query_err)?;
        let mut rows = stmt
            .query_map(params![session_id], trade_from_row)
            .map_err(query_err)?;
        rows.next().transpose().map_err(query_err)
    }

    fn query_trades(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Trade>, TradeEvalError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(query_err)?;
        let rows = stmt.query_map(params, trade_from_row).map_err(query_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(query_err)
    }

    fn execute(&self, sql: &str, params: impl rusqlite::Params) -> Result<bool, TradeEvalError> {
        let changed = self.conn()?.execute(sql, params).map_err(query_err)?;
        Ok(changed > 0)
    }
}

impl TradeStore for SqliteAdapter {
    fn trades_missing_atr(&self, limit: usize) -> Result<Vec<Trade>, TradeEvalError> {
        self.query_trades(
            &format!(
                "SELECT {TRADE_COLUMNS} FROM trades
                 WHERE atr_at_execution IS NULL
                 ORDER BY timestamp DESC
                 LIMIT ?1"
            ),
            params![limit as i64],
        )
    }

    fn set_atr_if_null(&self, session_id: &str, atr: f64) -> Result<bool, TradeEvalError> {
        self.execute(
            "UPDATE trades SET atr_at_execution = ?1
             WHERE session_id = ?2 AND atr_at_execution IS NULL",
            params![atr, session_id],
        )
    }

    fn set_exit_price_if_null(
        &self,
        session_id: &str,
        price: f64,
    ) -> Result<bool, TradeEvalError> {
        self.execute(
            "UPDATE trades SET exit_price = ?1
             WHERE session_id = ?2 AND exit_price IS NULL",
            params![price, session_id],
        )
    }

    fn evaluable_trades(&self, scope: &EvaluationScope) -> Result<Vec<Trade>, TradeEvalError> {
        let base = format!(
            "SELECT {TRADE_COLUMNS} FROM trades
             WHERE exit_price IS NOT NULL
               AND filled_avg_price > 0
               AND atr_at_execution IS NOT NULL
               AND atr_at_execution > 0"
        );
        match scope {
            EvaluationScope::Pending { placed_before } => self.query_trades(
                &format!("{base} AND result IS NULL AND timestamp < ?1 ORDER BY timestamp"),
                params![format_timestamp(placed_before)],
            ),
            EvaluationScope::All => {
                self.query_trades(&format!("{base} ORDER BY timestamp"), params![])
            }
        }
    }

    fn write_evaluation(
        &self,
        session_id: &str,
        evaluation: &Evaluation,
        overwrite: bool,
    ) -> Result<bool, TradeEvalError> {
        let sql = if overwrite {
            "UPDATE trades SET result = ?1, return_pct = ?2 WHERE session_id = ?3"
        } else {
            "UPDATE trades SET result = ?1, return_pct = ?2
             WHERE session_id = ?3 AND result IS NULL"
        };
        self.execute(
            sql,
            params![evaluation.result.as_str(), evaluation.return_pct, session_id],
        )
    }
}

impl DataPort for SqliteAdapter {
    fn fetch_daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TradeEvalError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol, date, open, high, low, close, volume
                 FROM ohlcv
                 WHERE symbol = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(
                params![symbol, format_date(start), format_date(end)],
                |row| {
                    let date_str: String = row.get(1)?;
                    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
                        .map_err(|e| conversion_err(1, e))?;
                    Ok(OhlcvBar {
                        symbol: row.get(0)?,
                        date,
                        open: row.get(2)?,
                        high: row.get(3)?,
                        low: row.get(4)?,
                        close: row.get(5)?,
                        volume: row.get(6)?,
                    })
                },
            )
            .map_err(query_err)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(query_err)
    }
}
