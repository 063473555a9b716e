//! CLI definition and dispatch.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvBarAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backfill::BackfillOptions;
use crate::domain::batch::BatchReport;
use crate::domain::classifier::{Thresholds, classify};
use crate::domain::config_validation::validate_config;
use crate::domain::error::TradeEvalError;
use crate::domain::evaluation::EvaluationScope;
use crate::domain::reconcile::ReconcileOptions;
use crate::domain::trade::Side;
use crate::ports::config_port::ConfigPort;

#[derive(Parser, Debug)]
#[command(
    name = "tradeeval",
    about = "Trade journal ATR backfill, exit reconciliation and evaluation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the trade journal and bar tables
    InitDb {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Load daily bars for a symbol from a CSV directory into the store
    ImportBars {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        csv_dir: PathBuf,
    },
    /// Load journal trades from a CSV export
    ImportTrades {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Fill in missing ATR-at-execution values
    BackfillAtr {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Fill in missing exit prices from closed broker orders
    ReconcileExits {
        #[arg(short, long)]
        config: PathBuf,
        /// Broker closed-order export; defaults to [reconcile] orders_csv
        #[arg(long)]
        orders: Option<PathBuf>,
    },
    /// Classify closed trades as WIN, LOSE or HOLD
    Evaluate {
        #[arg(short, long)]
        config: PathBuf,
        /// Re-evaluate every trade, overwriting earlier results
        #[arg(long)]
        all: bool,
    },
    /// Print the 14-period ATR for a symbol as of a date
    Atr {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Classify a single trade
    Classify {
        #[arg(long)]
        side: String,
        #[arg(long)]
        entry: f64,
        #[arg(long)]
        exit: f64,
        #[arg(long)]
        atr: f64,
        #[arg(long, default_value_t = 2.0)]
        win_multiplier: f64,
        #[arg(long, default_value_t = 1.5)]
        lose_multiplier: f64,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed when `run` is driven from tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        #[cfg(feature = "sqlite")]
        Command::InitDb { config } => store_commands::init_db(&config),
        #[cfg(feature = "sqlite")]
        Command::ImportBars {
            config,
            symbol,
            csv_dir,
        } => store_commands::import_bars(&config, &symbol, &csv_dir),
        #[cfg(feature = "sqlite")]
        Command::ImportTrades { config, csv } => store_commands::import_trades(&config, &csv),
        #[cfg(feature = "sqlite")]
        Command::BackfillAtr { config, limit } => store_commands::backfill(&config, limit),
        #[cfg(feature = "sqlite")]
        Command::ReconcileExits { config, orders } => {
            store_commands::reconcile(&config, orders.as_deref())
        }
        #[cfg(feature = "sqlite")]
        Command::Evaluate { config, all } => store_commands::evaluate(&config, all),
        #[cfg(feature = "sqlite")]
        Command::Atr {
            config,
            symbol,
            date,
        } => store_commands::atr(&config, &symbol, date),
        Command::Classify {
            side,
            entry,
            exit,
            atr,
            win_multiplier,
            lose_multiplier,
        } => run_classify(
            &side,
            entry,
            exit,
            atr,
            Thresholds {
                win_multiplier,
                lose_multiplier,
            },
        ),
        Command::Validate { config } => run_validate(&config),
        #[cfg(not(feature = "sqlite"))]
        _ => {
            tracing::error!("the sqlite feature is required for this command");
            return ExitCode::from(1);
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, TradeEvalError> {
    FileConfigAdapter::from_file(path).map_err(|e| TradeEvalError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Load and validate in one step; every workflow command starts here.
pub fn load_validated_config(path: &Path) -> Result<FileConfigAdapter, TradeEvalError> {
    tracing::info!("loading config from {}", path.display());
    let config = load_config(path)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn build_backfill_options(config: &dyn ConfigPort) -> BackfillOptions {
    let defaults = BackfillOptions::default();
    BackfillOptions {
        lookback_days: config
            .get_int("backfill", "lookback_days", defaults.lookback_days as i64)
            .max(0) as u64,
        limit: config
            .get_int("backfill", "limit", defaults.limit as i64)
            .max(0) as usize,
    }
}

pub fn build_reconcile_options(config: &dyn ConfigPort) -> ReconcileOptions {
    let defaults = ReconcileOptions::default();
    ReconcileOptions {
        lookback_days: config.get_int("reconcile", "lookback_days", defaults.lookback_days),
        limit: config
            .get_int("reconcile", "limit", defaults.limit as i64)
            .max(0) as usize,
    }
}

pub fn build_thresholds(config: &dyn ConfigPort) -> Thresholds {
    let defaults = Thresholds::default();
    Thresholds {
        win_multiplier: config.get_double("evaluation", "win_multiplier", defaults.win_multiplier),
        lose_multiplier: config.get_double(
            "evaluation",
            "lose_multiplier",
            defaults.lose_multiplier,
        ),
    }
}

pub fn build_scope(
    config: &dyn ConfigPort,
    all: bool,
    as_of: DateTime<Utc>,
) -> Result<EvaluationScope, TradeEvalError> {
    if all {
        Ok(EvaluationScope::All)
    } else {
        EvaluationScope::pending(as_of, config.get_int("evaluation", "min_age_hours", 24))
    }
}

/// Bars come from the store unless `[data] source = csv`.
pub fn csv_bar_source(config: &dyn ConfigPort) -> Result<Option<CsvBarAdapter>, TradeEvalError> {
    match config.get_string("data", "source").as_deref().map(str::trim) {
        Some("csv") => {
            let dir = config.require_string("data", "csv_dir")?;
            Ok(Some(CsvBarAdapter::new(PathBuf::from(dir))))
        }
        _ => Ok(None),
    }
}

/// One summary line plus a line per skipped trade, on stdout.
pub fn format_report(label: &str, report: &BatchReport) -> String {
    let mut out = format!(
        "{label}: examined {}, updated {}, unchanged {}, skipped {}",
        report.examined,
        report.updated,
        report.unchanged,
        report.skipped.len()
    );
    for skipped in &report.skipped {
        out.push_str(&format!("\n  skipped {}: {}", skipped.id, skipped.reason));
    }
    out
}

fn run_classify(
    side: &str,
    entry: f64,
    exit: f64,
    atr: f64,
    thresholds: Thresholds,
) -> Result<(), TradeEvalError> {
    let side: Side = side.parse()?;
    let evaluation = classify(side, entry, exit, atr, &thresholds)?;
    println!("{} {:.2}", evaluation.result, evaluation.return_pct);
    Ok(())
}

fn run_validate(path: &Path) -> Result<(), TradeEvalError> {
    let config = load_validated_config(path)?;
    let thresholds = build_thresholds(&config);
    let backfill = build_backfill_options(&config);
    let reconcile = build_reconcile_options(&config);
    println!("configuration is valid");
    println!(
        "  evaluation: win {} x ATR, lose {} x ATR",
        thresholds.win_multiplier, thresholds.lose_multiplier
    );
    println!(
        "  backfill:   {} days lookback, limit {}",
        backfill.lookback_days, backfill.limit
    );
    println!(
        "  reconcile:  {} days lookback, limit {}",
        reconcile.lookback_days, reconcile.limit
    );
    Ok(())
}

#[cfg(feature = "sqlite")]
mod store_commands {
    use super::*;
    use crate::adapters::csv_adapter::{CsvOrderAdapter, read_trades};
    use crate::adapters::sqlite_adapter::SqliteAdapter;
    use crate::domain::atr::{ATR_PERIOD, compute_atr};
    use crate::domain::backfill::backfill_atr;
    use crate::domain::evaluation::evaluate_trades;
    use crate::domain::reconcile::reconcile_exit_prices;
    use crate::ports::data_port::DataPort;
    use chrono::Days;

    fn open_store(config: &dyn ConfigPort) -> Result<SqliteAdapter, TradeEvalError> {
        let store = SqliteAdapter::from_config(config)?;
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn init_db(path: &Path) -> Result<(), TradeEvalError> {
        let config = load_validated_config(path)?;
        open_store(&config)?;
        println!("schema ready");
        Ok(())
    }

    pub fn import_bars(path: &Path, symbol: &str, csv_dir: &Path) -> Result<(), TradeEvalError> {
        let config = load_validated_config(path)?;
        let store = open_store(&config)?;
        let symbol = symbol.to_uppercase();
        let bars = CsvBarAdapter::new(csv_dir.to_path_buf()).fetch_daily_bars(
            &symbol,
            NaiveDate::MIN,
            NaiveDate::MAX,
        )?;
        store.insert_bars(&bars)?;
        println!("imported {} bars for {}", bars.len(), symbol);
        Ok(())
    }

    pub fn import_trades(path: &Path, csv: &Path) -> Result<(), TradeEvalError> {
        let config = load_validated_config(path)?;
        let store = open_store(&config)?;
        let trades = read_trades(csv)?;
        let inserted = store.insert_trades(&trades)?;
        println!(
            "imported {} trades ({} already present)",
            inserted,
            trades.len() - inserted
        );
        Ok(())
    }

    pub fn backfill(path: &Path, limit: Option<usize>) -> Result<(), TradeEvalError> {
        let config = load_validated_config(path)?;
        let store = open_store(&config)?;
        let mut options = build_backfill_options(&config);
        if let Some(limit) = limit {
            options.limit = limit;
        }

        let csv = csv_bar_source(&config)?;
        let data: &dyn DataPort = match &csv {
            Some(adapter) => adapter,
            None => &store,
        };

        let report = backfill_atr(&store, data, &options)?;
        println!("{}", format_report("backfill-atr", &report));
        Ok(())
    }

    pub fn reconcile(path: &Path, orders: Option<&Path>) -> Result<(), TradeEvalError> {
        let config = load_validated_config(path)?;
        let store = open_store(&config)?;
        let orders_path = match orders {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(config.require_string("reconcile", "orders_csv")?),
        };
        let broker = CsvOrderAdapter::new(orders_path);
        let options = build_reconcile_options(&config);

        let report = reconcile_exit_prices(&store, &broker, &options, Utc::now())?;
        println!("{}", format_report("reconcile-exits", &report));
        Ok(())
    }

    pub fn evaluate(path: &Path, all: bool) -> Result<(), TradeEvalError> {
        let config = load_validated_config(path)?;
        let store = open_store(&config)?;
        let thresholds = build_thresholds(&config);
        let scope = build_scope(&config, all, Utc::now())?;

        let report = evaluate_trades(&store, &thresholds, &scope)?;
        println!("{}", format_report("evaluate", &report));
        Ok(())
    }

    pub fn atr(path: &Path, symbol: &str, date: NaiveDate) -> Result<(), TradeEvalError> {
        let config = load_validated_config(path)?;
        let store = open_store(&config)?;
        let options = build_backfill_options(&config);

        let csv = csv_bar_source(&config)?;
        let data: &dyn DataPort = match &csv {
            Some(adapter) => adapter,
            None => &store,
        };

        let start = date
            .checked_sub_days(Days::new(options.lookback_days))
            .ok_or_else(|| TradeEvalError::ConfigInvalid {
                section: "backfill".into(),
                key: "lookback_days".into(),
                reason: format!("{} days before {date} is out of range", options.lookback_days),
            })?;
        let symbol = symbol.to_uppercase();
        let bars = data.fetch_daily_bars(&symbol, start, date)?;
        match compute_atr(&bars, ATR_PERIOD)? {
            Some(atr) => println!("{symbol} {date} ATR({ATR_PERIOD}) {atr:.4}"),
            None => println!(
                "{symbol} {date} ATR({ATR_PERIOD}) undefined ({} bars, need {})",
                bars.len(),
                ATR_PERIOD + 1
            ),
        }
        Ok(())
    }
}
