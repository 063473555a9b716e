//! Core domain types and logic.

pub mod ohlcv;
pub mod atr;
pub mod trade;
pub mod order;
pub mod classifier;
pub mod batch;
pub mod backfill;
pub mod reconcile;
pub mod evaluation;
pub mod config_validation;
pub mod error;
