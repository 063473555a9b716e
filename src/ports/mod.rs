//! Port traits for the collaborators the workflows depend on.

pub mod broker_port;
pub mod config_port;
pub mod data_port;
pub mod trade_store_port;
