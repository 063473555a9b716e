//! Domain error types.

/// Rejection raised by the ATR estimator or the classifier.
///
/// Insufficient history is not an error: [`crate::domain::atr::compute_atr`]
/// reports it as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// Data that cannot be evaluated (non-finite bar, non-positive price or ATR).
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Caller contract bug (zero period, malformed side, bad multipliers).
    #[error("precondition violated: {reason}")]
    PreconditionViolation { reason: String },
}

impl EvalError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        EvalError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn precondition(reason: impl Into<String>) -> Self {
        EvalError::PreconditionViolation {
            reason: reason.into(),
        }
    }
}

/// Top-level error type for tradeeval.
#[derive(Debug, thiserror::Error)]
pub enum TradeEvalError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TradeEvalError {
    /// Process exit status for this error category.
    pub fn exit_status(&self) -> u8 {
        match self {
            TradeEvalError::Io(_) => 1,
            TradeEvalError::ConfigParse { .. }
            | TradeEvalError::ConfigMissing { .. }
            | TradeEvalError::ConfigInvalid { .. } => 2,
            TradeEvalError::Database { .. } | TradeEvalError::DatabaseQuery { .. } => 3,
            TradeEvalError::Eval(_) => 4,
            TradeEvalError::DataSource { .. } => 5,
        }
    }
}

impl From<&TradeEvalError> for std::process::ExitCode {
    fn from(err: &TradeEvalError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
