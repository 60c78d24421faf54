//! Domain error types.

/// A parse error with position information for expression parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Failure of a single expression evaluation.
///
/// `InsufficientData` and `Numeric` are per-tick conditions: the rule engine
/// caches them as "no value" for the tick and carries on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("invalid expression: {reason}")]
    InvalidExpression {
        reason: String,
        suggestion: Option<String>,
    },

    #[error("insufficient data: need {needed} points, but only {available} available")]
    InsufficientData { needed: usize, available: usize },

    #[error("numeric error: {reason}")]
    Numeric { reason: String },
}

impl EvalError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        EvalError::InvalidExpression {
            reason: reason.into(),
            suggestion: None,
        }
    }

    pub fn numeric(reason: impl Into<String>) -> Self {
        EvalError::Numeric {
            reason: reason.into(),
        }
    }
}

/// Structural problems in a strategy definition, collected in one pass.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid strategy definition: {}", errors.join("; "))]
pub struct StrategyDefinitionError {
    pub errors: Vec<String>,
}

/// Top-level error type for lobtrader.
#[derive(Debug, thiserror::Error)]
pub enum LobtraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("failed to load strategy from {file}: {reason}")]
    StrategyLoad { file: String, reason: String },

    #[error(transparent)]
    StrategyDefinition(#[from] StrategyDefinitionError),

    #[error(transparent)]
    Expression(#[from] EvalError),

    #[error("market data error: {reason}")]
    MarketData { reason: String },

    #[error("degenerate input: {valid_ticks} valid ticks, need at least 2")]
    DegenerateInput { valid_ticks: usize },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LobtraderError {
    /// Process exit status for this error category.
    pub fn exit_status(&self) -> u8 {
        match self {
            LobtraderError::Io(_) | LobtraderError::Report { .. } => 1,
            LobtraderError::ConfigParse { .. }
            | LobtraderError::ConfigInvalid { .. } => 2,
            LobtraderError::MarketData { .. } => 3,
            LobtraderError::StrategyLoad { .. }
            | LobtraderError::StrategyDefinition(_)
            | LobtraderError::Expression(_) => 4,
            LobtraderError::DegenerateInput { .. } => 5,
        }
    }
}

impl From<&LobtraderError> for std::process::ExitCode {
    fn from(err: &LobtraderError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
