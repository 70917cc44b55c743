//! Error handling for the application

use thiserror::Error;

use crate::shared::types::SwapStage;

/// Swap-related errors.
///
/// Every variant except [`SwapError::RetriesExhausted`] is recoverable: the
/// orchestrator answers all of them by starting over from a fresh quote.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SwapError {
    #[error("Quote unavailable: {0}")]
    QuoteUnavailable(String),

    #[error("Failed to build swap transaction: {0}")]
    BuildFailure(String),

    #[error("Invalid transaction format: {0}")]
    InvalidTransactionFormat(String),

    #[error("Submission rejected by node: {0}")]
    SubmissionRejected(String),

    #[error("Confirmation expired for {0}, outcome unknown")]
    ConfirmationExpired(String),

    #[error("Transaction {signature} rejected: {reason}")]
    ConfirmationRejected { signature: String, reason: String },

    #[error("Balance query failed: {0}")]
    BalanceQueryFailure(String),

    #[error("Swap gave up after {attempts} attempts, last error: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: Box<SwapError>,
    },
}

impl SwapError {
    /// Stage of the swap state machine this error was raised from.
    pub fn stage(&self) -> Option<SwapStage> {
        match self {
            SwapError::QuoteUnavailable(_) => Some(SwapStage::Quoting),
            SwapError::BuildFailure(_) => Some(SwapStage::Building),
            SwapError::InvalidTransactionFormat(_) => Some(SwapStage::Signing),
            SwapError::SubmissionRejected(_) => Some(SwapStage::Submitting),
            SwapError::ConfirmationExpired(_) | SwapError::ConfirmationRejected { .. } => {
                Some(SwapStage::AwaitingConfirmation)
            }
            SwapError::BalanceQueryFailure(_) | SwapError::RetriesExhausted { .. } => None,
        }
    }

    /// Whether the orchestrator should start a new attempt after this error.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SwapError::RetriesExhausted { .. })
    }
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Wallet error: {0}")]
    WalletError(String),

    #[error("Blockchain error: {0}")]
    BlockchainError(String),

    #[error("Swap error: {0}")]
    Swap(#[from] SwapError),
}
