//! Execution domain - signing, submission, confirmation and retry of swaps

mod confirmation;
mod orchestrator;
mod retry;
mod signer;
mod submitter;

pub use confirmation::{classify_status, ConfirmationConfig, ConfirmationResult, ConfirmationTracker, RpcConfirmationTracker};
pub use orchestrator::{SwapOrchestrator, SwapOutcome};
pub use retry::{Backoff, RetryPolicy};
pub use signer::{KeypairSigner, SignedTransaction, TransactionSigner};
pub use submitter::{RpcSubmitter, SimulationReport, SubmissionHandle, SubmitOptions, Submitter};
