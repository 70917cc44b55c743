//! Swap orchestration: quote, build, sign, submit and confirm with retry

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::confirmation::{ConfirmationResult, ConfirmationTracker};
use super::retry::RetryPolicy;
use super::signer::TransactionSigner;
use super::submitter::{SimulationReport, SubmitOptions, Submitter};
use crate::exchanges::types::{FeeBudget, QuoteRequest};
use crate::exchanges::SwapProvider;
use crate::shared::errors::SwapError;
use crate::shared::types::{SwapStage, TransactionId};

/// Confirmed swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOutcome {
    pub transaction_id: TransactionId,
    pub slot: u64,
    pub quote_id: String,
    pub attempts: u32,
    pub expected_output_amount: u64,
}

/// Runs one swap to a confirmed state.
///
/// Every failed attempt, whatever stage it failed in, starts over from a
/// fresh quote. Signed transactions are moved into the submitter, so a
/// payload can never be sent twice.
pub struct SwapOrchestrator {
    signer: Arc<dyn TransactionSigner>,
    submitter: Arc<dyn Submitter>,
    tracker: Arc<dyn ConfirmationTracker>,
    fee: FeeBudget,
    submit_options: SubmitOptions,
    retry_policy: RetryPolicy,
}

impl SwapOrchestrator {
    pub fn new(
        signer: Arc<dyn TransactionSigner>,
        submitter: Arc<dyn Submitter>,
        tracker: Arc<dyn ConfirmationTracker>,
        fee: FeeBudget,
        submit_options: SubmitOptions,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            signer,
            submitter,
            tracker,
            fee,
            submit_options,
            retry_policy,
        }
    }

    pub fn owner(&self) -> solana_sdk::pubkey::Pubkey {
        self.signer.pubkey()
    }

    pub async fn execute(&self, provider: &dyn SwapProvider, request: &QuoteRequest) -> Result<SwapOutcome, SwapError> {
        info!(
            "🔄 {} swap {} {} -> {}",
            provider.label(),
            request.input.to_ui(request.amount),
            request.input.symbol,
            request.output.symbol
        );

        let mut attempt: u32 = 0;
        loop {
            attempt = RetryPolicy::next_attempt(attempt);
            match self.attempt(provider, request, attempt).await {
                Ok(outcome) => {
                    info!(
                        "✅ {} swap confirmed in slot {} after {} attempt(s): {}",
                        provider.label(),
                        outcome.slot,
                        outcome.attempts,
                        outcome.transaction_id.explorer_url()
                    );
                    return Ok(outcome);
                }
                Err(err) => {
                    let stage = err.stage().map(|s| s.as_str()).unwrap_or("unknown stage");
                    warn!(
                        "❌ {} attempt {} failed while {}: {}",
                        provider.label(),
                        attempt,
                        stage,
                        err
                    );

                    if !err.is_retryable() || !self.retry_policy.allows_retry(attempt) {
                        return Err(SwapError::RetriesExhausted {
                            attempts: attempt,
                            last_error: Box::new(err),
                        });
                    }

                    let delay = self.retry_policy.delay_for(attempt);
                    info!("Retrying {} swap from a fresh quote in {:?}", provider.label(), delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt(
        &self,
        provider: &dyn SwapProvider,
        request: &QuoteRequest,
        attempt: u32,
    ) -> Result<SwapOutcome, SwapError> {
        debug!("Attempt {}: {}", attempt, SwapStage::Quoting);
        let quote = provider.quote(request).await?;

        debug!("Attempt {}: {} for quote {}", attempt, SwapStage::Building, quote.id);
        let unsigned = provider
            .build_transaction(&quote, &self.signer.pubkey(), &self.fee)
            .await?;
        if unsigned.quote_id != quote.id {
            return Err(SwapError::BuildFailure(format!(
                "transaction built for quote {} instead of {}",
                unsigned.quote_id, quote.id
            )));
        }

        debug!("Attempt {}: {}", attempt, SwapStage::Signing);
        let signed = self.signer.sign(unsigned, provider.transaction_version())?;

        debug!("Attempt {}: {} {}", attempt, SwapStage::Submitting, signed.signature);
        let handle = self.submitter.submit(signed, &self.submit_options).await?;

        debug!("Attempt {}: {} {}", attempt, SwapStage::AwaitingConfirmation, handle.transaction_id);
        match self.tracker.await_confirmation(&handle).await {
            ConfirmationResult::Confirmed { slot } => Ok(SwapOutcome {
                transaction_id: handle.transaction_id,
                slot,
                quote_id: quote.id,
                attempts: attempt,
                expected_output_amount: quote.expected_output_amount,
            }),
            ConfirmationResult::Expired => Err(SwapError::ConfirmationExpired(handle.transaction_id.to_string())),
            ConfirmationResult::Rejected(reason) => Err(SwapError::ConfirmationRejected {
                signature: handle.transaction_id.to_string(),
                reason,
            }),
        }
    }

    /// Quote, build and sign once, then simulate instead of submitting
    pub async fn simulate(
        &self,
        provider: &dyn SwapProvider,
        request: &QuoteRequest,
    ) -> Result<SimulationReport, SwapError> {
        let quote = provider.quote(request).await?;
        let unsigned = provider
            .build_transaction(&quote, &self.signer.pubkey(), &self.fee)
            .await?;
        let signed = self.signer.sign(unsigned, provider.transaction_version())?;
        let report = self.submitter.simulate(signed).await?;

        if report.success {
            info!(
                "🧪 {} simulation ok, {:?} compute units",
                provider.label(),
                report.units_consumed
            );
        } else {
            warn!(
                "🧪 {} simulation failed: {}",
                provider.label(),
                report.error.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(report)
    }
}
