//! Confirmation tracking for submitted transactions

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{commitment_config::CommitmentConfig, signature::Signature};
use solana_transaction_status::TransactionStatus;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::submitter::SubmissionHandle;

/// Terminal classification of a submission.
///
/// `Expired` means the outcome is unknown: the transaction may still land
/// after the window was observed as elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationResult {
    Confirmed { slot: u64 },
    Expired,
    Rejected(String),
}

#[derive(Debug, Clone, Copy)]
pub struct ConfirmationConfig {
    pub poll_interval: Duration,
    /// How long the block height may stay unreadable before the wait ends.
    /// Never cuts the validity window short.
    pub timeout: Duration,
    pub commitment: CommitmentConfig,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2_000),
            timeout: Duration::from_secs(90),
            commitment: CommitmentConfig::finalized(),
        }
    }
}

#[async_trait]
pub trait ConfirmationTracker: Send + Sync {
    /// Suspend until the submission is confirmed, rejected or expired
    async fn await_confirmation(&self, handle: &SubmissionHandle) -> ConfirmationResult;
}

/// Classify one `getSignatureStatuses` entry. `None` means keep waiting.
pub fn classify_status(status: Option<&TransactionStatus>, commitment: CommitmentConfig) -> Option<ConfirmationResult> {
    let status = status?;
    if let Some(err) = &status.err {
        return Some(ConfirmationResult::Rejected(format!("{:?}", err)));
    }
    if status.satisfies_commitment(commitment) {
        return Some(ConfirmationResult::Confirmed { slot: status.slot });
    }
    None
}

pub struct RpcConfirmationTracker {
    rpc_client: Arc<RpcClient>,
    config: ConfirmationConfig,
}

impl RpcConfirmationTracker {
    pub fn new(rpc_client: Arc<RpcClient>, config: ConfirmationConfig) -> Self {
        Self { rpc_client, config }
    }

    async fn fetch_status(&self, signature: &Signature) -> Option<TransactionStatus> {
        match self.rpc_client.get_signature_statuses(&[*signature]).await {
            Ok(response) => response.value.into_iter().next().flatten(),
            Err(e) => {
                warn!("Failed to fetch status of {}: {}", signature, e);
                None
            }
        }
    }

    async fn block_height(&self) -> Option<u64> {
        match self.rpc_client.get_block_height().await {
            Ok(height) => Some(height),
            Err(e) => {
                warn!("Failed to fetch block height: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl ConfirmationTracker for RpcConfirmationTracker {
    async fn await_confirmation(&self, handle: &SubmissionHandle) -> ConfirmationResult {
        let signature = match Signature::from_str(handle.transaction_id.as_str()) {
            Ok(signature) => signature,
            Err(e) => return ConfirmationResult::Rejected(format!("invalid transaction id: {}", e)),
        };

        info!("⏳ Waiting to confirm the transaction: {}", handle.transaction_id.explorer_url());
        let started = Instant::now();
        // Set once the node reports the transaction without an error. From
        // then on only the commitment or a later error ends the wait.
        let mut landed_slot: Option<u64> = None;

        loop {
            let status = self.fetch_status(&signature).await;
            if let Some(result) = classify_status(status.as_ref(), self.config.commitment) {
                return result;
            }
            if let (Some(status), None) = (&status, landed_slot) {
                info!(
                    "📦 {} landed in slot {}, waiting for {:?}",
                    handle.transaction_id, status.slot, self.config.commitment.commitment
                );
                landed_slot = Some(status.slot);
            }

            if landed_slot.is_none() {
                match self.block_height().await {
                    Some(height) if height > handle.last_valid_block_height => {
                        debug!("Block height {} / last valid {}", height, handle.last_valid_block_height);
                        // The transaction may have landed between the two calls
                        let status = self.fetch_status(&signature).await;
                        if let Some(result) = classify_status(status.as_ref(), self.config.commitment) {
                            return result;
                        }
                        match status {
                            Some(status) => landed_slot = Some(status.slot),
                            None => return ConfirmationResult::Expired,
                        }
                    }
                    Some(height) => {
                        debug!("Block height {} / last valid {}", height, handle.last_valid_block_height);
                    }
                    None if started.elapsed() >= self.config.timeout => {
                        warn!(
                            "⏰ Block height unavailable for {:?}, giving up on {}",
                            self.config.timeout, handle.transaction_id
                        );
                        return ConfirmationResult::Expired;
                    }
                    None => {}
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::TransactionId;
    use chrono::Utc;
    use solana_rpc_client::mock_sender::Mocks;
    use solana_client::{
        rpc_request::RpcRequest,
        rpc_response::{Response, RpcResponseContext},
    };
    use solana_sdk::{instruction::InstructionError, transaction::TransactionError};
    use solana_transaction_status::TransactionConfirmationStatus;

    fn status(
        slot: u64,
        err: Option<TransactionError>,
        confirmation_status: TransactionConfirmationStatus,
    ) -> TransactionStatus {
        TransactionStatus {
            slot,
            // rooted transactions report no confirmation count
            confirmations: match &confirmation_status {
                TransactionConfirmationStatus::Finalized => None,
                _ => Some(1),
            },
            status: match &err {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            },
            err,
            confirmation_status: Some(confirmation_status),
        }
    }

    #[test]
    fn test_unknown_signature_keeps_waiting() {
        assert_eq!(classify_status(None, CommitmentConfig::finalized()), None);
    }

    #[test]
    fn test_finalized_status_is_confirmed() {
        let s = status(100, None, TransactionConfirmationStatus::Finalized);
        assert_eq!(
            classify_status(Some(&s), CommitmentConfig::finalized()),
            Some(ConfirmationResult::Confirmed { slot: 100 })
        );
    }

    #[test]
    fn test_confirmed_status_waits_for_finalized() {
        let s = status(100, None, TransactionConfirmationStatus::Confirmed);
        assert_eq!(classify_status(Some(&s), CommitmentConfig::finalized()), None);
        assert_eq!(
            classify_status(Some(&s), CommitmentConfig::confirmed()),
            Some(ConfirmationResult::Confirmed { slot: 100 })
        );
    }

    #[test]
    fn test_execution_error_is_rejected() {
        let err = TransactionError::InstructionError(2, InstructionError::Custom(6001));
        let s = status(101, Some(err), TransactionConfirmationStatus::Processed);
        assert!(matches!(
            classify_status(Some(&s), CommitmentConfig::finalized()),
            Some(ConfirmationResult::Rejected(reason)) if reason.contains("6001")
        ));
    }

    fn statuses(value: Option<TransactionStatus>) -> serde_json::Value {
        serde_json::to_value(Response {
            context: RpcResponseContext { slot: 1, api_version: None },
            value: vec![value],
        })
        .unwrap()
    }

    // Mocked methods answer once, later calls fall back to the mock node's
    // canned replies (finalized in slot 1, block height 1234).
    fn tracker(url: &str, mocks: Mocks, timeout: Duration) -> RpcConfirmationTracker {
        let client = RpcClient::new_mock_with_mocks(url.to_string(), mocks);
        RpcConfirmationTracker::new(
            Arc::new(client),
            ConfirmationConfig {
                poll_interval: Duration::from_millis(500),
                timeout,
                commitment: CommitmentConfig::finalized(),
            },
        )
    }

    fn handle(last_valid_block_height: u64) -> SubmissionHandle {
        SubmissionHandle {
            transaction_id: TransactionId::from(Signature::new_unique()),
            quote_id: "quote-1".to_string(),
            last_valid_block_height,
            submitted_at: Utc::now(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_landed_transaction_is_never_expired() {
        let mut mocks = Mocks::new();
        mocks.insert(
            RpcRequest::GetSignatureStatuses,
            statuses(Some(status(480, None, TransactionConfirmationStatus::Confirmed))),
        );
        mocks.insert(RpcRequest::GetBlockHeight, serde_json::json!(100));
        let tracker = tracker("succeeds", mocks, Duration::ZERO);

        let result = tracker.await_confirmation(&handle(200)).await;
        assert_eq!(result, ConfirmationResult::Confirmed { slot: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_does_not_cut_window_short() {
        let mut mocks = Mocks::new();
        mocks.insert(RpcRequest::GetSignatureStatuses, statuses(None));
        mocks.insert(RpcRequest::GetBlockHeight, serde_json::json!(100));
        let tracker = tracker("succeeds", mocks, Duration::ZERO);

        let result = tracker.await_confirmation(&handle(200)).await;
        assert_eq!(result, ConfirmationResult::Confirmed { slot: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_window_without_status_expires() {
        let tracker = tracker("sig_not_found", Mocks::new(), Duration::from_secs(90));

        let result = tracker.await_confirmation(&handle(200)).await;
        assert_eq!(result, ConfirmationResult::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_execution_is_rejected() {
        let tracker = tracker("instruction_error", Mocks::new(), Duration::from_secs(90));

        let result = tracker.await_confirmation(&handle(200)).await;
        assert!(matches!(result, ConfirmationResult::Rejected(reason) if reason.contains("UninitializedAccount")));
    }
}
