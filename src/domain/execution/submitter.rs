//! Submission of signed transactions to the RPC node

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use solana_client::{nonblocking::rpc_client::RpcClient, rpc_config::RpcSendTransactionConfig};
use solana_sdk::commitment_config::CommitmentConfig;
use std::sync::Arc;
use tracing::{debug, info};

use super::signer::SignedTransaction;
use crate::shared::errors::SwapError;
use crate::shared::types::TransactionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    /// Skipping preflight saves a simulation round trip, but malformed
    /// transactions then only surface during confirmation.
    pub skip_preflight: bool,
    /// Rebroadcast attempts the node makes on our behalf
    pub max_retries: usize,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            skip_preflight: true,
            max_retries: 5,
        }
    }
}

/// One in-flight attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionHandle {
    pub transaction_id: TransactionId,
    pub quote_id: String,
    /// Block height after which the transaction can no longer land
    pub last_valid_block_height: u64,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub success: bool,
    pub error: Option<String>,
    pub units_consumed: Option<u64>,
    pub logs: Vec<String>,
}

#[async_trait]
pub trait Submitter: Send + Sync {
    /// Send `signed` once. Node-level rejection is returned as
    /// `SubmissionRejected` and never retried here.
    async fn submit(&self, signed: SignedTransaction, options: &SubmitOptions) -> Result<SubmissionHandle, SwapError>;

    /// Dry run `signed` against current chain state
    async fn simulate(&self, signed: SignedTransaction) -> Result<SimulationReport, SwapError>;
}

pub struct RpcSubmitter {
    rpc_client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl RpcSubmitter {
    pub fn new(rpc_client: Arc<RpcClient>, commitment: CommitmentConfig) -> Self {
        Self { rpc_client, commitment }
    }

    /// Validity window for the submission. Builders that don't ship one get the
    /// window of the latest blockhash at submission time.
    async fn validity_window(&self, signed: &SignedTransaction) -> Result<u64, SwapError> {
        if let Some(height) = signed.last_valid_block_height {
            return Ok(height);
        }
        let (_, last_valid_block_height) = self
            .rpc_client
            .get_latest_blockhash_with_commitment(self.commitment)
            .await
            .map_err(|e| SwapError::SubmissionRejected(format!("failed to get latest blockhash: {}", e)))?;
        Ok(last_valid_block_height)
    }
}

#[async_trait]
impl Submitter for RpcSubmitter {
    async fn submit(&self, signed: SignedTransaction, options: &SubmitOptions) -> Result<SubmissionHandle, SwapError> {
        let last_valid_block_height = self.validity_window(&signed).await?;

        let config = RpcSendTransactionConfig {
            skip_preflight: options.skip_preflight,
            preflight_commitment: Some(self.commitment.commitment),
            max_retries: Some(options.max_retries),
            ..Default::default()
        };
        debug!(
            "Sending {} transaction {} (skip_preflight={}, max_retries={})",
            signed.dex_label, signed.signature, options.skip_preflight, options.max_retries
        );

        let signature = self
            .rpc_client
            .send_transaction_with_config(&signed.transaction, config)
            .await
            .map_err(|e| SwapError::SubmissionRejected(e.to_string()))?;

        let transaction_id = TransactionId::from(signature);
        info!("🚀 Sent {} swap: {}", signed.dex_label, transaction_id.explorer_url());

        Ok(SubmissionHandle {
            transaction_id,
            quote_id: signed.quote_id,
            last_valid_block_height,
            submitted_at: Utc::now(),
        })
    }

    async fn simulate(&self, signed: SignedTransaction) -> Result<SimulationReport, SwapError> {
        let response = self
            .rpc_client
            .simulate_transaction(&signed.transaction)
            .await
            .map_err(|e| SwapError::SubmissionRejected(format!("simulation failed: {}", e)))?;

        let result = response.value;
        Ok(SimulationReport {
            success: result.err.is_none(),
            error: result.err.map(|e| format!("{:?}", e)),
            units_consumed: result.units_consumed,
            logs: result.logs.unwrap_or_default(),
        })
    }
}
