//! Solana RPC client shared by submission, confirmation and balance reads

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::shared::errors::AppError;

const RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Solana RPC client wrapper
pub struct SolanaRpcClient {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl SolanaRpcClient {
    pub fn new(rpc_url: String, commitment: CommitmentConfig) -> Self {
        Self {
            client: Arc::new(RpcClient::new_with_timeout_and_commitment(rpc_url, RPC_TIMEOUT, commitment)),
            commitment,
        }
    }

    /// Shared handle for the execution and trading collaborators
    pub fn handle(&self) -> Arc<RpcClient> {
        self.client.clone()
    }

    pub fn commitment(&self) -> CommitmentConfig {
        self.commitment
    }

    /// Reach the node once so a bad endpoint fails at startup
    pub async fn check_health(&self) -> Result<u64, AppError> {
        let version = self
            .client
            .get_version()
            .await
            .map_err(|e| AppError::BlockchainError(format!("Failed to reach {}: {}", self.client.url(), e)))?;
        let height = self
            .client
            .get_block_height()
            .await
            .map_err(|e| AppError::BlockchainError(format!("Failed to get block height: {}", e)))?;

        info!(
            "🔗 Connected to {} (solana-core {}), block height {}",
            self.client.url(),
            version.solana_core,
            height
        );
        Ok(height)
    }
}

pub fn parse_commitment(value: &str) -> Result<CommitmentConfig, AppError> {
    match value.to_ascii_lowercase().as_str() {
        "processed" => Ok(CommitmentConfig::processed()),
        "confirmed" => Ok(CommitmentConfig::confirmed()),
        "finalized" => Ok(CommitmentConfig::finalized()),
        other => Err(AppError::ConfigError(format!("Unknown commitment level: {}", other))),
    }
}
