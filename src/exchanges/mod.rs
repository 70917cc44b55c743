pub mod api_clients;
pub mod types;
pub mod utils;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;

use crate::app::AppCfg;
use crate::exchanges::api_clients::{JupiterSwapClient, RaydiumSwapClient};
use crate::exchanges::types::{DexLabel, FeeBudget, Quote, QuoteRequest, TxVersion, UnsignedTransaction};
use crate::shared::errors::SwapError;

/// Quote and build capability of one swap venue.
///
/// Implementations only talk to their provider API; signing, submission and
/// confirmation are shared and live in the orchestrator.
#[async_trait]
pub trait SwapProvider: Send + Sync {
    fn label(&self) -> DexLabel;

    /// Transaction version the provider is configured to return
    fn transaction_version(&self) -> TxVersion;

    /// Fetch a fresh quote. Fails with `QuoteUnavailable` when no route exists.
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, SwapError>;

    /// Assemble an unsigned transaction for `quote`. Fails with `BuildFailure`.
    async fn build_transaction(
        &self,
        quote: &Quote,
        owner: &Pubkey,
        fee: &FeeBudget,
    ) -> Result<UnsignedTransaction, SwapError>;
}

pub fn create_provider(
    dex_label: DexLabel,
    app_cfg: &AppCfg,
    http_client: reqwest::Client,
) -> Arc<dyn SwapProvider> {
    match dex_label {
        DexLabel::Raydium => Arc::new(RaydiumSwapClient::new(
            http_client,
            app_cfg.raydium_api_url.clone(),
            app_cfg.raydium_trade_url.clone(),
            app_cfg.use_versioned_transaction,
        )),
        DexLabel::Jupiter => Arc::new(JupiterSwapClient::new(
            http_client,
            app_cfg.jupiter_api_url.clone(),
            app_cfg.jupiter_api_key.clone(),
        )),
    }
}
