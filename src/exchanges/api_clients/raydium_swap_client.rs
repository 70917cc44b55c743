use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::read_json;
use crate::exchanges::types::{
    DexLabel, FeeBudget, Quote, QuoteRequest, RouteInfo, TxVersion, UnsignedTransaction,
};
use crate::exchanges::utils::{decode_transaction, format_pool_address, parse_amount};
use crate::exchanges::SwapProvider;
use crate::shared::errors::SwapError;
use crate::shared::types::Asset;
use crate::shared::utils::generate_id;

pub const DEFAULT_RAYDIUM_API_URL: &str = "https://api-v3.raydium.io";
pub const DEFAULT_RAYDIUM_TRADE_URL: &str = "https://transaction-v1.raydium.io";

/// Envelope shared by every Raydium endpoint
#[derive(Debug, Deserialize)]
struct RaydiumEnvelope<T> {
    success: bool,
    msg: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct PoolPage {
    #[serde(default)]
    data: Vec<RaydiumPool>,
}

#[derive(Debug, Deserialize)]
struct RaydiumPool {
    id: String,
    #[serde(rename = "type", default)]
    pool_type: String,
    #[serde(default)]
    tvl: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComputeData {
    input_amount: String,
    output_amount: String,
    other_amount_threshold: String,
    #[serde(default)]
    price_impact_pct: f64,
    #[serde(default)]
    route_plan: Vec<RoutePlanStep>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoutePlanStep {
    pool_id: String,
}

#[derive(Debug, Deserialize)]
struct SwapTransactionEntry {
    transaction: String,
}

/// Pool based provider backed by the Raydium HTTP APIs.
///
/// A pool between the two mints has to exist before a quote is computed; the
/// discovered pool id is cached per unordered mint pair.
pub struct RaydiumSwapClient {
    http_client: Client,
    api_url: String,
    trade_url: String,
    tx_version: TxVersion,
    pool_cache: RwLock<HashMap<(Pubkey, Pubkey), String>>,
}

impl RaydiumSwapClient {
    pub fn new(http_client: Client, api_url: String, trade_url: String, use_versioned_transaction: bool) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            trade_url: trade_url.trim_end_matches('/').to_string(),
            tx_version: if use_versioned_transaction { TxVersion::V0 } else { TxVersion::Legacy },
            pool_cache: RwLock::new(HashMap::new()),
        }
    }

    fn pair_key(a: &Pubkey, b: &Pubkey) -> (Pubkey, Pubkey) {
        if a <= b {
            (*a, *b)
        } else {
            (*b, *a)
        }
    }

    /// Find the deepest pool between two mints
    async fn find_pool(&self, input: &Asset, output: &Asset) -> Result<String, SwapError> {
        let key = Self::pair_key(&input.mint, &output.mint);
        if let Some(pool_id) = self.pool_cache.read().await.get(&key) {
            return Ok(pool_id.clone());
        }

        let url = format!(
            "{}/pools/info/mint?mint1={}&mint2={}&poolType=all&poolSortField=liquidity&sortType=desc&pageSize=1&page=1",
            self.api_url, input.mint, output.mint
        );
        info!("🔍 Looking up Raydium pool for {} / {}", input.symbol, output.symbol);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| SwapError::QuoteUnavailable(format!("Raydium pool lookup failed: {}", e)))?;
        let envelope: RaydiumEnvelope<PoolPage> = read_json(response)
            .await
            .map_err(|e| SwapError::QuoteUnavailable(format!("Raydium pool lookup failed: {}", e)))?;

        let pool_id = select_pool(envelope)?;
        info!("✅ Using Raydium pool {}", format_pool_address(&pool_id));
        self.pool_cache.write().await.insert(key, pool_id.clone());
        Ok(pool_id)
    }
}

fn select_pool(envelope: RaydiumEnvelope<PoolPage>) -> Result<String, SwapError> {
    if !envelope.success {
        return Err(SwapError::QuoteUnavailable(format!(
            "Raydium pool lookup failed: {}",
            envelope.msg.unwrap_or_default()
        )));
    }
    let pool = envelope
        .data
        .and_then(|page| page.data.into_iter().next())
        .ok_or_else(|| SwapError::QuoteUnavailable("Couldn't find the pool info".to_string()))?;
    debug!("Raydium pool {} ({}) tvl {:.2}", pool.id, pool.pool_type, pool.tvl);
    Ok(pool.id)
}

/// Turn a `/compute/swap-base-in` document into a quote
fn quote_from_compute(
    request: &QuoteRequest,
    pool_id: &str,
    raw: serde_json::Value,
) -> Result<Quote, SwapError> {
    let envelope: RaydiumEnvelope<ComputeData> = serde_json::from_value(raw.clone())
        .map_err(|e| SwapError::QuoteUnavailable(format!("unexpected Raydium quote: {}", e)))?;
    if !envelope.success {
        return Err(SwapError::QuoteUnavailable(format!(
            "Raydium has no route: {}",
            envelope.msg.unwrap_or_default()
        )));
    }
    let data = envelope
        .data
        .ok_or_else(|| SwapError::QuoteUnavailable("Raydium quote without data".to_string()))?;

    let mut pool_ids: Vec<String> = data.route_plan.into_iter().map(|step| step.pool_id).collect();
    if pool_ids.is_empty() {
        pool_ids.push(pool_id.to_string());
    }

    Ok(Quote {
        id: generate_id(),
        dex_label: DexLabel::Raydium,
        input_asset: request.input.clone(),
        output_asset: request.output.clone(),
        input_amount: parse_amount("inputAmount", &data.input_amount)?,
        expected_output_amount: parse_amount("outputAmount", &data.output_amount)?,
        min_output_amount: parse_amount("otherAmountThreshold", &data.other_amount_threshold)?,
        route: RouteInfo {
            labels: vec![DexLabel::Raydium.as_str().to_string(); pool_ids.len()],
            pool_ids,
            price_impact_pct: data.price_impact_pct,
        },
        slippage_bps: request.slippage_bps,
        raw,
    })
}

fn swap_request_body(
    quote: &Quote,
    owner: &Pubkey,
    fee: &FeeBudget,
    tx_version: TxVersion,
) -> serde_json::Value {
    let mut body = json!({
        "computeUnitPriceMicroLamports": fee.compute_unit_price_micro_lamports().to_string(),
        "swapResponse": quote.raw,
        "txVersion": tx_version.as_str(),
        "wallet": owner.to_string(),
        "wrapSol": quote.input_asset.is_native_sol(),
        "unwrapSol": quote.output_asset.is_native_sol(),
    });
    // SPL input has to name the account the tokens are spent from
    if !quote.input_asset.is_native_sol() {
        body["inputAccount"] = get_associated_token_address(owner, &quote.input_asset.mint)
            .to_string()
            .into();
    }
    body
}

#[async_trait]
impl SwapProvider for RaydiumSwapClient {
    fn label(&self) -> DexLabel {
        DexLabel::Raydium
    }

    fn transaction_version(&self) -> TxVersion {
        self.tx_version
    }

    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, SwapError> {
        let pool_id = self.find_pool(&request.input, &request.output).await?;

        let url = format!(
            "{}/compute/swap-base-in?inputMint={}&outputMint={}&amount={}&slippageBps={}&txVersion={}",
            self.trade_url,
            request.input.mint,
            request.output.mint,
            request.amount,
            request.slippage_bps,
            self.tx_version.as_str()
        );
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| SwapError::QuoteUnavailable(format!("Raydium quote request failed: {}", e)))?;
        let raw: serde_json::Value = read_json(response)
            .await
            .map_err(|e| SwapError::QuoteUnavailable(format!("Raydium quote request failed: {}", e)))?;

        let quote = quote_from_compute(request, &pool_id, raw)?;
        info!(
            "💱 Raydium quote {}: {} {} -> {} {} (min {})",
            quote.id,
            quote.input_amount,
            quote.input_asset.symbol,
            quote.expected_output_amount,
            quote.output_asset.symbol,
            quote.min_output_amount
        );
        Ok(quote)
    }

    async fn build_transaction(
        &self,
        quote: &Quote,
        owner: &Pubkey,
        fee: &FeeBudget,
    ) -> Result<UnsignedTransaction, SwapError> {
        let body = swap_request_body(quote, owner, fee, self.tx_version);
        let response = self
            .http_client
            .post(format!("{}/transaction/swap-base-in", self.trade_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| SwapError::BuildFailure(format!("Raydium swap request failed: {}", e)))?;
        let envelope: RaydiumEnvelope<Vec<SwapTransactionEntry>> = read_json(response)
            .await
            .map_err(|e| SwapError::BuildFailure(format!("Raydium swap request failed: {}", e)))?;

        if !envelope.success {
            return Err(SwapError::BuildFailure(format!(
                "Raydium refused to build swap: {}",
                envelope.msg.unwrap_or_default()
            )));
        }
        let mut entries = envelope.data.unwrap_or_default();
        if entries.len() != 1 {
            warn!("⚠️ Raydium returned {} transactions for one swap", entries.len());
            return Err(SwapError::BuildFailure(format!(
                "expected exactly one transaction, got {}",
                entries.len()
            )));
        }
        let entry = entries.remove(0);
        let payload = decode_transaction(&entry.transaction, self.tx_version)?;

        Ok(UnsignedTransaction {
            quote_id: quote.id.clone(),
            dex_label: DexLabel::Raydium,
            payload,
            last_valid_block_height: None,
        })
    }
}
