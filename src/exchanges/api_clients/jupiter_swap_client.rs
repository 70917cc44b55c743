use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use solana_sdk::pubkey::Pubkey;
use tracing::info;

use super::read_json;
use crate::exchanges::types::{
    DexLabel, FeeBudget, Quote, QuoteRequest, RouteInfo, TxVersion, UnsignedTransaction,
};
use crate::exchanges::utils::{decode_transaction, parse_amount};
use crate::exchanges::SwapProvider;
use crate::shared::errors::SwapError;
use crate::shared::utils::generate_id;

pub const DEFAULT_JUPITER_API_URL: &str = "https://lite-api.jup.ag/swap/v1";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    in_amount: String,
    out_amount: String,
    other_amount_threshold: String,
    #[serde(default)]
    price_impact_pct: String,
    #[serde(default)]
    route_plan: Vec<RoutePlanEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoutePlanEntry {
    swap_info: SwapInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapInfo {
    amm_key: String,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapResponse {
    swap_transaction: String,
    #[serde(default)]
    last_valid_block_height: Option<u64>,
}

/// Aggregator based provider backed by the Jupiter swap API (`/quote` -> `/swap`)
pub struct JupiterSwapClient {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl JupiterSwapClient {
    pub fn new(http_client: Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
        }
    }

    fn with_api_key(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("X-API-KEY", key),
            None => builder,
        }
    }
}

fn quote_from_response(request: &QuoteRequest, raw: serde_json::Value) -> Result<Quote, SwapError> {
    // Jupiter answers "no route" with a 4xx and {"error": ..., "errorCode": ...}
    if let Some(error) = raw.get("error").and_then(|v| v.as_str()) {
        return Err(SwapError::QuoteUnavailable(format!("Jupiter has no route: {}", error)));
    }
    let response: QuoteResponse = serde_json::from_value(raw.clone())
        .map_err(|e| SwapError::QuoteUnavailable(format!("unexpected Jupiter quote: {}", e)))?;
    if response.route_plan.is_empty() {
        return Err(SwapError::QuoteUnavailable("Jupiter returned an empty route".to_string()));
    }

    let (pool_ids, labels): (Vec<String>, Vec<String>) = response
        .route_plan
        .into_iter()
        .map(|entry| {
            let label = entry.swap_info.label.unwrap_or_else(|| "unknown".to_string());
            (entry.swap_info.amm_key, label)
        })
        .unzip();

    Ok(Quote {
        id: generate_id(),
        dex_label: DexLabel::Jupiter,
        input_asset: request.input.clone(),
        output_asset: request.output.clone(),
        input_amount: parse_amount("inAmount", &response.in_amount)?,
        expected_output_amount: parse_amount("outAmount", &response.out_amount)?,
        min_output_amount: parse_amount("otherAmountThreshold", &response.other_amount_threshold)?,
        route: RouteInfo {
            pool_ids,
            labels,
            price_impact_pct: response.price_impact_pct.parse().unwrap_or(0.0),
        },
        slippage_bps: request.slippage_bps,
        raw,
    })
}

fn swap_request_body(quote: &Quote, owner: &Pubkey, fee: &FeeBudget) -> serde_json::Value {
    json!({
        "quoteResponse": quote.raw,
        "userPublicKey": owner.to_string(),
        "wrapAndUnwrapSol": true,
        "dynamicComputeUnitLimit": true,
        "prioritizationFeeLamports": fee.priority_fee_lamports,
    })
}

#[async_trait]
impl SwapProvider for JupiterSwapClient {
    fn label(&self) -> DexLabel {
        DexLabel::Jupiter
    }

    fn transaction_version(&self) -> TxVersion {
        TxVersion::V0
    }

    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, SwapError> {
        let url = format!(
            "{}/quote?inputMint={}&outputMint={}&amount={}&slippageBps={}",
            self.base_url, request.input.mint, request.output.mint, request.amount, request.slippage_bps
        );
        let response = self
            .with_api_key(self.http_client.get(&url))
            .send()
            .await
            .map_err(|e| SwapError::QuoteUnavailable(format!("Jupiter quote request failed: {}", e)))?;

        // Error bodies are still JSON, let `quote_from_response` classify them
        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SwapError::QuoteUnavailable(format!("Jupiter quote request failed: {}", e)))?;

        let quote = quote_from_response(request, raw)?;
        info!(
            "💱 Jupiter quote {}: {} {} -> {} {} via {}",
            quote.id,
            quote.input_amount,
            quote.input_asset.symbol,
            quote.expected_output_amount,
            quote.output_asset.symbol,
            quote.route.labels.join(" > ")
        );
        Ok(quote)
    }

    async fn build_transaction(
        &self,
        quote: &Quote,
        owner: &Pubkey,
        fee: &FeeBudget,
    ) -> Result<UnsignedTransaction, SwapError> {
        let response = self
            .with_api_key(self.http_client.post(format!("{}/swap", self.base_url)))
            .json(&swap_request_body(quote, owner, fee))
            .send()
            .await
            .map_err(|e| SwapError::BuildFailure(format!("Jupiter swap request failed: {}", e)))?;
        let swap: SwapResponse = read_json(response)
            .await
            .map_err(|e| SwapError::BuildFailure(format!("Jupiter swap request failed: {}", e)))?;

        let payload = decode_transaction(&swap.swap_transaction, TxVersion::V0)?;
        Ok(UnsignedTransaction {
            quote_id: quote.id.clone(),
            dex_label: DexLabel::Jupiter,
            payload,
            last_valid_block_height: swap.last_valid_block_height,
        })
    }
}
