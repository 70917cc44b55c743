use serde::{Deserialize, Serialize};
use solana_sdk::transaction::{Transaction, VersionedTransaction};
use std::fmt;
use std::str::FromStr;

use crate::shared::types::Asset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DexLabel {
    Raydium,
    Jupiter,
}

impl DexLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DexLabel::Raydium => "Raydium",
            DexLabel::Jupiter => "Jupiter",
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            DexLabel::Raydium => ProviderKind::PoolBased,
            DexLabel::Jupiter => ProviderKind::AggregatorBased,
        }
    }
}

impl fmt::Display for DexLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DexLabel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raydium" | "raydium_v4" => Ok(DexLabel::Raydium),
            "jupiter" | "jup" => Ok(DexLabel::Jupiter),
            _ => Err(anyhow::anyhow!("Unknown swap provider: {}", s)),
        }
    }
}

/// How a provider sources liquidity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Routes through a single discovered AMM pool
    PoolBased,
    /// Lets an aggregator pick the route across venues
    AggregatorBased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxVersion {
    Legacy,
    V0,
}

impl TxVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxVersion::Legacy => "LEGACY",
            TxVersion::V0 => "V0",
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub input: Asset,
    pub output: Asset,
    pub amount: u64,
    pub slippage_bps: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteInfo {
    pub pool_ids: Vec<String>,
    pub labels: Vec<String>,
    pub price_impact_pct: f64,
}

/// Price quote for one swap attempt. Never reused across attempts.
#[derive(Debug, Clone)]
pub struct Quote {
    pub id: String,
    pub dex_label: DexLabel,
    pub input_asset: Asset,
    pub output_asset: Asset,
    pub input_amount: u64,
    pub expected_output_amount: u64,
    pub min_output_amount: u64,
    pub route: RouteInfo,
    pub slippage_bps: u16,
    /// Provider document echoed back when building the transaction
    pub raw: serde_json::Value,
}

/// Prioritization fee budget for one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeBudget {
    pub priority_fee_lamports: u64,
    pub compute_unit_limit: u32,
}

impl FeeBudget {
    pub const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 200_000;

    pub fn new(priority_fee_lamports: u64) -> Self {
        Self {
            priority_fee_lamports,
            compute_unit_limit: Self::DEFAULT_COMPUTE_UNIT_LIMIT,
        }
    }

    /// Per compute unit price that spends the whole budget at the unit limit
    pub fn compute_unit_price_micro_lamports(&self) -> u64 {
        if self.compute_unit_limit == 0 {
            return 0;
        }
        ((self.priority_fee_lamports as u128 * 1_000_000) / self.compute_unit_limit as u128) as u64
    }
}

#[derive(Debug, Clone)]
pub enum TransactionPayload {
    Legacy(Transaction),
    Versioned(VersionedTransaction),
}

impl TransactionPayload {
    pub fn version(&self) -> TxVersion {
        match self {
            TransactionPayload::Legacy(_) => TxVersion::Legacy,
            TransactionPayload::Versioned(_) => TxVersion::V0,
        }
    }
}

/// Builder output bound to exactly one quote and one fee budget
#[derive(Debug, Clone)]
pub struct UnsignedTransaction {
    pub quote_id: String,
    pub dex_label: DexLabel,
    pub payload: TransactionPayload,
    pub last_valid_block_height: Option<u64>,
}
