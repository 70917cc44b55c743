//! Common types used across the application

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::fmt;

/// Tradable asset (SPL mint) with the metadata needed to format amounts
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub mint: Pubkey,
    pub symbol: String,
    pub decimals: u8,
}

impl Asset {
    pub fn new(mint: Pubkey, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            mint,
            symbol: symbol.into(),
            decimals,
        }
    }

    /// Convert a human readable amount into the nearest number of base units
    pub fn to_raw(&self, ui_amount: f64) -> u64 {
        if ui_amount <= 0.0 {
            return 0;
        }
        // 0.29 * 1e9 is 289_999_999.99..., so truncating would lose a unit
        (ui_amount * 10_f64.powi(self.decimals as i32)).round() as u64
    }

    pub fn to_ui(&self, raw_amount: u64) -> f64 {
        raw_amount as f64 / 10_f64.powi(self.decimals as i32)
    }

    pub fn is_native_sol(&self) -> bool {
        self.mint == spl_token::native_mint::id()
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.mint)
    }
}

/// Pair of assets a cycle trades: spend `base` to buy `quote`, then sell it back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradePair {
    pub base: Asset,
    pub quote: Asset,
}

impl TradePair {
    /// (input, output) assets for a direction
    pub fn legs(&self, direction: TradeDirection) -> (&Asset, &Asset) {
        match direction {
            TradeDirection::Buy => (&self.base, &self.quote),
            TradeDirection::Sell => (&self.quote, &self.base),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl TradeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::Buy => "buy",
            TradeDirection::Sell => "sell",
        }
    }
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stages of a single swap attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapStage {
    Quoting,
    Building,
    Signing,
    Submitting,
    AwaitingConfirmation,
}

impl SwapStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwapStage::Quoting => "quoting",
            SwapStage::Building => "building",
            SwapStage::Signing => "signing",
            SwapStage::Submitting => "submitting",
            SwapStage::AwaitingConfirmation => "awaiting confirmation",
        }
    }
}

impl fmt::Display for SwapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction identifier as returned by the node (base58 signature on mainnet)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn explorer_url(&self) -> String {
        format!("https://solscan.io/tx/{}", self.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<solana_sdk::signature::Signature> for TransactionId {
    fn from(signature: solana_sdk::signature::Signature) -> Self {
        Self(signature.to_string())
    }
}
