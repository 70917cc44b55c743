use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

use crate::exchanges::api_clients::{DEFAULT_JUPITER_API_URL, DEFAULT_RAYDIUM_API_URL, DEFAULT_RAYDIUM_TRADE_URL};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcCfg {
    pub url: String,
    pub commitment: String,
}

impl Default for RpcCfg {
    fn default() -> Self {
        Self {
            url: "https://api.mainnet-beta.solana.com".to_string(),
            commitment: "finalized".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WalletCfg {
    /// Keypair file, used when no secret key is set in the environment
    pub keypair: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    pub mint: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenCfg {
    /// Asset spent on buys and recovered on sells
    pub base_token: TokenInfo,
    pub quote_token: TokenInfo,
}

impl Default for TokenCfg {
    fn default() -> Self {
        Self {
            base_token: TokenInfo {
                mint: "So11111111111111111111111111111111111111112".to_string(),
                symbol: "SOL".to_string(),
                decimals: 9,
            },
            quote_token: TokenInfo {
                mint: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string(),
                symbol: "USDC".to_string(),
                decimals: 6,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TradeCfg {
    /// Base token spent per buy, in UI units
    pub amount_in: f64,
    pub duration_minutes: u64,
    pub priority_fee_sol: f64,
    pub compute_unit_limit: u32,
    pub simulate_only: bool,
    /// Providers cycled through, in order
    pub providers: Vec<String>,
}

impl Default for TradeCfg {
    fn default() -> Self {
        Self {
            amount_in: 0.01,
            duration_minutes: 60,
            priority_fee_sol: 0.0005,
            compute_unit_limit: 200_000,
            simulate_only: false,
            providers: vec!["raydium".to_string(), "jupiter".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RaydiumCfg {
    pub api_url: String,
    pub trade_url: String,
    pub slippage_bps: u16,
    pub use_versioned_transaction: bool,
}

impl Default for RaydiumCfg {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_RAYDIUM_API_URL.to_string(),
            trade_url: DEFAULT_RAYDIUM_TRADE_URL.to_string(),
            slippage_bps: 500,
            use_versioned_transaction: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JupiterCfg {
    pub api_url: String,
    pub api_key: Option<String>,
    pub slippage_bps: u16,
}

impl Default for JupiterCfg {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_JUPITER_API_URL.to_string(),
            api_key: None,
            slippage_bps: 50,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersCfg {
    pub raydium: RaydiumCfg,
    pub jupiter: JupiterCfg,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryCfg {
    /// 0 retries until success
    pub max_attempts: u32,
    /// "fixed" or "exponential"
    pub backoff: String,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryCfg {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            backoff: "exponential".to_string(),
            base_delay_ms: 500,
            max_delay_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubmitCfg {
    pub skip_preflight: bool,
    pub max_retries: usize,
}

impl Default for SubmitCfg {
    fn default() -> Self {
        Self {
            skip_preflight: true,
            max_retries: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfirmationCfg {
    pub poll_interval_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ConfirmationCfg {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            timeout_secs: 90,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rpc: RpcCfg,
    pub wallet: WalletCfg,
    pub tokens: TokenCfg,
    pub trade: TradeCfg,
    pub providers: ProvidersCfg,
    pub retry: RetryCfg,
    pub submit: SubmitCfg,
    pub confirmation: ConfirmationCfg,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path.as_ref())
            .with_context(|| format!("read {}", path.as_ref().display()))?;
        Self::from_toml(&s)
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s).context("parse Config.toml")?;
        Ok(cfg)
    }
}
