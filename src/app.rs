// src/app.rs
use anyhow::{Context, Result};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{Config, TokenInfo};
use crate::domain::execution::{
    Backoff, ConfirmationConfig, KeypairSigner, RetryPolicy, RpcConfirmationTracker, RpcSubmitter, SubmitOptions,
    SwapOrchestrator,
};
use crate::domain::trading::{ProviderSlot, RpcBalanceQuery, RunSummary, TradeCycleDriver, TradeSettings};
use crate::exchanges::create_provider;
use crate::exchanges::types::{DexLabel, FeeBudget};
use crate::infrastructure::blockchain::{parse_commitment, SolanaRpcClient};
use crate::shared::errors::AppError;
use crate::shared::types::{Asset, TradePair};
use crate::shared::utils::sol_to_lamports;

/// Environment variables holding a base58 secret key, checked in order
const SECRET_KEY_VARS: [&str; 2] = ["SECRET_KEY", "WALLET_PRIVATE_KEY"];
const JUPITER_API_KEY_VAR: &str = "JUPITER_API_KEY";

#[derive(Clone)]
pub struct AppCfg {
    pub simulate_only: bool,
    pub rpc_url: String,
    pub commitment: CommitmentConfig,
    pub keypair_path: Option<String>,
    pub pair: TradePair,
    pub amount_in: f64,
    pub duration_minutes: u64,
    pub priority_fee_sol: f64,
    pub compute_unit_limit: u32,
    pub providers: Vec<DexLabel>,

    // Raydium
    pub raydium_api_url: String,
    pub raydium_trade_url: String,
    pub raydium_slippage_bps: u16,
    pub use_versioned_transaction: bool,

    // Jupiter
    pub jupiter_api_url: String,
    pub jupiter_api_key: Option<String>,
    pub jupiter_slippage_bps: u16,

    pub retry_policy: RetryPolicy,
    pub submit_options: SubmitOptions,
    pub confirmation: ConfirmationConfig,
}

fn asset_from(token: &TokenInfo) -> Result<Asset, AppError> {
    let mint = Pubkey::from_str(&token.mint)
        .map_err(|e| AppError::ConfigError(format!("Invalid {} mint {}: {}", token.symbol, token.mint, e)))?;
    Ok(Asset::new(mint, token.symbol.clone(), token.decimals))
}

impl AppCfg {
    pub fn from_config(cfg: Config, override_simulate: bool) -> Result<Self> {
        let pair = TradePair {
            base: asset_from(&cfg.tokens.base_token)?,
            quote: asset_from(&cfg.tokens.quote_token)?,
        };

        let providers = cfg
            .trade
            .providers
            .iter()
            .map(|name| DexLabel::from_str(name))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::ConfigError(format!("Invalid provider: {}", e)))?;

        let backoff = match cfg.retry.backoff.to_ascii_lowercase().as_str() {
            "fixed" => Backoff::Fixed,
            "exponential" => Backoff::Exponential,
            other => return Err(AppError::ConfigError(format!("Unknown backoff: {}", other)).into()),
        };
        let commitment = parse_commitment(&cfg.rpc.commitment)?;

        let jupiter_api_key = std::env::var(JUPITER_API_KEY_VAR)
            .ok()
            .filter(|key| !key.is_empty())
            .or(cfg.providers.jupiter.api_key);

        Ok(Self {
            simulate_only: override_simulate || cfg.trade.simulate_only,
            rpc_url: cfg.rpc.url,
            commitment,
            keypair_path: cfg.wallet.keypair,
            pair,
            amount_in: cfg.trade.amount_in,
            duration_minutes: cfg.trade.duration_minutes,
            priority_fee_sol: cfg.trade.priority_fee_sol,
            compute_unit_limit: cfg.trade.compute_unit_limit,
            providers,

            raydium_api_url: cfg.providers.raydium.api_url,
            raydium_trade_url: cfg.providers.raydium.trade_url,
            raydium_slippage_bps: cfg.providers.raydium.slippage_bps,
            use_versioned_transaction: cfg.providers.raydium.use_versioned_transaction,

            jupiter_api_url: cfg.providers.jupiter.api_url,
            jupiter_api_key,
            jupiter_slippage_bps: cfg.providers.jupiter.slippage_bps,

            retry_policy: RetryPolicy {
                max_attempts: Some(cfg.retry.max_attempts).filter(|max| *max > 0),
                backoff,
                base_delay: Duration::from_millis(cfg.retry.base_delay_ms),
                max_delay: Duration::from_millis(cfg.retry.max_delay_ms),
            },
            submit_options: SubmitOptions {
                skip_preflight: cfg.submit.skip_preflight,
                max_retries: cfg.submit.max_retries,
            },
            confirmation: ConfirmationConfig {
                poll_interval: Duration::from_millis(cfg.confirmation.poll_interval_ms),
                timeout: Duration::from_secs(cfg.confirmation.timeout_secs),
                commitment,
            },
        })
    }

    /// Check values that CLI overrides may have changed
    pub fn validate(&self) -> Result<(), AppError> {
        if self.amount_in.is_nan() || self.amount_in <= 0.0 {
            return Err(AppError::ConfigError(format!("amount_in must be positive, got {}", self.amount_in)));
        }
        if self.pair.base.to_raw(self.amount_in) == 0 {
            return Err(AppError::ConfigError(format!(
                "amount_in {} is below one base unit of {}",
                self.amount_in, self.pair.base.symbol
            )));
        }
        if self.duration_minutes == 0 {
            return Err(AppError::ConfigError("duration_minutes must be positive".to_string()));
        }
        if self.priority_fee_sol < 0.0 {
            return Err(AppError::ConfigError("priority_fee_sol must not be negative".to_string()));
        }
        for (name, bps) in [("raydium", self.raydium_slippage_bps), ("jupiter", self.jupiter_slippage_bps)] {
            if bps > 10_000 {
                return Err(AppError::ConfigError(format!("{} slippage {} bps exceeds 10000", name, bps)));
            }
        }
        if self.pair.base.mint == self.pair.quote.mint {
            return Err(AppError::ConfigError("base and quote tokens must differ".to_string()));
        }
        if self.providers.is_empty() {
            return Err(AppError::ConfigError("at least one provider is required".to_string()));
        }
        Ok(())
    }

    pub fn slippage_for(&self, dex_label: DexLabel) -> u16 {
        match dex_label {
            DexLabel::Raydium => self.raydium_slippage_bps,
            DexLabel::Jupiter => self.jupiter_slippage_bps,
        }
    }

    pub fn fee_budget(&self) -> FeeBudget {
        FeeBudget {
            priority_fee_lamports: sol_to_lamports(self.priority_fee_sol),
            compute_unit_limit: self.compute_unit_limit,
        }
    }
}

pub fn keypair_from_base58(secret: &str) -> Result<Keypair, AppError> {
    let bytes = bs58::decode(secret.trim())
        .into_vec()
        .map_err(|e| AppError::WalletError(format!("secret key is not base58: {}", e)))?;
    Keypair::from_bytes(&bytes).map_err(|e| AppError::WalletError(format!("invalid secret key: {}", e)))
}

/// Secret key from the environment first, then the keypair file
pub fn load_keypair(keypair_path: Option<&str>) -> Result<Keypair, AppError> {
    for var in SECRET_KEY_VARS {
        if let Ok(secret) = std::env::var(var) {
            if !secret.trim().is_empty() {
                return keypair_from_base58(&secret);
            }
        }
    }

    let path = keypair_path.ok_or_else(|| {
        AppError::WalletError(format!("set {} or provide a keypair file", SECRET_KEY_VARS.join("/")))
    })?;
    read_keypair_file(path).map_err(|e| AppError::WalletError(format!("Failed to load keypair {}: {}", path, e)))
}

pub async fn run(app_cfg: AppCfg) -> Result<RunSummary> {
    info!("Starting swap cycler");
    app_cfg.validate()?;

    let keypair = Arc::new(load_keypair(app_cfg.keypair_path.as_deref())?);
    info!("Loaded keypair: {}", keypair.pubkey());

    let rpc = SolanaRpcClient::new(app_cfg.rpc_url.clone(), app_cfg.commitment);
    if let Err(e) = rpc.check_health().await {
        warn!("{}", e);
    }
    let rpc_client = rpc.handle();

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("build HTTP client")?;

    let providers: Vec<ProviderSlot> = app_cfg
        .providers
        .iter()
        .map(|label| {
            info!("Provider {} ({:?}), slippage {} bps", label, label.kind(), app_cfg.slippage_for(*label));
            ProviderSlot {
                provider: create_provider(*label, &app_cfg, http_client.clone()),
                slippage_bps: app_cfg.slippage_for(*label),
            }
        })
        .collect();

    let fee = app_cfg.fee_budget();
    info!(
        "Pair {}/{}, {} {} per buy, priority fee {} lamports, {} minute(s)",
        app_cfg.pair.base.symbol,
        app_cfg.pair.quote.symbol,
        app_cfg.amount_in,
        app_cfg.pair.base.symbol,
        fee.priority_fee_lamports,
        app_cfg.duration_minutes
    );

    let orchestrator = SwapOrchestrator::new(
        Arc::new(KeypairSigner::new(keypair)),
        Arc::new(RpcSubmitter::new(rpc_client.clone(), rpc.commitment())),
        Arc::new(RpcConfirmationTracker::new(rpc_client.clone(), app_cfg.confirmation)),
        fee,
        app_cfg.submit_options,
        app_cfg.retry_policy,
    );

    let settings = TradeSettings {
        amount_in: app_cfg.pair.base.to_raw(app_cfg.amount_in),
        pair: app_cfg.pair.clone(),
        duration: Duration::from_secs(app_cfg.duration_minutes.saturating_mul(60)),
        simulate_only: app_cfg.simulate_only,
    };

    let mut driver = TradeCycleDriver::new(
        orchestrator,
        Arc::new(RpcBalanceQuery::new(rpc_client)),
        providers,
        settings,
    );
    Ok(driver.run().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_cfg() -> AppCfg {
        AppCfg::from_config(Config::default(), false).unwrap()
    }

    #[test]
    fn test_defaults_are_valid() {
        let cfg = app_cfg();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.providers, vec![DexLabel::Raydium, DexLabel::Jupiter]);
        assert!(cfg.pair.base.is_native_sol());
        assert_eq!(cfg.slippage_for(DexLabel::Raydium), 500);
        assert_eq!(cfg.slippage_for(DexLabel::Jupiter), 50);
        assert_eq!(cfg.retry_policy.max_attempts, Some(20));
        assert_eq!(cfg.confirmation.commitment, CommitmentConfig::finalized());
    }

    #[test]
    fn test_fee_budget_from_sol() {
        let cfg = app_cfg();
        let fee = cfg.fee_budget();
        assert_eq!(fee.priority_fee_lamports, 500_000);
        assert_eq!(fee.compute_unit_limit, 200_000);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut cfg = app_cfg();
        cfg.amount_in = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = app_cfg();
        cfg.duration_minutes = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = app_cfg();
        cfg.jupiter_slippage_bps = 10_001;
        assert!(cfg.validate().is_err());

        let mut cfg = app_cfg();
        cfg.pair.quote = cfg.pair.base.clone();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_invalid_mint_and_provider_are_config_errors() {
        let mut config = Config::default();
        config.tokens.quote_token.mint = "not-a-mint".to_string();
        assert!(AppCfg::from_config(config, false).is_err());

        let mut config = Config::default();
        config.trade.providers = vec!["orca".to_string()];
        assert!(AppCfg::from_config(config, false).is_err());
    }

    #[test]
    fn test_unlimited_retry_when_cap_is_zero() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        config.retry.backoff = "fixed".to_string();
        let cfg = AppCfg::from_config(config, true).unwrap();
        assert_eq!(cfg.retry_policy.max_attempts, None);
        assert_eq!(cfg.retry_policy.backoff, Backoff::Fixed);
        assert!(cfg.simulate_only);
    }

    #[test]
    fn test_keypair_from_base58() {
        let keypair = Keypair::new();
        let restored = keypair_from_base58(&keypair.to_base58_string()).unwrap();
        assert_eq!(restored.pubkey(), keypair.pubkey());

        assert!(keypair_from_base58("0OIl").is_err());
        assert!(keypair_from_base58("3mJr7AoUXx2Wqd").is_err());
    }
}
