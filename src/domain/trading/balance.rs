//! Wallet holdings lookup

use async_trait::async_trait;
use solana_client::{nonblocking::rpc_client::RpcClient, rpc_request::TokenAccountsFilter};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::shared::errors::SwapError;
use crate::shared::types::Asset;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenBalance {
    pub raw_amount: u64,
    pub decimals: u8,
    pub ui_amount: f64,
}

impl TokenBalance {
    pub fn zero(decimals: u8) -> Self {
        Self {
            raw_amount: 0,
            decimals,
            ui_amount: 0.0,
        }
    }

    pub fn from_raw(raw_amount: u64, decimals: u8) -> Self {
        Self {
            raw_amount,
            decimals,
            ui_amount: raw_amount as f64 / 10_f64.powi(decimals as i32),
        }
    }
}

#[async_trait]
pub trait BalanceQuery: Send + Sync {
    /// Holding of `asset` by `owner`. A missing holding record reads as zero.
    async fn balance_of(&self, owner: &Pubkey, asset: &Asset) -> TokenBalance;
}

pub struct RpcBalanceQuery {
    rpc_client: Arc<RpcClient>,
}

impl RpcBalanceQuery {
    pub fn new(rpc_client: Arc<RpcClient>) -> Self {
        Self { rpc_client }
    }

    /// Token account holding of the mint. Native SOL is read from its wrapped
    /// account, never from the wallet's lamports, which also pay fees and rent.
    async fn fetch(&self, owner: &Pubkey, asset: &Asset) -> Result<TokenBalance, SwapError> {
        let accounts = self
            .rpc_client
            .get_token_accounts_by_owner(owner, TokenAccountsFilter::Mint(asset.mint))
            .await
            .map_err(|e| SwapError::BalanceQueryFailure(e.to_string()))?;

        let Some(account) = accounts.first() else {
            debug!("No {} account for {}", asset.symbol, owner);
            return Ok(TokenBalance::zero(asset.decimals));
        };
        let account_key = Pubkey::from_str(&account.pubkey)
            .map_err(|e| SwapError::BalanceQueryFailure(format!("invalid token account {}: {}", account.pubkey, e)))?;

        let amount = self
            .rpc_client
            .get_token_account_balance(&account_key)
            .await
            .map_err(|e| SwapError::BalanceQueryFailure(e.to_string()))?;

        let raw_amount = amount
            .amount
            .parse::<u64>()
            .map_err(|e| SwapError::BalanceQueryFailure(format!("invalid amount {}: {}", amount.amount, e)))?;
        Ok(TokenBalance::from_raw(raw_amount, amount.decimals))
    }
}

#[async_trait]
impl BalanceQuery for RpcBalanceQuery {
    async fn balance_of(&self, owner: &Pubkey, asset: &Asset) -> TokenBalance {
        match self.fetch(owner, asset).await {
            Ok(balance) => {
                debug!("💰 {} balance: {}", asset.symbol, balance.ui_amount);
                balance
            }
            Err(e) => {
                warn!("{}, treating {} balance as zero", e, asset.symbol);
                TokenBalance::zero(asset.decimals)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use solana_client::rpc_request::RpcRequest;
    use solana_rpc_client::mock_sender::Mocks;

    const TOKEN_ACCOUNT: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

    fn context(value: Value) -> Value {
        json!({ "context": { "slot": 1 }, "value": value })
    }

    fn token_accounts(pubkeys: &[&str]) -> Value {
        let accounts: Vec<Value> = pubkeys
            .iter()
            .map(|pubkey| {
                json!({
                    "pubkey": pubkey,
                    "account": {
                        "lamports": 2_039_280,
                        "data": ["", "base64"],
                        "owner": spl_token::id().to_string(),
                        "executable": false,
                        "rentEpoch": 0,
                        "space": 165
                    }
                })
            })
            .collect();
        context(json!(accounts))
    }

    fn token_amount(amount: &str, decimals: u8, ui_amount: f64) -> Value {
        context(json!({
            "amount": amount,
            "decimals": decimals,
            "uiAmount": ui_amount,
            "uiAmountString": ui_amount.to_string()
        }))
    }

    fn query(mocks: Mocks) -> RpcBalanceQuery {
        RpcBalanceQuery::new(Arc::new(RpcClient::new_mock_with_mocks("succeeds".to_string(), mocks)))
    }

    #[test]
    fn test_balance_from_raw() {
        let balance = TokenBalance::from_raw(1_500_000, 6);
        assert_eq!(balance.raw_amount, 1_500_000);
        assert!((balance.ui_amount - 1.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_missing_holding_reads_as_zero() {
        let mut mocks = Mocks::new();
        mocks.insert(RpcRequest::GetTokenAccountsByOwner, token_accounts(&[]));
        let asset = Asset::new(Pubkey::new_unique(), "BONK", 5);

        let balance = query(mocks).balance_of(&Pubkey::new_unique(), &asset).await;
        assert_eq!(balance, TokenBalance::zero(5));
    }

    #[tokio::test]
    async fn test_token_account_balance() {
        let mut mocks = Mocks::new();
        mocks.insert(RpcRequest::GetTokenAccountsByOwner, token_accounts(&[TOKEN_ACCOUNT]));
        mocks.insert(RpcRequest::GetTokenAccountBalance, token_amount("1500000", 6, 1.5));
        let asset = Asset::new(Pubkey::new_unique(), "USDC", 6);

        let balance = query(mocks).balance_of(&Pubkey::new_unique(), &asset).await;
        assert_eq!(balance, TokenBalance::from_raw(1_500_000, 6));
    }

    #[tokio::test]
    async fn test_native_sol_reads_wrapped_account_not_wallet() {
        // the mock node reports 50 lamports for getBalance
        let mut mocks = Mocks::new();
        mocks.insert(RpcRequest::GetTokenAccountsByOwner, token_accounts(&[]));
        let sol = Asset::new(spl_token::native_mint::id(), "SOL", 9);

        let balance = query(mocks).balance_of(&Pubkey::new_unique(), &sol).await;
        assert_eq!(balance.raw_amount, 0);
    }

    #[tokio::test]
    async fn test_wrapped_sol_holding_is_sold() {
        let mut mocks = Mocks::new();
        mocks.insert(RpcRequest::GetTokenAccountsByOwner, token_accounts(&[TOKEN_ACCOUNT]));
        mocks.insert(RpcRequest::GetTokenAccountBalance, token_amount("250000000", 9, 0.25));
        let sol = Asset::new(spl_token::native_mint::id(), "SOL", 9);

        let balance = query(mocks).balance_of(&Pubkey::new_unique(), &sol).await;
        assert_eq!(balance.raw_amount, 250_000_000);
    }

    #[tokio::test]
    async fn test_unreadable_amount_reads_as_zero() {
        let mut mocks = Mocks::new();
        mocks.insert(RpcRequest::GetTokenAccountsByOwner, token_accounts(&[TOKEN_ACCOUNT]));
        mocks.insert(RpcRequest::GetTokenAccountBalance, token_amount("lots", 6, 1.0));
        let asset = Asset::new(Pubkey::new_unique(), "USDC", 6);

        let balance = query(mocks).balance_of(&Pubkey::new_unique(), &asset).await;
        assert_eq!(balance, TokenBalance::zero(6));
    }

    #[tokio::test]
    async fn test_unreachable_node_reads_as_zero() {
        // nothing listens on port 9
        let query = RpcBalanceQuery::new(Arc::new(RpcClient::new("http://127.0.0.1:9".to_string())));
        let asset = Asset::new(Pubkey::new_unique(), "BONK", 5);

        let balance = query.balance_of(&Pubkey::new_unique(), &asset).await;
        assert_eq!(balance.raw_amount, 0);
    }
}
