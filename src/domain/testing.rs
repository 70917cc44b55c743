//! In-memory collaborators for unit tests

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    message::{v0, Message, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    system_instruction,
    transaction::{Transaction, VersionedTransaction},
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::domain::execution::{
    ConfirmationResult, ConfirmationTracker, KeypairSigner, RetryPolicy, SignedTransaction, SimulationReport,
    SubmissionHandle, SubmitOptions, Submitter, SwapOrchestrator,
};
use crate::domain::trading::{BalanceQuery, TokenBalance};
use crate::exchanges::types::{
    DexLabel, FeeBudget, Quote, QuoteRequest, RouteInfo, TransactionPayload, TxVersion, UnsignedTransaction,
};
use crate::exchanges::SwapProvider;
use crate::shared::errors::SwapError;
use crate::shared::types::{Asset, TradePair, TransactionId};
use crate::shared::utils::generate_id;

pub fn sample_pair() -> TradePair {
    TradePair {
        base: Asset::new(spl_token::native_mint::id(), "SOL", 9),
        quote: Asset::new(Pubkey::new_unique(), "USDC", 6),
    }
}

pub fn test_orchestrator(submitter: Arc<MockSubmitter>, tracker: Arc<MockTracker>) -> SwapOrchestrator {
    SwapOrchestrator::new(
        Arc::new(KeypairSigner::new(Arc::new(solana_sdk::signature::Keypair::new()))),
        submitter,
        tracker,
        FeeBudget::new(100_000),
        SubmitOptions::default(),
        RetryPolicy {
            max_attempts: Some(3),
            ..RetryPolicy::default()
        },
    )
}

/// Quotes a fixed route at a 1:2 rate and builds a fresh transfer per quote
pub struct MockProvider {
    label: DexLabel,
    version: TxVersion,
    failing_quotes: Mutex<u32>,
    mismatched_builds: Mutex<u32>,
    requests: Mutex<Vec<QuoteRequest>>,
    quote_ids: Mutex<Vec<String>>,
    builds: Mutex<u32>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            label: DexLabel::Jupiter,
            version: TxVersion::V0,
            failing_quotes: Mutex::new(0),
            mismatched_builds: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
            quote_ids: Mutex::new(Vec::new()),
            builds: Mutex::new(0),
        }
    }

    pub fn with_label(mut self, label: DexLabel) -> Self {
        self.label = label;
        self
    }

    pub fn with_version(mut self, version: TxVersion) -> Self {
        self.version = version;
        self
    }

    /// The first `n` quote requests fail with `QuoteUnavailable`
    pub fn failing_quotes(self, n: u32) -> Self {
        *self.failing_quotes.lock().unwrap() = n;
        self
    }

    /// The first `n` builds return the other transaction version
    pub fn mismatched_builds(self, n: u32) -> Self {
        *self.mismatched_builds.lock().unwrap() = n;
        self
    }

    pub fn quote_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<QuoteRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn quote_ids(&self) -> Vec<String> {
        self.quote_ids.lock().unwrap().clone()
    }

    pub fn build_count(&self) -> u32 {
        *self.builds.lock().unwrap()
    }

    fn take(counter: &Mutex<u32>) -> bool {
        let mut remaining = counter.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl SwapProvider for MockProvider {
    fn label(&self) -> DexLabel {
        self.label
    }

    fn transaction_version(&self) -> TxVersion {
        self.version
    }

    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, SwapError> {
        self.requests.lock().unwrap().push(request.clone());
        if Self::take(&self.failing_quotes) {
            return Err(SwapError::QuoteUnavailable("no route".to_string()));
        }

        let id = generate_id();
        self.quote_ids.lock().unwrap().push(id.clone());
        Ok(Quote {
            id,
            dex_label: self.label,
            input_asset: request.input.clone(),
            output_asset: request.output.clone(),
            input_amount: request.amount,
            expected_output_amount: request.amount * 2,
            min_output_amount: request.amount * 2,
            route: RouteInfo {
                pool_ids: vec!["pool-1".to_string()],
                labels: vec!["Mock".to_string()],
                price_impact_pct: 0.0,
            },
            slippage_bps: request.slippage_bps,
            raw: serde_json::Value::Null,
        })
    }

    async fn build_transaction(
        &self,
        quote: &Quote,
        owner: &Pubkey,
        _fee: &FeeBudget,
    ) -> Result<UnsignedTransaction, SwapError> {
        *self.builds.lock().unwrap() += 1;

        let version = if Self::take(&self.mismatched_builds) {
            match self.version {
                TxVersion::Legacy => TxVersion::V0,
                TxVersion::V0 => TxVersion::Legacy,
            }
        } else {
            self.version
        };

        let ix = system_instruction::transfer(owner, &Pubkey::new_unique(), quote.input_amount);
        let blockhash = Hash::new_unique();
        let payload = match version {
            TxVersion::Legacy => TransactionPayload::Legacy(Transaction::new_unsigned(Message::new_with_blockhash(
                &[ix],
                Some(owner),
                &blockhash,
            ))),
            TxVersion::V0 => {
                let message = v0::Message::try_compile(owner, &[ix], &[], blockhash).unwrap();
                TransactionPayload::Versioned(VersionedTransaction {
                    signatures: vec![Signature::default()],
                    message: VersionedMessage::V0(message),
                })
            }
        };

        Ok(UnsignedTransaction {
            quote_id: quote.id.clone(),
            dex_label: self.label,
            payload,
            last_valid_block_height: Some(1_000),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SubmittedRecord {
    pub quote_id: String,
    pub signature: Signature,
}

/// Hands out scripted transaction ids, optionally rejecting the first submissions
pub struct MockSubmitter {
    ids: Mutex<VecDeque<String>>,
    rejections: Mutex<u32>,
    submissions: Mutex<Vec<SubmittedRecord>>,
    simulations: Mutex<u32>,
}

impl MockSubmitter {
    pub fn with_ids(ids: &[&str]) -> Self {
        Self {
            ids: Mutex::new(ids.iter().map(|id| id.to_string()).collect()),
            rejections: Mutex::new(0),
            submissions: Mutex::new(Vec::new()),
            simulations: Mutex::new(0),
        }
    }

    pub fn rejecting(times: u32, accepted_id: &str) -> Self {
        let submitter = Self::with_ids(&[accepted_id]);
        *submitter.rejections.lock().unwrap() = times;
        submitter
    }

    /// Every submission, rejected ones included
    pub fn submissions(&self) -> Vec<SubmittedRecord> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn simulations(&self) -> u32 {
        *self.simulations.lock().unwrap()
    }
}

#[async_trait]
impl Submitter for MockSubmitter {
    async fn submit(&self, signed: SignedTransaction, _options: &SubmitOptions) -> Result<SubmissionHandle, SwapError> {
        self.submissions.lock().unwrap().push(SubmittedRecord {
            quote_id: signed.quote_id.clone(),
            signature: signed.signature,
        });

        {
            let mut rejections = self.rejections.lock().unwrap();
            if *rejections > 0 {
                *rejections -= 1;
                return Err(SwapError::SubmissionRejected("Blockhash not found".to_string()));
            }
        }

        let id = self
            .ids
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| signed.signature.to_string());
        Ok(SubmissionHandle {
            transaction_id: TransactionId::new(id),
            quote_id: signed.quote_id,
            last_valid_block_height: signed.last_valid_block_height.unwrap_or_default(),
            submitted_at: chrono::Utc::now(),
        })
    }

    async fn simulate(&self, _signed: SignedTransaction) -> Result<SimulationReport, SwapError> {
        *self.simulations.lock().unwrap() += 1;
        Ok(SimulationReport {
            success: true,
            error: None,
            units_consumed: Some(42_000),
            logs: vec!["Program log: mock".to_string()],
        })
    }
}

/// Returns scripted results in order, then `Confirmed` once the script runs out
pub struct MockTracker {
    results: Mutex<VecDeque<ConfirmationResult>>,
    calls: Mutex<u32>,
    delay: Duration,
}

impl MockTracker {
    pub fn new(results: Vec<ConfirmationResult>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            calls: Mutex::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Each wait takes `delay` of (tokio) time
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ConfirmationTracker for MockTracker {
    async fn await_confirmation(&self, _handle: &SubmissionHandle) -> ConfirmationResult {
        *self.calls.lock().unwrap() += 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ConfirmationResult::Confirmed { slot: 1 })
    }
}

/// Fixed holdings by mint; anything else has no holding record
pub struct MockBalance {
    holdings: HashMap<Pubkey, u64>,
    queried: Mutex<Vec<Pubkey>>,
}

impl MockBalance {
    pub fn new() -> Self {
        Self {
            holdings: HashMap::new(),
            queried: Mutex::new(Vec::new()),
        }
    }

    pub fn holding(mut self, mint: Pubkey, raw_amount: u64) -> Self {
        self.holdings.insert(mint, raw_amount);
        self
    }

    pub fn queried(&self) -> Vec<Pubkey> {
        self.queried.lock().unwrap().clone()
    }
}

#[async_trait]
impl BalanceQuery for MockBalance {
    async fn balance_of(&self, _owner: &Pubkey, asset: &Asset) -> TokenBalance {
        self.queried.lock().unwrap().push(asset.mint);
        match self.holdings.get(&asset.mint) {
            Some(raw) => TokenBalance::from_raw(*raw, asset.decimals),
            None => TokenBalance::zero(asset.decimals),
        }
    }
}
