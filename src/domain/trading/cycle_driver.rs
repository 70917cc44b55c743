//! Buy/sell cycle driver

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

use super::balance::BalanceQuery;
use crate::domain::execution::{SwapOrchestrator, SwapOutcome};
use crate::exchanges::types::{DexLabel, QuoteRequest};
use crate::exchanges::SwapProvider;
use crate::shared::errors::SwapError;
use crate::shared::types::{TradeDirection, TradePair};
use crate::shared::utils::format_amount;

/// A provider together with the slippage tolerance used against it
#[derive(Clone)]
pub struct ProviderSlot {
    pub provider: Arc<dyn SwapProvider>,
    pub slippage_bps: u16,
}

#[derive(Debug, Clone)]
pub struct TradeSettings {
    pub pair: TradePair,
    /// Base asset spent on every buy, in base units
    pub amount_in: u64,
    pub duration: Duration,
    pub simulate_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeCycleState {
    pub direction: TradeDirection,
    pub provider: DexLabel,
    pub deadline: DateTime<Utc>,
    pub cycles_completed: u32,
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub provider: DexLabel,
    pub buy: SwapOutcome,
    pub sell: SwapOutcome,
    pub sold_amount: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles_completed: u32,
    pub cycles_failed: u32,
}

pub struct TradeCycleDriver {
    orchestrator: SwapOrchestrator,
    balance_query: Arc<dyn BalanceQuery>,
    providers: Vec<ProviderSlot>,
    settings: TradeSettings,
    deadline_at: Instant,
    state: TradeCycleState,
}

impl TradeCycleDriver {
    /// The deadline starts counting when the driver is created
    pub fn new(
        orchestrator: SwapOrchestrator,
        balance_query: Arc<dyn BalanceQuery>,
        providers: Vec<ProviderSlot>,
        settings: TradeSettings,
    ) -> Self {
        let deadline_at = Instant::now() + settings.duration;
        let deadline = Utc::now() + chrono::Duration::from_std(settings.duration).unwrap_or_else(|_| chrono::Duration::weeks(52));
        let state = TradeCycleState {
            direction: TradeDirection::Buy,
            provider: providers
                .first()
                .map(|slot| slot.provider.label())
                .unwrap_or(DexLabel::Raydium),
            deadline,
            cycles_completed: 0,
        };

        Self {
            orchestrator,
            balance_query,
            providers,
            settings,
            deadline_at,
            state,
        }
    }

    pub fn state(&self) -> &TradeCycleState {
        &self.state
    }

    fn request(&self, direction: TradeDirection, amount: u64, slippage_bps: u16) -> QuoteRequest {
        let (input, output) = self.settings.pair.legs(direction);
        QuoteRequest {
            input: input.clone(),
            output: output.clone(),
            amount,
            slippage_bps,
        }
    }

    /// Buy with the configured amount, then sell back the whole acquired balance
    pub async fn run_cycle(&mut self, slot: &ProviderSlot) -> Result<CycleReport, SwapError> {
        let provider = slot.provider.as_ref();
        self.state.provider = provider.label();

        self.state.direction = TradeDirection::Buy;
        let buy_request = self.request(TradeDirection::Buy, self.settings.amount_in, slot.slippage_bps);
        let buy = self.orchestrator.execute(provider, &buy_request).await?;

        let acquired = &self.settings.pair.quote;
        let balance = self
            .balance_query
            .balance_of(&self.orchestrator.owner(), acquired)
            .await;
        if balance.raw_amount == 0 {
            warn!("No {} holding visible yet, selling 0", acquired.symbol);
        } else {
            info!("💰 Holding {} {}", format_amount(balance.raw_amount, acquired.decimals), acquired.symbol);
        }

        self.state.direction = TradeDirection::Sell;
        let sell_request = self.request(TradeDirection::Sell, balance.raw_amount, slot.slippage_bps);
        let sell = self.orchestrator.execute(provider, &sell_request).await?;

        self.state.direction = TradeDirection::Buy;
        Ok(CycleReport {
            provider: provider.label(),
            buy,
            sell,
            sold_amount: balance.raw_amount,
        })
    }

    /// Alternate cycles across providers until the deadline passes.
    ///
    /// The deadline is only checked before a cycle starts.
    pub async fn run(&mut self) -> RunSummary {
        let mut summary = RunSummary::default();
        if self.providers.is_empty() {
            warn!("No swap providers configured");
            return summary;
        }
        if self.settings.simulate_only {
            self.simulate_all().await;
            return summary;
        }

        info!("Trading {} until {}", self.settings.pair.quote.symbol, self.state.deadline);

        let providers = self.providers.clone();
        'cycles: loop {
            for slot in &providers {
                if Instant::now() >= self.deadline_at {
                    break 'cycles;
                }

                match self.run_cycle(slot).await {
                    Ok(report) => {
                        summary.cycles_completed += 1;
                        self.state.cycles_completed = summary.cycles_completed;
                        info!(
                            "🔁 {} cycle #{} done: buy {}, sell {} ({} {})",
                            report.provider,
                            summary.cycles_completed,
                            report.buy.transaction_id,
                            report.sell.transaction_id,
                            format_amount(report.sold_amount, self.settings.pair.quote.decimals),
                            self.settings.pair.quote.symbol
                        );
                    }
                    Err(e) => {
                        summary.cycles_failed += 1;
                        error!("{} cycle failed: {}", slot.provider.label(), e);
                    }
                }
            }
        }

        info!(
            "⏰ Deadline reached: {} cycles completed, {} failed",
            summary.cycles_completed, summary.cycles_failed
        );
        summary
    }

    async fn simulate_all(&mut self) {
        info!("Simulation mode - not sending real transactions");
        let providers = self.providers.clone();
        for slot in &providers {
            self.state.provider = slot.provider.label();
            let request = self.request(TradeDirection::Buy, self.settings.amount_in, slot.slippage_bps);
            if let Err(e) = self.orchestrator.simulate(slot.provider.as_ref(), &request).await {
                error!("{} simulation failed: {}", slot.provider.label(), e);
            }
        }
    }
}
