//! Trading domain - balance reads and the buy/sell cycle

mod balance;
mod cycle_driver;

pub use balance::{BalanceQuery, RpcBalanceQuery, TokenBalance};
pub use cycle_driver::{CycleReport, ProviderSlot, RunSummary, TradeCycleDriver, TradeCycleState, TradeSettings};
