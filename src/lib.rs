//! Swap cycler - repeated buy/sell swap rounds on Solana through Raydium and Jupiter

pub mod app;
pub mod config;
pub mod domain;
pub mod exchanges;
pub mod infrastructure;
pub mod shared;

// Re-export main types for convenience
pub use domain::execution::SwapOrchestrator;
pub use domain::trading::TradeCycleDriver;
pub use exchanges::SwapProvider;
