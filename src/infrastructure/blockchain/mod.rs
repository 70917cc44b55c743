//! Solana RPC connectivity

pub mod rpc_client;

pub use rpc_client::{parse_commitment, SolanaRpcClient};
