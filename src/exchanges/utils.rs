use solana_sdk::transaction::{Transaction, VersionedTransaction};

use crate::exchanges::types::{TransactionPayload, TxVersion};
use crate::shared::errors::SwapError;

/// Decode a base64 wire transaction returned by a provider API
pub fn decode_transaction(blob: &str, version: TxVersion) -> Result<TransactionPayload, SwapError> {
    let bytes = base64::decode(blob.trim())
        .map_err(|e| SwapError::BuildFailure(format!("transaction is not valid base64: {}", e)))?;

    match version {
        TxVersion::V0 => bincode::deserialize::<VersionedTransaction>(&bytes)
            .map(TransactionPayload::Versioned)
            .map_err(|e| SwapError::BuildFailure(format!("cannot decode versioned transaction: {}", e))),
        TxVersion::Legacy => bincode::deserialize::<Transaction>(&bytes)
            .map(TransactionPayload::Legacy)
            .map_err(|e| SwapError::BuildFailure(format!("cannot decode legacy transaction: {}", e))),
    }
}

/// Parse an integer amount that APIs ship as a JSON string
pub fn parse_amount(field: &str, value: &str) -> Result<u64, SwapError> {
    value
        .parse::<u64>()
        .map_err(|e| SwapError::QuoteUnavailable(format!("invalid {} '{}': {}", field, value, e)))
}

pub fn format_pool_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 16 {
        return address.to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 8..].iter().collect();
    format!("{}...{}", head, tail)
}
