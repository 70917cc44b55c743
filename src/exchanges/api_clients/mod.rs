pub mod jupiter_swap_client;
pub mod raydium_swap_client;

pub use jupiter_swap_client::{JupiterSwapClient, DEFAULT_JUPITER_API_URL};
pub use raydium_swap_client::{RaydiumSwapClient, DEFAULT_RAYDIUM_API_URL, DEFAULT_RAYDIUM_TRADE_URL};

use serde::de::DeserializeOwned;

/// Read a JSON body, turning HTTP level failures into a message for the caller's error variant
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(format!("HTTP {}: {}", status, body.trim()));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| format!("unexpected response body: {}", e))
}
