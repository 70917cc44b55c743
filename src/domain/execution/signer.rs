//! Transaction signing with the trading keypair

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::VersionedTransaction,
};
use std::sync::Arc;

use crate::exchanges::types::{DexLabel, TransactionPayload, TxVersion, UnsignedTransaction};
use crate::shared::errors::SwapError;

/// Wire-ready transaction. Consumed by exactly one submission.
#[derive(Debug)]
pub struct SignedTransaction {
    pub quote_id: String,
    pub dex_label: DexLabel,
    pub transaction: VersionedTransaction,
    pub signature: Signature,
    pub last_valid_block_height: Option<u64>,
}

pub trait TransactionSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    /// Sign `unsigned`, which must be of the `expected` transaction version
    fn sign(&self, unsigned: UnsignedTransaction, expected: TxVersion) -> Result<SignedTransaction, SwapError>;
}

/// Signs with an in-memory keypair. No network I/O.
pub struct KeypairSigner {
    keypair: Arc<Keypair>,
}

impl KeypairSigner {
    pub fn new(keypair: Arc<Keypair>) -> Self {
        Self { keypair }
    }

    fn sign_versioned(&self, mut tx: VersionedTransaction) -> Result<(VersionedTransaction, Signature), SwapError> {
        let owner = self.keypair.pubkey();
        let required = tx.message.header().num_required_signatures as usize;
        let index = tx
            .message
            .static_account_keys()
            .iter()
            .take(required)
            .position(|key| *key == owner)
            .ok_or_else(|| {
                SwapError::InvalidTransactionFormat(format!("{} is not a required signer of the transaction", owner))
            })?;

        let signature = self
            .keypair
            .try_sign_message(&tx.message.serialize())
            .map_err(|e| SwapError::InvalidTransactionFormat(format!("signing failed: {}", e)))?;

        if tx.signatures.len() < required {
            tx.signatures.resize(required, Signature::default());
        }
        tx.signatures[index] = signature;
        Ok((tx, signature))
    }
}

impl TransactionSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    fn sign(&self, unsigned: UnsignedTransaction, expected: TxVersion) -> Result<SignedTransaction, SwapError> {
        let actual = unsigned.payload.version();
        if actual != expected {
            return Err(SwapError::InvalidTransactionFormat(format!(
                "{} returned a {} transaction, expected {}",
                unsigned.dex_label,
                actual.as_str(),
                expected.as_str()
            )));
        }

        let (transaction, signature) = match unsigned.payload {
            TransactionPayload::Versioned(tx) => self.sign_versioned(tx)?,
            TransactionPayload::Legacy(mut tx) => {
                let blockhash = tx.message.recent_blockhash;
                tx.try_partial_sign(&[self.keypair.as_ref()], blockhash)
                    .map_err(|e| SwapError::InvalidTransactionFormat(format!("signing failed: {}", e)))?;
                let signature = tx
                    .get_signing_keypair_positions(&[self.keypair.pubkey()])
                    .ok()
                    .and_then(|positions| positions.into_iter().next().flatten())
                    .map(|index| tx.signatures[index])
                    .ok_or_else(|| SwapError::InvalidTransactionFormat("signature missing after signing".to_string()))?;
                (VersionedTransaction::from(tx), signature)
            }
        };

        Ok(SignedTransaction {
            quote_id: unsigned.quote_id,
            dex_label: unsigned.dex_label,
            transaction,
            signature,
            last_valid_block_height: unsigned.last_valid_block_height,
        })
    }
}
