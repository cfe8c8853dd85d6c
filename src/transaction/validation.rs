//! Signature validation for transactions, separated from type definitions

use crate::crypto::verify_digest;
use crate::error::ChainError;
use crate::transaction::types::{Transaction, TransferTx};

impl Transaction {
    /// Rewards are trusted by construction. Transfers must carry a signature
    /// by the sender over their own content hash.
    pub fn is_valid(&self) -> Result<bool, ChainError> {
        match self {
            Transaction::Reward(_) => Ok(true),
            Transaction::Transfer(tx) => tx.verify_signature(),
        }
    }
}

impl TransferTx {
    pub fn verify_signature(&self) -> Result<bool, ChainError> {
        let signature = match &self.signature {
            Some(sig) if !sig.is_empty() => sig,
            _ => return Err(ChainError::MissingSignature),
        };
        verify_digest(&self.from_address, &self.content_hash(), signature)
    }
}
