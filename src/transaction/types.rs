//! Transaction types for SealChain

use crate::crypto::{Digest32, KeyPair};
use crate::error::ChainError;
use fixed::types::{I32F32, I64F64};
use sha2::{Digest, Sha256};

/// Signed fixed-point value unit carried by a single transaction.
pub type Amount = I32F32;

/// Running total of many amounts, as produced by balance replay.
pub type Balance = I64F64;

pub(crate) fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

fn update_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

/// A value-transfer record as it travels through the pool and into blocks
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Transaction {
    Transfer(TransferTx),
    Reward(RewardTx),
}

impl Transaction {
    /// A user transfer stamped with the current time, unsigned.
    pub fn new(from_address: impl Into<String>, to_address: impl Into<String>, amount: Amount) -> Self {
        Transaction::Transfer(TransferTx::new(from_address, to_address, amount))
    }

    /// A system-minted payout; never carries a signature.
    pub fn reward(to_address: impl Into<String>, amount: Amount) -> Self {
        Transaction::Reward(RewardTx {
            to_address: to_address.into(),
            amount,
            timestamp: now_millis(),
        })
    }

    pub fn is_reward(&self) -> bool {
        matches!(self, Transaction::Reward(_))
    }

    /// Sender address; `None` for rewards.
    pub fn from_address(&self) -> Option<&str> {
        match self {
            Transaction::Transfer(tx) => Some(&tx.from_address),
            Transaction::Reward(_) => None,
        }
    }

    pub fn to_address(&self) -> &str {
        match self {
            Transaction::Transfer(tx) => &tx.to_address,
            Transaction::Reward(tx) => &tx.to_address,
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            Transaction::Transfer(tx) => tx.amount,
            Transaction::Reward(tx) => tx.amount,
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            Transaction::Transfer(tx) => tx.timestamp,
            Transaction::Reward(tx) => tx.timestamp,
        }
    }

    pub fn signature(&self) -> Option<&[u8]> {
        match self {
            Transaction::Transfer(tx) => tx.signature.as_deref(),
            Transaction::Reward(_) => None,
        }
    }

    /// Hash over sender, recipient, amount and timestamp. The signature is not covered.
    pub fn content_hash(&self) -> Digest32 {
        match self {
            Transaction::Transfer(tx) => tx.content_hash(),
            Transaction::Reward(tx) => tx.content_hash(),
        }
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.content_hash())
    }

    /// Signs with `signing_key`, which must own the sender address.
    pub fn sign(&mut self, signing_key: &KeyPair) -> Result<(), ChainError> {
        match self {
            Transaction::Transfer(tx) => tx.sign(signing_key),
            Transaction::Reward(_) => Err(ChainError::WrongWallet),
        }
    }

    /// Feeds every field, signature included, into a block hasher in a fixed order.
    pub(crate) fn write_canonical(&self, hasher: &mut Sha256) {
        match self {
            Transaction::Transfer(tx) => {
                hasher.update(b"transfer");
                hasher.update(tx.content_hash());
                match &tx.signature {
                    Some(sig) => {
                        hasher.update((sig.len() as u64).to_le_bytes());
                        hasher.update(sig);
                    }
                    None => hasher.update(u64::MAX.to_le_bytes()),
                }
            }
            Transaction::Reward(tx) => {
                hasher.update(b"reward");
                hasher.update(tx.content_hash());
            }
        }
    }
}

/// Transfer transaction: moves `amount` from one wallet to another
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransferTx {
    pub from_address: String,
    pub to_address: String,
    pub amount: Amount,
    /// Creation time in milliseconds since the Unix epoch
    pub timestamp: u64,
    /// DER-encoded ECDSA signature over `content_hash()`
    #[serde(default, with = "hex_opt")]
    pub signature: Option<Vec<u8>>,
}

impl TransferTx {
    pub fn new(from_address: impl Into<String>, to_address: impl Into<String>, amount: Amount) -> Self {
        TransferTx {
            from_address: from_address.into(),
            to_address: to_address.into(),
            amount,
            timestamp: now_millis(),
            signature: None,
        }
    }

    pub fn content_hash(&self) -> Digest32 {
        let mut hasher = Sha256::new();
        update_str(&mut hasher, &self.from_address);
        update_str(&mut hasher, &self.to_address);
        hasher.update(self.amount.to_le_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        hasher.finalize().into()
    }

    pub fn sign(&mut self, signing_key: &KeyPair) -> Result<(), ChainError> {
        if !signing_key.owns_address(&self.from_address) {
            return Err(ChainError::WrongWallet);
        }
        let digest = self.content_hash();
        self.signature = Some(signing_key.sign_digest(&digest));
        Ok(())
    }
}

/// Reward transaction: miner payout minted by the chain itself
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RewardTx {
    pub to_address: String,
    pub amount: Amount,
    pub timestamp: u64,
}

impl RewardTx {
    pub fn content_hash(&self) -> Digest32 {
        let mut hasher = Sha256::new();
        hasher.update(b"reward");
        update_str(&mut hasher, &self.to_address);
        hasher.update(self.amount.to_le_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        hasher.finalize().into()
    }
}

mod hex_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_some(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| hex::decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
