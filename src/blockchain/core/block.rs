use crate::error::ChainError;
use crate::miner::{meets_difficulty, MiningControl};
use crate::transaction::Transaction;
use sha2::{Digest, Sha256};
use std::convert::Infallible;
use tracing::info;

pub type Sha256Hash = [u8; 32];

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    /// Creation time in milliseconds since the Unix epoch
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    #[serde(with = "hex_hash")]
    pub previous_hash: Sha256Hash,
    #[serde(with = "hex_hash")]
    pub hash: Sha256Hash,
    pub nonce: u64,
}

impl Block {
    /// Builds an unmined block. `hash` already reflects the pre-mining state.
    pub fn new(timestamp: u64, transactions: Vec<Transaction>, previous_hash: Sha256Hash) -> Self {
        let mut block = Block {
            timestamp,
            transactions,
            previous_hash,
            hash: [0u8; 32],
            nonce: 0,
        };
        block.hash = block.calculate_hash();
        block
    }

    /// Hasher state after everything except the nonce. Cloned per attempt while mining.
    pub(crate) fn prefix_hasher(&self) -> Sha256 {
        let mut hasher = Sha256::new();
        hasher.update(self.previous_hash);
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update((self.transactions.len() as u64).to_le_bytes());
        for tx in &self.transactions {
            tx.write_canonical(&mut hasher);
        }
        hasher
    }

    pub(crate) fn hash_with_nonce(prefix: &Sha256, nonce: u64) -> Sha256Hash {
        let mut hasher = prefix.clone();
        hasher.update(nonce.to_le_bytes());
        hasher.finalize().into()
    }

    pub fn calculate_hash(&self) -> Sha256Hash {
        Self::hash_with_nonce(&self.prefix_hasher(), self.nonce)
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        meets_difficulty(&self.hash, difficulty)
    }

    /// Increments the nonce until the hash has `difficulty` leading zero hex digits.
    /// Runs until it succeeds.
    pub fn mine(&mut self, difficulty: u32) {
        match self.search(difficulty, |_| Ok::<(), Infallible>(())) {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    /// Like [`Block::mine`], but stops when `control` is cancelled or its
    /// iteration budget runs out. The block is left self-consistent either way.
    pub fn mine_with(&mut self, difficulty: u32, control: &MiningControl) -> Result<(), ChainError> {
        self.search(difficulty, |iterations| {
            if control.is_cancelled() {
                return Err(ChainError::MiningCancelled);
            }
            if control.max_iterations().is_some_and(|max| iterations >= max) {
                return Err(ChainError::MiningExhausted(iterations));
            }
            Ok(())
        })
    }

    /// Nonce search shared by both mining entry points. `may_continue` sees the
    /// attempts made so far before each new one.
    fn search<E>(
        &mut self,
        difficulty: u32,
        mut may_continue: impl FnMut(u64) -> Result<(), E>,
    ) -> Result<(), E> {
        let prefix = self.prefix_hasher();
        self.hash = Self::hash_with_nonce(&prefix, self.nonce);

        let mut iterations = 0u64;
        while !meets_difficulty(&self.hash, difficulty) {
            may_continue(iterations)?;
            self.nonce = self.nonce.wrapping_add(1);
            self.hash = Self::hash_with_nonce(&prefix, self.nonce);
            iterations += 1;
        }

        info!("Block mined: {} (nonce {})", self.hash_hex(), self.nonce);
        Ok(())
    }

    /// First failing transaction, as an error.
    pub fn validate_transactions(&self) -> Result<(), ChainError> {
        for tx in &self.transactions {
            if !tx.is_valid()? {
                return Err(ChainError::InvalidSignature);
            }
        }
        Ok(())
    }

    pub fn has_valid_transactions(&self) -> bool {
        self.validate_transactions().is_ok()
    }
}

mod hex_hash {
    use super::Sha256Hash;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Sha256Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Sha256Hash, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let mut hash = [0u8; 32];
        hex::decode_to_slice(&encoded, &mut hash).map_err(serde::de::Error::custom)?;
        Ok(hash)
    }
}
