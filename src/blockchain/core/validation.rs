use crate::error::ChainError;

use super::block::Block;
use super::chain::Blockchain;

/// A block is intact when its stored hash matches a fresh recomputation and
/// every transaction inside it verifies.
pub fn verify_block_integrity(block: &Block) -> Result<(), ChainError> {
    block.validate_transactions()?;

    let recomputed = block.calculate_hash();
    if block.hash != recomputed {
        return Err(ChainError::InvalidBlock(format!(
            "Stored hash {} does not match recomputed hash {}",
            hex::encode(block.hash),
            hex::encode(recomputed)
        )));
    }
    Ok(())
}

impl Blockchain {
    /// Diagnostic form of `is_chain_valid`: the first reason the chain is invalid.
    ///
    /// Previous-hash linkage is not part of this check; see [`Blockchain::check_linkage`].
    pub fn validate_chain(&self) -> Result<(), ChainError> {
        let blocks = self.blocks();
        if blocks.first() != Some(&Self::create_genesis_block()) {
            return Err(ChainError::InvalidBlock("Genesis block has been tampered with".to_string()));
        }

        for (height, block) in blocks.iter().enumerate().skip(1) {
            verify_block_integrity(block).map_err(|e| {
                ChainError::InvalidBlock(format!("Block {} failed validation: {}", height, e))
            })?;
        }
        Ok(())
    }

    /// Checks that every block points at the hash of the block before it.
    pub fn check_linkage(&self) -> Result<(), ChainError> {
        for (height, pair) in self.blocks().windows(2).enumerate() {
            if pair[1].previous_hash != pair[0].hash {
                return Err(ChainError::InvalidBlockLinkage(height + 1));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfig;
    use crate::crypto::KeyPair;
    use crate::transaction::{Amount, Transaction};

    fn chain_with_one_transfer() -> (Blockchain, KeyPair) {
        let keypair = KeyPair::generate().unwrap();
        let mut chain = Blockchain::with_config(&ChainConfig {
            difficulty: 1,
            mining_reward: 100,
        });
        let mut tx = Transaction::new(keypair.address(), "bob", Amount::from_num(10));
        tx.sign(&keypair).unwrap();
        chain.add_transaction(tx).unwrap();
        chain.mine_pending_transactions(&keypair.address()).unwrap();
        (chain, keypair)
    }

    #[test]
    fn test_fresh_and_mined_chains_are_valid() {
        assert!(Blockchain::new().is_chain_valid());
        let (chain, _) = chain_with_one_transfer();
        assert!(chain.is_chain_valid());
        assert!(chain.check_linkage().is_ok());
    }

    #[test]
    fn test_tampered_amount_is_detected() {
        let (mut chain, _) = chain_with_one_transfer();
        if let Some(Transaction::Transfer(tx)) = chain
            .block_mut(1)
            .and_then(|b| b.transactions.first_mut())
        {
            tx.amount = Amount::from_num(1_000);
        }
        assert!(!chain.is_chain_valid());
    }

    #[test]
    fn test_rehashed_tamper_is_still_detected_by_signature() {
        let (mut chain, _) = chain_with_one_transfer();
        if let Some(block) = chain.block_mut(1) {
            if let Some(Transaction::Transfer(tx)) = block.transactions.first_mut() {
                tx.amount = Amount::from_num(1_000);
            }
            block.hash = block.calculate_hash();
        }
        assert!(matches!(chain.validate_chain(), Err(ChainError::InvalidBlock(msg)) if msg.contains("Block 1")));
    }

    #[test]
    fn test_tampered_reward_is_detected_by_hash() {
        let (mut chain, _) = chain_with_one_transfer();
        if let Some(Transaction::Reward(tx)) = chain
            .block_mut(1)
            .and_then(|b| b.transactions.last_mut())
        {
            tx.amount = Amount::from_num(1_000_000);
        }
        assert!(!chain.is_chain_valid());
    }

    #[test]
    fn test_tampered_genesis_is_detected() {
        let (mut chain, _) = chain_with_one_transfer();
        if let Some(genesis) = chain.block_mut(0) {
            genesis.nonce = 1;
            genesis.hash = genesis.calculate_hash();
        }
        assert!(!chain.is_chain_valid());
    }

    #[test]
    fn test_mislinked_block_passes_validation_but_not_linkage() {
        let (mut chain, _) = chain_with_one_transfer();
        if let Some(block) = chain.block_mut(1) {
            block.previous_hash = [9u8; 32];
            block.mine(1);
        }
        assert!(chain.is_chain_valid());
        assert_eq!(chain.check_linkage(), Err(ChainError::InvalidBlockLinkage(1)));
    }
}
