//! Thread-safe handle around a single [`Blockchain`].
//!
//! Readers share an `RwLock`. Mining runs outside the lock so queries stay
//! responsive; a separate miner mutex keeps mining runs serialized, and the
//! pool drain plus block append happen in a single write-locked step.

use crate::blockchain::{Block, Blockchain};
use crate::error::ChainError;
use crate::miner::{mine_parallel, MiningControl};
use crate::transaction::{Balance, Transaction};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SharedBlockchain {
    inner: Arc<RwLock<Blockchain>>,
    miner: Arc<Mutex<()>>,
}

impl SharedBlockchain {
    pub fn new(chain: Blockchain) -> Self {
        Self {
            inner: Arc::new(RwLock::new(chain)),
            miner: Arc::new(Mutex::new(())),
        }
    }

    /// Consistent read-only view; holds off appends while alive.
    pub fn read(&self) -> RwLockReadGuard<'_, Blockchain> {
        self.inner.read()
    }

    pub fn add_transaction(&self, tx: Transaction) -> Result<(), ChainError> {
        self.inner.write().add_transaction(tx)
    }

    pub fn mine_pending_transactions(&self, reward_address: &str) -> Result<(), ChainError> {
        self.mine_pending_transactions_with(reward_address, &MiningControl::new())
    }

    pub fn mine_pending_transactions_with(
        &self,
        reward_address: &str,
        control: &MiningControl,
    ) -> Result<(), ChainError> {
        let _mining = self.miner.lock();

        let (mut block, included, difficulty, threads) = {
            let chain = self.inner.read();
            (
                chain.candidate_block(reward_address)?,
                chain.pending_transactions().len(),
                chain.difficulty(),
                chain.threads(),
            )
        };

        mine_parallel(&mut block, difficulty, threads, control)?;

        // only miners append, and they are serialized, so the tip has not moved
        self.inner.write().append_mined_block(block, included);
        Ok(())
    }

    pub fn balance_of(&self, address: &str) -> Balance {
        self.inner.read().balance_of(address)
    }

    pub fn transactions_for(&self, address: &str) -> Vec<Transaction> {
        self.inner
            .read()
            .transactions_for(address)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn is_chain_valid(&self) -> bool {
        self.inner.read().is_chain_valid()
    }

    pub fn latest_block(&self) -> Block {
        self.inner.read().latest_block().clone()
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn pending_len(&self) -> usize {
        self.inner.read().pending_transactions().len()
    }
}
