use crate::config::{ChainConfig, Config};
use crate::error::ChainError;
use crate::miner::{mine_parallel, MiningControl};
use crate::transaction::types::now_millis;
use crate::transaction::{Amount, Balance, Transaction};
use tracing::{debug, info, warn};

use super::block::{Block, Sha256Hash};

/// 2020-01-01T00:00:00Z in milliseconds
pub const GENESIS_TIMESTAMP: u64 = 1_577_836_800_000;
pub const GENESIS_PREVIOUS_HASH: Sha256Hash = [0u8; 32];

#[derive(Debug, Clone, serde::Serialize)]
pub struct Blockchain {
    blocks: Vec<Block>,
    difficulty: u32,
    pending_transactions: Vec<Transaction>,
    mining_reward: Amount,
    #[serde(skip)]
    threads: usize,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// A fresh chain holding only the genesis block, with difficulty 2 and a reward of 100.
    pub fn new() -> Self {
        Self::with_config(&ChainConfig::default())
    }

    pub fn with_config(config: &ChainConfig) -> Self {
        Blockchain {
            blocks: vec![Self::create_genesis_block()],
            difficulty: config.difficulty,
            pending_transactions: Vec::new(),
            mining_reward: reward_amount(config.mining_reward),
            threads: 1,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut chain = Self::with_config(&config.chain);
        chain.threads = config.miner.threads.max(1);
        chain
    }

    pub fn create_genesis_block() -> Block {
        Block::new(GENESIS_TIMESTAMP, Vec::new(), GENESIS_PREVIOUS_HASH)
    }

    pub fn latest_block(&self) -> &Block {
        // the genesis block is never removed
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Mutable access to an already appended block. Any change made through
    /// this handle is what `is_chain_valid` exists to catch.
    pub fn block_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index)
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn mining_reward(&self) -> Amount {
        self.mining_reward
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending_transactions
    }

    /// Admits a signed transfer into the pending pool.
    ///
    /// The sender's balance is looked at but never enforced: an overdraft is
    /// logged and the transaction is still accepted.
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<(), ChainError> {
        let from_address = match tx.from_address() {
            Some(from) if !from.is_empty() => from,
            _ => return Err(ChainError::MissingAddress),
        };
        if tx.to_address().is_empty() {
            return Err(ChainError::MissingAddress);
        }

        if !tx.is_valid()? {
            return Err(ChainError::InvalidSignature);
        }

        if tx.amount() <= Amount::ZERO {
            return Err(ChainError::NonPositiveAmount);
        }

        for party in [from_address, tx.to_address()] {
            if self.projected_balance(party, &tx).is_none() {
                return Err(ChainError::AmountOverflow(format!(
                    "balance of {} would leave the representable range",
                    party
                )));
            }
        }

        let balance = self.balance_of(from_address);
        if balance < Balance::from_num(tx.amount()) {
            warn!(
                "Sender {} spends {} with a balance of {}",
                from_address,
                tx.amount(),
                balance
            );
        }

        info!("Transaction added: {}", tx.hash_str());
        self.pending_transactions.push(tx);
        Ok(())
    }

    /// Unmined block holding the whole pending pool followed by a fresh reward for `reward_address`.
    pub(crate) fn candidate_block(&self, reward_address: &str) -> Result<Block, ChainError> {
        let reward = Transaction::reward(reward_address, self.mining_reward);
        if self.projected_balance(reward_address, &reward).is_none() {
            return Err(ChainError::AmountOverflow(format!(
                "reward would push the balance of {} out of range",
                reward_address
            )));
        }

        let mut transactions = self.pending_transactions.clone();
        transactions.push(reward);
        Ok(Block::new(now_millis(), transactions, self.latest_block().hash))
    }

    /// Appends a sealed block and drops the first `included` pending transactions it carries.
    pub(crate) fn append_mined_block(&mut self, block: Block, included: usize) {
        let included = included.min(self.pending_transactions.len());
        self.pending_transactions.drain(..included);
        info!(
            "Block successfully mined at height {} with {} transactions",
            self.blocks.len(),
            block.transactions.len()
        );
        self.blocks.push(block);
    }

    /// Seals the pending pool plus a reward into a new block and appends it. Blocks until done.
    pub fn mine_pending_transactions(&mut self, reward_address: &str) -> Result<(), ChainError> {
        self.mine_pending_transactions_with(reward_address, &MiningControl::new())
    }

    /// Bounded or cancellable variant. On failure neither the chain nor the pool change.
    pub fn mine_pending_transactions_with(
        &mut self,
        reward_address: &str,
        control: &MiningControl,
    ) -> Result<(), ChainError> {
        let mut block = self.candidate_block(reward_address)?;
        let included = self.pending_transactions.len();
        mine_parallel(&mut block, self.difficulty, self.threads, control)?;
        self.append_mined_block(block, included);
        Ok(())
    }

    /// Replays every transaction on the chain: debits as sender, credits as recipient.
    pub fn balance_of(&self, address: &str) -> Balance {
        let mut balance = Balance::ZERO;
        for tx in self.blocks.iter().flat_map(|b| b.transactions.iter()) {
            // admission and mining keep every replay in range, so this never saturates
            let amount = Balance::from_num(tx.amount());
            if tx.from_address() == Some(address) {
                balance = balance.saturating_sub(amount);
            }
            if tx.to_address() == address {
                balance = balance.saturating_add(amount);
            }
        }
        debug!("balance of {}: {}", address, balance);
        balance
    }

    /// Balance of `address` after the chain, the pending pool, then `next`.
    /// `None` if any step overflows.
    fn projected_balance(&self, address: &str, next: &Transaction) -> Option<Balance> {
        self.blocks
            .iter()
            .flat_map(|b| b.transactions.iter())
            .chain(self.pending_transactions.iter())
            .try_fold(Balance::ZERO, |balance, tx| settle(balance, tx, address))
            .and_then(|balance| settle(balance, next, address))
    }

    /// Every transaction sent or received by `address`, in chain order.
    pub fn transactions_for(&self, address: &str) -> Vec<&Transaction> {
        let txs: Vec<&Transaction> = self
            .blocks
            .iter()
            .flat_map(|b| b.transactions.iter())
            .filter(|tx| tx.from_address() == Some(address) || tx.to_address() == address)
            .collect();
        debug!("get transactions for wallet count: {}", txs.len());
        txs
    }

    pub fn is_chain_valid(&self) -> bool {
        match self.validate_chain() {
            Ok(()) => true,
            Err(e) => {
                warn!("Chain failed validation: {}", e);
                false
            }
        }
    }
}

/// Applies `tx` to `balance` as seen by `address`. `None` on overflow.
fn settle(balance: Balance, tx: &Transaction, address: &str) -> Option<Balance> {
    let amount = Balance::from_num(tx.amount());
    let mut balance = balance;
    if tx.from_address() == Some(address) {
        balance = balance.checked_sub(amount)?;
    }
    if tx.to_address() == address {
        balance = balance.checked_add(amount)?;
    }
    Some(balance)
}

fn reward_amount(configured: u32) -> Amount {
    Amount::checked_from_num(configured).unwrap_or_else(|| {
        warn!(
            "Mining reward {} exceeds the largest amount, capping at {}",
            configured,
            Amount::MAX
        );
        Amount::MAX
    })
}
