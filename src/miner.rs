//! Proof-of-work search.
//!
//! A block is sealed once the hex form of its hash starts with `difficulty`
//! zero digits. The search can be bounded by an iteration budget and aborted
//! from another thread through a [`MiningControl`]; with more than one worker
//! the nonce space is striped across a dedicated rayon pool and the first
//! worker to find a match stops the rest.

use crate::blockchain::{Block, Sha256Hash};
use crate::error::ChainError;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Cancellation and budget handle for a mining run. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct MiningControl {
    cancelled: Arc<AtomicBool>,
    max_iterations: Option<u64>,
}

impl MiningControl {
    /// An unbounded control that is never cancelled unless `cancel` is called.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn max_iterations(&self) -> Option<u64> {
        self.max_iterations
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Number of leading `0` digits in the hex rendering of `hash`.
pub fn leading_zero_digits(hash: &Sha256Hash) -> u32 {
    let mut total = 0u32;
    for byte in hash {
        if *byte == 0 {
            total += 2;
        } else {
            if *byte < 0x10 {
                total += 1;
            }
            break;
        }
    }
    total
}

pub fn meets_difficulty(hash: &Sha256Hash, difficulty: u32) -> bool {
    leading_zero_digits(hash) >= difficulty
}

/// Seals `block` using `threads` workers. One worker runs the plain sequential
/// search on the calling thread.
pub fn mine_parallel(
    block: &mut Block,
    difficulty: u32,
    threads: usize,
    control: &MiningControl,
) -> Result<(), ChainError> {
    if threads <= 1 {
        return block.mine_with(difficulty, control);
    }

    block.hash = block.calculate_hash();
    if meets_difficulty(&block.hash, difficulty) {
        return Ok(());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| ChainError::Config(format!("Failed to start mining pool: {}", e)))?;

    let prefix = block.prefix_hasher();
    let start = block.nonce;
    let stride = threads as u64;
    let budget = control.max_iterations().map(|max| max.div_ceil(stride));
    let found = AtomicBool::new(false);

    let winner = pool.install(|| {
        (0..stride).into_par_iter().find_map_any(|worker| {
            let mut nonce = start.wrapping_add(worker + 1);
            let mut tried = 0u64;
            loop {
                if found.load(Ordering::Relaxed) || control.is_cancelled() {
                    return None;
                }
                if budget.is_some_and(|b| tried >= b) {
                    return None;
                }
                let hash = Block::hash_with_nonce(&prefix, nonce);
                tried += 1;
                if meets_difficulty(&hash, difficulty) {
                    found.store(true, Ordering::Relaxed);
                    debug!(worker, tried, "nonce found");
                    return Some((nonce, hash));
                }
                nonce = nonce.wrapping_add(stride);
            }
        })
    });

    match winner {
        Some((nonce, hash)) => {
            block.nonce = nonce;
            block.hash = hash;
            Ok(())
        }
        None if control.is_cancelled() => Err(ChainError::MiningCancelled),
        None => Err(ChainError::MiningExhausted(
            control.max_iterations().unwrap_or_default(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_zero_digit_examples() {
        let mut h = [0xFFu8; 32];
        assert_eq!(leading_zero_digits(&h), 0);
        h[0] = 0x0F;
        assert_eq!(leading_zero_digits(&h), 1);
        h[0] = 0x00;
        h[1] = 0xA0;
        assert_eq!(leading_zero_digits(&h), 2);
        h[1] = 0x01;
        assert_eq!(leading_zero_digits(&h), 3);
        assert_eq!(leading_zero_digits(&[0u8; 32]), 64);
    }

    #[test]
    fn leading_zero_digits_match_hex_rendering() {
        let mut h = [0x5Au8; 32];
        h[0] = 0x00;
        h[1] = 0x07;
        let rendered = hex::encode(h);
        let zeros = rendered.chars().take_while(|c| *c == '0').count() as u32;
        assert_eq!(leading_zero_digits(&h), zeros);
        assert!(meets_difficulty(&h, 3));
        assert!(!meets_difficulty(&h, 4));
    }

    #[test]
    fn parallel_mining_meets_difficulty() {
        let mut block = Block::new(1_000, Vec::new(), [7u8; 32]);
        mine_parallel(&mut block, 2, 4, &MiningControl::new()).unwrap();

        assert!(block.hash_hex().starts_with("00"));
        assert_eq!(block.hash, block.calculate_hash());
    }

    #[test]
    fn cancelled_control_stops_parallel_search() {
        let mut block = Block::new(1_000, Vec::new(), [7u8; 32]);
        let control = MiningControl::new();
        control.cancel();

        let result = mine_parallel(&mut block, 64, 2, &control);
        assert_eq!(result, Err(ChainError::MiningCancelled));
    }

    #[test]
    fn budget_exhaustion_is_reported() {
        let mut block = Block::new(1_000, Vec::new(), [7u8; 32]);
        let control = MiningControl::new().with_max_iterations(64);

        let result = mine_parallel(&mut block, 64, 2, &control);
        assert_eq!(result, Err(ChainError::MiningExhausted(64)));
    }

    #[test]
    fn clones_share_cancellation() {
        let control = MiningControl::new();
        let handle = control.clone();
        handle.cancel();
        assert!(control.is_cancelled());
    }
}
