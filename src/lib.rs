//! SealChain - a single-node ledger of signed transfers sealed into proof-of-work blocks
//!
//! # Architecture
//!
//! ## Core Blockchain
//! - [`blockchain`] - Blocks, the chain, mining orchestration and validation
//! - [`transaction`] - Transfer and reward transactions, signing and verification
//!
//! ## Consensus & Mining
//! - [`miner`] - Bounded, cancellable and multi-threaded proof-of-work search
//!
//! ## Cryptography
//! - [`crypto`] - secp256k1 key pairs, signing and verification
//!
//! ## Concurrency
//! - [`shared`] - Lock-guarded handle for sharing one chain across threads
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Blockchain
// ============================================================================
pub mod blockchain;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Concurrency
// ============================================================================
pub mod shared;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
