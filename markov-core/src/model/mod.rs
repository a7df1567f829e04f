//! Top-level module for the prediction system.
//!
//! This crate provides a multi-order context prediction engine, including:
//! - Finite symbol sets (`Alphabet`)
//! - Observation-count distributions (`Distribution`)
//! - Fixed-order context chains (`ContextChain`)
//! - Recursive backoff over decreasing orders (`BackoffChain`)
//! - Chain configuration (`ChainConfig`)
//! - Training and generation helpers (`sequence`)

/// Immutable ordered symbol set with bidirectional index lookup.
pub mod alphabet;

/// Observation-count distribution over an alphabet.
///
/// Produces probabilities, samples, surprise, information content and entropy,
/// and combines with other distributions by sum or product.
pub mod distribution;

/// Generalized order-k, lookahead-L chain.
///
/// Records per-context observation counts and builds distributions on demand.
pub mod context_chain;

/// Recursive backoff chain blending every order from k down to 1.
pub mod backoff_chain;

/// Common interface of context and backoff chains.
pub mod chain;

/// Per-instance chain configuration (logging verbosity, backoff scaling).
pub mod config;

/// Training, generation and scoring of whole symbol sequences.
pub mod sequence;

/// Versioned persisted representation of a chain level.
///
/// This module is not exposed publicly.
mod document;
