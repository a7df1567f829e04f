//! Context-based sequence prediction library.
//!
//! This crate provides a probabilistic next-symbol prediction system including:
//! - Finite symbol alphabets with index lookup
//! - Observation-count distributions with sampling and information measures
//! - Generalized order-k / lookahead-L context chains
//! - Recursive backoff chains blending several history orders
//! - Persistence of trained chains (JSON or compact binary)
//!
//! Only the high-level API is exposed publicly. File handling helpers
//! are kept internal.

/// Error type shared by every fallible operation of the crate.
pub mod error;

/// Alphabets, distributions, chains and sequence helpers.
pub mod model;

/// I/O utilities (document encoding, sub-chain paths).
///
/// Not exposed
pub(crate) mod io;

pub use error::{MarkovError, Result};
pub use model::alphabet::{Alphabet, Symbol};
pub use model::backoff_chain::BackoffChain;
pub use model::chain::Chain;
pub use model::config::ChainConfig;
pub use model::context_chain::ContextChain;
pub use model::distribution::Distribution;
