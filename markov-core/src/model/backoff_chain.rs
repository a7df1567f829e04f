use std::path::Path;
use std::sync::Arc;

use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::alphabet::{Alphabet, Symbol};
use super::config::ChainConfig;
use super::context_chain::ContextChain;
use super::distribution::Distribution;
use super::document::ChainDocument;
use crate::error::{MarkovError, Result};
use crate::io::{read_document, sub_chain_path};

/// Next lower level of a [`BackoffChain`].
///
/// Order 1 is a plain context chain; every higher order is itself a
/// backoff chain, so a chain of order k owns a tree of depth k - 1.
#[derive(Clone, Debug)]
enum SubChain<S: Symbol> {
	Base(ContextChain<S>),
	Backoff(Box<BackoffChain<S>>),
}

impl<S: Symbol> SubChain<S> {
	/// Context chain at the top of this level.
	fn head(&self) -> &ContextChain<S> {
		match self {
			SubChain::Base(chain) => chain,
			SubChain::Backoff(chain) => &chain.chain,
		}
	}

	fn reset(&mut self) {
		match self {
			SubChain::Base(chain) => chain.reset(),
			SubChain::Backoff(chain) => chain.reset(),
		}
	}

	fn transition(&mut self, symbol: &S, countdown: usize) -> Result<()> {
		match self {
			SubChain::Base(chain) => chain.transition(symbol, countdown),
			SubChain::Backoff(chain) => chain.transition(symbol, countdown),
		}
	}

	fn observe(&mut self, symbol: &S, countdown: usize) -> Result<()> {
		match self {
			SubChain::Base(chain) => chain.observe(symbol, countdown),
			SubChain::Backoff(chain) => chain.observe(symbol, countdown),
		}
	}

	fn expectations(&self) -> Distribution<S> {
		match self {
			SubChain::Base(chain) => chain.expectations(),
			SubChain::Backoff(chain) => chain.expectations(),
		}
	}

	fn set_config(&mut self, config: ChainConfig) {
		match self {
			SubChain::Base(chain) => chain.set_config(config),
			SubChain::Backoff(chain) => chain.set_config(config),
		}
	}

	fn check_same_shape(&self, other: &Self) -> Result<()> {
		match (self, other) {
			(SubChain::Base(chain), SubChain::Base(other)) => chain.check_same_shape(other),
			(SubChain::Backoff(chain), SubChain::Backoff(other)) => chain.check_same_shape(other),
			_ => Err(MarkovError::invalid_argument("backoff depth mismatch")),
		}
	}

	fn merge(&mut self, other: &Self) -> Result<()> {
		match (self, other) {
			(SubChain::Base(chain), SubChain::Base(other)) => chain.merge(other),
			(SubChain::Backoff(chain), SubChain::Backoff(other)) => chain.merge(other),
			_ => Err(MarkovError::invalid_argument("backoff depth mismatch")),
		}
	}
}

/// Chain that falls back to lower orders when its own context lacks evidence.
///
/// Every level sees the identical stream of `transition`/`observe` calls,
/// each conditioning on its own (shorter) history.
///
/// # Responsibilities
/// - Mirror playback to every order level
/// - Merge the expectations of all levels (Katz-style backoff)
/// - Persist each level to its own file
///
/// # Invariants
/// - `order >= 2`
/// - The sub chain has order `order - 1`, the same alphabets and lookahead,
///   and a history equal to the most recent entries of this level's history
#[derive(Clone, Debug)]
pub struct BackoffChain<S: Symbol> {
	chain: ContextChain<S>,
	sub_chain: SubChain<S>,
}

impl<S: Symbol> BackoffChain<S> {
	/// Creates an empty backoff chain with levels `order` down to 1.
	///
	/// # Errors
	/// Returns `InvalidArgument` if `order < 2` (use a [`ContextChain`]
	/// instead) or `lookahead < 1`.
	pub fn new(
		input_alphabet: impl Into<Arc<Alphabet<S>>>,
		output_alphabet: impl Into<Arc<Alphabet<S>>>,
		order: usize,
		lookahead: usize,
	) -> Result<Self> {
		if order < 2 {
			return Err(MarkovError::invalid_argument(
				"a backoff chain needs an order >= 2, use a context chain for order 1",
			));
		}

		let input_alphabet = input_alphabet.into();
		let output_alphabet = output_alphabet.into();

		let chain = ContextChain::new(input_alphabet.clone(), output_alphabet.clone(), order, lookahead)?;
		let sub_chain = if order == 2 {
			SubChain::Base(ContextChain::new(input_alphabet, output_alphabet, 1, lookahead)?)
		} else {
			SubChain::Backoff(Box::new(Self::new(input_alphabet, output_alphabet, order - 1, lookahead)?))
		};

		Ok(Self { chain, sub_chain })
	}

	/// Backoff chain over a single alphabet with no horizon awareness.
	pub fn simple(alphabet: impl Into<Arc<Alphabet<S>>>, order: usize) -> Result<Self> {
		let alphabet = alphabet.into();
		Self::new(alphabet.clone(), alphabet, order, 1)
	}

	/// Backoff chain with distinct input and output alphabets and no horizon awareness.
	pub fn asymmetric(
		input_alphabet: impl Into<Arc<Alphabet<S>>>,
		output_alphabet: impl Into<Arc<Alphabet<S>>>,
		order: usize,
	) -> Result<Self> {
		Self::new(input_alphabet, output_alphabet, order, 1)
	}

	/// Backoff chain over a single alphabet conditioned on the steps left.
	pub fn bidirectional(alphabet: impl Into<Arc<Alphabet<S>>>, order: usize, lookahead: usize) -> Result<Self> {
		let alphabet = alphabet.into();
		Self::new(alphabet.clone(), alphabet, order, lookahead)
	}

	/// Replaces the configuration of every level.
	pub fn with_config(mut self, config: ChainConfig) -> Self {
		self.set_config(config);
		self
	}

	pub(crate) fn set_config(&mut self, config: ChainConfig) {
		self.chain.set_config(config);
		self.sub_chain.set_config(config);
	}

	pub fn config(&self) -> &ChainConfig {
		self.chain.config()
	}

	pub fn order(&self) -> usize {
		self.chain.order()
	}

	pub fn lookahead(&self) -> usize {
		self.chain.lookahead()
	}

	pub fn input_alphabet(&self) -> &Arc<Alphabet<S>> {
		self.chain.input_alphabet()
	}

	pub fn output_alphabet(&self) -> &Arc<Alphabet<S>> {
		self.chain.output_alphabet()
	}

	pub fn current_state(&self) -> Option<&S> {
		self.chain.current_state()
	}

	pub fn countdown(&self) -> Option<usize> {
		self.chain.countdown()
	}

	/// History buffer of the highest order level, oldest entry first.
	pub fn history(&self) -> impl Iterator<Item = Option<&S>> + '_ {
		self.chain.history()
	}

	/// Context chains of every level, highest order first.
	pub fn levels(&self) -> Vec<&ContextChain<S>> {
		let mut levels = vec![&self.chain];
		let mut sub_chain = &self.sub_chain;
		loop {
			match sub_chain {
				SubChain::Base(chain) => {
					levels.push(chain);
					return levels;
				}
				SubChain::Backoff(chain) => {
					levels.push(&chain.chain);
					sub_chain = &chain.sub_chain;
				}
			}
		}
	}

	/// Forgets history and countdown on every level. Counts are kept.
	pub fn reset(&mut self) {
		self.chain.reset();
		self.sub_chain.reset();
	}

	/// Advances every level. See [`ContextChain::transition`].
	pub fn transition(&mut self, symbol: &S, countdown: usize) -> Result<()> {
		// Levels share one stream: once this level accepts a step, lower ones do too.
		self.chain.transition(symbol, countdown)?;
		self.sub_chain.transition(symbol, countdown)
	}

	/// Records an outcome on every level. See [`ContextChain::observe`].
	pub fn observe(&mut self, symbol: &S, countdown: usize) -> Result<()> {
		self.chain.observe(symbol, countdown)?;
		self.sub_chain.observe(symbol, countdown)
	}

	pub fn transition_unbounded(&mut self, symbol: &S) -> Result<()> {
		self.transition(symbol, self.lookahead().saturating_add(1))
	}

	pub fn observe_unbounded(&mut self, symbol: &S) -> Result<()> {
		self.observe(symbol, self.lookahead().saturating_add(1))
	}

	/// Expectations of this level, backed off to the lower orders.
	///
	/// A symbol with direct evidence at this level keeps its raw count. Any
	/// other symbol inherits the lower order's (already merged) count times
	/// the backoff scaling.
	pub fn expectations(&self) -> Distribution<S> {
		// Every level shares this level's output alphabet.
		let mut expectations = self.chain.expectations();
		let sub_expectations = self.sub_chain.expectations();
		let scaling = self.chain.config().backoff_scaling();

		for (symbol, count) in sub_expectations.observations() {
			if expectations.count_for(symbol) > 0.0 || count <= 0.0 {
				continue;
			}
			if let Ok(index) = expectations.alphabet().index_of(symbol) {
				expectations.add_at(index, scaling * count);
			}
		}

		expectations
	}

	/// Merges the observation tables of every level of `other` into `self`.
	///
	/// # Errors
	/// Returns `InvalidArgument` if any level differs in shape; nothing is
	/// merged in that case.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		self.check_same_shape(other)?;
		self.chain.merge(&other.chain)?;
		self.sub_chain.merge(&other.sub_chain)
	}

	fn check_same_shape(&self, other: &Self) -> Result<()> {
		self.chain.check_same_shape(&other.chain)?;
		self.sub_chain.check_same_shape(&other.sub_chain)
	}
}

impl<S: Symbol + Serialize> BackoffChain<S> {
	/// Saves every level: this one to `path`, the next one to `<stem>_sub.<ext>`
	/// and so on down to order 1.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let path = path.as_ref();
		self.chain.save(path)?;

		let sub_path = sub_chain_path(path)?;
		match &self.sub_chain {
			SubChain::Base(chain) => chain.save(&sub_path),
			SubChain::Backoff(chain) => chain.save(&sub_path),
		}
	}
}

impl<S: Symbol + DeserializeOwned> BackoffChain<S> {
	/// Loads a chain saved with [`BackoffChain::save`], re-attaching every level.
	///
	/// # Errors
	/// Returns `Io` if any level file cannot be read and `Malformed` if any
	/// level is invalid or inconsistent with its parent. No partial chain
	/// is ever returned.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let document: ChainDocument<S> = read_document(path)?;
		let chain = ContextChain::from_document(document, path)?;
		if chain.order() < 2 {
			return Err(MarkovError::malformed(
				path,
				format!("a backoff chain needs an order >= 2, found {}", chain.order()),
			));
		}

		let sub_path = sub_chain_path(path)?;
		let sub_chain = if chain.order() == 2 {
			SubChain::Base(ContextChain::load(&sub_path)?)
		} else {
			SubChain::Backoff(Box::new(Self::load(&sub_path)?))
		};

		if !sub_chain.head().follows(&chain) {
			return Err(MarkovError::malformed(
				&sub_path,
				format!("level does not match its order-{} parent", chain.order()),
			));
		}

		debug!("attached {} to order-{} backoff chain", sub_path.display(), chain.order());
		Ok(Self { chain, sub_chain })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::config::BACKOFF_SCALING;

	fn alphabet(range: std::ops::Range<u32>) -> Arc<Alphabet<u32>> {
		Arc::new(Alphabet::new(range.collect()).unwrap())
	}

	fn play(chain: &mut BackoffChain<u32>, symbols: &[u32], mut steps_left: usize) {
		for symbol in symbols {
			chain.observe(symbol, steps_left).unwrap();
			chain.transition(symbol, steps_left).unwrap();
			steps_left -= 1;
		}
	}

	#[test]
	fn order_one_is_rejected() {
		assert!(matches!(
			BackoffChain::simple(alphabet(0..3), 1),
			Err(MarkovError::InvalidArgument(_))
		));
		assert!(BackoffChain::bidirectional(alphabet(0..3), 2, 0).is_err());
	}

	#[test]
	fn builds_one_level_per_order() {
		let chain = BackoffChain::bidirectional(alphabet(0..3), 4, 2).unwrap();
		let orders: Vec<usize> = chain.levels().iter().map(|level| level.order()).collect();
		assert_eq!(orders, vec![4, 3, 2, 1]);
		assert!(chain.levels().iter().all(|level| level.lookahead() == 2));
	}

	#[test]
	fn every_level_sees_the_stream() {
		let mut chain = BackoffChain::simple(alphabet(0..5), 3).unwrap();
		chain.transition_unbounded(&1).unwrap();
		chain.transition_unbounded(&2).unwrap();
		for level in chain.levels() {
			assert_eq!(level.current_state(), Some(&2));
		}

		chain.reset();
		for level in chain.levels() {
			assert_eq!(level.current_state(), None);
			assert_eq!(level.countdown(), None);
		}
	}

	#[test]
	fn direct_evidence_is_not_scaled() {
		let mut chain = BackoffChain::simple(alphabet(0..5), 2).unwrap();
		play(&mut chain, &[1, 2, 3], 50);
		chain.reset();
		play(&mut chain, &[4, 2, 4], 50);
		chain.reset();
		chain.transition_unbounded(&1).unwrap();
		chain.transition_unbounded(&2).unwrap();

		let expectations = chain.expectations();
		assert_eq!(expectations.count_for(&3), 1.0);
		assert!((expectations.count_for(&4) - BACKOFF_SCALING).abs() < 1e-12);
	}

	#[test]
	fn unseen_context_inherits_scaled_counts() {
		let mut chain = BackoffChain::simple(alphabet(0..5), 2).unwrap();
		play(&mut chain, &[0, 1, 3], 50);
		chain.reset();
		chain.transition_unbounded(&2).unwrap();
		chain.transition_unbounded(&1).unwrap();

		let expectations = chain.expectations();
		assert!((expectations.count_for(&3) - 0.05).abs() < 1e-12);
		assert_eq!(expectations.sample(), Some(3));
	}

	#[test]
	fn asymmetric_levels_share_the_output_alphabet() {
		let mut chain = BackoffChain::asymmetric(alphabet(0..3), alphabet(10..13), 2).unwrap();
		chain.observe_unbounded(&11).unwrap();
		chain.transition_unbounded(&0).unwrap();
		chain.observe_unbounded(&12).unwrap();
		chain.reset();
		chain.transition_unbounded(&2).unwrap();
		chain.transition_unbounded(&0).unwrap();

		let expectations = chain.expectations();
		assert_eq!(expectations.alphabet(), chain.output_alphabet());
		assert!(chain.levels().iter().all(|level| level.output_alphabet() == chain.output_alphabet()));
		assert!((expectations.count_for(&12) - BACKOFF_SCALING).abs() < 1e-12);
		assert_eq!(expectations.count_for(&11), 0.0);
	}

	#[test]
	fn scaling_follows_config() {
		let mut config = ChainConfig::default();
		config.set_backoff_scaling(0.5).unwrap();
		let mut chain = BackoffChain::simple(alphabet(0..5), 2).unwrap().with_config(config);
		play(&mut chain, &[0, 1, 3], 50);
		chain.reset();
		chain.transition_unbounded(&2).unwrap();
		chain.transition_unbounded(&1).unwrap();

		assert!((chain.expectations().count_for(&3) - 0.5).abs() < 1e-12);
		assert!(chain.levels().iter().all(|level| level.config().backoff_scaling() == 0.5));
	}

	#[test]
	fn failed_step_touches_no_level() {
		let mut chain = BackoffChain::bidirectional(alphabet(0..5), 3, 4).unwrap();
		chain.transition(&1, 3).unwrap();
		assert!(chain.transition(&1, 1).is_err());
		assert!(chain.observe(&9, 2).is_err());
		for level in chain.levels() {
			assert_eq!(level.countdown(), Some(3));
			assert_eq!(level.observation_count(), 0);
		}
	}

	#[test]
	fn merge_requires_same_depth() {
		let mut a = BackoffChain::simple(alphabet(0..5), 3).unwrap();
		let mut b = BackoffChain::simple(alphabet(0..5), 3).unwrap();
		play(&mut b, &[1, 2], 50);
		a.merge(&b).unwrap();
		assert!(a.levels().iter().all(|level| level.observation_count() == 2));

		let c = BackoffChain::simple(alphabet(0..5), 2).unwrap();
		assert!(a.merge(&c).is_err());
		assert!(a.levels().iter().all(|level| level.observation_count() == 2));
	}
}
