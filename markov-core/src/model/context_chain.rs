use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;

use log::{Level, debug, log};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::alphabet::{Alphabet, Symbol};
use super::config::ChainConfig;
use super::distribution::Distribution;
use super::document::{ChainDocument, DOCUMENT_VERSION, ObservationRecord};
use crate::error::{MarkovError, Result};
use crate::io::{read_document, write_document};

/// Identifies one conditional distribution: the full history buffer
/// (input alphabet indices, `None` for unknown slots) and the countdown bucket.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct ContextKey {
	history: Vec<Option<usize>>,
	countdown: Option<usize>,
}

/// Generalized order-k, lookahead-L chain.
///
/// The chain keeps the last `order` input symbols and the number of steps
/// left before a horizon, and counts which output symbol was observed under
/// each such context.
///
/// # Responsibilities
/// - Advance the context (`transition`) and record outcomes (`observe`)
/// - Enforce strictly sequential countdowns
/// - Build the distribution of the current context (`expectations`)
/// - Merge with another chain of the same shape
///
/// # Invariants
/// - `order >= 1` and `lookahead >= 1`
/// - `history.len() == order`
/// - A known `countdown` is always `<= lookahead`
/// - Every stored count is `>= 1`
#[derive(Clone, Debug)]
pub struct ContextChain<S: Symbol> {
	input_alphabet: Arc<Alphabet<S>>,
	output_alphabet: Arc<Alphabet<S>>,
	order: usize,
	lookahead: usize,

	/// Rolling buffer of the last `order` input indices, oldest first.
	history: VecDeque<Option<usize>>,
	/// Steps left before the horizon, `None` when unknown or beyond `lookahead`.
	countdown: Option<usize>,

	/// Mapping from a context key to the counts of each output index.
	observations: HashMap<ContextKey, BTreeMap<usize, u64>>,

	config: ChainConfig,
}

impl<S: Symbol> ContextChain<S> {
	/// Creates an empty chain.
	///
	/// # Errors
	/// Returns `InvalidArgument` if `order < 1` or `lookahead < 1`.
	pub fn new(
		input_alphabet: impl Into<Arc<Alphabet<S>>>,
		output_alphabet: impl Into<Arc<Alphabet<S>>>,
		order: usize,
		lookahead: usize,
	) -> Result<Self> {
		if order < 1 {
			return Err(MarkovError::invalid_argument("order must be >= 1"));
		}
		if lookahead < 1 {
			return Err(MarkovError::invalid_argument("lookahead must be >= 1"));
		}

		Ok(Self {
			input_alphabet: input_alphabet.into(),
			output_alphabet: output_alphabet.into(),
			order,
			lookahead,
			history: VecDeque::from(vec![None; order]),
			countdown: None,
			observations: HashMap::new(),
			config: ChainConfig::default(),
		})
	}

	/// Chain over a single alphabet with no horizon awareness (lookahead 1).
	pub fn simple(alphabet: impl Into<Arc<Alphabet<S>>>, order: usize) -> Result<Self> {
		let alphabet = alphabet.into();
		Self::new(alphabet.clone(), alphabet, order, 1)
	}

	/// Chain predicting symbols of `output_alphabet` from a history of
	/// `input_alphabet` symbols, with no horizon awareness (lookahead 1).
	pub fn asymmetric(
		input_alphabet: impl Into<Arc<Alphabet<S>>>,
		output_alphabet: impl Into<Arc<Alphabet<S>>>,
		order: usize,
	) -> Result<Self> {
		Self::new(input_alphabet, output_alphabet, order, 1)
	}

	/// Chain over a single alphabet conditioned on up to `lookahead` steps
	/// left before the horizon.
	pub fn bidirectional(alphabet: impl Into<Arc<Alphabet<S>>>, order: usize, lookahead: usize) -> Result<Self> {
		let alphabet = alphabet.into();
		Self::new(alphabet.clone(), alphabet, order, lookahead)
	}

	/// Replaces the configuration of this chain.
	pub fn with_config(mut self, config: ChainConfig) -> Self {
		self.config = config;
		self
	}

	pub(crate) fn set_config(&mut self, config: ChainConfig) {
		self.config = config;
	}

	pub fn config(&self) -> &ChainConfig {
		&self.config
	}

	pub fn order(&self) -> usize {
		self.order
	}

	pub fn lookahead(&self) -> usize {
		self.lookahead
	}

	pub fn input_alphabet(&self) -> &Arc<Alphabet<S>> {
		&self.input_alphabet
	}

	pub fn output_alphabet(&self) -> &Arc<Alphabet<S>> {
		&self.output_alphabet
	}

	/// Forgets the history and countdown. Accumulated counts are kept.
	pub fn reset(&mut self) {
		self.history.iter_mut().for_each(|slot| *slot = None);
		self.countdown = None;
	}

	/// Most recent input symbol, `None` while still unknown.
	pub fn current_state(&self) -> Option<&S> {
		self.history
			.back()
			.copied()
			.flatten()
			.map(|index| &self.input_alphabet.symbols()[index])
	}

	/// Steps left before the horizon, `None` if unknown or beyond the lookahead.
	pub fn countdown(&self) -> Option<usize> {
		self.countdown
	}

	/// History buffer, oldest entry first.
	pub fn history(&self) -> impl Iterator<Item = Option<&S>> + '_ {
		self.history
			.iter()
			.map(|slot| slot.map(|index| &self.input_alphabet.symbols()[index]))
	}

	/// Number of distinct contexts with at least one observation.
	pub fn context_count(&self) -> usize {
		self.observations.len()
	}

	/// Number of observations recorded across all contexts.
	pub fn observation_count(&self) -> u64 {
		self.observations.values().flat_map(|counts| counts.values()).sum()
	}

	/// Pushes `symbol` into the history and moves the countdown.
	///
	/// Countdowns beyond the lookahead are all stored as unknown.
	///
	/// # Errors
	/// Returns `InvalidArgument` if the symbol is not in the input alphabet, or
	/// if a countdown is known and `countdown` is not exactly one less.
	/// The chain is left untouched on error.
	pub fn transition(&mut self, symbol: &S, countdown: usize) -> Result<()> {
		let index = self.input_alphabet.index_of(symbol).map_err(|_| {
			MarkovError::invalid_argument(format!("input symbol {:?} is not in the input alphabet", symbol))
		})?;
		self.check_countdown(countdown)?;

		self.history.pop_front();
		self.history.push_back(Some(index));
		self.countdown = (countdown <= self.lookahead).then_some(countdown);

		log!(self.key_log_level(), "transition -> key {:?}", self.current_key());
		Ok(())
	}

	/// Counts `symbol` under the current context. History and countdown
	/// are not modified.
	///
	/// # Errors
	/// Returns `InvalidArgument` if the symbol is not in the output alphabet,
	/// or if the countdown breaks the sequence (see [`Self::transition`]).
	pub fn observe(&mut self, symbol: &S, countdown: usize) -> Result<()> {
		let index = self.output_alphabet.index_of(symbol).map_err(|_| {
			MarkovError::invalid_argument(format!("output symbol {:?} is not in the output alphabet", symbol))
		})?;
		self.check_countdown(countdown)?;

		let key = self.current_key();
		log!(self.key_log_level(), "observe key {:?} => {:?}, {}", key, symbol, countdown);
		*self.observations.entry(key).or_default().entry(index).or_insert(0) += 1;
		Ok(())
	}

	/// [`Self::transition`] for playback that never comes near a horizon.
	pub fn transition_unbounded(&mut self, symbol: &S) -> Result<()> {
		self.transition(symbol, self.unbounded_countdown())
	}

	/// [`Self::observe`] for playback that never comes near a horizon.
	pub fn observe_unbounded(&mut self, symbol: &S) -> Result<()> {
		self.observe(symbol, self.unbounded_countdown())
	}

	/// Distribution of the output symbols observed under the current context.
	pub fn expectations(&self) -> Distribution<S> {
		let mut expectations = Distribution::new(self.output_alphabet.clone());
		if let Some(counts) = self.observations.get(&self.current_key()) {
			for (index, count) in counts {
				expectations.add_at(*index, *count as f64);
			}
		}
		expectations
	}

	/// Merges the observation table of another chain into this one.
	///
	/// History and countdown of `self` are not modified.
	///
	/// # Errors
	/// Returns `InvalidArgument` if order, lookahead or alphabets differ.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		self.check_same_shape(other)?;

		for (key, counts) in &other.observations {
			let existing = self.observations.entry(key.clone()).or_default();
			for (index, count) in counts {
				*existing.entry(*index).or_insert(0) += count;
			}
		}

		Ok(())
	}

	pub(crate) fn check_same_shape(&self, other: &Self) -> Result<()> {
		if self.order != other.order {
			return Err(MarkovError::invalid_argument(format!(
				"order mismatch: {} vs {}",
				self.order, other.order
			)));
		}
		if self.lookahead != other.lookahead {
			return Err(MarkovError::invalid_argument(format!(
				"lookahead mismatch: {} vs {}",
				self.lookahead, other.lookahead
			)));
		}
		if self.input_alphabet != other.input_alphabet || self.output_alphabet != other.output_alphabet {
			return Err(MarkovError::invalid_argument("alphabet mismatch"));
		}
		Ok(())
	}

	/// True when this chain is the lower-order view of `parent`'s stream:
	/// same alphabets and lookahead, order one less, history equal to the
	/// parent's most recent entries and the same countdown.
	pub(crate) fn follows(&self, parent: &Self) -> bool {
		self.order + 1 == parent.order
			&& self.lookahead == parent.lookahead
			&& self.input_alphabet == parent.input_alphabet
			&& self.output_alphabet == parent.output_alphabet
			&& self.countdown == parent.countdown
			&& self.history.iter().eq(parent.history.iter().skip(1))
	}

	fn check_countdown(&self, countdown: usize) -> Result<()> {
		match self.countdown {
			Some(previous) if previous.checked_sub(1) != Some(countdown) => {
				Err(MarkovError::invalid_argument(format!(
					"countdown expected to be {}, got {}",
					previous as i64 - 1,
					countdown
				)))
			}
			_ => Ok(()),
		}
	}

	fn unbounded_countdown(&self) -> usize {
		self.lookahead.saturating_add(1)
	}

	fn current_key(&self) -> ContextKey {
		ContextKey {
			history: self.history.iter().copied().collect(),
			countdown: self.countdown,
		}
	}

	fn key_log_level(&self) -> Level {
		if self.config.verbose { Level::Debug } else { Level::Trace }
	}
}

impl<S: Symbol + Serialize> ContextChain<S> {
	/// Saves the chain to `path` (`.bin` → binary, otherwise JSON).
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		write_document(&path, &self.to_document())?;
		debug!(
			"saved order-{} chain ({} contexts) to {}",
			self.order,
			self.observations.len(),
			path.as_ref().display()
		);
		Ok(())
	}

	pub(crate) fn to_document(&self) -> ChainDocument<S> {
		let symbols_of = |history: &[Option<usize>]| -> Vec<Option<S>> {
			history
				.iter()
				.map(|slot| slot.map(|index| self.input_alphabet.symbols()[index].clone()))
				.collect()
		};

		let mut keys: Vec<&ContextKey> = self.observations.keys().collect();
		keys.sort();

		let observations = keys
			.into_iter()
			.map(|key| ObservationRecord {
				history: symbols_of(&key.history),
				countdown: key.countdown,
				counts: self.observations[key]
					.iter()
					.map(|(index, count)| (self.output_alphabet.symbols()[*index].clone(), *count))
					.collect(),
			})
			.collect();

		let history: Vec<Option<usize>> = self.history.iter().copied().collect();
		ChainDocument {
			version: DOCUMENT_VERSION,
			input_alphabet: (*self.input_alphabet).clone(),
			output_alphabet: (*self.output_alphabet).clone(),
			order: self.order,
			lookahead: self.lookahead,
			observations,
			history: symbols_of(&history),
			countdown: self.countdown,
		}
	}
}

impl<S: Symbol + DeserializeOwned> ContextChain<S> {
	/// Loads a chain saved with [`ContextChain::save`].
	///
	/// # Errors
	/// Returns `Io` if the file cannot be read and `Malformed` if its content
	/// does not describe a valid chain. No partial chain is ever returned.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let document: ChainDocument<S> = read_document(path)?;
		let chain = Self::from_document(document, path)?;
		debug!(
			"loaded order-{} chain ({} contexts) from {}",
			chain.order,
			chain.observations.len(),
			path.display()
		);
		Ok(chain)
	}
}

impl<S: Symbol> ContextChain<S> {
	/// Rebuilds a chain from its document, validating every field.
	pub(crate) fn from_document(document: ChainDocument<S>, path: &Path) -> Result<Self> {
		let malformed = |reason: String| MarkovError::malformed(path, reason);

		if document.version != DOCUMENT_VERSION {
			return Err(malformed(format!(
				"unsupported version {} (expected {})",
				document.version, DOCUMENT_VERSION
			)));
		}

		// The history buffer is sized from `order`; check it against the
		// entries actually stored before allocating.
		if document.history.len() != document.order {
			return Err(malformed(format!(
				"history has {} entries, expected {}",
				document.history.len(),
				document.order
			)));
		}

		let mut chain = Self::new(
			document.input_alphabet,
			document.output_alphabet,
			document.order,
			document.lookahead,
		)
		.map_err(|e| malformed(e.to_string()))?;

		chain.history = chain.history_indices(&document.history).map_err(malformed)?.into();
		chain.countdown = chain.checked_bucket(document.countdown).map_err(malformed)?;

		let mut seen = HashSet::new();
		for record in document.observations {
			let key = ContextKey {
				history: chain.history_indices(&record.history).map_err(malformed)?,
				countdown: chain.checked_bucket(record.countdown).map_err(malformed)?,
			};
			if !seen.insert(key.clone()) {
				return Err(malformed(format!("duplicate context {:?}", record.history)));
			}

			let mut counts = BTreeMap::new();
			for (symbol, count) in record.counts {
				let index = chain
					.output_alphabet
					.index_of(&symbol)
					.map_err(|_| malformed(format!("output symbol {:?} is not in the output alphabet", symbol)))?;
				if counts.insert(index, count).is_some() {
					return Err(malformed(format!("duplicate count for {:?}", symbol)));
				}
			}
			counts.retain(|_, count| *count > 0);
			if !counts.is_empty() {
				chain.observations.insert(key, counts);
			}
		}

		Ok(chain)
	}

	fn history_indices(&self, history: &[Option<S>]) -> std::result::Result<Vec<Option<usize>>, String> {
		if history.len() != self.order {
			return Err(format!(
				"history has {} entries, expected {}",
				history.len(),
				self.order
			));
		}

		history
			.iter()
			.map(|slot| match slot {
				None => Ok(None),
				Some(symbol) => self
					.input_alphabet
					.index_of(symbol)
					.map(Some)
					.map_err(|_| format!("input symbol {:?} is not in the input alphabet", symbol)),
			})
			.collect()
	}

	fn checked_bucket(&self, countdown: Option<usize>) -> std::result::Result<Option<usize>, String> {
		match countdown {
			Some(value) if value > self.lookahead => {
				Err(format!("countdown {} is beyond the lookahead {}", value, self.lookahead))
			}
			other => Ok(other),
		}
	}
}
