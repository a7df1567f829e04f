use std::collections::BTreeMap;
use std::sync::Arc;

use rand::Rng;

use super::alphabet::{Alphabet, Symbol};
use crate::error::{MarkovError, Result};

/// Probabilities below this are treated as impossible by
/// [`Distribution::information_content_for`].
const MIN_PROBABILITY: f64 = 1.0e-10;

/// Information content reported for outcomes with (near) zero probability,
/// `log2(1e6)` bits.
pub fn max_information_content() -> f64 {
	1.0e6_f64.log2()
}

/// Empirical distribution over the symbols of an alphabet.
///
/// A `Distribution` accumulates non-negative observation weights per symbol.
/// Conceptually, it is the outgoing edge set of one context: the weight of a
/// symbol is how often it followed that context.
///
/// ## Responsibilities:
/// - Accumulate observation weights
/// - Sample an outcome proportionally to its weight
/// - Answer probability, surprise, information content and entropy queries
/// - Combine with another distribution (sum or product)
///
/// ## Invariants
/// - `total` equals the sum of all stored weights
/// - No weight is negative
/// - Every key of `counts` is a valid index of `alphabet`
#[derive(Clone, Debug)]
pub struct Distribution<S: Symbol> {
	alphabet: Arc<Alphabet<S>>,
	/// Weights indexed by alphabet position. Iteration follows alphabet order.
	counts: BTreeMap<usize, f64>,
	total: f64,
}

impl<S: Symbol> Distribution<S> {
	/// Creates an empty distribution over `alphabet`.
	pub fn new(alphabet: impl Into<Arc<Alphabet<S>>>) -> Self {
		Self {
			alphabet: alphabet.into(),
			counts: BTreeMap::new(),
			total: 0.0,
		}
	}

	pub fn alphabet(&self) -> &Arc<Alphabet<S>> {
		&self.alphabet
	}

	/// Sum of all observation weights.
	pub fn total(&self) -> f64 {
		self.total
	}

	/// Iterates over tracked symbols and their weights, in alphabet order.
	///
	/// Symbols never observed are not yielded.
	pub fn observations(&self) -> impl Iterator<Item = (&S, f64)> + '_ {
		self.counts
			.iter()
			.map(|(index, count)| (&self.alphabet.symbols()[*index], *count))
	}

	/// Records one observation of `symbol`.
	pub fn observe(&mut self, symbol: &S) -> Result<()> {
		self.observe_weighted(symbol, 1.0)
	}

	/// Records `weight` observations of `symbol`.
	///
	/// A zero weight is accepted and changes nothing.
	///
	/// # Errors
	/// Returns `InvalidArgument` if the weight is negative or not finite, if
	/// adding it would overflow the total, or if the symbol is not part of the
	/// alphabet. The distribution is left untouched.
	pub fn observe_weighted(&mut self, symbol: &S, weight: f64) -> Result<()> {
		if !(weight >= 0.0 && weight.is_finite()) {
			return Err(MarkovError::invalid_argument(format!(
				"observation weight must be finite and >= 0, got {}",
				weight
			)));
		}
		if !(self.total + weight).is_finite() {
			return Err(MarkovError::invalid_argument(format!(
				"observation weight {} overflows the total {}",
				weight, self.total
			)));
		}
		let index = self.alphabet.index_of(symbol).map_err(|_| {
			MarkovError::invalid_argument(format!("symbol {:?} is not in the alphabet", symbol))
		})?;
		self.add_at(index, weight);
		Ok(())
	}

	/// Adds `weight` to the symbol at `index`. Callers guarantee both are valid.
	///
	/// Zero weights are not stored.
	pub(crate) fn add_at(&mut self, index: usize, weight: f64) {
		if weight == 0.0 {
			return;
		}
		*self.counts.entry(index).or_insert(0.0) += weight;
		self.total += weight;
	}

	/// Weight accumulated for `symbol`, 0 if never observed.
	pub fn count_for(&self, symbol: &S) -> f64 {
		self.alphabet
			.index_of(symbol)
			.ok()
			.and_then(|index| self.counts.get(&index))
			.copied()
			.unwrap_or(0.0)
	}

	/// Probability of `symbol`: its weight over the total weight.
	///
	/// # Errors
	/// Returns `Undefined` if nothing has been observed.
	pub fn probability_of(&self, symbol: &S) -> Result<f64> {
		if self.total == 0.0 {
			return Err(MarkovError::Undefined("probability"));
		}
		Ok(self.count_for(symbol) / self.total)
	}

	/// Draws an outcome using the thread-local generator.
	///
	/// Returns `None` if nothing has been observed.
	pub fn sample(&self) -> Option<S> {
		self.sample_with(&mut rand::rng())
	}

	/// Draws an outcome proportionally to its weight.
	///
	/// This method performs:
	/// - an O(n) scan over the tracked symbols
	/// - a cumulative subtraction to select a bucket
	///
	/// Returns `None` if nothing has been observed.
	pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<S> {
		if self.total <= 0.0 {
			return None;
		}

		// `total` may be infinite after combining huge distributions; the walk
		// then ends on the fallback.
		let mut r = rng.random::<f64>() * self.total;

		let mut fallback: Option<usize> = None;
		for (index, count) in &self.counts {
			if *count <= 0.0 {
				continue;
			}
			if r < *count {
				return Some(self.alphabet.symbols()[*index].clone());
			}
			r -= count;
			fallback = Some(*index);
		}

		// Rounding can leave `r` just above the last bucket.
		fallback.map(|index| self.alphabet.symbols()[index].clone())
	}

	/// Normalized surprise in `[0, 1]` relative to the most observed symbol.
	///
	/// - 0.0 for the most observed symbol
	/// - 1.0 for a symbol never observed
	/// - 0.5 when nothing has been observed at all
	pub fn surprise_for(&self, symbol: &S) -> f64 {
		if self.total == 0.0 {
			return 0.5;
		}

		let max_count = self.counts.values().copied().fold(0.0, f64::max);
		(max_count - self.count_for(symbol)) / max_count
	}

	/// Shannon information content of `symbol` in bits, `log2(1 / p)`.
	///
	/// Capped at [`max_information_content`] for probabilities under `1e-10`.
	///
	/// # Errors
	/// Returns `Undefined` if nothing has been observed.
	pub fn information_content_for(&self, symbol: &S) -> Result<f64> {
		if self.total == 0.0 {
			return Err(MarkovError::Undefined("information content"));
		}

		let p = self.probability_of(symbol)?;
		if p < MIN_PROBABILITY {
			return Ok(max_information_content());
		}
		Ok((1.0 / p).log2())
	}

	/// Entropy in bits: `-Σ p·log2(p)` over the observed symbols.
	///
	/// # Errors
	/// Returns `Undefined` if nothing has been observed.
	pub fn entropy(&self) -> Result<f64> {
		if self.total == 0.0 {
			return Err(MarkovError::Undefined("entropy"));
		}

		let entropy = self
			.counts
			.values()
			.filter(|count| **count > 0.0)
			.map(|count| {
				let p = count / self.total;
				-p * p.log2()
			})
			.sum::<f64>();
		Ok(entropy.max(0.0))
	}

	/// Largest entropy any distribution over this alphabet can have.
	pub fn max_entropy(&self) -> f64 {
		(self.alphabet.size() as f64).log2()
	}

	/// Multiplies every weight (and the total) by `factor`.
	///
	/// Weights that become zero are dropped.
	///
	/// # Errors
	/// Returns `InvalidArgument` if the factor is negative or not finite, or if
	/// the scaled total would overflow. The distribution is left untouched.
	pub fn scale(&mut self, factor: f64) -> Result<()> {
		if !(factor >= 0.0 && factor.is_finite()) {
			return Err(MarkovError::invalid_argument(format!(
				"scaling factor must be finite and >= 0, got {}",
				factor
			)));
		}
		if !(self.total * factor).is_finite() {
			return Err(MarkovError::invalid_argument(format!(
				"scaling {} by {} overflows",
				self.total, factor
			)));
		}

		for count in self.counts.values_mut() {
			*count *= factor;
		}
		self.counts.retain(|_, count| *count > 0.0);
		self.total = self.counts.values().sum();
		Ok(())
	}

	/// Sums two distributions over the union of their alphabets.
	///
	/// Every symbol ends up with the sum of both weights (0 where absent).
	pub fn combine_sum(&self, other: &Self) -> Self {
		let mut combined = Self::new(self.union_alphabet(other));

		for source in [self, other] {
			for (symbol, count) in source.observations() {
				combined.add_symbol(symbol, count);
			}
		}

		combined
	}

	/// Multiplies two distributions over the union of their alphabets.
	///
	/// Only symbols with a positive weight on both sides are kept, with the
	/// product of both weights. Models two independent predictive signals.
	pub fn combine_product(&self, other: &Self) -> Self {
		let mut combined = Self::new(self.union_alphabet(other));

		for (symbol, count) in self.observations() {
			let other_count = other.count_for(symbol);
			if count > 0.0 && other_count > 0.0 {
				combined.add_symbol(symbol, count * other_count);
			}
		}

		combined
	}

	fn union_alphabet(&self, other: &Self) -> Arc<Alphabet<S>> {
		if Arc::ptr_eq(&self.alphabet, &other.alphabet) || *self.alphabet == *other.alphabet {
			self.alphabet.clone()
		} else {
			Arc::new(self.alphabet.union(&other.alphabet))
		}
	}

	/// Adds a weight for a symbol known to be in the alphabet.
	fn add_symbol(&mut self, symbol: &S, weight: f64) {
		if let Ok(index) = self.alphabet.index_of(symbol) {
			self.add_at(index, weight);
		}
	}
}
