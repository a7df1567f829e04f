use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

use crate::error::{MarkovError, Result};

/// Values that can be stored in an [`Alphabet`].
///
/// Implemented for every type that is cloneable, hashable, comparable
/// and printable (integers, chars, strings, small enums...).
pub trait Symbol: Clone + Eq + Hash + Debug {}

impl<T: Clone + Eq + Hash + Debug> Symbol for T {}

/// Finite ordered set of distinct symbols.
///
/// The position of a symbol is its index. An alphabet never changes after
/// construction; combining two alphabets produces a new one.
///
/// # Invariants
/// - At least one symbol
/// - No duplicate symbols
/// - `index[symbols[i]] == i` for every `i`
#[derive(Clone, Debug)]
pub struct Alphabet<S: Symbol> {
	symbols: Vec<S>,
	index: HashMap<S, usize>,
}

impl<S: Symbol> Alphabet<S> {
	/// Creates an alphabet from a sequence of symbols.
	///
	/// # Errors
	/// Returns `InvalidAlphabet` if the sequence is empty or contains duplicates.
	pub fn new(symbols: Vec<S>) -> Result<Self> {
		if symbols.is_empty() {
			return Err(MarkovError::InvalidAlphabet("an alphabet needs at least one symbol".to_owned()));
		}

		let mut index = HashMap::with_capacity(symbols.len());
		for (i, symbol) in symbols.iter().enumerate() {
			if index.insert(symbol.clone(), i).is_some() {
				return Err(MarkovError::InvalidAlphabet(format!("duplicate symbol {:?}", symbol)));
			}
		}

		Ok(Self { symbols, index })
	}

	/// Number of symbols.
	pub fn size(&self) -> usize {
		self.symbols.len()
	}

	/// All symbols, in index order.
	pub fn symbols(&self) -> &[S] {
		&self.symbols
	}

	/// Returns the index of `symbol`.
	///
	/// # Errors
	/// Returns `NotFound` if the symbol is not part of the alphabet.
	pub fn index_of(&self, symbol: &S) -> Result<usize> {
		self.index
			.get(symbol)
			.copied()
			.ok_or_else(|| MarkovError::NotFound(format!("{:?}", symbol)))
	}

	/// Returns the symbol at `index`.
	///
	/// # Errors
	/// Returns `OutOfRange` if `index >= size()`.
	pub fn symbol_at(&self, index: usize) -> Result<&S> {
		self.symbols.get(index).ok_or(MarkovError::OutOfRange {
			index,
			size: self.symbols.len(),
		})
	}

	pub fn contains(&self, symbol: &S) -> bool {
		self.index.contains_key(symbol)
	}

	/// Returns a new alphabet made of this alphabet's symbols followed by
	/// the symbols of `other` that are not already present.
	pub fn union(&self, other: &Self) -> Self {
		let mut symbols = self.symbols.clone();
		let mut index = self.index.clone();
		for symbol in &other.symbols {
			if !index.contains_key(symbol) {
				index.insert(symbol.clone(), symbols.len());
				symbols.push(symbol.clone());
			}
		}
		Self { symbols, index }
	}
}

impl<S: Symbol> PartialEq for Alphabet<S> {
	fn eq(&self, other: &Self) -> bool {
		self.symbols == other.symbols
	}
}

impl<S: Symbol> Eq for Alphabet<S> {}

impl<S: Symbol> TryFrom<Vec<S>> for Alphabet<S> {
	type Error = MarkovError;

	fn try_from(symbols: Vec<S>) -> Result<Self> {
		Alphabet::new(symbols)
	}
}

// Persisted as the plain symbol list; validation runs again on load.
impl<S: Symbol + Serialize> Serialize for Alphabet<S> {
	fn serialize<Se: Serializer>(&self, serializer: Se) -> std::result::Result<Se::Ok, Se::Error> {
		self.symbols.serialize(serializer)
	}
}

impl<'de, S: Symbol + Deserialize<'de>> Deserialize<'de> for Alphabet<S> {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		let symbols = Vec::<S>::deserialize(deserializer)?;
		Alphabet::new(symbols).map_err(de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn digits(range: std::ops::RangeInclusive<u32>) -> Alphabet<u32> {
		Alphabet::new(range.collect()).unwrap()
	}

	#[test]
	fn index_lookup_is_bidirectional() {
		let alphabet = Alphabet::new(vec!['a', 'b', 'c']).unwrap();
		assert_eq!(alphabet.size(), 3);
		for (i, symbol) in alphabet.symbols().iter().enumerate() {
			assert_eq!(alphabet.index_of(symbol).unwrap(), i);
			assert_eq!(alphabet.symbol_at(i).unwrap(), symbol);
		}
	}

	#[test]
	fn duplicates_are_rejected() {
		assert!(matches!(Alphabet::new(vec![1, 2, 1]), Err(MarkovError::InvalidAlphabet(_))));
	}

	#[test]
	fn empty_alphabet_is_rejected() {
		assert!(matches!(Alphabet::<u8>::new(Vec::new()), Err(MarkovError::InvalidAlphabet(_))));
	}

	#[test]
	fn lookup_failures() {
		let alphabet = digits(1..=3);
		assert!(matches!(alphabet.index_of(&9), Err(MarkovError::NotFound(_))));
		assert!(matches!(alphabet.symbol_at(3), Err(MarkovError::OutOfRange { index: 3, size: 3 })));
		assert!(alphabet.contains(&2));
		assert!(!alphabet.contains(&0));
	}

	#[test]
	fn union_keeps_own_symbols_first() {
		let union = digits(1..=3).union(&digits(2..=5));
		assert_eq!(union.symbols(), &[1, 2, 3, 4, 5]);
		assert_eq!(union.index_of(&5).unwrap(), 4);

		let disjoint = digits(7..=8).union(&digits(1..=2));
		assert_eq!(disjoint.symbols(), &[7, 8, 1, 2]);
	}

	#[test]
	fn deserializing_duplicates_fails() {
		let result: std::result::Result<Alphabet<u32>, _> = serde_json::from_str("[1, 2, 2]");
		assert!(result.is_err());

		let alphabet: Alphabet<u32> = serde_json::from_str("[4, 2]").unwrap();
		assert_eq!(alphabet.index_of(&2).unwrap(), 1);
	}
}
