use serde::{Deserialize, Serialize};

use super::alphabet::{Alphabet, Symbol};

/// Version written in every chain document. Loaders reject anything else.
pub(crate) const DOCUMENT_VERSION: u32 = 1;

/// Persisted state of a single chain level.
///
/// Fields are written in a fixed order: alphabets, order, lookahead,
/// observation table, history buffer and countdown. Unknown fields are
/// rejected by self-describing formats.
#[derive(Serialize, Deserialize, Debug)]
#[serde(
	deny_unknown_fields,
	bound(serialize = "S: Symbol + Serialize", deserialize = "S: Symbol + Deserialize<'de>")
)]
pub(crate) struct ChainDocument<S: Symbol> {
	pub(crate) version: u32,
	pub(crate) input_alphabet: Alphabet<S>,
	pub(crate) output_alphabet: Alphabet<S>,
	pub(crate) order: usize,
	pub(crate) lookahead: usize,
	pub(crate) observations: Vec<ObservationRecord<S>>,
	pub(crate) history: Vec<Option<S>>,
	pub(crate) countdown: Option<usize>,
}

/// Counts recorded under one context key.
#[derive(Serialize, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct ObservationRecord<S> {
	pub(crate) history: Vec<Option<S>>,
	pub(crate) countdown: Option<usize>,
	pub(crate) counts: Vec<(S, u64)>,
}
