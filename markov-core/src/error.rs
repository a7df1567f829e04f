use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by alphabets, distributions, chains and their persistence.
///
/// Validation errors never leave a chain or distribution partially updated.
#[derive(Debug, Error)]
pub enum MarkovError {
	#[error("invalid alphabet: {0}")]
	InvalidAlphabet(String),

	#[error("symbol not found in alphabet: {0}")]
	NotFound(String),

	#[error("index {index} out of range for an alphabet of {size} symbols")]
	OutOfRange { index: usize, size: usize },

	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	#[error("{0} is undefined without observations")]
	Undefined(&'static str),

	#[error("I/O error on {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("malformed chain file {}: {reason}", path.display())]
	Malformed { path: PathBuf, reason: String },
}

impl MarkovError {
	pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
		MarkovError::InvalidArgument(message.into())
	}

	pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
		MarkovError::Malformed {
			path: path.into(),
			reason: reason.into(),
		}
	}
}

pub type Result<T> = std::result::Result<T, MarkovError>;
