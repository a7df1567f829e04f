use crate::error::{MarkovError, Result};

/// Damping applied to lower-order counts a backoff level inherits.
pub const BACKOFF_SCALING: f64 = 0.05;

/// Per-instance configuration of a chain.
///
/// `ChainConfig` replaces process-wide switches: each chain (and every level
/// of a backoff chain) carries its own copy.
///
/// # Invariants
/// - `backoff_scaling` is always in `(0.0, 1.0]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainConfig {
	/// Log every context key touched by `observe`/`transition` at `debug`
	/// level instead of `trace`.
	pub verbose: bool,

	/// Factor applied to the child's counts when a backoff level has no
	/// direct evidence for a symbol.
	backoff_scaling: f64,
}

impl Default for ChainConfig {
	fn default() -> Self {
		Self {
			verbose: false,
			backoff_scaling: BACKOFF_SCALING,
		}
	}
}

impl ChainConfig {
	/// Returns the current backoff scaling factor.
	pub fn backoff_scaling(&self) -> f64 {
		self.backoff_scaling
	}

	/// Sets the backoff scaling factor (0.0 exclusive..1.0 inclusive).
	///
	/// # Errors
	/// Returns an error if the value is outside the valid range.
	pub fn set_backoff_scaling(&mut self, scaling: f64) -> Result<()> {
		if !(scaling > 0.0 && scaling <= 1.0) {
			return Err(MarkovError::invalid_argument(format!(
				"backoff scaling must be in (0.0, 1.0], got {}",
				scaling
			)));
		}
		self.backoff_scaling = scaling;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults() {
		let config = ChainConfig::default();
		assert!(!config.verbose);
		assert_eq!(config.backoff_scaling(), BACKOFF_SCALING);
	}

	#[test]
	fn scaling_is_validated() {
		let mut config = ChainConfig::default();
		assert!(config.set_backoff_scaling(0.0).is_err());
		assert!(config.set_backoff_scaling(1.5).is_err());
		assert!(config.set_backoff_scaling(f64::NAN).is_err());
		assert_eq!(config.backoff_scaling(), BACKOFF_SCALING);

		config.set_backoff_scaling(1.0).unwrap();
		assert_eq!(config.backoff_scaling(), 1.0);
	}
}
