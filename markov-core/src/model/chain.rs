use super::alphabet::Symbol;
use super::backoff_chain::BackoffChain;
use super::context_chain::ContextChain;
use super::distribution::Distribution;
use crate::error::Result;

/// Operations shared by [`ContextChain`] and [`BackoffChain`].
///
/// A caller drives playback by pairing `observe` (record the outcome of the
/// current context) with `transition` (advance the context), then queries
/// `expectations`.
pub trait Chain<S: Symbol> {
	fn order(&self) -> usize;

	fn lookahead(&self) -> usize;

	fn reset(&mut self);

	fn current_state(&self) -> Option<&S>;

	fn countdown(&self) -> Option<usize>;

	fn transition(&mut self, symbol: &S, countdown: usize) -> Result<()>;

	fn observe(&mut self, symbol: &S, countdown: usize) -> Result<()>;

	fn expectations(&self) -> Distribution<S>;
}

impl<S: Symbol> Chain<S> for ContextChain<S> {
	fn order(&self) -> usize {
		ContextChain::order(self)
	}

	fn lookahead(&self) -> usize {
		ContextChain::lookahead(self)
	}

	fn reset(&mut self) {
		ContextChain::reset(self)
	}

	fn current_state(&self) -> Option<&S> {
		ContextChain::current_state(self)
	}

	fn countdown(&self) -> Option<usize> {
		ContextChain::countdown(self)
	}

	fn transition(&mut self, symbol: &S, countdown: usize) -> Result<()> {
		ContextChain::transition(self, symbol, countdown)
	}

	fn observe(&mut self, symbol: &S, countdown: usize) -> Result<()> {
		ContextChain::observe(self, symbol, countdown)
	}

	fn expectations(&self) -> Distribution<S> {
		ContextChain::expectations(self)
	}
}

impl<S: Symbol> Chain<S> for BackoffChain<S> {
	fn order(&self) -> usize {
		BackoffChain::order(self)
	}

	fn lookahead(&self) -> usize {
		BackoffChain::lookahead(self)
	}

	fn reset(&mut self) {
		BackoffChain::reset(self)
	}

	fn current_state(&self) -> Option<&S> {
		BackoffChain::current_state(self)
	}

	fn countdown(&self) -> Option<usize> {
		BackoffChain::countdown(self)
	}

	fn transition(&mut self, symbol: &S, countdown: usize) -> Result<()> {
		BackoffChain::transition(self, symbol, countdown)
	}

	fn observe(&mut self, symbol: &S, countdown: usize) -> Result<()> {
		BackoffChain::observe(self, symbol, countdown)
	}

	fn expectations(&self) -> Distribution<S> {
		BackoffChain::expectations(self)
	}
}
