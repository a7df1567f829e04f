use rand::Rng;

use super::alphabet::Symbol;
use super::chain::Chain;
use super::distribution::max_information_content;
use crate::error::Result;

/// Trains `chain` on one complete episode.
///
/// # Behavior
/// - Resets the chain first, so the episode starts from an unknown history.
/// - For each symbol, observes it under the current context, then
///   transitions to it.
/// - The countdown of symbol `i` is `len - 1 - i`: the last symbol of the
///   episode sits on the horizon.
///
/// # Errors
/// Propagates the first chain error; symbols before it stay recorded.
pub fn train_episode<S, C>(chain: &mut C, episode: &[S]) -> Result<()>
where
	S: Symbol,
	C: Chain<S> + ?Sized,
{
	chain.reset();
	for (i, symbol) in episode.iter().enumerate() {
		let countdown = episode.len() - 1 - i;
		chain.observe(symbol, countdown)?;
		chain.transition(symbol, countdown)?;
	}
	Ok(())
}

/// Generates an episode of at most `length` symbols.
///
/// The chain is reset, then each step samples the current expectations and
/// transitions to the sampled symbol with the same countdowns as
/// [`train_episode`]. Generation stops early when a context has no outcome.
///
/// # Errors
/// Returns an error if a sampled symbol is not part of the input alphabet
/// (only possible with asymmetric alphabets).
pub fn generate<S, C, R>(chain: &mut C, length: usize, rng: &mut R) -> Result<Vec<S>>
where
	S: Symbol,
	C: Chain<S> + ?Sized,
	R: Rng + ?Sized,
{
	chain.reset();
	let mut episode = Vec::with_capacity(length);
	for i in 0..length {
		let countdown = length - 1 - i;
		let Some(symbol) = chain.expectations().sample_with(rng) else {
			break;
		};
		chain.transition(&symbol, countdown)?;
		episode.push(symbol);
	}
	Ok(episode)
}

/// Information content, in bits, of each symbol of `episode` given the
/// symbols before it.
///
/// Steps whose context has no observation at all score
/// [`max_information_content`]. The chain is reset before and after the
/// replay, including when the replay fails; no count is recorded.
///
/// # Errors
/// Returns an error if a symbol is not part of the input alphabet.
pub fn score_episode<S, C>(chain: &mut C, episode: &[S]) -> Result<Vec<f64>>
where
	S: Symbol,
	C: Chain<S> + ?Sized,
{
	chain.reset();
	let bits = replay_information(chain, episode);
	chain.reset();
	bits
}

fn replay_information<S, C>(chain: &mut C, episode: &[S]) -> Result<Vec<f64>>
where
	S: Symbol,
	C: Chain<S> + ?Sized,
{
	let mut bits = Vec::with_capacity(episode.len());
	for (i, symbol) in episode.iter().enumerate() {
		let expectations = chain.expectations();
		let information = if expectations.total() > 0.0 {
			expectations.information_content_for(symbol)?
		} else {
			max_information_content()
		};
		bits.push(information);
		chain.transition(symbol, episode.len() - 1 - i)?;
	}
	Ok(bits)
}
