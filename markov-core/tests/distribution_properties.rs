//! Property-based tests for distributions.
//!
//! Weights are small integers so sums stay exact in floating point.

use std::sync::Arc;

use markov_core::{Alphabet, Distribution};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

const SYMBOLS: u8 = 8;

fn alphabet() -> Arc<Alphabet<u8>> {
	Arc::new(Alphabet::new((0..SYMBOLS).collect()).unwrap())
}

/// Strategy producing (symbol, weight) observations over the test alphabet.
fn observations() -> impl Strategy<Value = Vec<(u8, u32)>> {
	prop::collection::vec((0..SYMBOLS, 0u32..20), 0..32)
}

fn build(observations: &[(u8, u32)]) -> Distribution<u8> {
	let mut x = Distribution::new(alphabet());
	for (symbol, weight) in observations {
		x.observe_weighted(symbol, *weight as f64).unwrap();
	}
	x
}

proptest! {
	#[test]
	fn counts_sum_to_total(obs in observations()) {
		let x = build(&obs);
		let sum: f64 = (0..SYMBOLS).map(|s| x.count_for(&s)).sum();
		prop_assert_eq!(sum, x.total());
	}

	#[test]
	fn probabilities_sum_to_one(obs in observations()) {
		let x = build(&obs);
		prop_assume!(x.total() > 0.0);
		let sum: f64 = (0..SYMBOLS)
			.filter(|s| x.count_for(s) > 0.0)
			.map(|s| x.probability_of(&s).unwrap())
			.sum();
		prop_assert!((sum - 1.0).abs() < 1e-9);
	}

	#[test]
	fn samples_have_positive_count(obs in observations(), seed in any::<u64>()) {
		let x = build(&obs);
		let mut rng = StdRng::seed_from_u64(seed);
		match x.sample_with(&mut rng) {
			Some(symbol) => prop_assert!(x.count_for(&symbol) > 0.0),
			None => prop_assert_eq!(x.total(), 0.0),
		}
	}

	#[test]
	fn most_observed_symbol_is_not_surprising(obs in observations()) {
		let x = build(&obs);
		prop_assume!(x.total() > 0.0);
		let max = (0..SYMBOLS).max_by(|a, b| x.count_for(a).total_cmp(&x.count_for(b))).unwrap();
		prop_assert_eq!(x.surprise_for(&max), 0.0);
		for s in 0..SYMBOLS {
			let surprise = x.surprise_for(&s);
			prop_assert!((0.0..=1.0).contains(&surprise));
		}
	}

	#[test]
	fn surprise_does_not_grow_with_count(obs in observations(), symbol in 0..SYMBOLS, extra in 1u32..10) {
		let before = build(&obs);
		let mut after = before.clone();
		after.observe_weighted(&symbol, extra as f64).unwrap();
		prop_assume!(before.total() > 0.0);
		prop_assert!(after.surprise_for(&symbol) <= before.surprise_for(&symbol));
	}

	#[test]
	fn entropy_is_bounded(obs in observations()) {
		let x = build(&obs);
		prop_assume!(x.total() > 0.0);
		let h = x.entropy().unwrap();
		prop_assert!(h >= 0.0);
		prop_assert!(h <= x.max_entropy() + 1e-9);

		let support = (0..SYMBOLS).filter(|s| x.count_for(s) > 0.0).count();
		prop_assert_eq!(h < 1e-12, support == 1);
	}

	#[test]
	fn combine_sum_adds_counts(a in observations(), b in observations()) {
		let (x, y) = (build(&a), build(&b));
		let sum = x.combine_sum(&y);
		for s in 0..SYMBOLS {
			prop_assert_eq!(sum.count_for(&s), x.count_for(&s) + y.count_for(&s));
		}
		prop_assert_eq!(sum.total(), x.total() + y.total());
	}

	#[test]
	fn combine_product_keeps_common_support(a in observations(), b in observations()) {
		let (x, y) = (build(&a), build(&b));
		let product = x.combine_product(&y);
		for s in 0..SYMBOLS {
			let (cx, cy) = (x.count_for(&s), y.count_for(&s));
			if cx > 0.0 && cy > 0.0 {
				prop_assert_eq!(product.count_for(&s), cx * cy);
			} else {
				prop_assert!(product.observations().all(|(symbol, _)| *symbol != s));
			}
		}
	}
}
