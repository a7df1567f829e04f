use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use markov_core::model::sequence::{generate, score_episode, train_episode};
use markov_core::{Alphabet, BackoffChain, ChainConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // One episode per line, whitespace-separated MIDI pitches
    let data = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./data/melodies.txt"));
    let text = fs::read_to_string(&data)?;

    let mut episodes: Vec<Vec<u32>> = Vec::new();
    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        let episode = line
            .split_whitespace()
            .map(str::parse::<u32>)
            .collect::<Result<Vec<_>, _>>()?;
        episodes.push(episode);
    }
    println!("Loaded {} melodies from {}", episodes.len(), data.display());

    // The alphabet is every pitch that appears in the data
    let mut pitches: Vec<u32> = episodes.iter().flatten().copied().collect();
    pitches.sort_unstable();
    pitches.dedup();
    let alphabet = Arc::new(Alphabet::new(pitches)?);

    // Order 3, and the chain knows when a melody is 2 notes away from its end
    let mut config = ChainConfig::default();
    config.set_backoff_scaling(0.1)?;
    let mut chain = BackoffChain::bidirectional(alphabet, 3, 2)?.with_config(config);
    for episode in &episodes {
        train_episode(&mut chain, episode)?;
    }

    // Save next to the data file (one file per order) and read it back
    let model = data.with_extension("bin");
    chain.save(&model)?;
    let mut chain: BackoffChain<u32> = BackoffChain::load(&model)?;
    println!("Model saved to {} and reloaded", model.display());

    for level in chain.levels() {
        println!(
            "order {}: {} contexts, {} observations",
            level.order(),
            level.context_count(),
            level.observation_count()
        );
    }

    // Invalid settings are rejected
    match ChainConfig::default().set_backoff_scaling(2.0) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("Backoff scaling 2.0 is invalid: {}", e),
    }

    let mut rng = rand::rng();
    for i in 0..5 {
        let melody = generate(&mut chain, 8, &mut rng)?;
        let bits = score_episode(&mut chain, &melody)?;
        let total: f64 = bits.iter().sum();
        println!(
            "Generated melody {}: {:?} ({:.2} bits)",
            i + 1,
            melody,
            total
        );
    }

    // How predictable is the model right after the opening of the first melody?
    if let Some(first) = episodes.first() {
        chain.reset();
        for (i, pitch) in first.iter().take(3).enumerate() {
            chain.transition(pitch, first.len() - 1 - i)?;
        }
        let expectations = chain.expectations();
        if let Ok(entropy) = expectations.entropy() {
            println!(
                "Entropy after {:?}: {:.3} bits (max {:.3})",
                &first[..first.len().min(3)],
                entropy,
                expectations.max_entropy()
            );
        }
    }

    Ok(())
}
