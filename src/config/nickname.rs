//! Random nickname generator, used when the config leaves the nickname blank.
//!
//! Produces nicknames in the format `AdjectiveGoatNN` (e.g. `NeonGoat42`).

use rand::RngExt;

const ADJECTIVES: &[&str] = &[
    "Space", "Neon", "Lunar", "Solar", "Frost", "Storm", "Pixel", "Cosmic", "Iron", "Quiet",
    "Rapid", "Nova", "Onyx", "Cobalt", "Azure", "Hex", "Wired", "Chrome",
];

/// Generate a random nickname like `NeonGoat42`.
pub fn generate_nickname() -> String {
    let mut rng = rand::rng();
    let adj = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
    let num: u8 = rng.random_range(0..100);
    format!("{}Goat{}", adj, num)
}
