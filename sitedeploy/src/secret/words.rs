//! Human-readable deployment secrets (`adjective-color-noun`)

use rand::Rng;

pub const COLORS: &[&str] = &[
    "red", "green", "blue", "yellow", "orange", "purple", "pink", "brown", "black", "white",
];

pub const ADJECTIVES: &[&str] = &[
    "smol", "tiny", "giant", "interesting", "smart", "bright", "dull", "extreme", "beautiful",
    "pretty", "dark", "epic", "salty", "silly", "funny", "lame", "lazy", "loud", "lucky", "mad",
    "mean", "mighty", "mysterious", "nasty", "odd", "old", "powerful", "quiet", "rapid", "scary",
    "shiny", "shy", "smooth", "sour", "spicy", "stupid", "sweet", "tasty", "terrible", "ugly",
    "unusual", "vast", "wet", "wild", "witty", "wrong", "zany", "zealous", "zippy", "zombie",
    "zorro",
];

pub const NOUNS: &[&str] = &[
    "cat", "dog", "mouse", "pig", "cow", "horse", "sheep", "chicken", "duck", "goat", "panda",
    "tiger", "lion", "elephant", "monkey", "bird", "fish", "snake", "frog", "turtle", "hamster",
    "penguin", "kangaroo", "whale", "dolphin", "crocodile", "snail", "ant", "bee", "beetle",
    "butterfly", "dragon", "eagle", "giraffe", "lizard", "rabbit", "spider", "zebra",
];

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, words: &[&'a str]) -> &'a str {
    words[rng.gen_range(0..words.len())]
}

/// Draw one adjective, one color and one noun and join them with hyphens
pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "{}-{}-{}",
        pick(rng, ADJECTIVES),
        pick(rng, COLORS),
        pick(rng, NOUNS)
    )
}

/// Generate a secret using the thread-local RNG
pub fn generate() -> String {
    generate_with(&mut rand::thread_rng())
}

/// Whether `secret` has the `adjective-color-noun` shape with words from the lists
pub fn is_word_secret(secret: &str) -> bool {
    let mut parts = secret.split('-');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(adjective), Some(color), Some(noun), None) => {
            ADJECTIVES.contains(&adjective) && COLORS.contains(&color) && NOUNS.contains(&noun)
        }
        _ => false,
    }
}
