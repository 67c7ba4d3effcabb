//! Built-in programmer jokes

use rand::seq::SliceRandom;
use rand::Rng;

pub const JOKES: &[&str] = &[
    "Why do programmers prefer dark mode? Because light attracts bugs.",
    "There are 10 kinds of people in the world: those who understand binary and those who don't.",
    "A SQL query walks into a bar, walks up to two tables and asks, can I join you?",
    "How many programmers does it take to change a light bulb? None, that's a hardware problem.",
    "Why did the programmer quit his job? Because he didn't get arrays.",
    "To understand what recursion is, you must first understand recursion.",
    "Debugging: being the detective in a crime movie where you are also the murderer.",
    "I would tell you a UDP joke, but you might not get it.",
    "The best thing about a boolean is that even if you are wrong, you are only off by a bit.",
    "Why do Java developers wear glasses? Because they don't C sharp.",
    "Knock knock. Race condition. Who's there?",
    "It works on my machine. Then we'll ship your machine.",
];

/// A joke drawn uniformly from the list with the given generator
pub fn pick_joke<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    JOKES.choose(rng).copied().unwrap_or_default()
}

pub fn random_joke() -> &'static str {
    pick_joke(&mut rand::thread_rng())
}
