//! Where race text comes from.

use rand::Rng;

/// Supplies the text for each new race.
///
/// Called once per accepted start request, under the store lock, so it
/// should return quickly.
pub trait TextSource: Send + Sync + 'static {
    fn next_text(&self) -> String;
}

const BUILTIN_SENTENCES: &[&str] = &[
    "The quick brown fox jumps over the lazy dog.",
    "Typing speed is a skill that can be improved with practice.",
    "JavaScript is versatile and widely used for web development.",
    "A journey of a thousand miles begins with a single step.",
    "The pen is mightier than the sword.",
];

/// Picks a sentence uniformly at random for every race.
#[derive(Debug, Clone)]
pub struct SentencePool {
    sentences: Vec<String>,
}

impl SentencePool {
    /// Builds a pool from caller-supplied sentences, skipping blank ones.
    /// Returns `None` if nothing usable is left.
    pub fn new(sentences: Vec<String>) -> Option<Self> {
        let sentences: Vec<String> = sentences
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect();
        if sentences.is_empty() {
            None
        } else {
            Some(Self { sentences })
        }
    }

    pub fn sentences(&self) -> &[String] {
        &self.sentences
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}

impl Default for SentencePool {
    fn default() -> Self {
        Self {
            sentences: BUILTIN_SENTENCES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TextSource for SentencePool {
    fn next_text(&self) -> String {
        let idx = rand::rng().random_range(0..self.sentences.len());
        self.sentences[idx].clone()
    }
}

impl TextSource for Box<dyn TextSource> {
    fn next_text(&self) -> String {
        (**self).next_text()
    }
}

/// Always returns the same text. Handy for tests and fixed practice rooms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedText(pub String);

impl TextSource for FixedText {
    fn next_text(&self) -> String {
        self.0.clone()
    }
}
