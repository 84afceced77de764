
use std::collections::HashMap;

use tracing::debug;

use super::segmenter::{Paragraph, Position, WordToken};

/// Immutable mapping from a normalized word to every place it occurs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionIndex {
    occurrences: HashMap<WordToken, Vec<Position>>,
    total: usize,
}

impl PositionIndex {
    /// Walk every segment in document order and record word occurrences
    #[inline]
    pub fn build(paragraphs: &[Paragraph]) -> Self {
        let mut occurrences: HashMap<WordToken, Vec<Position>> = HashMap::new();
        let mut total = 0;

        for segment in paragraphs.iter().flat_map(|p| p.segments.iter()) {
            if let Some(word) = &segment.word {
                occurrences
                    .entry(word.clone())
                    .or_default()
                    .push(segment.position());
                total += 1;
            }
        }

        debug!(
            "Built position index with {} distinct words and {} occurrences",
            occurrences.len(),
            total
        );

        Self { occurrences, total }
    }

    /// Occurrences of `word` in document order; empty when the word never appears
    #[inline]
    pub fn occurrences(&self, word: &str) -> &[Position] {
        self.occurrences
            .get(word)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[inline]
    pub fn count(&self, word: &str) -> usize {
        self.occurrences(word).len()
    }

    #[inline]
    pub fn contains(&self, word: &str) -> bool {
        self.occurrences.contains_key(word)
    }

    /// Number of distinct words
    #[inline]
    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    /// Number of word occurrences across the whole document
    #[inline]
    pub const fn total_occurrences(&self) -> usize {
        self.total
    }

    #[inline]
    pub fn words(&self) -> impl Iterator<Item = &WordToken> {
        self.occurrences.keys()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&WordToken, &[Position])> {
        self.occurrences
            .iter()
            .map(|(word, positions)| (word, positions.as_slice()))
    }
}
