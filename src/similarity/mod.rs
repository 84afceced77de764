
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::analysis::{MetadataTable, WordMetadata};

/// Upper bound on the length of a similarity list
pub const MAX_SIMILAR_WORDS: usize = 5;

/// A candidate word and its similarity to the target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarWord {
    pub word: String,
    pub score: f32,
}

/// Pairwise embedding similarity, higher is more similar
pub trait Scorer {
    fn score(&self, target: &[f32], candidate: &[f32]) -> f32;
}

/// Raw dot product over the shared prefix of both vectors.
///
/// Embeddings are not normalized first, so magnitude contributes to the score.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotProduct;

impl Scorer for DotProduct {
    #[inline]
    fn score(&self, target: &[f32], candidate: &[f32]) -> f32 {
        target.iter().zip(candidate).map(|(a, b)| a * b).sum()
    }
}

/// Ranks the vocabulary of one analysis by similarity to a target word
#[derive(Debug, Clone)]
pub struct SimilarityRanker<S = DotProduct> {
    table: Arc<MetadataTable>,
    scorer: S,
    limit: usize,
}

impl SimilarityRanker {
    #[inline]
    pub fn new(table: Arc<MetadataTable>) -> Self {
        Self::with_scorer(table, DotProduct)
    }
}

impl<S: Scorer> SimilarityRanker<S> {
    #[inline]
    pub fn with_scorer(table: Arc<MetadataTable>, scorer: S) -> Self {
        Self {
            table,
            scorer,
            limit: MAX_SIMILAR_WORDS,
        }
    }

    /// Cap the result length; values outside `1..=5` are clamped
    #[inline]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.clamp(1, MAX_SIMILAR_WORDS);
        self
    }

    #[inline]
    pub fn table(&self) -> &MetadataTable {
        &self.table
    }

    #[inline]
    pub const fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Top matches for `word`, best first.
    ///
    /// Candidates are every other non-stopword entry carrying an embedding.
    /// Equal scores keep dictionary order. A word that is missing from the
    /// table or has no embedding yields an empty list.
    #[inline]
    pub fn rank(&self, word: &str) -> Vec<SimilarWord> {
        let Some(target) = self.table.get(word).and_then(WordMetadata::embedding) else {
            debug!("No embedding for '{}', skipping similarity scan", word);
            return Vec::new();
        };
        self.rank_embedding(word, target)
    }

    /// Rank the table against an embedding supplied from outside it.
    ///
    /// `word` is excluded from the candidates like in [`rank`](Self::rank).
    #[inline]
    pub fn rank_embedding(&self, word: &str, target: &[f32]) -> Vec<SimilarWord> {
        let mut scored: Vec<(&str, f32)> = self
            .table
            .iter()
            .filter(|(candidate, metadata)| *candidate != word && !metadata.is_stopword)
            .filter_map(|(candidate, metadata)| {
                metadata
                    .embedding()
                    .map(|embedding| (candidate, self.scorer.score(target, embedding)))
            })
            .collect();

        let candidates = scored.len();
        scored.sort_by(|a, b| descending(a.1, b.1));
        scored.truncate(self.limit);

        debug!(
            "Ranked {} candidates for '{}', kept {}",
            candidates,
            word,
            scored.len()
        );

        scored
            .into_iter()
            .map(|(candidate, score)| SimilarWord {
                word: candidate.to_string(),
                score,
            })
            .collect()
    }
}

// NaN sorts after every number; everything else is plain descending order.
fn descending(a: f32, b: f32) -> Ordering {
    b.partial_cmp(&a)
        .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

/// Something that can produce a similarity list, possibly yielding first
#[async_trait]
pub trait SimilaritySource: Send + Sync {
    async fn similar_words(&self, word: &str) -> Vec<SimilarWord>;
}

#[async_trait]
impl<S: Scorer + Send + Sync> SimilaritySource for SimilarityRanker<S> {
    async fn similar_words(&self, word: &str) -> Vec<SimilarWord> {
        tokio::task::yield_now().await;
        self.rank(word)
    }
}

/// Similarity lists computed during one analysis session.
///
/// Entries are written once and never evicted; `clear` is for session
/// replacement only.
#[derive(Debug, Clone, Default)]
pub struct SimilarityCache {
    entries: HashMap<String, Arc<[SimilarWord]>>,
}

impl SimilarityCache {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, word: &str) -> Option<&[SimilarWord]> {
        self.entries.get(word).map(AsRef::as_ref)
    }

    #[inline]
    pub fn contains(&self, word: &str) -> bool {
        self.entries.contains_key(word)
    }

    /// Store a list unless one is already cached; returns the cached list
    #[inline]
    pub fn insert(&mut self, word: &str, similar: Vec<SimilarWord>) -> &[SimilarWord] {
        self.entries
            .entry(word.to_string())
            .or_insert_with(|| similar.into())
    }

    #[inline]
    pub fn get_or_insert_with<F>(&mut self, word: &str, compute: F) -> &[SimilarWord]
    where
        F: FnOnce() -> Vec<SimilarWord>,
    {
        self.entries
            .entry(word.to_string())
            .or_insert_with(|| compute().into())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
