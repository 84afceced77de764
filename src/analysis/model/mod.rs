#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Options sent along with a text to analyze
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub include_embeddings: bool,
}

impl Default for AnalysisOptions {
    #[inline]
    fn default() -> Self {
        Self {
            include_embeddings: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisRequest {
    pub text: String,
    pub options: AnalysisOptions,
}

/// Precomputed metadata for one vocabulary word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordMetadata {
    pub count: u64,
    pub frequency: f64,
    pub is_stopword: bool,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_dim: Option<usize>,
}

impl WordMetadata {
    /// The embedding vector, treating an empty vector as absent
    #[inline]
    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref().filter(|e| !e.is_empty())
    }

    #[inline]
    pub fn has_embedding(&self) -> bool {
        self.embedding().is_some()
    }

    /// Declared embedding dimension, falling back to the vector length
    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.embedding_dim
            .or_else(|| self.embedding().map(<[f32]>::len))
    }
}

/// The service's word dictionary, in the order the service sent it.
///
/// Order matters: similarity ties are broken by first appearance here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataTable {
    entries: Vec<(String, WordMetadata)>,
    lookup: HashMap<String, usize>,
}

impl MetadataTable {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry; a replaced entry keeps its original slot
    #[inline]
    pub fn insert(&mut self, word: impl Into<String>, metadata: WordMetadata) {
        let word = word.into();
        if let Some(&slot) = self.lookup.get(&word) {
            self.entries[slot].1 = metadata;
        } else {
            self.lookup.insert(word.clone(), self.entries.len());
            self.entries.push((word, metadata));
        }
    }

    #[inline]
    pub fn get(&self, word: &str) -> Option<&WordMetadata> {
        self.lookup.get(word).map(|&slot| &self.entries[slot].1)
    }

    #[inline]
    pub fn contains(&self, word: &str) -> bool {
        self.lookup.contains_key(word)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in service order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &WordMetadata)> {
        self.entries.iter().map(|(word, meta)| (word.as_str(), meta))
    }
}

impl<W: Into<String>> FromIterator<(W, WordMetadata)> for MetadataTable {
    #[inline]
    fn from_iter<I: IntoIterator<Item = (W, WordMetadata)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (word, metadata) in iter {
            table.insert(word, metadata);
        }
        table
    }
}

impl Serialize for MetadataTable {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (word, metadata) in &self.entries {
            map.serialize_entry(word, metadata)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MetadataTable {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = MetadataTable;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a map of words to word metadata")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut table = MetadataTable::new();
                while let Some((word, metadata)) = access.next_entry::<String, WordMetadata>()? {
                    table.insert(word, metadata);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// Document-level statistics computed by the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub word_count: u64,
    pub unique_word_count: u64,
    pub sentence_count: u64,
    #[serde(default)]
    pub character_count: Option<u64>,
    pub avg_words_per_sentence: f64,
    pub avg_word_length: f64,
    pub content_word_count: u64,
    pub stopword_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopWord {
    pub word: String,
    pub count: u64,
}

/// A nearest neighbour precomputed by the service (L2 distance, smaller is closer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub word: String,
    pub distance: f32,
}

/// A complete, successful analysis response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub sentences: Vec<String>,
    pub word_dictionary: MetadataTable,
    pub statistics: Statistics,
    pub top_words: Vec<TopWord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_embedding: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_coverage: Option<f64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub words_neighbors: HashMap<String, Vec<Neighbor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Embedding of a single word, looked up outside any analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordLookup {
    pub word: String,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_dim: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WordLookup {
    #[inline]
    pub fn has_embedding(&self) -> bool {
        self.embedding.as_ref().is_some_and(|e| !e.is_empty())
    }

    /// Metadata entry for a word the analysis did not cover.
    ///
    /// Counts are zero and the word is not treated as a stopword.
    #[inline]
    pub fn into_metadata(self) -> WordMetadata {
        let embedding_dim = self
            .embedding_dim
            .or_else(|| self.embedding.as_ref().map(Vec::len));
        WordMetadata {
            count: 0,
            frequency: 0.0,
            is_stopword: false,
            embedding: self.embedding.filter(|e| !e.is_empty()),
            embedding_dim,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimilarityRequest {
    pub word1: String,
    pub word2: String,
}

/// Pairwise similarity computed by the service's own model
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WordSimilarity {
    pub word1: String,
    pub word2: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Body of a non-success response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub cache_size: u64,
    pub word2vec_loaded: bool,
    pub timestamp: NaiveDateTime,
}

impl HealthStatus {
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
