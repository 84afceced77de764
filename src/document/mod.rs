
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analysis::{
    AnalysisResult, MetadataTable, Neighbor, ServiceError, Statistics, TopWord, WordMetadata,
};
use crate::similarity::SimilarityRanker;
use crate::text::{
    Paragraph, Position, PositionIndex, Segment, WordToken, associate_sentences, segment_text,
    sentence_count,
};

/// Display statistics for one paragraph
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParagraphStats {
    pub word_count: usize,
    pub distinct_words: usize,
    /// Associated sentences, never less than one
    pub sentence_count: usize,
    pub avg_sentence_length: f64,
}

/// A segmented paragraph joined with the sentences that appear in it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParagraphView {
    pub paragraph: Paragraph,
    pub sentences: Vec<String>,
    pub stats: ParagraphStats,
}

impl ParagraphView {
    fn new(paragraph: Paragraph, all_sentences: &[String]) -> Self {
        let sentences: Vec<String> = associate_sentences(&paragraph.text, all_sentences)
            .into_iter()
            .map(str::to_string)
            .collect();

        let word_count = paragraph.word_count();
        let distinct_words = paragraph
            .words()
            .filter_map(|segment| segment.word.as_ref())
            .collect::<BTreeSet<_>>()
            .len();
        let sentence_count = sentence_count(sentences.len());

        Self {
            stats: ParagraphStats {
                word_count,
                distinct_words,
                sentence_count,
                avg_sentence_length: word_count as f64 / sentence_count as f64,
            },
            paragraph,
            sentences,
        }
    }

    #[inline]
    pub const fn index(&self) -> usize {
        self.paragraph.index
    }

    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.paragraph.segments
    }
}

/// Read-only join of one text with the analysis the service returned for it.
///
/// Built once per successful analysis and replaced wholesale by the next.
#[derive(Debug, Clone)]
pub struct Document {
    text: String,
    paragraphs: Vec<ParagraphView>,
    index: PositionIndex,
    table: Arc<MetadataTable>,
    sentences: Vec<String>,
    statistics: Statistics,
    top_words: Vec<TopWord>,
    document_embedding: Option<Vec<f32>>,
    embedding_coverage: Option<f64>,
    neighbors: HashMap<String, Vec<Neighbor>>,
    cached: Option<bool>,
    cache_key: Option<String>,
    filename: Option<String>,
}

impl Document {
    #[inline]
    pub fn new(text: impl Into<String>, result: AnalysisResult) -> Self {
        let text = text.into();
        let AnalysisResult {
            sentences,
            word_dictionary,
            statistics,
            top_words,
            document_embedding,
            embedding_coverage,
            words_neighbors,
            cached,
            cache_key,
            filename,
        } = result;

        let segmented = segment_text(&text);
        let index = PositionIndex::build(&segmented);
        let paragraphs: Vec<ParagraphView> = segmented
            .into_iter()
            .map(|paragraph| ParagraphView::new(paragraph, &sentences))
            .collect();

        debug!(
            "Joined {} paragraphs with {} vocabulary entries and {} sentences",
            paragraphs.len(),
            word_dictionary.len(),
            sentences.len()
        );

        Self {
            text,
            paragraphs,
            index,
            table: Arc::new(word_dictionary),
            sentences,
            statistics,
            top_words,
            document_embedding,
            embedding_coverage,
            neighbors: words_neighbors,
            cached,
            cache_key,
            filename,
        }
    }

    /// Whether this document is exactly what `text` and `result` would build
    #[inline]
    pub fn is_derived_from(&self, text: &str, result: &AnalysisResult) -> bool {
        self.text == text
            && *self.table == result.word_dictionary
            && self.sentences == result.sentences
            && self.statistics == result.statistics
            && self.top_words == result.top_words
            && self.document_embedding == result.document_embedding
            && self.embedding_coverage == result.embedding_coverage
            && self.neighbors == result.words_neighbors
            && self.cached == result.cached
            && self.cache_key == result.cache_key
            && self.filename == result.filename
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn paragraphs(&self) -> &[ParagraphView] {
        &self.paragraphs
    }

    #[inline]
    pub fn paragraph(&self, index: usize) -> Option<&ParagraphView> {
        self.paragraphs.get(index)
    }

    #[inline]
    pub fn segment(&self, position: Position) -> Option<&Segment> {
        self.paragraph(position.paragraph)?
            .paragraph
            .segment(position.segment)
    }

    /// The normalized word at `position`, if that segment is a word
    #[inline]
    pub fn word_at(&self, position: Position) -> Option<&WordToken> {
        self.segment(position)?.word.as_ref()
    }

    #[inline]
    pub const fn index(&self) -> &PositionIndex {
        &self.index
    }

    #[inline]
    pub fn occurrences(&self, word: &str) -> &[Position] {
        self.index.occurrences(word)
    }

    #[inline]
    pub const fn table(&self) -> &Arc<MetadataTable> {
        &self.table
    }

    /// Metadata for `word`; `None` when the service did not report it
    #[inline]
    pub fn metadata(&self, word: &str) -> Option<&WordMetadata> {
        self.table.get(word)
    }

    #[inline]
    pub fn sentences(&self) -> &[String] {
        &self.sentences
    }

    #[inline]
    pub const fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    #[inline]
    pub fn top_words(&self) -> &[TopWord] {
        &self.top_words
    }

    #[inline]
    pub fn document_embedding(&self) -> Option<&[f32]> {
        self.document_embedding.as_deref()
    }

    /// Nearest neighbours the service computed for `word`, closest first
    #[inline]
    pub fn server_neighbors(&self, word: &str) -> &[Neighbor] {
        self.neighbors
            .get(word)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[inline]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    #[inline]
    pub fn cache_key(&self) -> Option<&str> {
        self.cache_key.as_deref()
    }

    #[inline]
    pub fn was_cached(&self) -> bool {
        self.cached == Some(true)
    }

    /// Unique words per hundred words, one decimal; 0 for an empty text
    #[inline]
    pub fn lexical_density(&self) -> f64 {
        if self.statistics.word_count == 0 {
            return 0.0;
        }
        let density = self.statistics.unique_word_count as f64
            / self.statistics.word_count as f64
            * 100.0;
        round_to(density, 1)
    }

    /// Fraction of content-word occurrences that carry an embedding.
    ///
    /// Uses the service's figure when it sent one.
    #[inline]
    pub fn embedding_coverage(&self) -> f64 {
        self.embedding_coverage
            .unwrap_or_else(|| computed_coverage(&self.table))
    }

    #[inline]
    pub const fn content_word_count(&self) -> u64 {
        self.statistics
            .word_count
            .saturating_sub(self.statistics.stopword_count)
    }

    /// Display words the service sent no metadata for, alphabetically
    #[inline]
    pub fn vocabulary_mismatch(&self) -> Vec<&WordToken> {
        let mut missing: Vec<&WordToken> = self
            .index
            .words()
            .filter(|word| !self.table.contains(word.as_str()))
            .collect();
        missing.sort_unstable();
        missing
    }

    /// A ranker over this document's vocabulary
    #[inline]
    pub fn similarity_ranker(&self, limit: usize) -> SimilarityRanker {
        SimilarityRanker::new(Arc::clone(&self.table)).with_limit(limit)
    }
}

fn computed_coverage(table: &MetadataTable) -> f64 {
    let (covered, total) = table
        .iter()
        .filter(|(_, metadata)| !metadata.is_stopword)
        .fold((0_u64, 0_u64), |(covered, total), (_, metadata)| {
            let with_embedding = if metadata.has_embedding() {
                metadata.count
            } else {
                0
            };
            (covered + with_embedding, total + metadata.count)
        });

    if total == 0 {
        return 0.0;
    }
    round_to(covered as f64 / total as f64, 2)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (value * scale).round() / scale
}

/// Whether [`Workspace::apply`] rebuilt the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Unchanged,
    Replaced,
}

/// Holds the current document and memoizes its derivation.
///
/// Applying the same `(text, analysis)` pair again keeps the existing
/// document; a failed analysis leaves it in place.
#[derive(Debug, Default)]
pub struct Workspace {
    document: Option<Document>,
    generation: u64,
}

impl Workspace {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub const fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Number of documents built so far
    #[inline]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Commit the outcome of an analysis of `text`.
    ///
    /// An error is returned unchanged and nothing is committed.
    #[inline]
    pub fn apply(
        &mut self,
        text: &str,
        outcome: Result<AnalysisResult, ServiceError>,
    ) -> Result<ApplyOutcome, ServiceError> {
        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!("Analysis failed, keeping the current document: {}", e);
                return Err(e);
            }
        };

        match &self.document {
            Some(current) if current.is_derived_from(text, &result) => {
                debug!("Analysis unchanged, reusing document");
                return Ok(ApplyOutcome::Unchanged);
            }
            _ => {}
        }

        let document = Document::new(text, result);
        self.generation += 1;
        info!(
            "Document {} ready: {} paragraphs, {} distinct words",
            self.generation,
            document.paragraphs().len(),
            document.index().len()
        );
        self.document = Some(document);
        Ok(ApplyOutcome::Replaced)
    }
}
