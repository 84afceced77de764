
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::analysis::{AnalysisResult, MetadataTable, ServiceError, WordMetadata};
use crate::config::HighlightConfig;
use crate::document::{ApplyOutcome, Document, Workspace};
use crate::highlight::{
    EventOutcome, HighlightClass, HighlightController, HighlightMode, HighlightSnapshot,
};
use crate::similarity::{SimilarWord, SimilarityRanker, SimilaritySource};
use crate::text::{Position, Segment, WordToken};

/// Everything known about one word occurrence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordInfo<'a> {
    pub word: &'a WordToken,
    pub position: Position,
    pub text: &'a str,
    pub metadata: Option<&'a WordMetadata>,
    pub class: HighlightClass,
    pub occurrences: &'a [Position],
}

impl WordInfo<'_> {
    /// Whether similarity highlighting can do anything for this word
    #[inline]
    pub fn has_embedding(&self) -> bool {
        self.metadata.is_some_and(WordMetadata::has_embedding)
    }
}

/// Interactive view over the current document.
///
/// Owns the workspace and the highlight controller, and keeps the two in
/// step: every new document restarts highlighting with a ranker over that
/// document's vocabulary.
#[derive(Debug)]
pub struct Inspector {
    workspace: Workspace,
    controller: HighlightController,
    similar_words: usize,
}

impl Inspector {
    #[inline]
    pub fn new(config: &HighlightConfig) -> Self {
        let empty: Arc<dyn SimilaritySource> =
            Arc::new(SimilarityRanker::new(Arc::new(MetadataTable::new())));
        Self {
            workspace: Workspace::new(),
            controller: HighlightController::new(empty, config),
            similar_words: config.similar_words,
        }
    }

    #[inline]
    pub const fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    #[inline]
    pub const fn document(&self) -> Option<&Document> {
        self.workspace.document()
    }

    #[inline]
    pub const fn controller(&self) -> &HighlightController {
        &self.controller
    }

    /// Commit an analysis outcome; a new document resets highlighting
    #[inline]
    pub fn apply_analysis(
        &mut self,
        text: &str,
        outcome: Result<AnalysisResult, ServiceError>,
    ) -> Result<ApplyOutcome, ServiceError> {
        let applied = self.workspace.apply(text, outcome)?;
        if applied == ApplyOutcome::Replaced {
            if let Some(document) = self.workspace.document() {
                let ranker = document.similarity_ranker(self.similar_words);
                self.controller.replace_source(Arc::new(ranker));
            }
        }
        Ok(applied)
    }

    /// Pointer entered the segment at `position`.
    ///
    /// Separators and positions outside the document are ignored. Returns the
    /// hovered word.
    #[inline]
    pub fn hover(&mut self, position: Position) -> Option<WordToken> {
        let word = self.workspace.document()?.word_at(position)?.clone();
        self.controller.hover(word.clone(), position);
        Some(word)
    }

    /// Hover the first occurrence of `word`
    #[inline]
    pub fn hover_word(&mut self, word: &str) -> Option<Position> {
        let document = self.workspace.document()?;
        let token = WordToken::normalize(word)?;
        let position = document.occurrences(token.as_str()).first().copied()?;
        self.controller.hover(token, position);
        Some(position)
    }

    #[inline]
    pub fn leave(&mut self) {
        self.controller.leave();
    }

    #[inline]
    pub fn set_mode(&mut self, mode: HighlightMode) {
        self.controller.set_mode(mode);
    }

    #[inline]
    pub fn toggle_mode(&mut self) -> HighlightMode {
        self.controller.toggle_mode()
    }

    #[inline]
    pub const fn mode(&self) -> HighlightMode {
        self.controller.machine().mode()
    }

    /// Apply background events until nothing is outstanding
    #[inline]
    pub async fn settle(&mut self) -> usize {
        let mut applied = 0;
        while let Some(outcome) = self.controller.next_event().await {
            debug!("Highlight event: {:?}", outcome);
            applied += 1;
        }
        applied
    }

    /// Apply lookup results until none is owed; a pending leave keeps running
    #[inline]
    pub async fn settle_lookups(&mut self) -> usize {
        self.controller.settle_lookups().await
    }

    /// Wait for a single background event
    #[inline]
    pub async fn next_event(&mut self) -> Option<EventOutcome> {
        self.controller.next_event().await
    }

    #[inline]
    pub fn drain_events(&mut self) -> usize {
        self.controller.drain_events()
    }

    #[inline]
    pub fn snapshot(&self) -> HighlightSnapshot {
        self.controller.snapshot()
    }

    /// The hovered word's similarity list, in similarity mode once computed
    #[inline]
    pub fn similar_words(&self) -> Option<&[SimilarWord]> {
        self.controller.machine().similar_words()
    }

    /// Metadata and display class of the word at `position`
    #[inline]
    pub fn word_info(&self, position: Position) -> Option<WordInfo<'_>> {
        let document = self.workspace.document()?;
        let segment = document.segment(position)?;
        let word = segment.word.as_ref()?;

        Some(WordInfo {
            word,
            position,
            text: &segment.text,
            metadata: document.metadata(word.as_str()),
            class: self.controller.machine().class_for(word.as_str(), position),
            occurrences: document.occurrences(word.as_str()),
        })
    }

    /// Display class of a segment; separators are never highlighted
    #[inline]
    pub fn class_of(&self, segment: &Segment) -> HighlightClass {
        segment.word.as_ref().map_or(HighlightClass::None, |word| {
            self.controller
                .machine()
                .class_for(word.as_str(), segment.position())
        })
    }

    /// Every highlighted occurrence in document order
    #[inline]
    pub fn highlighted_positions(&self) -> Vec<(Position, HighlightClass)> {
        let Some(document) = self.workspace.document() else {
            return Vec::new();
        };
        let machine = self.controller.machine();

        let mut positions: Vec<(Position, HighlightClass)> = machine
            .highlight_set()
            .iter()
            .flat_map(|word| {
                document
                    .occurrences(word)
                    .iter()
                    .map(move |&position| (position, machine.class_for(word, position)))
            })
            .collect();
        positions.sort_unstable_by_key(|(position, _)| *position);
        positions
    }
}
