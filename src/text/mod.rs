// Display segmentation of raw text
// Paragraph and word boundaries are re-derived here independently of the analysis service

pub mod index;
pub mod segmenter;
pub mod sentences;

pub use index::PositionIndex;
pub use segmenter::{Paragraph, Position, Segment, WordToken, segment_text};
pub use sentences::{associate_sentences, sentence_count, sentence_prefix};
