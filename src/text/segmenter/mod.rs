
use std::borrow::Borrow;
use std::fmt;
use std::sync::LazyLock;

use fancy_regex::Regex;
use serde::Serialize;
use tracing::debug;

// Paragraphs are the non-empty runs between newlines, so splitting on `\n+`
// and keeping the pieces is the same as matching everything that is not `\n`.
static PARAGRAPH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\n]+").expect("valid regex"));

static SEGMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+|\W+").expect("valid regex"));

/// Normalized identity of a word: lowercase `a-z` only, never empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct WordToken(String);

impl WordToken {
    /// Lower-case `raw` and strip everything outside `a-z`.
    ///
    /// Returns `None` when nothing is left, which is how separators
    /// (whitespace, punctuation, digits) are recognized.
    #[inline]
    pub fn normalize(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .chars()
            .flat_map(char::to_lowercase)
            .filter(char::is_ascii_lowercase)
            .collect();

        (!normalized.is_empty()).then_some(Self(normalized))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WordToken {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WordToken {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for WordToken {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Location of a segment within the segmented document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub paragraph: usize,
    pub segment: usize,
}

impl Position {
    #[inline]
    pub const fn new(paragraph: usize, segment: usize) -> Self {
        Self { paragraph, segment }
    }
}

impl fmt::Display for Position {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.paragraph, self.segment)
    }
}

/// One atomic display unit of a paragraph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// Index of the owning paragraph
    pub paragraph: usize,
    /// Index of this segment within its paragraph
    pub index: usize,
    /// Byte offset of the segment within the paragraph text
    pub offset: usize,
    /// Verbatim source text
    pub text: String,
    /// Normalized word, `None` for separators
    pub word: Option<WordToken>,
}

impl Segment {
    fn new(paragraph: usize, index: usize, offset: usize, text: &str) -> Self {
        Self {
            paragraph,
            index,
            offset,
            text: text.to_string(),
            word: WordToken::normalize(text),
        }
    }

    #[inline]
    pub const fn position(&self) -> Position {
        Position::new(self.paragraph, self.index)
    }

    #[inline]
    pub const fn is_word(&self) -> bool {
        self.word.is_some()
    }
}

/// A paragraph of the source text split into display segments
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paragraph {
    pub index: usize,
    /// Byte offset of the paragraph within the source text
    pub offset: usize,
    pub text: String,
    pub segments: Vec<Segment>,
}

impl Paragraph {
    fn new(index: usize, offset: usize, text: &str) -> Self {
        Self {
            index,
            offset,
            text: text.to_string(),
            segments: split_segments(index, text),
        }
    }

    /// Number of word segments
    #[inline]
    pub fn word_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_word()).count()
    }

    /// Word segments in display order
    #[inline]
    pub fn words(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(|s| s.is_word())
    }

    #[inline]
    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// Concatenate the raw text of every segment
    #[inline]
    pub fn reconstruct(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Segment raw text into paragraphs and display segments.
///
/// Never fails: empty or whitespace-only input yields no paragraphs.
#[inline]
pub fn segment_text(text: &str) -> Vec<Paragraph> {
    let paragraphs: Vec<Paragraph> = PARAGRAPH_REGEX
        .find_iter(text)
        .filter_map(Result::ok)
        .filter(|found| !found.as_str().trim().is_empty())
        .enumerate()
        .map(|(index, found)| Paragraph::new(index, found.start(), found.as_str()))
        .collect();

    debug!(
        "Segmented {} bytes into {} paragraphs ({} segments)",
        text.len(),
        paragraphs.len(),
        paragraphs.iter().map(|p| p.segments.len()).sum::<usize>()
    );

    paragraphs
}

/// Split a paragraph into maximal runs of word and non-word characters
fn split_segments(paragraph: usize, text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut covered = 0;

    for found in SEGMENT_REGEX.find_iter(text).map_while(Result::ok) {
        if found.start() != covered {
            break;
        }
        segments.push(Segment::new(
            paragraph,
            segments.len(),
            found.start(),
            found.as_str(),
        ));
        covered = found.end();
    }

    // Whatever the matcher did not cover stays as one trailing separator so
    // the paragraph can always be rebuilt from its segments.
    match text.get(covered..) {
        Some(rest) if !rest.is_empty() => {
            segments.push(Segment::new(paragraph, segments.len(), covered, rest));
        }
        _ => {}
    }

    segments
}
