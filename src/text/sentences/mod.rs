
/// Number of leading characters of a sentence used to locate it in a paragraph
pub const SENTENCE_PREFIX_CHARS: usize = 20;

/// The first `min(20, len)` characters of `sentence`
#[inline]
pub fn sentence_prefix(sentence: &str) -> &str {
    sentence
        .char_indices()
        .nth(SENTENCE_PREFIX_CHARS)
        .and_then(|(end, _)| sentence.get(..end))
        .unwrap_or(sentence)
}

/// Sentences whose prefix occurs somewhere in `paragraph`.
///
/// This is a containment heuristic, not boundary reconciliation: a sentence
/// whose prefix recurs is associated with every paragraph containing it, and
/// a sentence whose text was normalized differently upstream matches nothing.
/// An empty sentence has an empty prefix and matches every paragraph.
#[inline]
pub fn associate_sentences<'a, S>(paragraph: &str, sentences: &'a [S]) -> Vec<&'a str>
where
    S: AsRef<str>,
{
    sentences
        .iter()
        .map(AsRef::as_ref)
        .filter(|sentence| paragraph.contains(sentence_prefix(sentence)))
        .collect()
}

/// Sentence count used for averaging: the number of associated sentences,
/// never less than one.
#[inline]
pub fn sentence_count(associated: usize) -> usize {
    associated.max(1)
}
