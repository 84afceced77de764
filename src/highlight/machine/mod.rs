
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::similarity::{SimilarWord, SimilarityCache};
use crate::text::{Position, WordToken};

/// How the highlight set is derived from the hovered word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HighlightMode {
    /// Every occurrence of the hovered word
    #[default]
    CoOccurrence,
    /// The hovered word plus its most similar words
    Similarity,
}

impl HighlightMode {
    #[inline]
    pub const fn toggled(self) -> Self {
        match self {
            Self::CoOccurrence => Self::Similarity,
            Self::Similarity => Self::CoOccurrence,
        }
    }
}

impl fmt::Display for HighlightMode {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CoOccurrence => f.write_str("co-occurrence"),
            Self::Similarity => f.write_str("similarity"),
        }
    }
}

impl FromStr for HighlightMode {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "co-occurrence" | "cooccurrence" | "occurrence" => Ok(Self::CoOccurrence),
            "similarity" | "similar" => Ok(Self::Similarity),
            other => Err(format!(
                "Unknown highlight mode '{other}' (expected 'co-occurrence' or 'similarity')"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HoverState {
    #[default]
    Idle,
    Hovering { word: WordToken, position: Position },
}

/// Display class of one word token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HighlightClass {
    None,
    /// The exact occurrence under the pointer
    Hovered,
    /// Another occurrence of the hovered word
    CoOccurrence,
    /// A word from the hovered word's similarity list
    Similar,
}

impl HighlightClass {
    #[inline]
    pub const fn is_highlighted(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// A similarity lookup the machine wants computed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub word: WordToken,
    session: u64,
    ticket: u64,
}

/// Identifies one scheduled leave transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveTicket {
    session: u64,
    ticket: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Cached and reflected in the highlight set
    Applied,
    /// The pointer moved on or the document changed; the result was dropped
    Stale,
}

/// Words currently highlighted, derived on demand
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HighlightSet(BTreeSet<String>);

impl HighlightSet {
    #[inline]
    pub fn contains(&self, word: &str) -> bool {
        self.0.contains(word)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Everything a renderer needs, captured at one instant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightSnapshot {
    pub mode: HighlightMode,
    pub hovered: Option<WordToken>,
    pub position: Option<Position>,
    pub highlighted: HighlightSet,
    pub similar: Vec<SimilarWord>,
}

/// Owner of hover state, highlight mode and the session's similarity cache.
///
/// The machine never sleeps or spawns: transitions hand back tickets and the
/// caller reports completions through [`complete_lookup`](Self::complete_lookup)
/// and [`leave_elapsed`](Self::leave_elapsed). A completion whose ticket no
/// longer matches is ignored.
#[derive(Debug, Default)]
pub struct HighlightMachine {
    state: HoverState,
    mode: HighlightMode,
    cache: SimilarityCache,
    session: u64,
    next_ticket: u64,
    pending_leave: Option<u64>,
    in_flight: HashMap<WordToken, u64>,
}

impl HighlightMachine {
    #[inline]
    pub fn new(mode: HighlightMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    #[inline]
    pub const fn state(&self) -> &HoverState {
        &self.state
    }

    #[inline]
    pub const fn mode(&self) -> HighlightMode {
        self.mode
    }

    #[inline]
    pub const fn session(&self) -> u64 {
        self.session
    }

    #[inline]
    pub const fn cache(&self) -> &SimilarityCache {
        &self.cache
    }

    #[inline]
    pub const fn hovered_word(&self) -> Option<&WordToken> {
        match &self.state {
            HoverState::Idle => None,
            HoverState::Hovering { word, .. } => Some(word),
        }
    }

    #[inline]
    pub const fn hovered_position(&self) -> Option<Position> {
        match &self.state {
            HoverState::Idle => None,
            HoverState::Hovering { position, .. } => Some(*position),
        }
    }

    #[inline]
    pub const fn is_leave_pending(&self) -> bool {
        self.pending_leave.is_some()
    }

    #[inline]
    pub fn is_lookup_pending(&self, word: &str) -> bool {
        self.in_flight.contains_key(word)
    }

    /// Pointer entered a word occurrence.
    ///
    /// Cancels any pending leave. In similarity mode, returns a lookup to run
    /// when the word is neither cached nor already being looked up.
    #[inline]
    pub fn hover(&mut self, word: WordToken, position: Position) -> Option<LookupRequest> {
        self.pending_leave = None;
        self.state = HoverState::Hovering { word, position };
        self.request_lookup()
    }

    /// Pointer left a word; returns the ticket for the debounced transition to idle
    #[inline]
    pub fn leave(&mut self) -> Option<LeaveTicket> {
        if self.state == HoverState::Idle {
            return None;
        }

        let ticket = self.issue_ticket();
        self.pending_leave = Some(ticket);
        Some(LeaveTicket {
            session: self.session,
            ticket,
        })
    }

    /// The debounce delay for `ticket` has passed.
    ///
    /// Returns true when this moved the machine to idle.
    #[inline]
    pub fn leave_elapsed(&mut self, ticket: LeaveTicket) -> bool {
        if ticket.session != self.session || self.pending_leave != Some(ticket.ticket) {
            return false;
        }

        self.pending_leave = None;
        self.state = HoverState::Idle;
        true
    }

    /// Change the highlight mode; the hover state is untouched
    #[inline]
    pub fn set_mode(&mut self, mode: HighlightMode) -> Option<LookupRequest> {
        self.mode = mode;
        self.request_lookup()
    }

    /// Deliver the result of a lookup issued by this machine
    #[inline]
    pub fn complete_lookup(
        &mut self,
        request: &LookupRequest,
        similar: Vec<SimilarWord>,
    ) -> LookupOutcome {
        if request.session != self.session {
            debug!(
                "Dropping similarity result for '{}' from a previous document",
                request.word
            );
            return LookupOutcome::Stale;
        }

        if self.in_flight.get(&request.word) == Some(&request.ticket) {
            self.in_flight.remove(&request.word);
        }

        if self.hovered_word() != Some(&request.word) {
            debug!(
                "Dropping similarity result for '{}', pointer has moved on",
                request.word
            );
            return LookupOutcome::Stale;
        }

        self.cache.insert(request.word.as_str(), similar);
        LookupOutcome::Applied
    }

    /// Start a new session: idle, empty cache, every outstanding ticket void
    #[inline]
    pub fn reset(&mut self) {
        self.session += 1;
        self.state = HoverState::Idle;
        self.pending_leave = None;
        self.in_flight.clear();
        self.cache.clear();
        debug!("Highlight session {} started", self.session);
    }

    /// Similarity list of the hovered word, in similarity mode once computed
    #[inline]
    pub fn similar_words(&self) -> Option<&[SimilarWord]> {
        if self.mode != HighlightMode::Similarity {
            return None;
        }
        self.hovered_word()
            .and_then(|word| self.cache.get(word.as_str()))
    }

    /// The hovered word, plus its similar words in similarity mode
    #[inline]
    pub fn highlight_set(&self) -> HighlightSet {
        let mut set = BTreeSet::new();
        if let Some(word) = self.hovered_word() {
            set.insert(word.to_string());
        }
        for similar in self.similar_words().unwrap_or_default() {
            set.insert(similar.word.clone());
        }
        HighlightSet(set)
    }

    /// Display class for the token `word` rendered at `position`
    #[inline]
    pub fn class_for(&self, word: &str, position: Position) -> HighlightClass {
        let HoverState::Hovering {
            word: hovered,
            position: hovered_at,
        } = &self.state
        else {
            return HighlightClass::None;
        };

        if hovered.as_str() == word {
            if *hovered_at == position {
                HighlightClass::Hovered
            } else {
                HighlightClass::CoOccurrence
            }
        } else if self
            .similar_words()
            .is_some_and(|similar| similar.iter().any(|s| s.word == word))
        {
            HighlightClass::Similar
        } else {
            HighlightClass::None
        }
    }

    #[inline]
    pub fn snapshot(&self) -> HighlightSnapshot {
        HighlightSnapshot {
            mode: self.mode,
            hovered: self.hovered_word().cloned(),
            position: self.hovered_position(),
            highlighted: self.highlight_set(),
            similar: self.similar_words().map(<[_]>::to_vec).unwrap_or_default(),
        }
    }

    fn request_lookup(&mut self) -> Option<LookupRequest> {
        if self.mode != HighlightMode::Similarity {
            return None;
        }
        let word = self.hovered_word()?.clone();
        if self.cache.contains(word.as_str()) || self.in_flight.contains_key(&word) {
            return None;
        }

        let ticket = self.issue_ticket();
        self.in_flight.insert(word.clone(), ticket);
        debug!("Requesting similarity lookup for '{}'", word);
        Some(LookupRequest {
            word,
            session: self.session,
            ticket,
        })
    }

    fn issue_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }
}
