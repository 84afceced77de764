
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::machine::{
    HighlightMachine, HighlightMode, HighlightSnapshot, LeaveTicket, LookupOutcome, LookupRequest,
};
use crate::config::HighlightConfig;
use crate::similarity::{SimilarWord, SimilaritySource};
use crate::text::{Position, WordToken};

#[derive(Debug)]
enum ControllerEvent {
    LookupFinished {
        epoch: u64,
        request: LookupRequest,
        similar: Vec<SimilarWord>,
    },
    LeaveElapsed(LeaveTicket),
}

/// What processing one background event did to the highlight state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    SimilarityApplied,
    SimilarityDiscarded,
    BecameIdle,
    LeaveIgnored,
}

/// Drives a [`HighlightMachine`] on the tokio runtime.
///
/// Leave transitions are delayed by the configured debounce and similarity
/// lookups run as spawned tasks. Both report back through an internal
/// channel, so state only changes inside [`next_event`](Self::next_event),
/// [`settle_lookups`](Self::settle_lookups) or
/// [`drain_events`](Self::drain_events).
///
/// Outstanding work is the set of events still owed to the controller, not
/// the set of live tasks: a task may still be running after its event was
/// applied.
pub struct HighlightController {
    machine: HighlightMachine,
    source: Arc<dyn SimilaritySource>,
    debounce: Duration,
    events_tx: mpsc::UnboundedSender<ControllerEvent>,
    events_rx: mpsc::UnboundedReceiver<ControllerEvent>,
    leave_timer: Option<JoinHandle<()>>,
    lookups: Vec<JoinHandle<()>>,
    // Lookup events of the current epoch not yet applied
    lookups_owed: usize,
    leave_owed: Option<LeaveTicket>,
    // Bumped on every source replacement
    epoch: u64,
}

impl HighlightController {
    #[inline]
    pub fn new(source: Arc<dyn SimilaritySource>, config: &HighlightConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            machine: HighlightMachine::new(config.default_mode),
            source,
            debounce: config.leave_debounce(),
            events_tx,
            events_rx,
            leave_timer: None,
            lookups: Vec::new(),
            lookups_owed: 0,
            leave_owed: None,
            epoch: 0,
        }
    }

    #[inline]
    pub const fn machine(&self) -> &HighlightMachine {
        &self.machine
    }

    #[inline]
    pub const fn debounce(&self) -> Duration {
        self.debounce
    }

    #[inline]
    pub fn snapshot(&self) -> HighlightSnapshot {
        self.machine.snapshot()
    }

    /// Whether a lookup result or a leave transition is still owed
    #[inline]
    pub const fn has_outstanding_work(&self) -> bool {
        self.lookups_owed > 0 || self.leave_owed.is_some()
    }

    /// Pointer entered a word; must be called from within a tokio runtime
    #[inline]
    pub fn hover(&mut self, word: WordToken, position: Position) {
        self.cancel_leave_timer();
        if let Some(request) = self.machine.hover(word, position) {
            self.spawn_lookup(request);
        }
    }

    /// Pointer left a word; idle follows after the debounce unless re-entered
    #[inline]
    pub fn leave(&mut self) {
        self.cancel_leave_timer();
        let Some(ticket) = self.machine.leave() else {
            return;
        };

        let delay = self.debounce;
        let events = self.events_tx.clone();
        self.leave_owed = Some(ticket);
        self.leave_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The receiver lives as long as the controller
            let _ = events.send(ControllerEvent::LeaveElapsed(ticket));
        }));
    }

    #[inline]
    pub fn set_mode(&mut self, mode: HighlightMode) {
        if let Some(request) = self.machine.set_mode(mode) {
            self.spawn_lookup(request);
        }
    }

    #[inline]
    pub fn toggle_mode(&mut self) -> HighlightMode {
        let mode = self.machine.mode().toggled();
        self.set_mode(mode);
        mode
    }

    /// Swap in the similarity source for a new document.
    ///
    /// Pending timers and lookups are aborted and the machine starts a fresh
    /// session, so nothing from the previous document can land afterwards.
    #[inline]
    pub fn replace_source(&mut self, source: Arc<dyn SimilaritySource>) {
        self.cancel_leave_timer();
        for lookup in self.lookups.drain(..) {
            lookup.abort();
        }
        while self.events_rx.try_recv().is_ok() {}
        // An aborted lookup may still deliver; its epoch marks it as foreign
        self.epoch += 1;
        self.lookups_owed = 0;

        self.source = source;
        self.machine.reset();
    }

    /// Wait for the next background event and apply it.
    ///
    /// Returns `None` once nothing is outstanding.
    #[inline]
    pub async fn next_event(&mut self) -> Option<EventOutcome> {
        if !self.has_outstanding_work() {
            // Leftovers from cancelled timers are applied but never waited for
            let event = self.events_rx.try_recv().ok()?;
            return Some(self.apply(event));
        }

        let event = self.events_rx.recv().await?;
        Some(self.apply(event))
    }

    /// Wait until no lookup is owed, leaving any pending leave to its timer.
    ///
    /// Returns the number of events applied on the way.
    #[inline]
    pub async fn settle_lookups(&mut self) -> usize {
        let mut applied = self.drain_events();
        while self.lookups_owed > 0 {
            let Some(event) = self.events_rx.recv().await else {
                break;
            };
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Apply every event that has already arrived, without waiting
    #[inline]
    pub fn drain_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, event: ControllerEvent) -> EventOutcome {
        match event {
            ControllerEvent::LookupFinished {
                epoch,
                request,
                similar,
            } => {
                if epoch == self.epoch {
                    self.lookups_owed = self.lookups_owed.saturating_sub(1);
                }
                match self.machine.complete_lookup(&request, similar) {
                    LookupOutcome::Applied => EventOutcome::SimilarityApplied,
                    LookupOutcome::Stale => EventOutcome::SimilarityDiscarded,
                }
            }
            ControllerEvent::LeaveElapsed(ticket) => {
                if self.leave_owed == Some(ticket) {
                    self.leave_owed = None;
                }
                if self.machine.leave_elapsed(ticket) {
                    self.leave_timer = None;
                    debug!("Highlight cleared after leave debounce");
                    EventOutcome::BecameIdle
                } else {
                    EventOutcome::LeaveIgnored
                }
            }
        }
    }

    fn spawn_lookup(&mut self, request: LookupRequest) {
        let source = Arc::clone(&self.source);
        let events = self.events_tx.clone();
        let epoch = self.epoch;
        trace!("Spawning similarity lookup for '{}'", request.word);

        self.lookups.retain(|lookup| !lookup.is_finished());
        self.lookups_owed += 1;
        self.lookups.push(tokio::spawn(async move {
            let similar = source.similar_words(request.word.as_str()).await;
            let _ = events.send(ControllerEvent::LookupFinished {
                epoch,
                request,
                similar,
            });
        }));
    }

    fn cancel_leave_timer(&mut self) {
        if let Some(timer) = self.leave_timer.take() {
            timer.abort();
        }
        self.leave_owed = None;
    }
}

impl std::fmt::Debug for HighlightController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightController")
            .field("machine", &self.machine)
            .field("debounce", &self.debounce)
            .field("lookups_owed", &self.lookups_owed)
            .field("leave_owed", &self.leave_owed.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for HighlightController {
    fn drop(&mut self) {
        self.cancel_leave_timer();
        for lookup in self.lookups.drain(..) {
            lookup.abort();
        }
    }
}
