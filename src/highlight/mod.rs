// Hover-driven highlighting
// A pure state machine plus the tokio controller that schedules its timers and lookups

pub mod controller;
pub mod machine;

pub use controller::{EventOutcome, HighlightController};
pub use machine::{
    HighlightClass, HighlightMachine, HighlightMode, HighlightSet, HighlightSnapshot, HoverState,
    LeaveTicket, LookupOutcome, LookupRequest,
};
