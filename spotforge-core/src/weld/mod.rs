//! Weld pulse state machine and cycle event log
//!
//! The pulse machine drives the SSR through the timed
//! `Idle -> PreHeat -> Gap -> MainPulse -> Idle` sequence. It is advanced
//! by the short-period control tick, never by the sensing window, so pulse
//! timing resolution stays far below the window duration.

pub mod events;
pub mod machine;

pub use events::{AbortReason, EventKind, EventLog, WeldEvent, EVENT_LOG_CAPACITY};
pub use machine::{PulseMachine, PulseTimings, TickOutcome, WeldPhase};
