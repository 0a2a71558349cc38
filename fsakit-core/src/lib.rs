//! # fsakit-core
//!
//! Finite-state automaton model and simulation engine.
//!
//! This crate provides:
//! - The automaton graph with its naming and referential invariants
//! - Change notifications at automaton and entity level
//! - Non-deterministic simulation with epsilon closure
//! - A line-oriented text format with line-accurate diagnostics

pub mod automaton;
pub mod error;
pub mod format;
pub mod notify;
pub mod shared;
pub mod sim;
pub mod snapshot;
pub mod state;

pub use automaton::Automaton;
pub use error::{FormatError, GraphError, SnapshotError};
pub use notify::{
    Listener, Notification, NotificationLog, Scope, StateChange, SubscriptionId, TransitionChange,
};
pub use shared::SharedAutomaton;
pub use snapshot::{AutomatonSnapshot, StateSnapshot, TransitionSnapshot};
pub use state::{Position, State, StateId, Transition, TransitionId};
