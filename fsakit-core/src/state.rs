//! State and transition entities.
//!
//! Entities are owned by an [`Automaton`](crate::Automaton) and addressed by
//! opaque ids. Cross references (adjacency, endpoints) are stored as ids, so
//! removing an entity never leaves a dangling handle behind: a stale id simply
//! stops being a member.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Handle to a state inside an automaton.
///
/// Ids are stamped with the automaton that issued them, so a handle is never
/// a member of any other automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId {
    pub(crate) owner: u32,
    pub(crate) index: u32,
}

impl StateId {
    pub(crate) fn new(owner: u32, index: u32) -> Self {
        Self { owner, index }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.index)
    }
}

/// Handle to a transition inside an automaton. Stamped like [`StateId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransitionId {
    pub(crate) owner: u32,
    pub(crate) index: u32,
}

impl TransitionId {
    pub(crate) fn new(owner: u32, index: u32) -> Self {
        Self { owner, index }
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.index)
    }
}

/// Editor position of a state. Carried for the presentation layer only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A state in the automaton.
#[derive(Debug, Clone)]
pub struct State {
    pub(crate) name: String,
    pub(crate) position: Position,
    pub(crate) initial: bool,
    pub(crate) final_: bool,
    pub(crate) current: bool,
    pub(crate) outgoing: BTreeSet<TransitionId>,
    pub(crate) incoming: BTreeSet<TransitionId>,
}

impl State {
    pub(crate) fn new(name: impl Into<String>, position: Position) -> Self {
        Self {
            name: name.into(),
            position,
            initial: false,
            final_: false,
            current: false,
            outgoing: BTreeSet::new(),
            incoming: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_initial(&self) -> bool {
        self.initial
    }

    pub fn is_final(&self) -> bool {
        self.final_
    }

    /// Raw `current` flag. Only meaningful while the automaton is active;
    /// prefer [`Automaton::current_states`](crate::Automaton::current_states).
    pub fn is_current(&self) -> bool {
        self.current
    }

    /// Transitions leaving this state.
    pub fn outgoing(&self) -> impl Iterator<Item = TransitionId> + '_ {
        self.outgoing.iter().copied()
    }

    /// Transitions entering this state.
    pub fn incoming(&self) -> impl Iterator<Item = TransitionId> + '_ {
        self.incoming.iter().copied()
    }
}

/// A transition between two states. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub(crate) from: StateId,
    pub(crate) to: StateId,
    pub(crate) event: Option<String>,
}

impl Transition {
    pub fn from(&self) -> StateId {
        self.from
    }

    pub fn to(&self) -> StateId {
        self.to
    }

    /// Event label, `None` for an epsilon transition.
    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    pub fn is_epsilon(&self) -> bool {
        self.event.is_none()
    }

    /// Returns true if this transition connects `from` to `to` under `event`.
    /// Two epsilon labels compare equal; epsilon never equals a named event.
    pub(crate) fn matches(&self, from: StateId, to: StateId, event: Option<&str>) -> bool {
        self.from == from && self.to == to && self.event.as_deref() == event
    }
}

/// Checks the state name syntax: a letter followed by letters, digits or
/// underscores.
pub fn validate_state_name(name: &str) -> Result<(), &'static str> {
    let mut chars = name.chars();
    match chars.next() {
        None => return Err("name is empty"),
        Some(c) if !c.is_alphabetic() => return Err("name must begin with a letter"),
        Some(_) => {}
    }
    if chars.all(|c| c.is_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err("only letters, digits and underscores are allowed")
    }
}

/// Checks an event label: non-empty, letters only.
pub fn validate_event_label(label: &str) -> Result<(), &'static str> {
    if label.is_empty() {
        return Err("label is empty");
    }
    if label.chars().all(char::is_alphabetic) {
        Ok(())
    } else {
        Err("label must contain letters only")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_name_syntax() {
        assert!(validate_state_name("q0").is_ok());
        assert!(validate_state_name("start_state_2").is_ok());
        assert!(validate_state_name("Zeta").is_ok());

        assert!(validate_state_name("").is_err());
        assert!(validate_state_name("0q").is_err());
        assert!(validate_state_name("_q").is_err());
        assert!(validate_state_name("q-1").is_err());
        assert!(validate_state_name("q 1").is_err());
    }

    #[test]
    fn test_event_label_syntax() {
        assert!(validate_event_label("coin").is_ok());
        assert!(validate_event_label("PUSH").is_ok());

        assert!(validate_event_label("").is_err());
        assert!(validate_event_label("a1").is_err());
        assert!(validate_event_label("go_on").is_err());
        assert!(validate_event_label("?").is_err());
    }

    #[test]
    fn test_transition_label_equality() {
        let eps = Transition {
            from: StateId::new(0, 0),
            to: StateId::new(0, 1),
            event: None,
        };
        assert!(eps.matches(StateId::new(0, 0), StateId::new(0, 1), None));
        assert!(!eps.matches(StateId::new(0, 0), StateId::new(0, 1), Some("a")));

        let named = Transition {
            from: StateId::new(0, 0),
            to: StateId::new(0, 1),
            event: Some("a".to_string()),
        };
        assert!(named.matches(StateId::new(0, 0), StateId::new(0, 1), Some("a")));
        assert!(!named.matches(StateId::new(0, 0), StateId::new(0, 1), None));
        assert!(!named.matches(StateId::new(0, 1), StateId::new(0, 0), Some("a")));
    }
}
