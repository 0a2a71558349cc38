//! The automaton graph.
//!
//! An [`Automaton`] is an arena that exclusively owns its states and
//! transitions. States and transitions are only ever created through the
//! factory operations here, which validate everything up front: a call that
//! fails leaves the graph exactly as it was.
//!
//! Invariants held after every public operation:
//! - state names are unique and syntactically valid
//! - transition endpoints are members, and never rebound
//! - no two transitions share a (from, to, label) triple
//! - every transition is linked into the outgoing set of its source and the
//!   incoming set of its destination, and nowhere else

use crate::error::GraphError;
use crate::notify::{
    Listener, Notification, NotificationBus, Scope, StateChange, SubscriptionId,
    TransitionChange,
};
use crate::state::{
    validate_event_label, validate_state_name, Position, State, StateId, Transition, TransitionId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};

/// Source of automaton identities for id stamping.
static NEXT_AUTOMATON: AtomicU32 = AtomicU32::new(0);

/// A finite-state automaton with simulation status.
#[derive(Debug)]
pub struct Automaton {
    /// States in creation order.
    pub(crate) states: BTreeMap<StateId, State>,

    /// Name index for `find_state`.
    names: HashMap<String, StateId>,

    /// Transitions in creation order.
    pub(crate) transitions: BTreeMap<TransitionId, Transition>,

    /// Whether a simulation run is in progress.
    pub(crate) active: bool,

    pub(crate) bus: NotificationBus,

    /// Identity stamped into every id this automaton issues.
    owner: u32,
    next_state: u32,
    next_transition: u32,
}

impl Default for Automaton {
    fn default() -> Self {
        Self::new()
    }
}

impl Automaton {
    /// Creates an empty, inactive automaton.
    pub fn new() -> Self {
        Self {
            states: BTreeMap::new(),
            names: HashMap::new(),
            transitions: BTreeMap::new(),
            active: false,
            bus: NotificationBus::new(),
            owner: NEXT_AUTOMATON.fetch_add(1, Ordering::Relaxed),
            next_state: 0,
            next_transition: 0,
        }
    }

    // =========================================================================
    // States
    // =========================================================================

    /// Creates a state and registers it.
    pub fn create_state(&mut self, name: &str, x: i32, y: i32) -> Result<StateId, GraphError> {
        validate_state_name(name).map_err(|reason| GraphError::InvalidName {
            name: name.to_string(),
            reason,
        })?;
        if self.names.contains_key(name) {
            return Err(GraphError::DuplicateName {
                name: name.to_string(),
            });
        }

        let id = StateId::new(self.owner, self.next_state);
        self.next_state += 1;
        self.states.insert(id, State::new(name, Position::new(x, y)));
        self.names.insert(name.to_string(), id);
        tracing::debug!("created state {} ({}) at ({}, {})", name, id, x, y);

        self.bus.emit(Notification::StatesChanged);
        Ok(id)
    }

    /// Removes a state together with every transition touching it.
    ///
    /// Each cascaded transition removal notifies on its own, then the state
    /// removal notifies once. Does nothing if `id` is not a member.
    pub fn remove_state(&mut self, id: StateId) {
        let Some(state) = self.states.get(&id) else {
            return;
        };

        let mut touching: Vec<TransitionId> = state.outgoing().chain(state.incoming()).collect();
        touching.sort();
        touching.dedup();
        for transition in touching {
            self.remove_transition(transition);
        }

        if let Some(state) = self.states.remove(&id) {
            self.names.remove(&state.name);
            tracing::debug!("removed state {} ({})", state.name, id);
        }

        self.bus.emit(Notification::State {
            state: id,
            change: StateChange::Removed,
        });
        self.bus.drop_scope(Scope::State(id));
        self.bus.emit(Notification::StatesChanged);
    }

    /// Looks a state up by name.
    pub fn find_state(&self, name: &str) -> Option<StateId> {
        self.names.get(name).copied()
    }

    /// Returns the state for `id`, if it is a member.
    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(&id)
    }

    /// Returns true if `id` names a state of this automaton.
    pub fn contains_state(&self, id: StateId) -> bool {
        self.states.contains_key(&id)
    }

    /// Iterates over all states in creation order.
    pub fn states(&self) -> impl Iterator<Item = (StateId, &State)> + '_ {
        self.states.iter().map(|(id, s)| (*id, s))
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Name of a member state, or `"?"` for an unknown id.
    pub fn state_name(&self, id: StateId) -> &str {
        self.states.get(&id).map(|s| s.name()).unwrap_or("?")
    }

    /// States currently flagged initial. Computed on demand.
    pub fn initial_states(&self) -> Vec<StateId> {
        self.filter_states(|s| s.initial)
    }

    /// States currently flagged final. Computed on demand.
    pub fn final_states(&self) -> Vec<StateId> {
        self.filter_states(|s| s.final_)
    }

    pub(crate) fn filter_states(&self, pred: impl Fn(&State) -> bool) -> Vec<StateId> {
        self.states
            .iter()
            .filter(|(_, s)| pred(s))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Sets or clears the initial flag.
    pub fn set_initial(&mut self, id: StateId, initial: bool) -> Result<(), GraphError> {
        self.state_mut(id)?.initial = initial;
        self.bus.emit(Notification::State {
            state: id,
            change: StateChange::Initial,
        });
        Ok(())
    }

    /// Sets or clears the final flag.
    pub fn set_final(&mut self, id: StateId, final_: bool) -> Result<(), GraphError> {
        self.state_mut(id)?.final_ = final_;
        self.bus.emit(Notification::State {
            state: id,
            change: StateChange::Final,
        });
        Ok(())
    }

    /// Moves a state by `(dx, dy)`.
    pub fn move_by(&mut self, id: StateId, dx: i32, dy: i32) -> Result<(), GraphError> {
        let state = self.state_mut(id)?;
        state.position.x = state.position.x.saturating_add(dx);
        state.position.y = state.position.y.saturating_add(dy);
        self.bus.emit(Notification::State {
            state: id,
            change: StateChange::Position,
        });
        Ok(())
    }

    /// Writes the `current` flag, notifying only when it flips.
    pub(crate) fn set_current(&mut self, id: StateId, current: bool) {
        let Some(state) = self.states.get_mut(&id) else {
            return;
        };
        if state.current == current {
            return;
        }
        state.current = current;
        self.bus.emit(Notification::State {
            state: id,
            change: StateChange::Current,
        });
    }

    fn state_mut(&mut self, id: StateId) -> Result<&mut State, GraphError> {
        self.states
            .get_mut(&id)
            .ok_or(GraphError::UnknownState { state: id })
    }

    fn require_state(&self, id: StateId) -> Result<&State, GraphError> {
        self.states
            .get(&id)
            .ok_or(GraphError::UnknownState { state: id })
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Creates a transition. `event == None` makes an epsilon transition.
    pub fn create_transition(
        &mut self,
        from: StateId,
        to: StateId,
        event: Option<&str>,
    ) -> Result<TransitionId, GraphError> {
        self.require_state(from)?;
        self.require_state(to)?;
        if let Some(label) = event {
            validate_event_label(label).map_err(|reason| GraphError::InvalidLabel {
                label: label.to_string(),
                reason,
            })?;
        }
        if self.transitions.values().any(|t| t.matches(from, to, event)) {
            return Err(GraphError::DuplicateTransition {
                from: self.state_name(from).to_string(),
                label: event.unwrap_or("?").to_string(),
                to: self.state_name(to).to_string(),
            });
        }

        let id = TransitionId::new(self.owner, self.next_transition);
        self.next_transition += 1;
        self.transitions.insert(
            id,
            Transition {
                from,
                to,
                event: event.map(str::to_string),
            },
        );
        if let Some(s) = self.states.get_mut(&from) {
            s.outgoing.insert(id);
        }
        if let Some(s) = self.states.get_mut(&to) {
            s.incoming.insert(id);
        }
        tracing::debug!(
            "created transition {} {} -{}-> {}",
            id,
            self.state_name(from),
            event.unwrap_or("?"),
            self.state_name(to)
        );

        self.bus.emit(Notification::TransitionsChanged);
        Ok(id)
    }

    /// Removes a transition, unlinking it from both endpoints. Does nothing
    /// if `id` is not a member.
    pub fn remove_transition(&mut self, id: TransitionId) {
        let Some(transition) = self.transitions.remove(&id) else {
            return;
        };
        if let Some(s) = self.states.get_mut(&transition.from) {
            s.outgoing.remove(&id);
        }
        if let Some(s) = self.states.get_mut(&transition.to) {
            s.incoming.remove(&id);
        }
        tracing::debug!("removed transition {}", id);

        self.bus.emit(Notification::Transition {
            transition: id,
            change: TransitionChange::Removed,
        });
        self.bus.drop_scope(Scope::Transition(id));
        self.bus.emit(Notification::TransitionsChanged);
    }

    /// Returns every transition from `from` to `to`, whatever its label.
    pub fn find_transitions(
        &self,
        from: StateId,
        to: StateId,
    ) -> Result<Vec<TransitionId>, GraphError> {
        let source = self.require_state(from)?;
        self.require_state(to)?;
        Ok(source
            .outgoing()
            .filter(|t| self.transitions.get(t).is_some_and(|t| t.to == to))
            .collect())
    }

    /// Returns the transition for `id`, if it is a member.
    pub fn transition(&self, id: TransitionId) -> Option<&Transition> {
        self.transitions.get(&id)
    }

    /// Iterates over all transitions in creation order.
    pub fn transitions(&self) -> impl Iterator<Item = (TransitionId, &Transition)> + '_ {
        self.transitions.iter().map(|(id, t)| (*id, t))
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Subscribes to automaton-level notifications.
    pub fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        self.bus.subscribe(Scope::Automaton, listener)
    }

    /// Subscribes to changes of one state. The subscription ends when the
    /// state is removed.
    pub fn subscribe_state(
        &mut self,
        id: StateId,
        listener: Listener,
    ) -> Result<SubscriptionId, GraphError> {
        self.require_state(id)?;
        Ok(self.bus.subscribe(Scope::State(id), listener))
    }

    /// Subscribes to changes of one transition. The subscription ends when
    /// the transition is removed.
    pub fn subscribe_transition(
        &mut self,
        id: TransitionId,
        listener: Listener,
    ) -> Result<SubscriptionId, GraphError> {
        if !self.transitions.contains_key(&id) {
            return Err(GraphError::UnknownTransition { transition: id });
        }
        Ok(self.bus.subscribe(Scope::Transition(id), listener))
    }

    /// Cancels a subscription. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Canonical text form: state records, transition records, initial
    /// records, final records.
    pub fn serialize(&self) -> String {
        crate::format::to_string(self)
    }
}

impl std::str::FromStr for Automaton {
    type Err = crate::error::FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::format::parse(s)
    }
}
