//! NFA simulation.
//!
//! The simulation tracks a *set* of simultaneously current states. It is a
//! two-state machine over the automaton, Inactive until the first
//! [`reset`](Automaton::reset) and Active from then on; there is no terminal
//! state. While Inactive, stepping is a no-op and nothing is recognised.

use crate::automaton::Automaton;
use crate::notify::Notification;
use crate::state::StateId;
use std::collections::BTreeSet;

impl Automaton {
    /// Returns true once a simulation run has been started with `reset`.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current states in creation order. Empty while inactive.
    pub fn current_states(&self) -> Vec<StateId> {
        if !self.active {
            return Vec::new();
        }
        self.filter_states(|s| s.current)
    }

    /// Starts (or restarts) a run: the current set becomes exactly the
    /// initial states. The result is not epsilon-closed.
    pub fn reset(&mut self) {
        self.active = true;

        let flags: Vec<(StateId, bool)> = self
            .states
            .iter()
            .map(|(id, s)| (*id, s.initial))
            .collect();
        for (id, initial) in flags {
            self.set_current(id, initial);
        }
        tracing::debug!("simulation reset: {} current", self.current_states().len());

        self.bus.emit(Notification::OtherChanged);
    }

    /// Advances the run by one step.
    ///
    /// The current set is first epsilon-closed. Then, if `event` is given,
    /// the current set is replaced by the destinations of every transition
    /// labelled `event` leaving a state of the closed set. With `event ==
    /// None` only the closure happens.
    pub fn step(&mut self, event: Option<&str>) {
        if !self.active {
            tracing::debug!("step({:?}) ignored: simulation not started", event);
            return;
        }

        self.follow_epsilon();

        if let Some(event) = event {
            let sources = self.filter_states(|s| s.current);
            let reached: BTreeSet<StateId> = sources
                .iter()
                .filter_map(|id| self.states.get(id))
                .flat_map(|s| s.outgoing())
                .filter_map(|t| self.transitions.get(&t))
                .filter(|t| t.event() == Some(event))
                .map(|t| t.to())
                .collect();

            for id in sources {
                if !reached.contains(&id) {
                    self.set_current(id, false);
                }
            }
            for id in &reached {
                self.set_current(*id, true);
            }
            tracing::debug!("step '{}': {} current", event, reached.len());
        }

        self.bus.emit(Notification::OtherChanged);
    }

    /// Returns true if the epsilon closure of the current set contains a
    /// final state. Always false while inactive.
    ///
    /// The closure is applied to the current set, so epsilon-reachable
    /// states become current even without an explicit step.
    pub fn is_recognised(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.follow_epsilon();
        self.states.values().any(|s| s.current && s.final_)
    }

    /// Marks every state reachable through epsilon transitions from the
    /// current set as current. Returns how many states were added.
    fn follow_epsilon(&mut self) -> usize {
        let mut frontier = self.filter_states(|s| s.current);
        let mut added = 0;
        let mut pass = 0;

        while !frontier.is_empty() {
            let targets: Vec<StateId> = frontier
                .iter()
                .filter_map(|id| self.states.get(id))
                .flat_map(|s| s.outgoing())
                .filter_map(|t| self.transitions.get(&t))
                .filter(|t| t.is_epsilon())
                .map(|t| t.to())
                .collect();

            let mut next = Vec::new();
            for to in targets {
                if self.states.get(&to).is_some_and(|s| !s.current) {
                    self.set_current(to, true);
                    next.push(to);
                }
            }

            pass += 1;
            added += next.len();
            tracing::trace!("epsilon pass {}: {} added", pass, next.len());
            frontier = next;
        }

        added
    }
}

#[cfg(test)]
mod tests {
    use crate::notify::{NotificationLog, StateChange};
    use crate::{Automaton, Notification, StateId};

    fn names(fsa: &Automaton, ids: &[StateId]) -> Vec<String> {
        ids.iter().map(|id| fsa.state_name(*id).to_string()).collect()
    }

    fn current(fsa: &Automaton) -> Vec<String> {
        names(fsa, &fsa.current_states())
    }

    /// a(initial) -?-> b -?-> c -?-> d, with d final.
    fn epsilon_chain() -> Automaton {
        let mut fsa = Automaton::new();
        let a = fsa.create_state("a", 0, 0).unwrap();
        let b = fsa.create_state("b", 0, 0).unwrap();
        let c = fsa.create_state("c", 0, 0).unwrap();
        let d = fsa.create_state("d", 0, 0).unwrap();
        fsa.create_transition(a, b, None).unwrap();
        fsa.create_transition(b, c, None).unwrap();
        fsa.create_transition(c, d, None).unwrap();
        fsa.set_initial(a, true).unwrap();
        fsa.set_final(d, true).unwrap();
        fsa
    }

    #[test]
    fn test_inactive_before_reset() {
        let mut fsa = epsilon_chain();
        let a = fsa.find_state("a").unwrap();
        fsa.set_final(a, true).unwrap();

        assert!(!fsa.is_active());
        assert!(fsa.current_states().is_empty());
        assert!(!fsa.is_recognised());

        let log = NotificationLog::new();
        fsa.subscribe(log.listener());
        fsa.step(Some("x"));
        fsa.step(None);
        assert!(log.is_empty());
        assert!(fsa.current_states().is_empty());
    }

    #[test]
    fn test_reset_is_not_epsilon_closed() {
        let mut fsa = epsilon_chain();
        fsa.reset();
        assert_eq!(current(&fsa), vec!["a"]);
        fsa.reset();
        assert_eq!(current(&fsa), vec!["a"]);
    }

    #[test]
    fn test_epsilon_fixpoint_via_recognition() {
        let mut fsa = epsilon_chain();
        fsa.reset();
        assert!(fsa.is_recognised());
        assert_eq!(current(&fsa), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_epsilon_fixpoint_via_step() {
        let mut fsa = epsilon_chain();
        fsa.reset();
        fsa.step(None);
        assert_eq!(current(&fsa), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_epsilon_cycle_terminates() {
        let mut fsa = Automaton::new();
        let a = fsa.create_state("a", 0, 0).unwrap();
        let b = fsa.create_state("b", 0, 0).unwrap();
        fsa.create_transition(a, b, None).unwrap();
        fsa.create_transition(b, a, None).unwrap();
        fsa.create_transition(a, a, None).unwrap();
        fsa.set_initial(b, true).unwrap();

        fsa.reset();
        fsa.step(None);
        assert_eq!(current(&fsa), vec!["a", "b"]);
    }

    #[test]
    fn test_event_dispatch_over_state_set() {
        let mut fsa = Automaton::new();
        let s1 = fsa.create_state("s1", 0, 0).unwrap();
        let s2 = fsa.create_state("s2", 0, 0).unwrap();
        let t1 = fsa.create_state("t1", 0, 0).unwrap();
        let t2 = fsa.create_state("t2", 0, 0).unwrap();
        fsa.create_transition(s1, t1, Some("x")).unwrap();
        fsa.create_transition(s2, t2, Some("x")).unwrap();
        fsa.create_transition(s1, s2, Some("y")).unwrap();
        fsa.set_initial(s1, true).unwrap();
        fsa.set_initial(s2, true).unwrap();

        fsa.reset();
        fsa.step(Some("x"));
        assert_eq!(current(&fsa), vec!["t1", "t2"]);
    }

    #[test]
    fn test_source_stays_current_when_also_destination() {
        let mut fsa = Automaton::new();
        let s1 = fsa.create_state("s1", 0, 0).unwrap();
        let s2 = fsa.create_state("s2", 0, 0).unwrap();
        fsa.create_transition(s1, s2, Some("x")).unwrap();
        fsa.create_transition(s2, s1, Some("x")).unwrap();
        fsa.set_initial(s1, true).unwrap();
        fsa.set_initial(s2, true).unwrap();

        fsa.reset();
        fsa.step(Some("x"));
        assert_eq!(current(&fsa), vec!["s1", "s2"]);
    }

    #[test]
    fn test_unmatched_event_empties_current_set() {
        let mut fsa = epsilon_chain();
        fsa.reset();
        fsa.step(Some("nothing"));
        assert!(fsa.current_states().is_empty());
        assert!(!fsa.is_recognised());
        assert!(fsa.is_active());
    }

    #[test]
    fn test_epsilon_closure_precedes_event() {
        // a -?-> b -x-> c, c final
        let mut fsa = Automaton::new();
        let a = fsa.create_state("a", 0, 0).unwrap();
        let b = fsa.create_state("b", 0, 0).unwrap();
        let c = fsa.create_state("c", 0, 0).unwrap();
        fsa.create_transition(a, b, None).unwrap();
        fsa.create_transition(b, c, Some("x")).unwrap();
        fsa.set_initial(a, true).unwrap();
        fsa.set_final(c, true).unwrap();

        fsa.reset();
        assert!(!fsa.is_recognised());
        fsa.step(Some("x"));
        assert_eq!(current(&fsa), vec!["c"]);
        assert!(fsa.is_recognised());
    }

    #[test]
    fn test_epsilon_after_event_admitted_by_recognition() {
        // a -x-> b -?-> c, c final
        let mut fsa = Automaton::new();
        let a = fsa.create_state("a", 0, 0).unwrap();
        let b = fsa.create_state("b", 0, 0).unwrap();
        let c = fsa.create_state("c", 0, 0).unwrap();
        fsa.create_transition(a, b, Some("x")).unwrap();
        fsa.create_transition(b, c, None).unwrap();
        fsa.set_initial(a, true).unwrap();
        fsa.set_final(c, true).unwrap();

        fsa.reset();
        fsa.step(Some("x"));
        assert_eq!(current(&fsa), vec!["b"]);
        assert!(fsa.is_recognised());
        assert_eq!(current(&fsa), vec!["b", "c"]);
    }

    #[test]
    fn test_simulation_notifications() {
        let mut fsa = epsilon_chain();
        let a = fsa.find_state("a").unwrap();
        let d = fsa.find_state("d").unwrap();

        let log = NotificationLog::new();
        let d_log = NotificationLog::new();
        fsa.subscribe(log.listener());
        fsa.subscribe_state(d, d_log.listener()).unwrap();

        fsa.reset();
        fsa.step(None);
        assert!(fsa.is_recognised());
        assert_eq!(
            log.take(),
            vec![Notification::OtherChanged, Notification::OtherChanged]
        );
        assert_eq!(
            d_log.take(),
            vec![Notification::State {
                state: d,
                change: StateChange::Current
            }]
        );

        // Reset clears d and keeps a.
        fsa.reset();
        assert_eq!(d_log.len(), 1);
        assert_eq!(fsa.current_states(), vec![a]);
    }

    #[test]
    fn test_recognition_requires_final_state() {
        let mut fsa = epsilon_chain();
        let d = fsa.find_state("d").unwrap();
        fsa.set_final(d, false).unwrap();
        fsa.reset();
        assert!(!fsa.is_recognised());
    }
}
