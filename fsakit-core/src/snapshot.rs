//! JSON snapshot of an automaton, for tooling and display.

use crate::automaton::Automaton;
use crate::error::SnapshotError;
use serde::{Deserialize, Serialize};

/// A state at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub name: String,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub initial: bool,
    #[serde(default, rename = "final")]
    pub final_: bool,
    #[serde(default)]
    pub current: bool,
}

/// A transition at snapshot time. `event` is absent for epsilon transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionSnapshot {
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    pub to: String,
}

/// Full automaton contents plus simulation status.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AutomatonSnapshot {
    /// Whether a simulation run was in progress.
    #[serde(default)]
    pub active: bool,

    /// States in creation order.
    pub states: Vec<StateSnapshot>,

    /// Transitions in creation order.
    #[serde(default)]
    pub transitions: Vec<TransitionSnapshot>,
}

impl AutomatonSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Automaton {
    /// Captures the automaton's contents and simulation status.
    pub fn snapshot(&self) -> AutomatonSnapshot {
        AutomatonSnapshot {
            active: self.is_active(),
            states: self
                .states()
                .map(|(_, s)| StateSnapshot {
                    name: s.name().to_string(),
                    x: s.position().x,
                    y: s.position().y,
                    initial: s.is_initial(),
                    final_: s.is_final(),
                    current: self.is_active() && s.is_current(),
                })
                .collect(),
            transitions: self
                .transitions()
                .map(|(_, t)| TransitionSnapshot {
                    from: self.state_name(t.from()).to_string(),
                    event: t.event().map(str::to_string),
                    to: self.state_name(t.to()).to_string(),
                })
                .collect(),
        }
    }

    /// Rebuilds an automaton from a snapshot. Everything goes through the
    /// factory operations, so a snapshot that breaks an invariant is
    /// rejected. Simulation status is restored verbatim.
    pub fn from_snapshot(snapshot: &AutomatonSnapshot) -> Result<Self, SnapshotError> {
        let mut fsa = Automaton::new();

        for s in &snapshot.states {
            let id = fsa.create_state(&s.name, s.x, s.y)?;
            fsa.set_initial(id, s.initial)?;
            fsa.set_final(id, s.final_)?;
        }

        let lookup = |fsa: &Automaton, name: &str| {
            fsa.find_state(name)
                .ok_or_else(|| SnapshotError::UnknownState {
                    name: name.to_string(),
                })
        };
        for t in &snapshot.transitions {
            let from = lookup(&fsa, &t.from)?;
            let to = lookup(&fsa, &t.to)?;
            fsa.create_transition(from, to, t.event.as_deref())?;
        }

        if snapshot.active {
            fsa.active = true;
            for s in snapshot.states.iter().filter(|s| s.current) {
                let id = lookup(&fsa, &s.name)?;
                fsa.set_current(id, true);
            }
        }

        Ok(fsa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    fn sample() -> Automaton {
        "state a 0 0\nstate b 5 -5\ntransition a x b\ntransition b ? a\ninitial a\nfinal b\n"
            .parse()
            .unwrap()
    }

    #[test]
    fn test_snapshot_contents() {
        let mut fsa = sample();
        let snap = fsa.snapshot();
        assert!(!snap.active);
        assert_eq!(snap.states.len(), 2);
        assert!(snap.states[0].initial);
        assert!(snap.states[1].final_);
        assert_eq!(snap.transitions[1].event, None);

        fsa.reset();
        fsa.step(Some("x"));
        let snap = fsa.snapshot();
        assert!(snap.active);
        let current: Vec<_> = snap
            .states
            .iter()
            .filter(|s| s.current)
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(current, vec!["b"]);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut fsa = sample();
        fsa.reset();
        let json = fsa.snapshot().to_json().unwrap();
        assert!(json.contains("\"final\": true"));

        let snap = AutomatonSnapshot::from_json(&json).unwrap();
        let restored = Automaton::from_snapshot(&snap).unwrap();
        assert_eq!(restored.serialize(), fsa.serialize());
        assert_eq!(restored.current_states().len(), 1);
        assert!(restored.is_active());
    }

    #[test]
    fn test_invalid_snapshot_rejected() {
        let mut snap = sample().snapshot();
        snap.transitions.push(snap.transitions[0].clone());
        let err = Automaton::from_snapshot(&snap).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::Graph(GraphError::DuplicateTransition { .. })
        ));

        let mut snap = sample().snapshot();
        snap.transitions[0].to = "missing".to_string();
        let err = Automaton::from_snapshot(&snap).unwrap_err();
        assert!(matches!(err, SnapshotError::UnknownState { .. }));
    }
}
