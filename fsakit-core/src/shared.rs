//! A shared automaton handle.
//!
//! The automaton and its entities form one mutable object graph. Structural
//! edits touch several entities at once, so all access goes through a single
//! exclusive lock rather than per-entity locking. Listeners run while the
//! lock is held and must not call back into the same handle.

use crate::automaton::Automaton;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Cloneable, thread-safe handle to one automaton.
#[derive(Debug, Clone, Default)]
pub struct SharedAutomaton {
    inner: Arc<Mutex<Automaton>>,
}

impl SharedAutomaton {
    pub fn new(fsa: Automaton) -> Self {
        Self {
            inner: Arc::new(Mutex::new(fsa)),
        }
    }

    /// Runs `f` with exclusive access to the automaton.
    pub fn with<R>(&self, f: impl FnOnce(&mut Automaton) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Locks the automaton for a longer sequence of calls.
    pub fn lock(&self) -> MutexGuard<'_, Automaton> {
        self.inner.lock()
    }

    /// Swaps in a new automaton, returning the old one. Used to fall back to
    /// a known-good automaton after a failed load.
    pub fn replace(&self, fsa: Automaton) -> Automaton {
        std::mem::replace(&mut *self.inner.lock(), fsa)
    }
}
