//! Change notification bus.
//!
//! Two scopes exist: the automaton as a whole (states changed, transitions
//! changed, other changed) and individual entities (one channel per state and
//! per transition). Delivery is synchronous, inline with the mutating call,
//! and follows registration order. Every listener call is isolated, so a
//! panicking observer is logged and skipped without starving the rest.

use crate::state::{StateId, TransitionId};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// What changed on a single state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateChange {
    Position,
    Initial,
    Final,
    Current,
    Removed,
}

/// What changed on a single transition. Transitions are immutable, so the
/// only thing that can happen to one is its removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionChange {
    Removed,
}

/// A change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notification {
    /// A state was created or removed.
    StatesChanged,
    /// A transition was created or removed.
    TransitionsChanged,
    /// Simulation status changed (reset or step).
    OtherChanged,
    /// An attribute of one state changed.
    State { state: StateId, change: StateChange },
    /// One transition changed.
    Transition {
        transition: TransitionId,
        change: TransitionChange,
    },
}

impl Notification {
    /// The scope whose subscribers receive this notification.
    pub fn scope(&self) -> Scope {
        match self {
            Notification::StatesChanged
            | Notification::TransitionsChanged
            | Notification::OtherChanged => Scope::Automaton,
            Notification::State { state, .. } => Scope::State(*state),
            Notification::Transition { transition, .. } => Scope::Transition(*transition),
        }
    }
}

/// Subscription scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Automaton,
    State(StateId),
    Transition(TransitionId),
}

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// A notification listener.
pub type Listener = Box<dyn FnMut(&Notification) + Send>;

struct Subscriber {
    id: SubscriptionId,
    scope: Scope,
    listener: Listener,
}

/// Ordered subscriber registry with synchronous fan-out.
pub(crate) struct NotificationBus {
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("subscribers", &self.subscribers.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl NotificationBus {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    pub(crate) fn subscribe(&mut self, scope: Scope, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            scope,
            listener,
        });
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Drops every subscription bound to `scope`.
    pub(crate) fn drop_scope(&mut self, scope: Scope) {
        self.subscribers.retain(|s| s.scope != scope);
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Delivers `notification` to every subscriber of its scope, in
    /// registration order.
    pub(crate) fn emit(&mut self, notification: Notification) {
        let scope = notification.scope();
        for subscriber in self.subscribers.iter_mut().filter(|s| s.scope == scope) {
            let listener = &mut subscriber.listener;
            if catch_unwind(AssertUnwindSafe(|| listener(&notification))).is_err() {
                tracing::warn!(
                    "listener {:?} panicked while handling {:?}",
                    subscriber.id,
                    notification
                );
            }
        }
    }
}

/// A recording subscriber: every notification it receives is appended to a
/// shared log. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct NotificationLog {
    entries: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a listener that records into this log.
    pub fn listener(&self) -> Listener {
        let entries = Arc::clone(&self.entries);
        Box::new(move |n: &Notification| entries.lock().push(*n))
    }

    /// Removes and returns everything recorded so far.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.entries.lock())
    }

    /// Returns a copy of everything recorded so far.
    pub fn entries(&self) -> Vec<Notification> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
