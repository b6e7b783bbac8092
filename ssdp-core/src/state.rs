//! Shared lifecycle state cell with change notification.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

/// Lifecycle states shared by the senders and the listener.
///
/// Transitions are free-form; the conventions each component follows are
/// documented on the component itself. `Stopped` is both the initial state a
/// component reports before running and its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Stopped,
    Started,
    Sleep,
    Suspended,
}

/// Identifies a registered state listener for later removal.
pub type ListenerId = usize;

type Listener<S> = Arc<dyn Fn(&S) + Send + Sync>;

/// Thread-safe current-state cell.
///
/// Reads and writes are linearizable: [`StateHolder::set_state`] stores the
/// new value and notifies every registered listener before returning, so a
/// read that starts after a write returns cannot observe an older value.
/// Listeners run on the writing thread, in registration order, after the
/// state lock has been released.
///
/// A listener that writes back into the same holder will not deadlock, but
/// the relative order of the nested notifications is unspecified; reentrant
/// writes are unsupported.
pub struct StateHolder<S> {
    state: RwLock<Option<S>>,
    listeners: Mutex<Vec<(ListenerId, Listener<S>)>>,
    next_id: AtomicUsize,
}

impl<S: Clone> StateHolder<S> {
    /// Create a holder with no state set.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(None),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
        }
    }

    /// Current state, or `None` when nothing has been written yet.
    pub fn get(&self) -> Option<S> {
        self.state.read().clone()
    }

    /// Store a new state and synchronously notify every listener.
    pub fn set_state(&self, state: S) {
        *self.state.write() = Some(state.clone());

        // Snapshot so listeners run without any lock held.
        let listeners: Vec<Listener<S>> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(&state);
        }
    }

    /// Register a listener invoked on every `set_state`, in registration
    /// order. Returns an id accepted by [`StateHolder::remove_listener`].
    pub fn add_listener(&self, listener: impl Fn(&S) + Send + Sync + 'static) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Remove a previously registered listener. Unknown ids are ignored.
    pub fn remove_listener(&self, id: ListenerId) {
        self.listeners
            .lock()
            .retain(|(listener_id, _)| *listener_id != id);
    }
}

impl<S: Clone> Default for StateHolder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + std::fmt::Debug> std::fmt::Debug for StateHolder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateHolder")
            .field("state", &self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn test_initial_state_is_none() {
        let holder = StateHolder::<State>::new();
        assert_eq!(holder.get(), None);
    }

    #[test]
    fn test_reports_last_written_state() {
        let holder = StateHolder::new();
        holder.set_state(State::Started);
        holder.set_state(State::Sleep);
        holder.set_state(State::Stopped);
        assert_eq!(holder.get(), Some(State::Stopped));
    }

    #[test]
    fn test_listener_invoked_once_per_write() {
        let holder = StateHolder::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_seen = Arc::clone(&calls);
        holder.add_listener(move |_: &State| {
            calls_seen.fetch_add(1, Ordering::SeqCst);
        });

        holder.set_state(State::Started);
        holder.set_state(State::Sleep);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let holder = StateHolder::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            holder.add_listener(move |_: &State| order.lock().push(tag));
        }

        holder.set_state(State::Started);
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_removed_listener_is_not_invoked() {
        let holder = StateHolder::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_seen = Arc::clone(&calls);
        let id = holder.add_listener(move |_: &State| {
            calls_seen.fetch_add(1, Ordering::SeqCst);
        });

        holder.set_state(State::Started);
        holder.remove_listener(id);
        holder.set_state(State::Stopped);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_sees_written_value() {
        let holder = StateHolder::new();
        let seen = Arc::new(Mutex::new(None));

        let seen_inner = Arc::clone(&seen);
        holder.add_listener(move |state: &State| {
            *seen_inner.lock() = Some(*state);
        });

        holder.set_state(State::Suspended);
        assert_eq!(*seen.lock(), Some(State::Suspended));
    }
}
