use std::collections::HashMap;

use crate::listener::Listener;

/// Handling of a listener registered more than once for the same event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Re-registering an identical listener is a no-op.
    #[default]
    Ignore,
    /// Every registration is kept and invoked once per dispatch.
    Allow,
}

/// Event-keyed collection of listeners in registration order.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    listeners: HashMap<String, Vec<Listener>>,
    policy: DuplicatePolicy,
}

impl ListenerRegistry {
    /// Create an empty registry with the default duplicate policy.
    pub fn new() -> Self {
        Self::with_policy(DuplicatePolicy::default())
    }

    /// Create an empty registry with an explicit duplicate policy.
    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            listeners: HashMap::new(),
            policy,
        }
    }

    /// Append a listener for `event`.
    ///
    /// Returns `false` when the policy suppressed a duplicate registration.
    pub fn add(&mut self, event: &str, listener: Listener) -> bool {
        let entry = self.listeners.entry(event.to_string()).or_default();
        if self.policy == DuplicatePolicy::Ignore && entry.contains(&listener) {
            return false;
        }
        entry.push(listener);
        true
    }

    /// Remove the first registration of `listener` for `event`.
    ///
    /// Returns `false` if it was not registered. Events left without
    /// listeners are dropped from the registry.
    pub fn remove(&mut self, event: &str, listener: &Listener) -> bool {
        let Some(entry) = self.listeners.get_mut(event) else {
            return false;
        };
        let Some(index) = entry.iter().position(|l| l == listener) else {
            return false;
        };
        entry.remove(index);
        if entry.is_empty() {
            self.listeners.remove(event);
        }
        true
    }

    /// Listeners for `event`, in dispatch order.
    pub fn listeners(&self, event: &str) -> &[Listener] {
        self.listeners.get(event).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Owned copy of the listeners for `event`.
    pub fn snapshot(&self, event: &str) -> Vec<Listener> {
        self.listeners(event).to_vec()
    }

    pub fn len(&self, event: &str) -> usize {
        self.listeners(event).len()
    }

    /// Event names with at least one listener, sorted.
    pub fn events(&self) -> Vec<String> {
        let mut events: Vec<String> = self.listeners.keys().cloned().collect();
        events.sort();
        events
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }
}
