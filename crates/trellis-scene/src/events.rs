//! Lifecycle event bus
//!
//! Observers subscribe per (node, event kind). Subscriptions are explicit,
//! survive detach so a re-attached node keeps its observers, and are
//! dropped when the node is disposed.

use rustc_hash::FxHashMap;

use trellis_core::VisualId;

/// Lifecycle moments a node reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Attached,
    Detached,
    Measured,
    Arranged,
    Rendered,
}

/// Handle returned by `subscribe`, used to unsubscribe explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn Fn(VisualId, LifecycleEvent)>;

/// Typed event bus keyed by (node, event kind).
#[derive(Default)]
pub struct EventBus {
    subscribers: FxHashMap<(VisualId, LifecycleEvent), Vec<(SubscriptionId, Callback)>>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        node: VisualId,
        event: LifecycleEvent,
        callback: impl Fn(VisualId, LifecycleEvent) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers
            .entry((node, event))
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, subscription: SubscriptionId) {
        for list in self.subscribers.values_mut() {
            list.retain(|(id, _)| *id != subscription);
        }
        self.subscribers.retain(|_, list| !list.is_empty());
    }

    pub(crate) fn emit(&self, node: VisualId, event: LifecycleEvent) {
        if let Some(list) = self.subscribers.get(&(node, event)) {
            for (_, callback) in list {
                callback(node, event);
            }
        }
    }

    /// Drops every subscription tied to the node. Called on dispose.
    pub(crate) fn clear_node(&mut self, node: VisualId) {
        self.subscribers.retain(|(id, _), _| *id != node);
    }

    #[cfg(test)]
    fn subscription_count(&self) -> usize {
        self.subscribers.values().map(Vec::len).sum()
    }
}
