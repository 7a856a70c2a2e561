//! EventBus - Per-Session Pub/Sub
//!
//! Blocks talk to each other through app-level channels. A bus belongs to one
//! app load (client) or one request (server); it is never process-global.
//!
//! # Delivery rules
//! * `emit` invokes the listeners present when it starts, in subscription order.
//!   Listeners added while it runs are not invoked for that emission.
//! * One-shot waiters are detached when an emission picks them up, so they fire
//!   at most once even if a listener emits on the same channel again.
//! * A listener that errors or panics is logged and skipped; the rest still run.

use ahash::AHashMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tessera_core::ActionError;
use tokio::sync::oneshot;

/// One emission on a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub data: Value,
    /// Set when the emitter signals a failure.
    pub error: Option<Value>,
}

impl Event {
    pub fn new(data: Value) -> Self {
        Self { data, error: None }
    }

    pub fn failed(data: Value, error: Value) -> Self {
        Self {
            data,
            error: Some(error),
        }
    }

    /// `Ok(data)`, or `Rejected` carrying the error when the flag is set.
    pub fn into_result(self) -> Result<Value, ActionError> {
        match self.error {
            None => Ok(self.data),
            Some(error) => Err(ActionError::Rejected(error)),
        }
    }
}

pub type Listener = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Entry {
    id: u64,
    once: bool,
    listener: Listener,
}

#[derive(Default)]
pub struct EventBus {
    channels: Mutex<AHashMap<String, Vec<Entry>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, channel: &str, listener: F) -> SubscriptionId
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        SubscriptionId(self.insert(channel, false, Arc::new(listener)))
    }

    /// Returns `false` when the subscription was already gone.
    pub fn off(&self, channel: &str, id: SubscriptionId) -> bool {
        let mut channels = self.channels.lock();
        let Some(entries) = channels.get_mut(channel) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != id.0);
        let removed = entries.len() != before;
        if entries.is_empty() {
            channels.remove(channel);
        }
        removed
    }

    /// Deliver `event` to the current listeners. Returns how many were invoked.
    pub fn emit(&self, channel: &str, event: Event) -> usize {
        let snapshot: Vec<Listener> = {
            let mut channels = self.channels.lock();
            let Some(entries) = channels.get_mut(channel) else {
                tracing::trace!(channel, "Emit without listeners");
                return 0;
            };
            let snapshot = entries.iter().map(|entry| entry.listener.clone()).collect();
            entries.retain(|entry| !entry.once);
            if entries.is_empty() {
                channels.remove(channel);
            }
            snapshot
        };

        for listener in &snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::warn!(channel, error = %err, "Event listener failed"),
                Err(_) => tracing::warn!(channel, "Event listener panicked"),
            }
        }
        snapshot.len()
    }

    /// Register a one-shot waiter now; await the returned future later.
    ///
    /// Dropping the [`Waiter`] unsubscribes it.
    pub fn wait_for(self: &Arc<Self>, channel: &str) -> Waiter {
        let (sender, receiver) = oneshot::channel();
        let sender = Mutex::new(Some(sender));
        let id = self.insert(
            channel,
            true,
            Arc::new(move |event: &Event| -> anyhow::Result<()> {
                if let Some(sender) = sender.lock().take() {
                    // The waiter may already be gone; nothing to deliver to then.
                    let _ = sender.send(event.clone());
                }
                Ok(())
            }),
        );
        Waiter {
            bus: Arc::clone(self),
            channel: channel.to_string(),
            id: SubscriptionId(id),
            receiver,
        }
    }

    pub fn listener_count(&self, channel: &str) -> usize {
        self.channels.lock().get(channel).map_or(0, Vec::len)
    }

    fn insert(&self, channel: &str, once: bool, listener: Listener) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.channels
            .lock()
            .entry(channel.to_string())
            .or_default()
            .push(Entry { id, once, listener });
        id
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let channels = self.channels.lock();
        f.debug_struct("EventBus")
            .field("channels", &channels.len())
            .field(
                "listeners",
                &channels.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}

/// A pending one-shot subscription. Resolves with the first matching event.
#[must_use = "a waiter does nothing unless awaited"]
pub struct Waiter {
    bus: Arc<EventBus>,
    channel: String,
    id: SubscriptionId,
    receiver: oneshot::Receiver<Event>,
}

/// The bus was dropped before anything arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusClosed;

impl Future for Waiter {
    type Output = Result<Event, BusClosed>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.map_err(|_| BusClosed))
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        self.bus.off(&self.channel, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn delivers_in_subscription_order() {
        let bus = EventBus::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        for name in ["first", "second"] {
            let log = log.clone();
            bus.on("ready", move |event| {
                log.lock().unwrap().push((name, event.data.clone()));
                Ok(())
            });
        }
        assert_eq!(bus.emit("ready", Event::new(json!(1))), 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec![("first", json!(1)), ("second", json!(1))]
        );
    }

    #[test]
    fn listeners_added_during_emit_wait_for_the_next_one() {
        let bus = Arc::new(EventBus::new());
        let late_calls = Arc::new(AtomicU64::new(0));
        {
            let bus_inner = Arc::clone(&bus);
            let late_calls = late_calls.clone();
            bus.on("tick", move |_| {
                let late_calls = late_calls.clone();
                bus_inner.on("tick", move |_| {
                    late_calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                });
                Ok(())
            });
        }
        bus.emit("tick", Event::new(json!(null)));
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);
        bus.emit("tick", Event::new(json!(null)));
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_listeners_are_isolated() {
        let bus = EventBus::new();
        let reached = Arc::new(AtomicU64::new(0));
        bus.on("c", |_| anyhow::bail!("broken listener"));
        bus.on("c", |_| panic!("exploding listener"));
        {
            let reached = reached.clone();
            bus.on("c", move |_| {
                reached.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        assert_eq!(bus.emit("c", Event::new(json!(null))), 3);
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn off_removes_a_subscription() {
        let bus = EventBus::new();
        let id = bus.on("c", |_| Ok(()));
        assert!(bus.off("c", id));
        assert!(!bus.off("c", id));
        assert_eq!(bus.emit("c", Event::new(json!(null))), 0);
    }

    #[tokio::test]
    async fn waiter_fires_once_and_unsubscribes() {
        let bus = Arc::new(EventBus::new());
        let waiter = bus.wait_for("ready");
        assert_eq!(bus.listener_count("ready"), 1);
        bus.emit("ready", Event::new(json!("first")));
        bus.emit("ready", Event::new(json!("second")));
        assert_eq!(waiter.await.unwrap().data, json!("first"));
        assert_eq!(bus.listener_count("ready"), 0);
    }

    #[test]
    fn dropped_waiter_unsubscribes() {
        let bus = Arc::new(EventBus::new());
        drop(bus.wait_for("ready"));
        assert_eq!(bus.listener_count("ready"), 0);
    }

    #[test]
    fn error_flag_becomes_rejection() {
        let err = Event::failed(json!(null), json!("boom")).into_result().unwrap_err();
        assert_eq!(err, ActionError::Rejected(json!("boom")));
    }
}
