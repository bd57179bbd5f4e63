use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::channel::oneshot;
use futures::FutureExt;
use futures_timer::Delay;
use serde_json::Value;

use crate::error::{CdpError, Result};

type Listener = Arc<dyn Fn(&Value) + Send + Sync>;
type OnceListener = Box<dyn FnOnce(&Value) + Send>;

/// Identifies a registered persistent listener so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct AwaiterId(u64);

/// Per-page pub/sub over event names.
///
/// Three kinds of subscribers: persistent listeners, one-shot listeners and
/// one-shot awaiters parked in [`EventEmitter::wait_for`]. The router emits
/// raw CDP events under their method name and the target state machine emits
/// the synthetic lifecycle signals under short names.
#[derive(Default)]
pub struct EventEmitter {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    listeners: HashMap<String, Vec<(ListenerId, Listener)>>,
    once_listeners: HashMap<String, Vec<OnceListener>>,
    awaiters: HashMap<String, Vec<(AwaiterId, oneshot::Sender<Value>)>>,
    next_id: u64,
}

impl Inner {
    fn next_id(&mut self) -> u64 {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a persistent listener, called for every emission of `event`
    /// until removed.
    pub fn on(
        &self,
        event: impl Into<String>,
        listener: impl Fn(&Value) + Send + Sync + 'static,
    ) -> ListenerId {
        let mut inner = self.inner.lock().unwrap();
        let id = ListenerId(inner.next_id());
        inner
            .listeners
            .entry(event.into())
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Register a listener invoked at most once.
    pub fn once(&self, event: impl Into<String>, listener: impl FnOnce(&Value) + Send + 'static) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .once_listeners
            .entry(event.into())
            .or_default()
            .push(Box::new(listener));
    }

    pub fn remove_listener(&self, event: &str, id: ListenerId) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(listeners) = inner.listeners.get_mut(event) {
            listeners.retain(|(lid, _)| *lid != id);
            if listeners.is_empty() {
                inner.listeners.remove(event);
            }
        }
    }

    /// Deliver `params` to every subscriber of `event`.
    ///
    /// Subscribers are collected under the lock but invoked outside of it, so
    /// a listener may emit again without deadlocking.
    pub fn emit(&self, event: &str, params: &Value) {
        let (listeners, once, awaiters) = {
            let mut inner = self.inner.lock().unwrap();
            let listeners: Vec<Listener> = inner
                .listeners
                .get(event)
                .map(|l| l.iter().map(|(_, f)| Arc::clone(f)).collect())
                .unwrap_or_default();
            let once = inner.once_listeners.remove(event).unwrap_or_default();
            let awaiters = inner.awaiters.remove(event).unwrap_or_default();
            (listeners, once, awaiters)
        };

        for listener in listeners {
            listener(params);
        }
        for listener in once {
            listener(params);
        }
        for (_, tx) in awaiters {
            // the awaiter may have timed out and dropped its receiver
            let _ = tx.send(params.clone());
        }
    }

    /// Suspend until the next emission of `event`, or fail with
    /// [`CdpError::Timeout`].
    ///
    /// On timeout the awaiter is removed, so a later emission cannot target
    /// it.
    pub async fn wait_for(&self, event: &str, timeout: Duration) -> Result<Value> {
        let (tx, rx) = oneshot::channel();
        let id = {
            let mut inner = self.inner.lock().unwrap();
            let id = AwaiterId(inner.next_id());
            inner
                .awaiters
                .entry(event.to_string())
                .or_default()
                .push((id, tx));
            id
        };

        futures::select! {
            value = rx.fuse() => match value {
                Ok(value) => Ok(value),
                // emitter cleared while we were parked
                Err(_) => Err(CdpError::TransportClosed),
            },
            _ = Delay::new(timeout).fuse() => {
                self.revoke(event, id);
                Err(CdpError::Timeout {
                    method: event.to_string().into(),
                    timeout,
                })
            }
        }
    }

    fn revoke(&self, event: &str, id: AwaiterId) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(awaiters) = inner.awaiters.get_mut(event) {
            awaiters.retain(|(aid, _)| *aid != id);
            if awaiters.is_empty() {
                inner.awaiters.remove(event);
            }
        }
    }

    /// Drop every subscriber and cancel all outstanding awaiters.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.listeners.clear();
        inner.once_listeners.clear();
        // dropping the senders wakes the parked awaiters with a cancellation
        inner.awaiters.clear();
    }

    #[cfg(test)]
    fn awaiter_count(&self, event: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .awaiters
            .get(event)
            .map(|a| a.len())
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn persistent_listeners_fire_until_removed() {
        let emitter = EventEmitter::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = emitter.on("load", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        emitter.emit("load", &Value::Null);
        emitter.emit("load", &Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        emitter.remove_listener("load", id);
        emitter.emit("load", &Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn once_listeners_fire_exactly_once() {
        let emitter = EventEmitter::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        emitter.once("load", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        emitter.emit("load", &Value::Null);
        emitter.emit("load", &Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn emission_reaches_only_matching_subscribers() {
        let emitter = EventEmitter::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        emitter.on("networkidle", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        emitter.emit("load", &Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn reentrant_emit_does_not_deadlock() {
        let emitter = Arc::new(EventEmitter::new());
        let inner = Arc::clone(&emitter);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        emitter.on("first", move |_| {
            inner.emit("second", &Value::Null);
        });
        emitter.on("second", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        emitter.emit("first", &Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[cfg_attr(feature = "async-std-runtime", async_std::test)]
    #[cfg_attr(
        all(feature = "tokio-runtime", not(feature = "async-std-runtime")),
        tokio::test
    )]
    async fn wait_for_receives_emitted_params() {
        let emitter = Arc::new(EventEmitter::new());
        let waiter = Arc::clone(&emitter);
        let handle = async move { waiter.wait_for("load", Duration::from_secs(5)).await };

        let emit = async {
            // give the awaiter a chance to park first
            Delay::new(Duration::from_millis(10)).await;
            emitter.emit("load", &json!({"timestamp": 1.0}));
            Ok::<_, CdpError>(Value::Null)
        };

        let (got, _) = futures::try_join!(handle, emit).unwrap();
        assert_eq!(got["timestamp"], 1.0);
    }

    #[cfg_attr(feature = "async-std-runtime", async_std::test)]
    #[cfg_attr(
        all(feature = "tokio-runtime", not(feature = "async-std-runtime")),
        tokio::test
    )]
    async fn timed_out_awaiter_is_removed() {
        let emitter = EventEmitter::new();
        let err = emitter
            .wait_for("never", Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, CdpError::Timeout { .. }));
        assert_eq!(emitter.awaiter_count("never"), 0);

        // a later emission must not target the cancelled awaiter
        emitter.emit("never", &Value::Null);
    }

    #[cfg_attr(feature = "async-std-runtime", async_std::test)]
    #[cfg_attr(
        all(feature = "tokio-runtime", not(feature = "async-std-runtime")),
        tokio::test
    )]
    async fn clear_cancels_parked_awaiters() {
        let emitter = Arc::new(EventEmitter::new());
        let waiter = Arc::clone(&emitter);
        let handle = async move { waiter.wait_for("load", Duration::from_secs(5)).await };

        let clear = async {
            Delay::new(Duration::from_millis(10)).await;
            emitter.clear();
            Ok::<_, CdpError>(Value::Null)
        };

        let (got, _) = futures::join!(handle, clear);
        assert!(matches!(got, Err(CdpError::TransportClosed)));
    }
}
