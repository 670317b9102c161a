//! Subscriber registry: event name to ordered callbacks.
//!
//! Callbacks run in registration order. Each registration gets its own
//! [`Subscription`] handle, so registering the same closure twice yields two
//! independent entries and removing one leaves the other in place.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use callwire_common::SubscriptionId;
use serde_json::Value;
use tracing::error;

use crate::types::EventKey;

/// A registered event callback.
pub type Callback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handle returned by [`SubscriberRegistry::on`]; pass it to `off` to
/// remove exactly that registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    event: String,
    id: SubscriptionId,
}

impl Subscription {
    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

pub struct SubscriberRegistry {
    next_id: AtomicU64,
    channels: RwLock<HashMap<String, BTreeMap<SubscriptionId, Callback>>>,
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        let counts: BTreeMap<&str, usize> = channels
            .iter()
            .map(|(event, callbacks)| (event.as_str(), callbacks.len()))
            .collect();
        f.debug_struct("SubscriberRegistry")
            .field("channels", &counts)
            .finish()
    }
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Register `callback` for `event`.
    pub fn on<F>(&self, event: impl Into<EventKey>, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let event = event.into().as_key().into_owned();
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.clone())
            .or_default()
            .insert(id, Arc::new(callback));
        Subscription { event, id }
    }

    /// Remove one registration. Returns `false` if it was already gone.
    pub fn off(&self, subscription: &Subscription) -> bool {
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        let Some(callbacks) = channels.get_mut(&subscription.event) else {
            return false;
        };
        let removed = callbacks.remove(&subscription.id).is_some();
        if callbacks.is_empty() {
            channels.remove(&subscription.event);
        }
        removed
    }

    /// Invoke every callback registered for `event` with `payload`.
    ///
    /// The callback list is snapshotted first, so callbacks may call `on` or
    /// `off` freely. A panicking callback is logged and the rest still run.
    /// Returns how many callbacks were invoked.
    pub fn trigger(&self, event: &str, payload: &Value) -> usize {
        let callbacks: Vec<(SubscriptionId, Callback)> = {
            let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
            match channels.get(event) {
                Some(callbacks) => callbacks
                    .iter()
                    .map(|(id, callback)| (*id, Arc::clone(callback)))
                    .collect(),
                None => return 0,
            }
        };

        for (id, callback) in &callbacks {
            if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| callback(payload))) {
                error!(
                    event,
                    subscription = %id,
                    panic = panic_message(panic.as_ref()),
                    "Event callback panicked"
                );
            }
        }
        callbacks.len()
    }

    pub fn emit(&self, event: &EventKey, payload: &Value) -> usize {
        self.trigger(&event.as_key(), payload)
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map_or(0, BTreeMap::len)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&'static str) -> Box<dyn Fn(&Value) + Send + Sync>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let make = move |tag: &'static str| {
            let sink = Arc::clone(&sink);
            Box::new(move |payload: &Value| {
                sink.lock().unwrap().push(format!("{tag}:{payload}"));
            }) as Box<dyn Fn(&Value) + Send + Sync>
        };
        (log, make)
    }

    #[test]
    fn callbacks_run_in_registration_order() {
        let registry = SubscriberRegistry::new();
        let (log, make) = recorder();
        registry.on("ringing", make("a"));
        registry.on("ringing", make("b"));
        registry.on("ringing", make("c"));

        assert_eq!(registry.trigger("ringing", &json!(1)), 3);
        assert_eq!(*log.lock().unwrap(), vec!["a:1", "b:1", "c:1"]);
    }

    #[test]
    fn trigger_without_listeners_is_a_no_op() {
        let registry = SubscriberRegistry::new();
        assert_eq!(registry.trigger("nobody", &Value::Null), 0);
    }

    #[test]
    fn same_closure_registered_twice_runs_twice_and_offs_independently() {
        let registry = SubscriberRegistry::new();
        let (log, make) = recorder();
        let shared: Arc<dyn Fn(&Value) + Send + Sync> = Arc::from(make("x"));

        let first = {
            let cb = Arc::clone(&shared);
            registry.on("ended", move |p| cb(p))
        };
        let second = {
            let cb = Arc::clone(&shared);
            registry.on("ended", move |p| cb(p))
        };
        assert_ne!(first.id(), second.id());

        registry.trigger("ended", &json!("one"));
        assert!(registry.off(&first));
        assert!(!registry.off(&first));
        registry.trigger("ended", &json!("two"));

        assert_eq!(
            *log.lock().unwrap(),
            vec![r#"x:"one""#, r#"x:"one""#, r#"x:"two""#]
        );
    }

    #[test]
    fn off_unknown_event_returns_false() {
        let registry = SubscriberRegistry::new();
        let other = SubscriberRegistry::new();
        let handle = other.on("connected", |_| {});
        assert!(!registry.off(&handle));
    }

    #[test]
    fn removing_last_callback_drops_the_channel() {
        let registry = SubscriberRegistry::new();
        let handle = registry.on(EventKey::Connected, |_| {});
        assert_eq!(handle.event(), "connected");
        assert_eq!(registry.listener_count("connected"), 1);
        registry.off(&handle);
        assert_eq!(registry.listener_count("connected"), 0);
        assert!(!format!("{registry:?}").contains("connected"));
    }

    #[test]
    fn panicking_callback_does_not_stop_the_others() {
        let registry = SubscriberRegistry::new();
        let (log, make) = recorder();
        registry.on("answered", make("before"));
        registry.on("answered", |_| panic!("listener bug"));
        registry.on("answered", make("after"));

        assert_eq!(registry.trigger("answered", &json!(null)), 3);
        assert_eq!(*log.lock().unwrap(), vec!["before:null", "after:null"]);
    }

    #[test]
    fn callback_may_unsubscribe_itself_during_dispatch() {
        let registry = Arc::new(SubscriberRegistry::new());
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(AtomicU64::new(0));

        let handle = {
            let inner = Arc::clone(&registry);
            let slot = Arc::clone(&slot);
            let calls = Arc::clone(&calls);
            registry.on("once", move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Some(me) = slot.lock().unwrap().take() {
                    inner.off(&me);
                }
            })
        };
        *slot.lock().unwrap() = Some(handle);

        registry.trigger("once", &Value::Null);
        registry.trigger("once", &Value::Null);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn call_keys_share_a_channel_with_their_string_form() {
        let registry = SubscriberRegistry::new();
        let (log, make) = recorder();
        registry.on(EventKey::Call(callwire_common::CallId::from("c1")), make("typed"));
        registry.on("call_c1", make("raw"));

        registry.emit(&EventKey::Call("c1".into()), &json!({}));
        assert_eq!(*log.lock().unwrap(), vec!["typed:{}", "raw:{}"]);
    }
}
