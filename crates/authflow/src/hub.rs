//! In-process notification hub for terminal flow outcomes.
//!
//! The operation bridge publishes a named event when a flow finishes;
//! subscribers are decoupled from the operation and may come and go at any
//! time. Delivery is at-least-once to the subscribers registered at publish
//! time — there is no replay for late arrivals.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

/// A named event published on the hub.
#[derive(Debug, Clone)]
pub struct HubPayload {
    /// Stable event name (e.g. `auth.signIn`).
    pub event_name: String,

    /// Structured outcome data. Tokens and other secrets are never placed
    /// here.
    pub data: Value,
}

impl HubPayload {
    /// Create a payload with the given name and data.
    pub fn new(event_name: impl Into<String>, data: Value) -> Self {
        Self {
            event_name: event_name.into(),
            data,
        }
    }
}

/// Identifies a hub subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HubToken(Uuid);

type Subscriber = Arc<dyn Fn(&HubPayload) + Send + Sync>;

/// In-process pub/sub channel for flow outcomes.
///
/// Cheap to clone; all clones share the same subscriber set.
#[derive(Clone, Default)]
pub struct Hub {
    subscribers: Arc<Mutex<HashMap<HubToken, Subscriber>>>,
}

impl Hub {
    /// Register a subscriber for every published payload.
    pub fn subscribe(&self, subscriber: impl Fn(&HubPayload) + Send + Sync + 'static) -> HubToken {
        let token = HubToken(Uuid::new_v4());
        self.subscribers
            .lock()
            .expect("hub subscriber lock poisoned")
            .insert(token, Arc::new(subscriber));
        token
    }

    /// Remove a subscriber; unknown tokens are ignored.
    pub fn unsubscribe(&self, token: HubToken) {
        self.subscribers
            .lock()
            .expect("hub subscriber lock poisoned")
            .remove(&token);
    }

    /// Deliver a payload to every currently registered subscriber.
    pub fn publish(&self, payload: HubPayload) {
        debug!(event = %payload.event_name, "publishing hub event");
        let snapshot: Vec<Subscriber> = self
            .subscribers
            .lock()
            .expect("hub subscriber lock poisoned")
            .values()
            .map(Arc::clone)
            .collect();
        for subscriber in snapshot {
            subscriber(&payload);
        }
    }
}
