use fnv::FnvHashMap;
use tracing::{debug, trace, warn};

/// A single token of a dotted topic, e.g. `"data.quotes.BTCUSD"` splits into
/// `["data", "quotes", "BTCUSD"]`.
fn tokens(topic: &str) -> Vec<&str> {
    topic.split('.').collect()
}

/// Does `pattern` match `topic`? `*` matches exactly one token; `>` matches one or more
/// trailing tokens and must be the pattern's final token.
fn matches(pattern: &[&str], topic: &[&str]) -> bool {
    let mut p = pattern.iter();
    let mut t = topic.iter();

    loop {
        match (p.next(), t.next()) {
            (Some(&">"), Some(_)) => return true,
            (Some(&"*"), Some(_)) => continue,
            (Some(pat), Some(tok)) => {
                if pat != tok {
                    return false;
                }
            }
            (None, None) => return true,
            _ => return false,
        }
    }
}

pub type SubscriptionId = u64;

struct Subscription<M> {
    id: SubscriptionId,
    pattern: String,
    priority: i32,
    registration_order: u64,
    handler: Box<dyn FnMut(&str, &M) + Send>,
}

/// Synchronous in-process publish/subscribe bus with dotted-topic wildcard matching
/// (`*` single token, `>` trailing tokens), point-to-point named endpoints, and
/// correlation-id keyed request/response.
///
/// Delivery to subscribers of a given `publish` call is synchronous and ordered by
/// descending priority, then ascending registration order for ties - the same subscriber
/// never observes two publishes out of the order they were published in.
///
/// A `send_to_endpoint`/`respond` call that finds no matching endpoint is logged and
/// dropped, never an error: a component tearing down its endpoint mid-run must not be
/// able to crash an unrelated publisher.
pub struct MessageBus<M> {
    subscriptions: Vec<Subscription<M>>,
    endpoints: FnvHashMap<String, Box<dyn FnMut(M) + Send>>,
    pending_requests: FnvHashMap<String, Box<dyn FnOnce(M) + Send>>,
    next_subscription_id: SubscriptionId,
    registration_counter: u64,
}

impl<M> Default for MessageBus<M> {
    fn default() -> Self {
        Self {
            subscriptions: Vec::new(),
            endpoints: FnvHashMap::default(),
            pending_requests: FnvHashMap::default(),
            next_subscription_id: 0,
            registration_counter: 0,
        }
    }
}

impl<M> MessageBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to every topic matching `pattern`. Higher `priority` values are
    /// delivered first; subscribers sharing a priority are delivered in subscription order.
    pub fn subscribe<F>(&mut self, pattern: impl Into<String>, priority: i32, handler: F) -> SubscriptionId
    where
        F: FnMut(&str, &M) + Send + 'static,
    {
        let id = self.next_subscription_id;
        self.next_subscription_id += 1;
        self.registration_counter += 1;

        let pattern = pattern.into();
        debug!(pattern, priority, subscription_id = id, "subscribing to topic pattern");

        self.subscriptions.push(Subscription {
            id,
            pattern,
            priority,
            registration_order: self.registration_counter,
            handler: Box::new(handler),
        });
        self.subscriptions.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.registration_order.cmp(&b.registration_order))
        });

        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscriptions.retain(|sub| sub.id != id);
    }

    /// Deliver `msg` to every subscription whose pattern matches `topic`, in priority order.
    pub fn publish(&mut self, topic: &str, msg: M) {
        let topic_tokens = tokens(topic);
        trace!(topic, "publishing message");

        for sub in self.subscriptions.iter_mut() {
            let pattern_tokens = tokens(&sub.pattern);
            if matches(&pattern_tokens, &topic_tokens) {
                (sub.handler)(topic, &msg);
            }
        }
    }

    /// Register a point-to-point endpoint named `name`. Replaces any existing endpoint of
    /// the same name.
    pub fn register_endpoint<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: FnMut(M) + Send + 'static,
    {
        let name = name.into();
        debug!(name, "registering endpoint");
        self.endpoints.insert(name, Box::new(handler));
    }

    pub fn deregister_endpoint(&mut self, name: &str) {
        debug!(name, "deregistering endpoint");
        self.endpoints.remove(name);
    }

    /// Send `msg` directly to the endpoint named `name`. A missing endpoint is logged and
    /// dropped rather than returned as an error.
    pub fn send_to_endpoint(&mut self, name: &str, msg: M) {
        match self.endpoints.get_mut(name) {
            Some(handler) => handler(msg),
            None => warn!(name, "no endpoint registered - message dropped"),
        }
    }

    /// Send `msg` to `name` and register `on_response` to run the next time `respond` is
    /// called with the same `correlation_id`.
    pub fn request<F>(&mut self, name: &str, correlation_id: impl Into<String>, msg: M, on_response: F)
    where
        F: FnOnce(M) + Send + 'static,
    {
        let correlation_id = correlation_id.into();
        self.pending_requests.insert(correlation_id, Box::new(on_response));
        self.send_to_endpoint(name, msg);
    }

    /// Fulfil a pending `request` keyed by `correlation_id`. A `correlation_id` with no
    /// matching request (already answered, timed out, or never made) is logged and dropped.
    pub fn respond(&mut self, correlation_id: &str, msg: M) {
        match self.pending_requests.remove(correlation_id) {
            Some(on_response) => on_response(msg),
            None => warn!(correlation_id, "no pending request for correlation id - response dropped"),
        }
    }

    pub fn endpoint_names(&self) -> Vec<String> {
        self.endpoints.keys().cloned().collect()
    }
}
