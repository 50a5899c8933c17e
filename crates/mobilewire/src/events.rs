//! Device notifications delivered to subscribers.
//!
//! A connection manager publishes [`DeviceEvent`]s (or any other event type)
//! into an [`EventHub`]. Subscribers either block on a [`Subscription`] with
//! a deadline or register a handler that runs on the publishing thread.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tracing::{debug, trace};

type Predicate<E> = Box<dyn Fn(&E) -> bool + Send>;
type Handler<E> = Box<dyn FnMut(&E) + Send>;

enum Sink<E> {
    Queue { predicate: Predicate<E>, tx: Sender<E> },
    Handler(Handler<E>),
}

struct Listener<E> {
    id: u64,
    sink: Sink<E>,
}

struct HubState<E> {
    next_id: u64,
    listeners: Vec<Listener<E>>,
}

impl<E> HubState<E> {
    fn add(&mut self, sink: Sink<E>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push(Listener { id, sink });
        id
    }

    fn remove(&mut self, id: u64) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }
}

fn lock<E>(state: &Mutex<HubState<E>>) -> MutexGuard<'_, HubState<E>> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Identifies a handler registered with [`EventHub::on_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Fan-out point for events of type `E`.
///
/// Cloning a hub yields another handle to the same listener set.
pub struct EventHub<E> {
    state: Arc<Mutex<HubState<E>>>,
}

impl<E> Clone for EventHub<E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<E: Clone + Send + 'static> Default for EventHub<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone + Send + 'static> EventHub<E> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Deliver `event` to every live listener on the calling thread.
    ///
    /// Handlers run while the hub is locked and must not call back into it.
    /// Returns the number of listeners that received the event.
    pub fn publish(&self, event: E) -> usize {
        let mut state = lock(&self.state);
        let mut delivered = 0;
        state.listeners.retain_mut(|listener| match &mut listener.sink {
            Sink::Queue { predicate, tx } => {
                if !predicate(&event) {
                    return true;
                }
                match tx.send(event.clone()) {
                    Ok(()) => {
                        delivered += 1;
                        true
                    }
                    Err(_) => {
                        trace!(id = listener.id, "dropping detached subscriber");
                        false
                    }
                }
            }
            Sink::Handler(handler) => {
                handler(&event);
                delivered += 1;
                true
            }
        });
        debug!(delivered, listeners = state.listeners.len(), "event published");
        delivered
    }

    /// Queue every event accepted by `predicate` until the subscription drops.
    pub fn subscribe<F>(&self, predicate: F) -> Subscription<E>
    where
        F: Fn(&E) -> bool + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let id = lock(&self.state).add(Sink::Queue {
            predicate: Box::new(predicate),
            tx,
        });
        Subscription {
            id,
            rx,
            hub: Arc::downgrade(&self.state),
        }
    }

    /// Call `handler` for every published event.
    pub fn on_event<F>(&self, handler: F) -> ListenerId
    where
        F: FnMut(&E) + Send + 'static,
    {
        ListenerId(lock(&self.state).add(Sink::Handler(Box::new(handler))))
    }

    /// Remove a handler. Returns `false` if it was already gone.
    pub fn remove_handler(&self, id: ListenerId) -> bool {
        lock(&self.state).remove(id.0)
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.state).listeners.len()
    }
}

/// Queue of matching events. Dropping it cancels the subscription.
pub struct Subscription<E> {
    id: u64,
    rx: Receiver<E>,
    hub: Weak<Mutex<HubState<E>>>,
}

impl<E> Subscription<E> {
    /// Next matching event, or `None` once `timeout` elapses.
    ///
    /// Also returns `None` immediately if the hub is gone and nothing is
    /// left in the queue.
    pub fn wait(&self, timeout: Duration) -> Option<E> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Next already-queued event without blocking.
    pub fn try_next(&self) -> Option<E> {
        self.rx.try_recv().ok()
    }
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        if let Some(state) = self.hub.upgrade() {
            lock(&state).remove(self.id);
        }
    }
}

/// Attachment changes reported by the connection manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Attached { device_id: String },
    Detached { device_id: String },
}

impl DeviceEvent {
    pub fn device_id(&self) -> &str {
        match self {
            Self::Attached { device_id } | Self::Detached { device_id } => device_id,
        }
    }
}

/// Predicate accepting attachment of `device_id`, or of any device when `None`.
pub fn attached(device_id: Option<String>) -> impl Fn(&DeviceEvent) -> bool + Send + 'static {
    move |event| match event {
        DeviceEvent::Attached { device_id: id } => device_id.as_deref().map_or(true, |want| want == id),
        DeviceEvent::Detached { .. } => false,
    }
}

/// Block until a matching device attaches, or `timeout` passes.
///
/// Subscribe before whatever triggers the attachment, then call this on the
/// returned subscription.
pub fn wait_for_device(subscription: &Subscription<DeviceEvent>, timeout: Duration) -> Option<String> {
    subscription
        .wait(timeout)
        .map(|event| event.device_id().to_string())
}
