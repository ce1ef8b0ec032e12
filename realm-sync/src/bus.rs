//! In-process event bus with strict FIFO delivery.
//!
//! `emit` enqueues; whichever call finds the bus idle becomes the
//! drainer and works the queue down sequentially. Every handler of
//! event N completes before event N+1 is dequeued, no matter how slow
//! an individual handler is. The handler list is snapshotted per event,
//! so unsubscribing mid-drain only affects later events.

use futures::future::BoxFuture;
use realm_types::RealmEvent;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// An async event handler.
pub type EventHandler = Arc<dyn Fn(RealmEvent) -> BoxFuture<'static, ()> + Send + Sync>;

/// Token returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionToken(usize);

struct BusInner {
    handlers: Vec<(usize, EventHandler)>,
    next_token: usize,
    queue: VecDeque<RealmEvent>,
    draining: bool,
}

/// Ordered, single-drain pub/sub.
pub struct EventBus {
    inner: Mutex<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BusInner {
                handlers: Vec::new(),
                next_token: 0,
                queue: VecDeque::new(),
                draining: false,
            }),
        }
    }

    /// Registers a handler for every subsequent event.
    pub fn subscribe(&self, handler: EventHandler) -> SubscriptionToken {
        let mut inner = self.lock();
        let token = inner.next_token;
        inner.next_token += 1;
        inner.handlers.push((token, handler));
        SubscriptionToken(token)
    }

    /// Removes a handler. The event currently being dispatched still
    /// reaches it; later events do not.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut inner = self.lock();
        let before = inner.handlers.len();
        inner.handlers.retain(|(id, _)| *id != token.0);
        inner.handlers.len() != before
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.lock().handlers.len()
    }

    /// Enqueues an event and drains the queue unless another `emit` is
    /// already draining. Returns once every event this call drained has
    /// been fully dispatched.
    pub async fn emit(&self, event: RealmEvent) {
        {
            let mut inner = self.lock();
            inner.queue.push_back(event);
            if inner.draining {
                // The active drainer will pick this event up in order.
                return;
            }
            inner.draining = true;
        }

        loop {
            let (event, handlers) = {
                let mut inner = self.lock();
                match inner.queue.pop_front() {
                    Some(event) => {
                        let handlers: Vec<EventHandler> = inner
                            .handlers
                            .iter()
                            .map(|(_, h)| Arc::clone(h))
                            .collect();
                        (event, handlers)
                    }
                    None => {
                        inner.draining = false;
                        return;
                    }
                }
            };

            debug!(event = %event.id, handlers = handlers.len(), "dispatching");
            for handler in handlers {
                handler(event.clone()).await;
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BusInner> {
        // Handlers never run under this lock, so it cannot be poisoned
        // by handler panics mid-dispatch; recover rather than propagate.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
