//! The client contract.
//!
//! A [`SyncClient`] is the sync engine's view of one connected remote
//! surface: an id, a connection flag, and an outbound event channel.
//! The transport owns the inbound direction and feeds received events
//! into [`crate::SyncEngine::handle_incoming`].

use crate::error::SyncResult;
use async_trait::async_trait;
use realm_types::{ClientId, RealmEvent};

/// A remote surface's duplex event channel, outbound half.
#[async_trait]
pub trait SyncClient: Send + Sync {
    /// The client's unique id.
    fn client_id(&self) -> ClientId;

    /// Human-readable label for logs.
    fn label(&self) -> &str;

    /// Whether the channel is still open.
    fn is_connected(&self) -> bool;

    /// Delivers an event to the remote end.
    async fn send(&self, event: &RealmEvent) -> SyncResult<()>;
}

/// A mock client for testing.
pub mod mock {
    use super::*;
    use crate::error::SyncError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// Channel-backed mock that records everything sent to it, pushing
    /// each event through the wire envelope so serialization is
    /// exercised too.
    #[derive(Debug, Clone)]
    pub struct MockClient {
        id: ClientId,
        label: String,
        delivered: Arc<Mutex<VecDeque<RealmEvent>>>,
        connected: Arc<AtomicBool>,
    }

    impl MockClient {
        pub fn new(label: impl Into<String>) -> Self {
            Self {
                id: ClientId::new(),
                label: label.into(),
                delivered: Arc::new(Mutex::new(VecDeque::new())),
                connected: Arc::new(AtomicBool::new(true)),
            }
        }

        /// Pops the oldest delivered event.
        pub fn take_delivered(&self) -> Option<RealmEvent> {
            self.delivered.lock().ok()?.pop_front()
        }

        /// How many events have been delivered and not taken.
        pub fn delivered_count(&self) -> usize {
            self.delivered.lock().map(|q| q.len()).unwrap_or(0)
        }

        /// Closes the channel; subsequent sends fail.
        pub fn close(&self) {
            self.connected.store(false, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl SyncClient for MockClient {
        fn client_id(&self) -> ClientId {
            self.id
        }

        fn label(&self) -> &str {
            &self.label
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn send(&self, event: &RealmEvent) -> SyncResult<()> {
            if !self.is_connected() {
                return Err(SyncError::ClientClosed(self.id));
            }
            // Round-trip through the wire form, as a real transport would.
            let wire = event.to_wire()?;
            let event = RealmEvent::from_wire(&wire)?;
            if let Ok(mut queue) = self.delivered.lock() {
                queue.push_back(event);
            }
            Ok(())
        }
    }
}
