use parkwatch_core::BookingService;
use parkwatch_shared::OccupancyUpdate;
use parkwatch_vision::SlotLayout;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Fan-out of detector results: a broadcast for live viewers and a watch
/// holding the most recent update for point-in-time queries.
#[derive(Clone)]
pub struct LiveFeed {
    tx: broadcast::Sender<Arc<OccupancyUpdate>>,
    latest: Arc<watch::Sender<Option<Arc<OccupancyUpdate>>>>,
}

impl LiveFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        let (latest, _) = watch::channel(None);
        Self {
            tx,
            latest: Arc::new(latest),
        }
    }

    /// Never blocks. Lagging subscribers miss updates.
    pub fn publish(&self, update: OccupancyUpdate) {
        let update = Arc::new(update);
        self.latest.send_replace(Some(update.clone()));
        // No subscribers is fine.
        let _ = self.tx.send(update);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<OccupancyUpdate>> {
        self.tx.subscribe()
    }

    pub fn latest(&self) -> Option<Arc<OccupancyUpdate>> {
        self.latest.borrow().clone()
    }

    /// True once this is the last handle, i.e. the server side is gone.
    pub fn is_detached(&self) -> bool {
        Arc::strong_count(&self.latest) == 1
    }
}

#[derive(Clone)]
pub struct AppState {
    pub bookings: BookingService,
    pub layout: Arc<SlotLayout>,
    pub live: LiveFeed,
}
