//! Store event system
//!
//! The EventBus decouples the store and the bulk orchestrator from whatever
//! observes them (a UI layer, telemetry, tests). It uses
//! `tokio::sync::broadcast`, so publishing never blocks and never fails.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut rx = store.events().subscribe();
//!
//! store.fetch(PaymentFilters::default()).await?;
//!
//! if let Ok(envelope) = rx.recv().await {
//!     println!("Received: {:?}", envelope.event);
//! }
//! ```

use crate::core::entity::PaymentId;
use crate::core::lifecycle::{BulkOperation, Transition};
use crate::core::status::{Fallback, PaymentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Something the store did or noticed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreEvent {
    /// A page of payments replaced the loaded page
    PageLoaded { page: u32, count: usize, total: u64 },
    /// A single payment changed status
    PaymentUpdated {
        payment_id: PaymentId,
        transition: Transition,
        status: PaymentStatus,
    },
    /// A payment was deleted remotely and dropped from the cache
    PaymentRemoved { payment_id: PaymentId },
    /// A payment was created remotely
    PaymentCreated { payment_id: PaymentId },
    /// A bulk call returned
    BulkCompleted {
        operation: BulkOperation,
        successful: usize,
        failed: usize,
        skipped: usize,
    },
    /// A listing response arrived after a newer fetch had been issued
    StaleResponseDiscarded { generation: u64, latest: u64 },
    /// The normalizer substituted a default for a value it did not recognize
    DataQuality {
        payment_id: PaymentId,
        fallback: Fallback,
    },
}

impl StoreEvent {
    /// Event name, for logs and metrics labels
    pub fn name(&self) -> &'static str {
        match self {
            StoreEvent::PageLoaded { .. } => "page_loaded",
            StoreEvent::PaymentUpdated { .. } => "payment_updated",
            StoreEvent::PaymentRemoved { .. } => "payment_removed",
            StoreEvent::PaymentCreated { .. } => "payment_created",
            StoreEvent::BulkCompleted { .. } => "bulk_completed",
            StoreEvent::StaleResponseDiscarded { .. } => "stale_response_discarded",
            StoreEvent::DataQuality { .. } => "data_quality",
        }
    }

    /// The payment this event is about, if it is about a single one
    pub fn payment_id(&self) -> Option<&PaymentId> {
        match self {
            StoreEvent::PaymentUpdated { payment_id, .. }
            | StoreEvent::PaymentRemoved { payment_id }
            | StoreEvent::PaymentCreated { payment_id }
            | StoreEvent::DataQuality { payment_id, .. } => Some(payment_id),
            _ => None,
        }
    }
}

/// Envelope wrapping an event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: StoreEvent,
}

impl EventEnvelope {
    pub fn new(event: StoreEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Broadcast-based event bus
///
/// Cheap to clone (the sender is shared). Slow receivers get a `Lagged`
/// error instead of blocking publishers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of receivers that will receive the event.
    pub fn publish(&self, event: StoreEvent) -> usize {
        // send() returns Err only if there are no receivers, which is fine
        self.sender.send(EventEnvelope::new(event)).unwrap_or(0)
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
