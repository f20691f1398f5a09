use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events published by the services. Events are sent after the owning
/// transaction commits, never before.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order events
    OrderSubmitted { order_id: Uuid, user_id: Uuid },
    PaymentRecorded { payment_id: Uuid, order_id: Uuid },

    // Cart events
    CartCreated(Uuid),
    CartUpdated(Uuid),
    CartDeleted(Uuid),
    CartItemAdded { cart_id: Uuid, product_id: Uuid },
    CartItemRemoved { cart_id: Uuid, item_id: Uuid },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is closed.
    /// Event delivery is observability, not a correctness dependency.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event.clone()).await {
            warn!("Dropping event {:?}: {}", event, e);
        }
    }
}

/// Consumes events from the channel and logs them. Runs for the lifetime of
/// the server task it is spawned on.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderSubmitted { order_id, user_id } => {
                info!(%order_id, %user_id, "order submitted");
            }
            Event::PaymentRecorded {
                payment_id,
                order_id,
            } => {
                info!(%payment_id, %order_id, "payment recorded");
            }
            other => info!(event = ?other, "event"),
        }
    }
    info!("Event channel closed; event processor stopping");
}
