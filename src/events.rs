use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::entities::stock_movement::MovementType;

/// Events emitted by the services after a successful state change.
///
/// Events are dispatched after the owning transaction commits, so a consumer
/// never observes an event for a change that was rolled back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Stock movement events
    StockMovementRecorded {
        movement_id: Uuid,
        product_id: Uuid,
        location_id: Uuid,
        movement_type: MovementType,
        quantity: i32,
        new_product_quantity: i32,
    },

    // Catalog events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),

    // Location events
    LocationCreated(Uuid),
    LocationUpdated(Uuid),
    LocationDeleted(Uuid),

    // User events
    UserRegistered(Uuid),
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
}

/// Consumes events from the channel until every sender is dropped.
///
/// Spawned once at startup; handlers that need to fan events out to external
/// systems hook in here.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("Event processor started");

    while let Some(event) = receiver.recv().await {
        match &event {
            Event::StockMovementRecorded {
                movement_id,
                product_id,
                location_id,
                movement_type,
                quantity,
                new_product_quantity,
            } => {
                info!(
                    movement_id = %movement_id,
                    product_id = %product_id,
                    location_id = %location_id,
                    movement_type = movement_type.as_str(),
                    quantity = quantity,
                    new_product_quantity = new_product_quantity,
                    "Stock movement recorded"
                );
            }
            other => debug!(event = ?other, "Event processed"),
        }
    }

    info!("Event processor stopped: all senders dropped");
}
