use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::bus::{BusError, EventBus};
use crate::model::ClientEvent;

/// Client Event Publisher: puts agent-reported events onto the events topic
pub struct EventPublisher {
    bus: Arc<dyn EventBus>,
}

impl EventPublisher {
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    /// Publish one event, assigning a fresh id when the agent sent none.
    /// Returns the id the event was published under.
    pub async fn publish(&self, mut event: ClientEvent) -> Result<Uuid, BusError> {
        if event.id.is_nil() {
            event.id = Uuid::new_v4();
        }

        self.bus.publish_event(&event).await?;
        debug!(event_id = %event.id, "📤 Published client event");
        Ok(event.id)
    }
}
