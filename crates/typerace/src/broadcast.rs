//! Countdown delivery through the connection hub.

use std::sync::Arc;

use tokio::sync::Mutex;
use typerace_protocol::{ParticipantId, RoomId, ServerEvent};
use typerace_room::RoomBroadcast;
use typerace_transport::BroadcastHub;

/// Outbound channels of every connection, grouped by room id.
pub type SharedHub = Arc<Mutex<BroadcastHub<ParticipantId, ServerEvent>>>;

/// Sends countdown events to whoever is in the room's hub group when the
/// tick fires.
#[derive(Clone)]
pub struct HubBroadcaster {
    hub: SharedHub,
}

impl HubBroadcaster {
    pub fn new(hub: SharedHub) -> Self {
        Self { hub }
    }
}

impl RoomBroadcast for HubBroadcaster {
    async fn broadcast(&self, room_id: &RoomId, event: ServerEvent) {
        let name = event.name();
        let delivered = self.hub.lock().await.broadcast(room_id.as_str(), event);
        tracing::trace!(%room_id, event = name, delivered, "room broadcast");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_broadcast_reaches_current_group_only() {
        let hub: SharedHub = Arc::new(Mutex::new(BroadcastHub::new()));
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        {
            let mut h = hub.lock().await;
            h.register(ParticipantId(1), tx1);
            h.register(ParticipantId(2), tx2);
            h.join_group("R1", ParticipantId(1));
        }

        let broadcaster = HubBroadcaster::new(Arc::clone(&hub));
        broadcaster
            .broadcast(&RoomId::new("R1"), ServerEvent::Countdown(3))
            .await;

        assert_eq!(rx1.try_recv().unwrap(), ServerEvent::Countdown(3));
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_to_empty_room_is_noop() {
        let hub: SharedHub = Arc::new(Mutex::new(BroadcastHub::new()));
        HubBroadcaster::new(hub)
            .broadcast(&RoomId::new("gone"), ServerEvent::Countdown(1))
            .await;
    }
}
