//! Broadcast router: typed events in, serialized frames out.

use std::sync::Arc;

use log::{debug, error};

use crate::realtime::events::ChannelEvent;
use crate::realtime::registry::ChannelRegistry;

/// Publishes update/alert events to every connection currently registered in
/// a channel. Serialization happens once per event, not per recipient.
#[derive(Clone)]
pub struct BroadcastRouter {
    registry: Arc<ChannelRegistry>,
}

impl BroadcastRouter {
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self { registry }
    }

    /// Best-effort fan-out to `channel`; returns the number of deliveries.
    /// Serialization failures are logged and dropped, never propagated: by
    /// the time an event reaches the router its originating write is already
    /// durable.
    pub fn publish(&self, channel: &str, event: &ChannelEvent) -> usize {
        let frame = match serde_json::to_string(event) {
            Ok(frame) => frame,
            Err(e) => {
                error!("failed to serialize {} event: {}", event.name(), e);
                return 0;
            }
        };
        let delivered = self.registry.publish(channel, &frame);
        debug!(
            "published {} to channel {} ({} recipients)",
            event.name(),
            channel,
            delivered
        );
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::events::{AlertHandledNotice, ChannelEvent};
    use chrono::Utc;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    #[test]
    fn router_serializes_once_and_fans_out() {
        let registry = Arc::new(ChannelRegistry::new());
        let router = BroadcastRouter::new(registry.clone());

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let a = registry.connect(tx1);
        let b = registry.connect(tx2);
        registry.join(a, "ch1");
        registry.join(b, "ch1");

        let event = ChannelEvent::AlertHandled(AlertHandledNotice {
            alert_id: Uuid::nil(),
            handled_by: "op".into(),
            handled_at: Utc::now(),
        });
        assert_eq!(router.publish("ch1", &event), 2);
        assert_eq!(rx1.try_recv().unwrap(), rx2.try_recv().unwrap());
        assert_eq!(router.publish("ch2", &event), 0);
    }
}
