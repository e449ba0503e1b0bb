//! Broadcast bus carrying pipeline progress to any number of listeners.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::types::{Event, EventEnvelope};

const DEFAULT_CAPACITY: usize = 256;

/// Cloning shares the channel; every clone emits to the same receivers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
    emitted: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Receivers that fall more than `capacity` events behind get `Lagged`.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            emitted: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Stamps `event` and sends it. Returns how many receivers got it; with
    /// none listening the event is dropped.
    pub fn emit(&self, event: Event) -> usize {
        self.emitted.fetch_add(1, Ordering::Relaxed);
        self.sender.send(EventEnvelope::new(event)).unwrap_or(0)
    }

    /// Events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Events emitted so far, delivered or not.
    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receivers", &self.sender.receiver_count())
            .field("emitted", &self.emitted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitesmith_core::StageName;
    use uuid::Uuid;

    fn stage_started(run_id: Uuid) -> Event {
        Event::StageStarted {
            run_id,
            stage: StageName::Strategy,
        }
    }

    #[tokio::test]
    async fn test_emit_reaches_every_receiver() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        let run_id = Uuid::new_v4();

        assert_eq!(bus.emit(stage_started(run_id)), 2);

        for rx in [&mut rx1, &mut rx2] {
            let envelope = rx.recv().await.unwrap();
            assert!(matches!(
                envelope.event,
                Event::StageStarted { run_id: id, .. } if id == run_id
            ));
        }
    }

    #[test]
    fn test_emit_without_receivers_is_dropped() {
        let bus = EventBus::new();
        assert_eq!(bus.emit(stage_started(Uuid::new_v4())), 0);
        assert_eq!(bus.emitted(), 1);
    }

    #[tokio::test]
    async fn test_lagging_receiver_does_not_block() {
        let bus = EventBus::with_capacity(2);
        let mut rx = bus.subscribe();

        for _ in 0..5 {
            bus.emit(stage_started(Uuid::new_v4()));
        }
        assert_eq!(bus.emitted(), 5);
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
    }

    #[tokio::test]
    async fn test_clones_share_channel() {
        let bus = EventBus::new();
        let mut rx = bus.clone().subscribe();
        let run_id = Uuid::new_v4();

        bus.emit(stage_started(run_id));
        let envelope = rx.recv().await.unwrap();
        assert!(matches!(envelope.event, Event::StageStarted { .. }));
    }
}
