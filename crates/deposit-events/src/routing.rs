//! Event bus routing helpers.

use crate::payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::sync::broadcast::Sender;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    replay: Arc<Mutex<VecDeque<EventEnvelope>>>,
    replay_capacity: usize,
    next_id: Arc<Mutex<EventId>>,
}

impl EventBus {
    /// Construct a bus with a custom replay capacity (clamped to at least one).
    #[must_use]
    pub fn with_capacity(replay_capacity: usize) -> Self {
        let replay_capacity = replay_capacity.max(1);
        let (sender, _) = broadcast::channel(replay_capacity);
        Self {
            sender,
            replay: Arc::new(Mutex::new(VecDeque::with_capacity(replay_capacity))),
            replay_capacity,
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Construct a bus with the default replay capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Subscribe to the bus, replaying buffered events newer than `last_event_id`.
    #[must_use]
    pub fn subscribe(&self, last_event_id: Option<EventId>) -> EventStream {
        // Subscribe before snapshotting so nothing published in between is lost.
        let live = BroadcastStream::new(self.sender.subscribe());
        let backlog: VecDeque<_> = last_event_id
            .map(|last| self.backlog_since(last).into())
            .unwrap_or_default();
        let delivered = backlog.back().map(|env: &EventEnvelope| env.id);
        EventStream {
            backlog,
            live,
            delivered,
        }
    }

    /// Publish a new event to all subscribers, returning its assigned id.
    pub fn publish(&self, event: Event) -> EventId {
        let mut next = self
            .next_id
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let id = *next;
        *next = next.saturating_add(1);
        drop(next);

        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };
        {
            let mut replay = self.lock_replay();
            if replay.len() == self.replay_capacity {
                let _ = replay.pop_front();
            }
            replay.push_back(envelope.clone());
        }
        // No subscribers is not an error; the replay ring keeps the event.
        let _ = self.sender.send(envelope);
        id
    }

    /// Last event id observed in the replay buffer.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.lock_replay().back().map(|env| env.id)
    }

    /// Collect a backlog of events emitted after the specified id.
    #[must_use]
    pub fn backlog_since(&self, id: EventId) -> Vec<EventEnvelope> {
        let replay = self.lock_replay();
        replay.iter().filter(|env| env.id > id).cloned().collect()
    }

    fn lock_replay(&self) -> MutexGuard<'_, VecDeque<EventEnvelope>> {
        self.replay
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber view that yields the replay backlog first, then live events.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    live: BroadcastStream<EventEnvelope>,
    delivered: Option<EventId>,
}

impl EventStream {
    /// Receive the next event; lagged gaps are skipped. Returns `None` once the bus is dropped.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(envelope) = self.backlog.pop_front() {
            return Some(envelope);
        }
        while let Some(item) = self.live.next().await {
            match item {
                Ok(envelope) if self.delivered.is_some_and(|seen| envelope.id <= seen) => {}
                Ok(envelope) => {
                    self.delivered = Some(envelope.id);
                    return Some(envelope);
                }
                Err(BroadcastStreamRecvError::Lagged(_)) => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn attached(n: u128) -> Event {
        Event::FileSetAttached {
            file_set_id: Uuid::from_u128(n),
            work_id: Uuid::nil(),
        }
    }

    #[tokio::test]
    async fn publish_and_replay_from_id() {
        let bus = EventBus::with_capacity(4);
        let first = bus.publish(attached(1));
        let second = bus.publish(Event::VisibilityCopied {
            work_id: Uuid::nil(),
            updated: 2,
        });

        assert_eq!(bus.last_event_id(), Some(second));
        let backlog = bus.backlog_since(first);
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0].id, second);
    }

    #[tokio::test]
    async fn replay_ring_drops_oldest_entries() {
        let bus = EventBus::with_capacity(2);
        for n in 0..3 {
            let _ = bus.publish(attached(n));
        }
        let backlog = bus.backlog_since(0);
        assert_eq!(backlog.iter().map(|env| env.id).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[tokio::test]
    async fn subscribe_streams_events() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe(None);
        let id = bus.publish(attached(9));
        let envelope = stream.next().await.expect("stream item");
        assert_eq!(envelope.id, id);
        assert!(matches!(envelope.event, Event::FileSetAttached { .. }));
    }

    #[tokio::test]
    async fn subscribe_replays_backlog_without_duplicates() {
        let bus = EventBus::with_capacity(8);
        let first = bus.publish(attached(1));
        let _ = bus.publish(attached(2));
        let mut stream = bus.subscribe(Some(first));
        let third = bus.publish(attached(3));

        let replayed = stream.next().await.expect("replayed item");
        assert_eq!(replayed.id, first + 1);
        let live = stream.next().await.expect("live item");
        assert_eq!(live.id, third);
    }
}
