// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/camwatch

//! Event bus for fleet observation

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::alerts::AlertTier;
use crate::sink::HealthRecord;

/// Event types in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Health,
    TierChange,
    Worker,
    Cycle,
}

/// Generic event wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Health(Box<HealthRecord>),
    TierChanged {
        camera_id: String,
        from: AlertTier,
        to: AlertTier,
        downtime_seconds: u64,
    },
    WorkerStarted { camera_id: String, authorized: bool },
    WorkerSkipped { camera_id: String, reason: String },
    CycleComplete { cycle: u64, cameras: usize },
}

/// Broadcast hub between workers and observers.
///
/// Publishing never blocks; with no subscribers events are dropped.
pub struct EventBus {
    event_tx: broadcast::Sender<Event>,
    event_counter: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity);

        Self {
            event_tx,
            event_counter: AtomicU64::new(0),
        }
    }

    pub fn publish_health(&self, record: &HealthRecord) {
        if self.event_tx.receiver_count() == 0 {
            return;
        }
        self.publish(EventType::Health, EventPayload::Health(Box::new(record.clone())));
    }

    pub fn publish_tier_change(
        &self,
        camera_id: &str,
        from: AlertTier,
        to: AlertTier,
        downtime_seconds: u64,
    ) {
        self.publish(
            EventType::TierChange,
            EventPayload::TierChanged {
                camera_id: camera_id.to_string(),
                from,
                to,
                downtime_seconds,
            },
        );
    }

    pub fn publish_worker_started(&self, camera_id: &str, authorized: bool) {
        self.publish(
            EventType::Worker,
            EventPayload::WorkerStarted {
                camera_id: camera_id.to_string(),
                authorized,
            },
        );
    }

    pub fn publish_worker_skipped(&self, camera_id: &str, reason: &str) {
        self.publish(
            EventType::Worker,
            EventPayload::WorkerSkipped {
                camera_id: camera_id.to_string(),
                reason: reason.to_string(),
            },
        );
    }

    pub fn publish_cycle_complete(&self, cycle: u64, cameras: usize) {
        self.publish(EventType::Cycle, EventPayload::CycleComplete { cycle, cameras });
    }

    fn publish(&self, event_type: EventType, payload: EventPayload) {
        let id = self.event_counter.fetch_add(1, Ordering::Relaxed);
        let event = Event {
            id,
            event_type,
            timestamp: Utc::now(),
            payload,
        };
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_are_numbered_in_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish_worker_started("lobby", true);
        bus.publish_tier_change("lobby", AlertTier::NoAlert, AlertTier::AlertLevel1, 10);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.id, 0);
        assert_eq!(first.event_type, EventType::Worker);
        assert_eq!(second.id, 1);
        match second.payload {
            EventPayload::TierChanged { to, downtime_seconds, .. } => {
                assert_eq!(to, AlertTier::AlertLevel1);
                assert_eq!(downtime_seconds, 10);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_harmless() {
        let bus = EventBus::default();
        bus.publish_cycle_complete(1, 0);
        bus.publish_worker_skipped("x", "unknown make");
    }
}
