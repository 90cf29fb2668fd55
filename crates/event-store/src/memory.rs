use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventQuery, EventStoreError, Result, Snapshot, Version,
    store::{AppendOptions, EventStore, validate_events_for_append},
};

/// In-memory event store.
///
/// Streams are kept in a map keyed by id, each holding its events in
/// version order. Clones share the same storage, so an engine restarted
/// on a clone sees everything the previous engine wrote.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    streams: Arc<RwLock<HashMap<AggregateId, Vec<EventEnvelope>>>>,
    snapshots: Arc<RwLock<HashMap<AggregateId, Snapshot>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored across all streams.
    pub async fn event_count(&self) -> usize {
        self.streams.read().await.values().map(Vec::len).sum()
    }

    /// Clears all events and snapshots.
    pub async fn clear(&self) {
        self.streams.write().await.clear();
        self.snapshots.write().await.clear();
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;

        let aggregate_id = events[0].aggregate_id.clone();
        let first_new_version = events[0].version;

        let mut streams = self.streams.write().await;
        let stream = streams.entry(aggregate_id.clone()).or_default();
        let current_version = stream
            .last()
            .map(|e| e.version)
            .unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current_version,
            });
        }

        // Stands in for the unique (aggregate_id, version) constraint.
        if first_new_version != current_version.next() {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version.unwrap_or(current_version),
                actual: current_version,
            });
        }

        let last_version = events
            .last()
            .map(|e| e.version)
            .unwrap_or(current_version);
        let appended = events.len();
        stream.extend(events);

        metrics::counter!("event_store_events_appended_total").increment(appended as u64);
        tracing::debug!(%aggregate_id, version = %last_version, appended, "Events appended");

        Ok(last_version)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: &AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let streams = self.streams.read().await;
        Ok(streams.get(aggregate_id).cloned().unwrap_or_default())
    }

    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: &AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let streams = self.streams.read().await;
        Ok(streams
            .get(aggregate_id)
            .map(|stream| {
                stream
                    .iter()
                    .filter(|e| e.version >= from_version)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>> {
        let streams = self.streams.read().await;
        let mut events: Vec<_> = streams
            .values()
            .flatten()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();

        events.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(a.version.cmp(&b.version))
        });

        let events = events
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(events)
    }

    async fn get_aggregate_version(&self, aggregate_id: &AggregateId) -> Result<Option<Version>> {
        let streams = self.streams.read().await;
        Ok(streams
            .get(aggregate_id)
            .and_then(|stream| stream.last())
            .map(|e| e.version))
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        snapshots.insert(snapshot.aggregate_id.clone(), snapshot);
        Ok(())
    }

    async fn get_snapshot(&self, aggregate_id: &AggregateId) -> Result<Option<Snapshot>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.get(aggregate_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventStoreExt;

    fn record(stream: &str, version: i64, event_type: &str) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(stream)
            .aggregate_type("ShipmentProcess")
            .event_type(event_type)
            .version(Version::new(version))
            .payload_raw(serde_json::json!({"stage": event_type}))
            .build()
    }

    #[tokio::test]
    async fn first_append_creates_stream() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new("1_process");

        let version = store
            .append(
                vec![record("1_process", 1, "ProcessStarted")],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();

        assert_eq!(version, Version::first());
        assert!(store.aggregate_exists(&id).await.unwrap());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn second_start_conflicts() {
        let store = InMemoryEventStore::new();
        store
            .append(
                vec![record("1_process", 1, "ProcessStarted")],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();

        let err = store
            .append(
                vec![record("1_process", 1, "ProcessStarted")],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn stale_writer_is_rejected() {
        let store = InMemoryEventStore::new();
        store
            .append(
                vec![
                    record("5_process", 1, "ProcessStarted"),
                    record("5_process", 2, "StageCompleted"),
                ],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();

        let result = store
            .append(
                vec![record("5_process", 2, "StageCompleted")],
                AppendOptions::expect_version(Version::first()),
            )
            .await;

        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn unchecked_append_with_gap_is_rejected() {
        let store = InMemoryEventStore::new();
        let result = store
            .append(vec![record("5_process", 3, "StageCompleted")], AppendOptions::new())
            .await;
        assert!(result.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn reads_from_version() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new("3_process");
        store
            .append(
                vec![
                    record("3_process", 1, "ProcessStarted"),
                    record("3_process", 2, "StageCompleted"),
                    record("3_process", 3, "StageCompleted"),
                ],
                AppendOptions::new(),
            )
            .await
            .unwrap();

        let tail = store
            .get_events_for_aggregate_from_version(&id, Version::new(2))
            .await
            .unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].version, Version::new(2));

        assert_eq!(
            store.get_aggregate_version(&id).await.unwrap(),
            Some(Version::new(3))
        );
    }

    #[tokio::test]
    async fn query_spans_streams() {
        let store = InMemoryEventStore::new();
        for stream in ["1_process", "2_process"] {
            store
                .append(
                    vec![
                        record(stream, 1, "ProcessStarted"),
                        record(stream, 2, "StageCompleted"),
                    ],
                    AppendOptions::expect_new(),
                )
                .await
                .unwrap();
        }

        let started = store
            .query_events(EventQuery::for_event_type("ProcessStarted"))
            .await
            .unwrap();
        assert_eq!(started.len(), 2);

        let limited = store
            .query_events(EventQuery::new().limit(3).offset(1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 3);
    }

    #[tokio::test]
    async fn load_aggregate_starts_after_snapshot() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new("8_process");
        store
            .append(
                vec![
                    record("8_process", 1, "ProcessStarted"),
                    record("8_process", 2, "StageCompleted"),
                    record("8_process", 3, "StageCompleted"),
                ],
                AppendOptions::new(),
            )
            .await
            .unwrap();
        let snapshot = Snapshot::from_state(
            id.clone(),
            "ShipmentProcess",
            Version::new(2),
            &serde_json::json!({"status": "Pending"}),
        )
        .unwrap();
        store.save_snapshot(snapshot).await.unwrap();

        let (snapshot, events) = store.load_aggregate(&id).await.unwrap();

        assert_eq!(snapshot.unwrap().version, Version::new(2));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].version, Version::new(3));
    }

    #[tokio::test]
    async fn clones_share_storage() {
        let store = InMemoryEventStore::new();
        let other = store.clone();
        store
            .append(vec![record("4_process", 1, "ProcessStarted")], AppendOptions::new())
            .await
            .unwrap();

        assert_eq!(other.event_count().await, 1);
        other.clear().await;
        assert_eq!(store.event_count().await, 0);
    }
}
