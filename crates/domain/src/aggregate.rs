//! Event-sourced aggregate traits.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// A fact recorded in an event stream. Named in the past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Name stored alongside the payload and used for event queries.
    fn event_type(&self) -> &'static str;
}

/// State rebuilt by folding an event stream.
///
/// `apply` must be pure and infallible: events are facts, so replaying the
/// same stream always yields the same state.
pub trait Aggregate: Default + Send + Sync + Sized {
    type Event: DomainEvent;

    /// Stream kind, used as the event store's aggregate type.
    fn aggregate_type() -> &'static str;

    /// None until the first event has been applied.
    fn id(&self) -> Option<&AggregateId>;

    /// Version of the last applied event; 0 for a fresh aggregate.
    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    fn apply(&mut self, event: Self::Event);

    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}

/// Aggregates whose folded state can be stored as a snapshot.
pub trait SnapshotCapable: Aggregate + Serialize + DeserializeOwned {
    /// Number of events between snapshots.
    fn snapshot_interval() -> usize {
        100
    }

    fn should_snapshot(&self) -> bool {
        self.version().as_i64() > 0
            && (self.version().as_i64() as usize).is_multiple_of(Self::snapshot_interval())
    }
}
