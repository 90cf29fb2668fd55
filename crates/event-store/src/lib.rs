//! Append-only event log used as the durability layer of the saga engine.
//!
//! Every stream is identified by an [`AggregateId`] and holds a gap-free,
//! strictly increasing sequence of [`Version`]s. Appends carry an expected
//! version so that two writers can never interleave records in one stream.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod snapshot;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use query::EventQuery;
pub use snapshot::Snapshot;
pub use store::{AppendOptions, EventStore, EventStoreExt};
