//! Shared types used across the orchestrator crates.

mod types;

pub use types::AggregateId;
