use chrono::{DateTime, Utc};

use crate::{AggregateId, Version};

/// Filter over the event log.
///
/// Every field is optional; unset fields match everything. Results are
/// returned in timestamp order, then version order.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub aggregate_id: Option<AggregateId>,

    pub aggregate_type: Option<String>,

    /// Matches any of these event types.
    pub event_types: Option<Vec<String>>,

    /// Inclusive lower version bound.
    pub from_version: Option<Version>,

    /// Inclusive upper version bound.
    pub to_version: Option<Version>,

    pub from_timestamp: Option<DateTime<Utc>>,

    pub to_timestamp: Option<DateTime<Utc>>,

    pub limit: Option<usize>,

    pub offset: Option<usize>,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for a single stream.
    pub fn for_aggregate(aggregate_id: impl Into<AggregateId>) -> Self {
        Self {
            aggregate_id: Some(aggregate_id.into()),
            ..Default::default()
        }
    }

    /// Creates a query for events of a specific type.
    pub fn for_event_type(event_type: impl Into<String>) -> Self {
        Self {
            event_types: Some(vec![event_type.into()]),
            ..Default::default()
        }
    }

    pub fn aggregate_id(mut self, id: impl Into<AggregateId>) -> Self {
        self.aggregate_id = Some(id.into());
        self
    }

    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types = Some(vec![event_type.into()]);
        self
    }

    pub fn event_types(mut self, event_types: Vec<String>) -> Self {
        self.event_types = Some(event_types);
        self
    }

    pub fn from_version(mut self, version: Version) -> Self {
        self.from_version = Some(version);
        self
    }

    pub fn to_version(mut self, version: Version) -> Self {
        self.to_version = Some(version);
        self
    }

    pub fn from_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.from_timestamp = Some(timestamp);
        self
    }

    pub fn to_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.to_timestamp = Some(timestamp);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Checks an event against every filter except limit and offset.
    pub fn matches(&self, event: &crate::EventEnvelope) -> bool {
        if let Some(ref id) = self.aggregate_id
            && &event.aggregate_id != id
        {
            return false;
        }
        if let Some(ref agg_type) = self.aggregate_type
            && &event.aggregate_type != agg_type
        {
            return false;
        }
        if let Some(ref types) = self.event_types
            && !types.contains(&event.event_type)
        {
            return false;
        }
        if let Some(from) = self.from_version
            && event.version < from
        {
            return false;
        }
        if let Some(to) = self.to_version
            && event.version > to
        {
            return false;
        }
        if let Some(from) = self.from_timestamp
            && event.timestamp < from
        {
            return false;
        }
        if let Some(to) = self.to_timestamp
            && event.timestamp > to
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventEnvelope;

    fn started(stream: &str) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(stream)
            .aggregate_type("ShipmentProcess")
            .event_type("ProcessStarted")
            .version(Version::first())
            .payload_raw(serde_json::json!({}))
            .build()
    }

    #[test]
    fn recovery_query_matches_started_records() {
        let query = EventQuery::new()
            .aggregate_type("ShipmentProcess")
            .event_type("ProcessStarted");

        assert!(query.matches(&started("9_process")));

        let mut other = started("9_process");
        other.event_type = "StageCompleted".to_string();
        assert!(!query.matches(&other));
    }

    #[test]
    fn stream_filter_excludes_other_streams() {
        let query = EventQuery::for_aggregate("1_process").to_version(Version::new(3));

        assert!(query.matches(&started("1_process")));
        assert!(!query.matches(&started("2_process")));
    }

    #[test]
    fn builder_chain_sets_paging() {
        let query = EventQuery::for_event_type("TimerScheduled")
            .from_version(Version::new(2))
            .limit(10)
            .offset(5);

        assert_eq!(query.event_types, Some(vec!["TimerScheduled".to_string()]));
        assert_eq!(query.from_version, Some(Version::new(2)));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(5));
    }
}
