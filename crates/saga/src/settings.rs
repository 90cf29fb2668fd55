//! Engine tunables.

use std::time::Duration;

use crate::invoker::{RetryPolicy, StepOptions};

/// Invocation settings per collaborator plus the collection lateness policy.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Manifestation and collection booking.
    pub carrier: StepOptions,
    pub documents: StepOptions,
    /// Eligibility check and scheduling.
    pub collection: StepOptions,
    /// How long after `bookAt` a booking may still be made.
    pub collection_late_tolerance: chrono::Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            carrier: StepOptions::new(Duration::from_secs(180)),
            documents: StepOptions::new(Duration::from_secs(5)),
            collection: StepOptions::new(Duration::from_secs(1)),
            collection_late_tolerance: chrono::Duration::hours(1),
        }
    }
}

impl EngineSettings {
    /// Applies `retry` to every collaborator.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.carrier.retry = retry.clone();
        self.documents.retry = retry.clone();
        self.collection.retry = retry;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        for options in [&mut self.carrier, &mut self.documents, &mut self.collection] {
            options.retry.max_attempts = max_attempts.max(1);
        }
        self
    }

    pub fn with_late_tolerance(mut self, tolerance: chrono::Duration) -> Self {
        self.collection_late_tolerance = tolerance;
        self
    }
}
