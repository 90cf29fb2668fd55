//! Records written to a process instance's journal.

use chrono::{DateTime, Utc};
use domain::{DomainEvent, ProcessFailure, ProcessOutcome, ProcessRequest};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SagaEvent {
    ProcessStarted(ProcessStartedData),

    /// A stage or step of some scope finished. `result` holds the encoded
    /// `Outcome` and is returned as-is on replay.
    StageCompleted(StageCompletedData),

    /// A scope suspended until `fire_at`.
    TimerScheduled(TimerScheduledData),

    TimerFired(TimerFiredData),

    ProcessSucceeded(ProcessSucceededData),

    ProcessFailed(ProcessFailedData),
}

impl DomainEvent for SagaEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SagaEvent::ProcessStarted(_) => "ProcessStarted",
            SagaEvent::StageCompleted(_) => "StageCompleted",
            SagaEvent::TimerScheduled(_) => "TimerScheduled",
            SagaEvent::TimerFired(_) => "TimerFired",
            SagaEvent::ProcessSucceeded(_) => "ProcessSucceeded",
            SagaEvent::ProcessFailed(_) => "ProcessFailed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessStartedData {
    pub instance_id: String,
    pub request: ProcessRequest,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageCompletedData {
    /// Correlation id of the scope, e.g. `42_manifestation_leg1`.
    pub scope: String,
    pub stage: String,
    pub result: serde_json::Value,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerScheduledData {
    pub scope: String,
    pub fire_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerFiredData {
    pub scope: String,
    pub fired_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSucceededData {
    pub outcome: ProcessOutcome,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessFailedData {
    pub failure: ProcessFailure,
    pub failed_at: DateTime<Utc>,
}

impl SagaEvent {
    pub fn process_started(instance_id: impl Into<String>, request: ProcessRequest) -> Self {
        SagaEvent::ProcessStarted(ProcessStartedData {
            instance_id: instance_id.into(),
            request,
            started_at: Utc::now(),
        })
    }

    pub fn stage_completed(
        scope: impl Into<String>,
        stage: impl Into<String>,
        result: serde_json::Value,
    ) -> Self {
        SagaEvent::StageCompleted(StageCompletedData {
            scope: scope.into(),
            stage: stage.into(),
            result,
            completed_at: Utc::now(),
        })
    }

    pub fn timer_scheduled(scope: impl Into<String>, fire_at: DateTime<Utc>) -> Self {
        SagaEvent::TimerScheduled(TimerScheduledData {
            scope: scope.into(),
            fire_at,
        })
    }

    pub fn timer_fired(scope: impl Into<String>, fired_at: DateTime<Utc>) -> Self {
        SagaEvent::TimerFired(TimerFiredData {
            scope: scope.into(),
            fired_at,
        })
    }

    pub fn process_succeeded(outcome: ProcessOutcome) -> Self {
        SagaEvent::ProcessSucceeded(ProcessSucceededData {
            outcome,
            completed_at: Utc::now(),
        })
    }

    pub fn process_failed(failure: ProcessFailure) -> Self {
        SagaEvent::ProcessFailed(ProcessFailedData {
            failure,
            failed_at: Utc::now(),
        })
    }

    /// Correlation id of the scope that produced this record, if any.
    pub fn scope(&self) -> Option<&str> {
        match self {
            SagaEvent::StageCompleted(data) => Some(&data.scope),
            SagaEvent::TimerScheduled(data) => Some(&data.scope),
            SagaEvent::TimerFired(data) => Some(&data.scope),
            _ => None,
        }
    }
}
