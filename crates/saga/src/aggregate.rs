//! Process instance aggregate.

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{
    Aggregate, ProcessFailure, ProcessOutcome, ProcessRequest, ProcessResult, SnapshotCapable,
};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::events::SagaEvent;
use crate::state::ProcessStatus;

/// Aggregate type under which every process stream is written.
pub const PROCESS_AGGREGATE_TYPE: &str = "ShipmentProcess";

/// Instance id of the process for a shipment.
pub fn instance_id_for(shipment_id: &str) -> String {
    format!("{shipment_id}_process")
}

/// An event-sourced process instance.
///
/// Folded from the journal; holds the request, which stages have
/// completed, and the final result once one is recorded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SagaInstance {
    id: Option<AggregateId>,
    version: Version,
    shipment_id: String,
    request: Option<ProcessRequest>,
    status: ProcessStatus,
    /// `scope/stage` keys in completion order.
    completed_stages: Vec<String>,
    /// Timers scheduled but not yet fired, by scope.
    pending_timers: Vec<(String, DateTime<Utc>)>,
    result: Option<ProcessResult<ProcessOutcome>>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl Aggregate for SagaInstance {
    type Event = SagaEvent;

    fn aggregate_type() -> &'static str {
        PROCESS_AGGREGATE_TYPE
    }

    fn id(&self) -> Option<&AggregateId> {
        self.id.as_ref()
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            SagaEvent::ProcessStarted(data) => {
                self.id = Some(AggregateId::new(data.instance_id));
                self.shipment_id = data.request.id.clone();
                self.request = Some(data.request);
                self.status = ProcessStatus::Pending;
                self.started_at = Some(data.started_at);
            }
            SagaEvent::StageCompleted(data) => {
                self.completed_stages
                    .push(format!("{}/{}", data.scope, data.stage));
            }
            SagaEvent::TimerScheduled(data) => {
                self.pending_timers.push((data.scope, data.fire_at));
            }
            SagaEvent::TimerFired(data) => {
                self.pending_timers.retain(|(scope, _)| *scope != data.scope);
            }
            SagaEvent::ProcessSucceeded(data) => {
                self.status = ProcessStatus::Succeeded;
                self.result = Some(ProcessResult::success(data.outcome));
                self.finished_at = Some(data.completed_at);
            }
            SagaEvent::ProcessFailed(data) => {
                self.status = ProcessStatus::Failed;
                self.result = Some(ProcessResult::failure(data.failure));
                self.finished_at = Some(data.failed_at);
            }
        }
        self.version = self.version.next();
    }
}

impl SnapshotCapable for SagaInstance {
    fn snapshot_interval() -> usize {
        1
    }
}

impl SagaInstance {
    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    pub fn shipment_id(&self) -> &str {
        &self.shipment_id
    }

    pub fn request(&self) -> Option<&ProcessRequest> {
        self.request.as_ref()
    }

    pub fn completed_stages(&self) -> &[String] {
        &self.completed_stages
    }

    pub fn pending_timers(&self) -> &[(String, DateTime<Utc>)] {
        &self.pending_timers
    }

    /// The recorded result, once the instance is terminal.
    pub fn result(&self) -> Option<&ProcessResult<ProcessOutcome>> {
        self.result.as_ref()
    }

    pub fn outcome(&self) -> Option<&ProcessOutcome> {
        self.result.as_ref().and_then(|r| r.as_success())
    }

    pub fn failure(&self) -> Option<&ProcessFailure> {
        self.result.as_ref().and_then(|r| r.as_failure())
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }
}
