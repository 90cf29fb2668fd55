//! Per-instance journal: the deterministic replay layer.
//!
//! Every stage result and timer transition of an instance is appended to
//! its stream. Re-running the process definition against the journal
//! returns recorded results instead of repeating side effects, so an
//! activation always continues from the first unrecorded stage.
//!
//! Records are keyed by `(scope, stage)`, where `scope` is the correlation
//! id of the (child) process that ran the stage.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{
    Aggregate, DomainEvent, Outcome, ProcessFailure, ProcessOutcome, ProcessRequest,
    ProcessResult, SnapshotCapable,
};
use event_store::{AppendOptions, EventEnvelope, EventStore, Snapshot, Version};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, watch};

use crate::aggregate::{PROCESS_AGGREGATE_TYPE, SagaInstance};
use crate::error::{Result, SagaError, StageResult};
use crate::events::SagaEvent;
use crate::scheduler::Scheduler;
use crate::state::ProcessStatus;

/// Metadata key carrying the scope that produced a record.
pub const CORRELATION_ID: &str = "correlation_id";

#[derive(Debug, Clone, Default)]
struct TimerRecord {
    fire_at: Option<DateTime<Utc>>,
    fired_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct JournalState {
    instance: SagaInstance,
    records: HashMap<(String, String), serde_json::Value>,
    timers: HashMap<String, TimerRecord>,
}

impl JournalState {
    fn index(&mut self, event: &SagaEvent) {
        match event {
            SagaEvent::StageCompleted(data) => {
                self.records
                    .insert((data.scope.clone(), data.stage.clone()), data.result.clone());
            }
            SagaEvent::TimerScheduled(data) => {
                self.timers.entry(data.scope.clone()).or_default().fire_at = Some(data.fire_at);
            }
            SagaEvent::TimerFired(data) => {
                self.timers.entry(data.scope.clone()).or_default().fired_at = Some(data.fired_at);
            }
            _ => {}
        }
    }
}

pub(crate) fn envelope(
    stream: &AggregateId,
    version: Version,
    event: &SagaEvent,
) -> Result<EventEnvelope> {
    let correlation_id = event.scope().unwrap_or(stream.as_str()).to_string();
    EventEnvelope::builder()
        .event_type(event.event_type())
        .aggregate_id(stream.clone())
        .aggregate_type(PROCESS_AGGREGATE_TYPE)
        .version(version)
        .payload(event)?
        .metadata(CORRELATION_ID, serde_json::Value::String(correlation_id))
        .try_build()
        .ok_or_else(|| SagaError::IncompleteEnvelope(stream.to_string()))
}

pub(crate) async fn save_snapshot(store: &dyn EventStore, instance: &SagaInstance) {
    let Some(id) = instance.id().cloned() else {
        return;
    };
    let snapshot = match Snapshot::from_state(
        id.clone(),
        SagaInstance::aggregate_type(),
        instance.version(),
        instance,
    ) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(instance_id = %id, error = %e, "snapshot could not be encoded");
            return;
        }
    };
    // The log stays authoritative; a stale snapshot only costs a longer tail.
    if let Err(e) = store.save_snapshot(snapshot).await {
        tracing::warn!(instance_id = %id, error = %e, "snapshot could not be saved");
    }
}

/// Replay journal of one process instance.
pub struct Journal {
    store: Arc<dyn EventStore>,
    stream: AggregateId,
    scheduler: Arc<dyn Scheduler>,
    shutdown: watch::Receiver<bool>,
    state: Mutex<JournalState>,
}

impl Journal {
    /// Loads the full stream of `instance_id` and indexes its records.
    pub async fn open(
        store: Arc<dyn EventStore>,
        instance_id: &str,
        scheduler: Arc<dyn Scheduler>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        let stream = AggregateId::new(instance_id);
        let envelopes = store.get_events_for_aggregate(&stream).await?;

        let mut state = JournalState::default();
        for envelope in envelopes {
            let event: SagaEvent = serde_json::from_value(envelope.payload)?;
            state.index(&event);
            state.instance.apply(event);
        }

        if state.instance.request().is_none() {
            return Err(SagaError::MissingStart(instance_id.to_string()));
        }

        tracing::debug!(
            instance_id,
            version = %state.instance.version(),
            records = state.records.len(),
            "journal opened"
        );

        Ok(Self {
            store,
            stream,
            scheduler,
            shutdown,
            state: Mutex::new(state),
        })
    }

    pub fn instance_id(&self) -> &AggregateId {
        &self.stream
    }

    pub fn scheduler(&self) -> &dyn Scheduler {
        self.scheduler.as_ref()
    }

    pub async fn instance(&self) -> SagaInstance {
        self.state.lock().await.instance.clone()
    }

    pub async fn status(&self) -> ProcessStatus {
        self.state.lock().await.instance.status()
    }

    pub async fn request(&self) -> Option<ProcessRequest> {
        self.state.lock().await.instance.request().cloned()
    }

    fn ensure_running(&self) -> Result<()> {
        if *self.shutdown.borrow() {
            return Err(SagaError::ShuttingDown);
        }
        Ok(())
    }

    /// Runs `work` once for `(scope, stage)`.
    ///
    /// A recorded result is returned without polling `work`. A record that
    /// no longer decodes as `ProcessResult<T>` degrades to an
    /// inconsistent-internal-state failure.
    pub async fn stage<T, Fut>(&self, scope: &str, stage: &str, work: Fut) -> StageResult<T>
    where
        T: Serialize + DeserializeOwned,
        Fut: Future<Output = StageResult<T>>,
    {
        let recorded = self
            .state
            .lock()
            .await
            .records
            .get(&(scope.to_string(), stage.to_string()))
            .cloned();

        if let Some(value) = recorded {
            return Ok(match serde_json::from_value::<ProcessResult<T>>(value) {
                Ok(result) => {
                    tracing::debug!(scope, stage, "stage replayed");
                    result
                }
                Err(e) => {
                    tracing::warn!(scope, stage, error = %e, "recorded stage result is unreadable");
                    Outcome::failure(ProcessFailure::inconsistent_internal_state(format!(
                        "Recorded result of stage '{stage}' in '{scope}' is unreadable"
                    )))
                }
            });
        }

        self.ensure_running()?;
        let result = work.await?;

        let value = serde_json::to_value(&result)?;
        self.record(SagaEvent::stage_completed(scope, stage, value))
            .await?;
        tracing::debug!(scope, stage, success = result.is_success(), "stage recorded");
        Ok(result)
    }

    /// Suspends the scope until `fire_at` and returns when the timer fired.
    ///
    /// A fired timer returns its recorded instant. A scheduled one re-arms
    /// for its recorded `fire_at`, ignoring the argument.
    pub async fn sleep_until(&self, scope: &str, fire_at: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let recorded = self.state.lock().await.timers.get(scope).cloned();

        let fire_at = match recorded {
            Some(TimerRecord {
                fired_at: Some(fired_at),
                ..
            }) => return Ok(fired_at),
            Some(TimerRecord {
                fire_at: Some(recorded),
                ..
            }) => recorded,
            _ => {
                self.ensure_running()?;
                self.record(SagaEvent::timer_scheduled(scope, fire_at))
                    .await?;
                fire_at
            }
        };

        tracing::debug!(scope, %fire_at, "timer armed");
        tokio::select! {
            _ = self.scheduler.suspend_until(fire_at) => {}
            _ = stopping(self.shutdown.clone()) => return Err(SagaError::ShuttingDown),
        }

        let fired_at = self.scheduler.now();
        self.record(SagaEvent::timer_fired(scope, fired_at)).await?;
        Ok(fired_at)
    }

    /// Records the terminal result and returns the resulting status.
    pub async fn finish(&self, result: ProcessResult<ProcessOutcome>) -> Result<ProcessStatus> {
        let event = match result {
            Outcome::Success(outcome) => SagaEvent::process_succeeded(outcome),
            Outcome::Failure(failure) => SagaEvent::process_failed(failure),
        };
        self.record(event).await?;
        Ok(self.status().await)
    }

    /// Appends `event` at the next version, then folds and snapshots it.
    async fn record(&self, event: SagaEvent) -> Result<()> {
        let mut state = self.state.lock().await;
        let current = state.instance.version();
        let envelope = envelope(&self.stream, current.next(), &event)?;

        self.store
            .append(vec![envelope], AppendOptions::expect_version(current))
            .await?;

        state.index(&event);
        state.instance.apply(event);
        if state.instance.should_snapshot() {
            save_snapshot(self.store.as_ref(), &state.instance).await;
        }
        Ok(())
    }
}

/// Resolves once shutdown is requested. Never resolves if the engine that
/// owns the sender is gone.
async fn stopping(mut shutdown: watch::Receiver<bool>) {
    let requested = shutdown.wait_for(|stopping| *stopping).await.is_ok();
    if !requested {
        std::future::pending::<()>().await;
    }
}
