//! Durable orchestration engine.
//!
//! Starts, drives, recovers and answers queries about process instances.
//! Each activation runs on its own tokio task and re-executes the process
//! definition against the instance's journal.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use common::AggregateId;
use domain::{Aggregate, ProcessRequest};
use event_store::{AppendOptions, EventEnvelope, EventQuery, EventStore, EventStoreExt, Version};
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::aggregate::{PROCESS_AGGREGATE_TYPE, SagaInstance, instance_id_for};
use crate::context::ProcessContext;
use crate::error::{Result, SagaError};
use crate::events::SagaEvent;
use crate::journal::{self, Journal};
use crate::process;
use crate::registry::ComposerRegistry;
use crate::scheduler::{Scheduler, SystemScheduler};
use crate::services::Services;
use crate::settings::EngineSettings;
use crate::state::ProcessStatus;

/// Answer to a start request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartReceipt {
    pub shipment_id: String,
    pub instance_id: String,
    /// True when an instance for this shipment already existed.
    pub already_started: bool,
}

struct Activation {
    handle: JoinHandle<()>,
    status: watch::Receiver<ProcessStatus>,
}

type Activations = Arc<Mutex<HashMap<String, Activation>>>;

/// What a spawned activation needs, detached from the engine.
struct Runner {
    store: Arc<dyn EventStore>,
    scheduler: Arc<dyn Scheduler>,
    services: Services,
    settings: Arc<EngineSettings>,
    registry: Arc<ComposerRegistry>,
    shutdown: watch::Receiver<bool>,
    activations: Activations,
}

/// Runs shipment processes over an event store.
pub struct ProcessEngine<S>
where
    S: EventStore + Clone + 'static,
{
    store: S,
    services: Services,
    scheduler: Arc<dyn Scheduler>,
    settings: Arc<EngineSettings>,
    registry: Arc<ComposerRegistry>,
    activations: Activations,
    shutdown: watch::Sender<bool>,
}

impl<S> ProcessEngine<S>
where
    S: EventStore + Clone + 'static,
{
    /// Creates an engine on the wall clock with default settings and
    /// composers.
    pub fn new(store: S, services: Services) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            store,
            services,
            scheduler: Arc::new(SystemScheduler),
            settings: Arc::new(EngineSettings::default()),
            registry: Arc::new(ComposerRegistry::with_defaults()),
            activations: Arc::new(Mutex::new(HashMap::new())),
            shutdown,
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    pub fn with_registry(mut self, registry: ComposerRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Starts the process for `request.id`.
    ///
    /// A second start for the same shipment does not overwrite anything:
    /// it resumes the existing instance if it is pending and not running.
    #[tracing::instrument(skip_all, fields(shipment_id = %request.id))]
    pub async fn start(&self, request: ProcessRequest) -> Result<StartReceipt> {
        if self.is_shutting_down() {
            return Err(SagaError::ShuttingDown);
        }

        let shipment_id = request.id.clone();
        let instance_id = instance_id_for(&shipment_id);
        let stream = AggregateId::new(instance_id.clone());

        let started = SagaEvent::process_started(instance_id.clone(), request);
        let envelope = journal::envelope(&stream, Version::first(), &started)?;

        let already_started = match self
            .store
            .append(vec![envelope], AppendOptions::expect_new())
            .await
        {
            Ok(_) => {
                let mut instance = SagaInstance::default();
                instance.apply(started);
                journal::save_snapshot(&self.store, &instance).await;

                metrics::counter!("shipment_process_started_total").increment(1);
                tracing::info!(%instance_id, "process started");
                false
            }
            Err(e) if e.is_conflict() => {
                tracing::info!(%instance_id, "process already started");
                true
            }
            Err(e) => return Err(e.into()),
        };

        self.activate(&instance_id).await?;

        Ok(StartReceipt {
            shipment_id,
            instance_id,
            already_started,
        })
    }

    /// Spawns an activation unless the instance is terminal or already
    /// running here. Returns whether one was spawned.
    async fn activate(&self, instance_id: &str) -> Result<bool> {
        let mut activations = self.activations.lock().await;
        if activations
            .get(instance_id)
            .is_some_and(|a| !a.handle.is_finished())
        {
            return Ok(false);
        }

        let stream = AggregateId::new(instance_id);
        match self.load(&stream).await? {
            Some(instance) if !instance.status().is_terminal() => {}
            _ => return Ok(false),
        }

        let runner = Runner {
            store: Arc::new(self.store.clone()),
            scheduler: self.scheduler.clone(),
            services: self.services.clone(),
            settings: self.settings.clone(),
            registry: self.registry.clone(),
            shutdown: self.shutdown.subscribe(),
            activations: self.activations.clone(),
        };
        let (status_tx, status_rx) = watch::channel(ProcessStatus::Pending);
        let span = tracing::info_span!("process", instance_id);
        let handle = tokio::spawn(drive(runner, instance_id.to_string(), status_tx).instrument(span));

        activations.insert(
            instance_id.to_string(),
            Activation {
                handle,
                status: status_rx,
            },
        );
        Ok(true)
    }

    /// Reads the committed state of a shipment's process.
    ///
    /// Served from the latest snapshot plus any later records; the instance
    /// does not need to be running. Unknown shipments yield `None`.
    pub async fn query(&self, shipment_id: &str) -> Result<Option<SagaInstance>> {
        self.load(&AggregateId::new(instance_id_for(shipment_id)))
            .await
    }

    async fn load(&self, stream: &AggregateId) -> Result<Option<SagaInstance>> {
        let (snapshot, events) = self.store.load_aggregate(stream).await?;

        let mut instance = match snapshot {
            Some(snapshot) => snapshot.into_state::<SagaInstance>()?,
            None => SagaInstance::default(),
        };
        for envelope in events {
            let event: SagaEvent = serde_json::from_value(envelope.payload)?;
            instance.apply(event);
        }

        Ok(instance.id().is_some().then_some(instance))
    }

    /// The raw journal of a shipment's process.
    pub async fn events(&self, shipment_id: &str) -> Result<Vec<EventEnvelope>> {
        let stream = AggregateId::new(instance_id_for(shipment_id));
        Ok(self.store.get_events_for_aggregate(&stream).await?)
    }

    /// Resumes every started instance that is not terminal.
    #[tracing::instrument(skip(self))]
    pub async fn recover(&self) -> Result<usize> {
        let started = self
            .store
            .query_events(
                EventQuery::new()
                    .aggregate_type(PROCESS_AGGREGATE_TYPE)
                    .event_type("ProcessStarted"),
            )
            .await?;

        let mut resumed = 0;
        for envelope in started {
            if self.activate(envelope.aggregate_id.as_str()).await? {
                resumed += 1;
            }
        }

        tracing::info!(resumed, "recovery finished");
        Ok(resumed)
    }

    /// Waits until the shipment's running activation ends and returns the
    /// committed state.
    ///
    /// Returns at once when nothing is running; an activation stopped by
    /// shutdown leaves the instance pending.
    pub async fn wait_for_completion(&self, shipment_id: &str) -> Result<SagaInstance> {
        let instance_id = instance_id_for(shipment_id);
        let status = self
            .activations
            .lock()
            .await
            .get(&instance_id)
            .map(|a| a.status.clone());

        if let Some(mut status) = status {
            let _ = status.wait_for(ProcessStatus::is_terminal).await;
        }

        self.query(shipment_id)
            .await?
            .ok_or_else(|| SagaError::InstanceNotFound(shipment_id.to_string()))
    }

    /// Stops all activations at their next stage boundary or timer, then
    /// waits for their tasks.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);

        let handles: Vec<_> = self
            .activations
            .lock()
            .await
            .drain()
            .map(|(_, a)| a.handle)
            .collect();

        tracing::info!(activations = handles.len(), "engine shutting down");
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "process task ended abnormally");
            }
        }
    }
}

async fn drive(runner: Runner, instance_id: String, status: watch::Sender<ProcessStatus>) {
    let Runner {
        store,
        scheduler,
        services,
        settings,
        registry,
        shutdown,
        activations,
    } = runner;

    match Journal::open(store, &instance_id, scheduler, shutdown).await {
        Ok(journal) => {
            let context = ProcessContext::new(journal, services, settings, registry);
            if let Some(final_status) = run_activation(&context).await {
                status.send_replace(final_status);
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "journal could not be opened; instance stays pending");
        }
    }

    let mut activations = activations.lock().await;
    if activations
        .get(&instance_id)
        .is_some_and(|a| a.status.same_channel(&status.subscribe()))
    {
        activations.remove(&instance_id);
    }
}

/// Runs the process definition once. Returns the terminal status if one
/// was reached.
async fn run_activation(context: &ProcessContext) -> Option<ProcessStatus> {
    let journal = context.journal();
    let instance = journal.instance().await;
    if instance.status().is_terminal() {
        return Some(instance.status());
    }
    let request = instance.request()?.clone();

    tracing::debug!(
        replayable = instance.completed_stages().len(),
        "activation started"
    );

    let result = match process::run(context, &request).await {
        Ok(result) => result,
        Err(SagaError::ShuttingDown) => {
            tracing::info!("activation suspended by shutdown");
            return None;
        }
        Err(e) => {
            tracing::error!(error = %e, "activation interrupted; instance stays pending");
            return None;
        }
    };

    match journal.finish(result).await {
        Ok(final_status) => {
            match final_status {
                ProcessStatus::Succeeded => {
                    metrics::counter!("shipment_process_succeeded_total").increment(1)
                }
                ProcessStatus::Failed => {
                    metrics::counter!("shipment_process_failed_total").increment(1)
                }
                ProcessStatus::Pending => {}
            }
            if let Some(started_at) = instance.started_at() {
                let elapsed = (Utc::now() - started_at).num_milliseconds().max(0) as f64 / 1000.0;
                metrics::histogram!("shipment_process_duration_seconds").record(elapsed);
            }
            tracing::info!(status = %final_status, "process finished");
            Some(final_status)
        }
        Err(e) => {
            tracing::error!(error = %e, "final result could not be recorded; instance stays pending");
            None
        }
    }
}
