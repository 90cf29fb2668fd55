//! End-to-end tests for the shipment process engine.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use domain::{FaultKind, Leg, ProcessRequest};
use event_store::{AppendOptions, EventEnvelope, EventStore, InMemoryEventStore};
use saga::{
    CORRELATION_ID, ComposerRegistry, EngineSettings, InMemoryCarrierService,
    InMemoryCollectionService, InMemoryDocumentService, ManualScheduler, ProcessEngine,
    ProcessStatus, RetryPolicy, SagaInstance, Services, ShipmentComposer,
};

fn clock() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-10-18T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn collection_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

fn domestic(id: &str) -> ProcessRequest {
    ProcessRequest::new(
        id,
        vec![Leg::new(
            "c62bee763e7a4ce387dda5eb11678815",
            "GB-sender1",
            "GB-receiver1",
            "GB-collection1",
        )],
        collection_date(),
        "Europe/London",
    )
}

fn two_legs(id: &str) -> ProcessRequest {
    ProcessRequest::new(
        id,
        vec![
            Leg::new(
                "9d6d28f2fbee4e53aeac2c3b3ba98d28",
                "DE-sender1",
                "DE-receiver1",
                "DE-collection1",
            ),
            Leg::new(
                "c62bee763e7a4ce387dda5eb11678815",
                "DE-sender2",
                "GB-receiver2",
                "DE-collection2",
            ),
        ],
        collection_date(),
        "Europe/Berlin",
    )
}

fn settings() -> EngineSettings {
    EngineSettings::default()
        .with_retry(RetryPolicy::new(3).with_initial_delay(StdDuration::from_millis(1)))
}

struct Harness {
    store: InMemoryEventStore,
    scheduler: ManualScheduler,
    carrier: InMemoryCarrierService,
    documents: InMemoryDocumentService,
    collection: InMemoryCollectionService,
    engine: ProcessEngine<InMemoryEventStore>,
}

impl Harness {
    fn new() -> Self {
        Self::with(
            InMemoryEventStore::new(),
            ManualScheduler::new(clock()),
            settings(),
            ComposerRegistry::with_defaults(),
        )
    }

    /// A fresh engine and fresh stubs over an existing store and clock.
    fn with(
        store: InMemoryEventStore,
        scheduler: ManualScheduler,
        settings: EngineSettings,
        registry: ComposerRegistry,
    ) -> Self {
        Self::with_collection(
            store,
            scheduler,
            settings,
            registry,
            InMemoryCollectionService::new(),
        )
    }

    fn with_collection(
        store: InMemoryEventStore,
        scheduler: ManualScheduler,
        settings: EngineSettings,
        registry: ComposerRegistry,
        collection: InMemoryCollectionService,
    ) -> Self {
        let carrier = InMemoryCarrierService::new();
        let documents = InMemoryDocumentService::new();

        let services = Services::new(
            Arc::new(carrier.clone()),
            Arc::new(documents.clone()),
            Arc::new(collection.clone()),
        );
        let engine = ProcessEngine::new(store.clone(), services)
            .with_scheduler(Arc::new(scheduler.clone()))
            .with_settings(settings)
            .with_registry(registry);

        Self {
            store,
            scheduler,
            carrier,
            documents,
            collection,
            engine,
        }
    }

    fn restarted(&self) -> Self {
        Self::with(
            self.store.clone(),
            self.scheduler.clone(),
            settings(),
            ComposerRegistry::with_defaults(),
        )
    }

    /// Starts `request`, lets the booking timer fire and waits for the end.
    async fn complete(&self, request: ProcessRequest) -> SagaInstance {
        let id = request.id.clone();
        self.engine.start(request).await.unwrap();
        self.scheduler.wait_for_parked(1).await;
        self.scheduler.advance_by(Duration::seconds(5));
        self.engine.wait_for_completion(&id).await.unwrap()
    }

    /// Starts `request` and waits for it to fail before any timer.
    async fn fail(&self, request: ProcessRequest) -> SagaInstance {
        let id = request.id.clone();
        self.engine.start(request).await.unwrap();
        self.engine.wait_for_completion(&id).await.unwrap()
    }
}

fn stage_of(envelope: &EventEnvelope) -> String {
    let correlation = envelope.metadata_str("correlation_id").unwrap_or_default();
    match envelope.payload["data"]["stage"].as_str() {
        Some(stage) => format!("{} {}/{}", envelope.event_type, correlation, stage),
        None => format!("{} {}", envelope.event_type, correlation),
    }
}

#[tokio::test]
async fn domestic_shipment_succeeds() {
    let h = Harness::new();

    let instance = h.complete(domestic("1000")).await;

    assert_eq!(instance.status(), ProcessStatus::Succeeded);
    let outcome = instance.outcome().unwrap();
    assert_eq!(outcome.id, "1000");
    assert_eq!(outcome.manifested_legs.len(), 1);
    assert_eq!(outcome.manifested_legs[0].tracking_numbers.len(), 2);
    assert_eq!(
        outcome.manifested_legs[0].labels_url,
        "http://somewhere.net/shipment-documents/1000_c62bee763e7a4ce387dda5eb11678815"
    );
    assert_eq!(
        outcome.documents.labels_url,
        "http://somewhere.net/shipment-documents/1000_labels"
    );
    assert_eq!(outcome.documents.invoice_url, None);
    assert_eq!(
        outcome.collection_booking.carrier_id,
        "c62bee763e7a4ce387dda5eb11678815"
    );
    assert!(instance.failure().is_none());

    assert_eq!(h.carrier.manifest_calls(), 1);
    assert_eq!(h.carrier.booking_calls(), 1);
    assert_eq!(h.documents.calls(), 3);
    assert_eq!(h.collection.calls(), 2);
}

#[tokio::test]
async fn journal_records_stages_in_order() {
    let h = Harness::new();
    h.complete(domestic("1000")).await;

    let events = h.engine.events("1000").await.unwrap();
    let stages: Vec<String> = events.iter().map(stage_of).collect();

    assert_eq!(
        stages,
        vec![
            "ProcessStarted 1000_process",
            "StageCompleted 1000_process/validation",
            "StageCompleted 1000_process/classification",
            "StageCompleted 1000_manifestation_leg1/manifest-leg",
            "StageCompleted 1000_manifestation/completed",
            "StageCompleted 1000_documents/generate-labels",
            "StageCompleted 1000_documents/generate-receipt",
            "StageCompleted 1000_documents/generate-combined-document",
            "StageCompleted 1000_documents/completed",
            "StageCompleted 1000_collection/check-eligibility",
            "StageCompleted 1000_collection/schedule",
            "TimerScheduled 1000_collection",
            "TimerFired 1000_collection",
            "StageCompleted 1000_collection_booking/book-collection",
            "StageCompleted 1000_collection/completed",
            "ProcessSucceeded 1000_process",
        ]
    );
    assert!(
        events
            .windows(2)
            .all(|pair| pair[1].version == pair[0].version.next())
    );
}

#[tokio::test]
async fn international_shipment_includes_customs_invoice() {
    let h = Harness::new();

    let instance = h.complete(two_legs("3000")).await;

    assert_eq!(instance.status(), ProcessStatus::Succeeded);
    let outcome = instance.outcome().unwrap();
    assert_eq!(
        outcome.documents.invoice_url.as_deref(),
        Some("http://somewhere.net/shipment-documents/3000_invoice")
    );
    let carriers: Vec<_> = outcome
        .manifested_legs
        .iter()
        .map(|leg| leg.carrier_id.as_str())
        .collect();
    assert_eq!(
        carriers,
        vec![
            "9d6d28f2fbee4e53aeac2c3b3ba98d28",
            "c62bee763e7a4ce387dda5eb11678815"
        ]
    );
    assert_eq!(
        outcome.collection_booking.carrier_id,
        "9d6d28f2fbee4e53aeac2c3b3ba98d28"
    );
    assert_eq!(h.carrier.manifest_calls(), 2);
    assert_eq!(h.documents.calls(), 4);
}

#[tokio::test]
async fn paperless_trade_invoice_comes_from_child_process() {
    let h = Harness::new();

    let instance = h.complete(two_legs("2000")).await;

    assert_eq!(instance.status(), ProcessStatus::Succeeded);
    assert_eq!(
        instance.outcome().unwrap().documents.invoice_url.as_deref(),
        Some("http://somewhere.net/shipment-documents/2000_pt_invoice")
    );

    let events = h.engine.events("2000").await.unwrap();
    assert!(events.iter().any(|e| {
        e.metadata_str("correlation_id") == Some("2000_documents_paperless_trade")
    }));
}

#[tokio::test]
async fn invalid_request_fails_without_side_effects() {
    let h = Harness::new();
    let mut request = domestic("  ");
    request.legs.clear();

    let instance = h.fail(request).await;

    assert_eq!(instance.status(), ProcessStatus::Failed);
    let failure = instance.failure().unwrap();
    assert_eq!(failure.faults.len(), 1);
    assert_eq!(failure.faults[0].kind, FaultKind::Validation);
    assert_eq!(failure.faults[0].description, "Invalid request");
    assert_eq!(
        failure.faults[0].errors,
        vec![
            "ShipmentId must be specified".to_string(),
            "Shipment must have 1 or 2 legs".to_string()
        ]
    );

    assert_eq!(h.carrier.manifest_calls(), 0);
    assert_eq!(h.documents.calls(), 0);
    assert_eq!(h.collection.calls(), 0);
}

#[tokio::test]
async fn too_many_legs_is_invalid() {
    let h = Harness::new();
    let mut request = two_legs("3000");
    request.legs.push(request.legs[0].clone());

    let instance = h.fail(request).await;

    assert_eq!(
        instance.failure().unwrap().faults[0].errors,
        vec!["Shipment must have 1 or 2 legs".to_string()]
    );
    assert_eq!(h.carrier.manifest_calls(), 0);
}

#[tokio::test]
async fn manifest_failure_stops_later_stages() {
    let h = Harness::new();

    let instance = h.fail(two_legs("3001")).await;

    assert_eq!(instance.status(), ProcessStatus::Failed);
    let failure = instance.failure().unwrap();
    assert_eq!(failure.faults.len(), 1);
    assert_eq!(failure.description(), Some("Carrier manifestation failed"));
    assert_eq!(
        failure.faults[0].errors,
        vec![
            "1.2.3: Address line 1 missing".to_string(),
            "1.2.5: Postal code missing".to_string()
        ]
    );

    assert_eq!(h.documents.calls(), 0);
    assert_eq!(h.collection.calls(), 0);
    assert_eq!(h.carrier.booking_calls(), 0);
}

#[tokio::test]
async fn booking_failure_after_timer() {
    let h = Harness::new();

    let instance = h.complete(two_legs("3002")).await;

    assert_eq!(instance.status(), ProcessStatus::Failed);
    let failure = instance.failure().unwrap();
    assert_eq!(failure.faults.len(), 1);
    assert_eq!(failure.description(), Some("Carrier collection booking failed"));
    assert_eq!(h.documents.calls(), 4);
    assert_eq!(h.carrier.booking_calls(), 1);
}

#[tokio::test]
async fn ineligible_collection_fails_before_scheduling() {
    let h = Harness::new();
    h.collection.set_ineligible(true);

    let instance = h.fail(domestic("1000")).await;

    let failure = instance.failure().unwrap();
    assert_eq!(failure.faults[0].kind, FaultKind::Validation);
    assert_eq!(
        failure.description(),
        Some("Shipment cannot be scheduled for collection booking")
    );
    assert_eq!(h.collection.calls(), 1);
    assert_eq!(h.carrier.booking_calls(), 0);
    assert_eq!(h.scheduler.parked(), 0);
}

#[tokio::test]
async fn second_start_is_idempotent() {
    let h = Harness::new();

    let first = h.engine.start(domestic("1000")).await.unwrap();
    let second = h.engine.start(domestic("1000")).await.unwrap();

    assert!(!first.already_started);
    assert!(second.already_started);
    assert_eq!(first.instance_id, "1000_process");
    assert_eq!(second.instance_id, first.instance_id);

    h.scheduler.wait_for_parked(1).await;
    h.scheduler.advance_by(Duration::seconds(5));
    let instance = h.engine.wait_for_completion("1000").await.unwrap();
    assert_eq!(instance.status(), ProcessStatus::Succeeded);

    let third = h.engine.start(domestic("1000")).await.unwrap();
    assert!(third.already_started);

    let events = h.engine.events("1000").await.unwrap();
    assert_eq!(
        events
            .iter()
            .filter(|e| e.event_type == "ProcessStarted")
            .count(),
        1
    );
    assert_eq!(h.carrier.manifest_calls(), 1);
    assert_eq!(h.carrier.booking_calls(), 1);
}

#[tokio::test]
async fn query_reports_pending_until_finished() {
    let h = Harness::new();
    assert!(h.engine.query("1000").await.unwrap().is_none());

    h.engine.start(domestic("1000")).await.unwrap();
    h.scheduler.wait_for_parked(1).await;

    let pending = h.engine.query("1000").await.unwrap().unwrap();
    assert_eq!(pending.status(), ProcessStatus::Pending);
    assert!(pending.outcome().is_none());
    assert!(pending.failure().is_none());
    assert_eq!(pending.pending_timers().len(), 1);

    h.scheduler.advance_by(Duration::seconds(5));
    h.engine.wait_for_completion("1000").await.unwrap();

    let first = h.engine.query("1000").await.unwrap().unwrap();
    let second = h.engine.query("1000").await.unwrap().unwrap();
    assert_eq!(first.status(), ProcessStatus::Succeeded);
    assert_eq!(first.outcome(), second.outcome());
}

#[tokio::test]
async fn restart_resumes_from_first_unfinished_stage() {
    let h = Harness::new();
    h.engine.start(two_legs("3000")).await.unwrap();
    h.scheduler.wait_for_parked(1).await;
    h.engine.shutdown().await;

    let stopped = h.engine.query("3000").await.unwrap().unwrap();
    assert_eq!(stopped.status(), ProcessStatus::Pending);
    assert_eq!(h.carrier.manifest_calls(), 2);
    assert_eq!(h.carrier.booking_calls(), 0);

    let restarted = h.restarted();
    assert_eq!(restarted.engine.recover().await.unwrap(), 1);
    restarted.scheduler.wait_for_parked(1).await;
    restarted.scheduler.advance_by(Duration::seconds(5));
    let instance = restarted.engine.wait_for_completion("3000").await.unwrap();

    assert_eq!(instance.status(), ProcessStatus::Succeeded);
    assert_eq!(instance.outcome().unwrap().manifested_legs.len(), 2);
    assert_eq!(restarted.carrier.manifest_calls(), 0);
    assert_eq!(restarted.documents.calls(), 0);
    assert_eq!(restarted.collection.calls(), 0);
    assert_eq!(restarted.carrier.booking_calls(), 1);
}

#[tokio::test]
async fn restart_between_documents_and_collection() {
    let h = Harness::new();
    h.complete(two_legs("3000")).await;

    // Journal as it stood once documents committed and before collection
    // planning began.
    let until_documents: Vec<EventEnvelope> = h
        .engine
        .events("3000")
        .await
        .unwrap()
        .into_iter()
        .take_while(|e| {
            !e.metadata_str(CORRELATION_ID)
                .is_some_and(|scope| scope.starts_with("3000_collection"))
        })
        .collect();
    assert_eq!(
        until_documents.last().unwrap().metadata_str(CORRELATION_ID),
        Some("3000_documents")
    );

    let store = InMemoryEventStore::new();
    store
        .append(until_documents, AppendOptions::expect_new())
        .await
        .unwrap();

    let restarted = Harness::with(
        store,
        ManualScheduler::new(clock()),
        settings(),
        ComposerRegistry::with_defaults(),
    );
    assert_eq!(restarted.engine.recover().await.unwrap(), 1);
    restarted.scheduler.wait_for_parked(1).await;
    restarted.scheduler.advance_by(Duration::seconds(5));
    let instance = restarted.engine.wait_for_completion("3000").await.unwrap();

    assert_eq!(instance.status(), ProcessStatus::Succeeded);
    assert_eq!(instance.outcome().unwrap().manifested_legs.len(), 2);
    assert_eq!(restarted.carrier.manifest_calls(), 0);
    assert_eq!(restarted.documents.calls(), 0);
    assert_eq!(restarted.collection.calls(), 2);
    assert_eq!(restarted.carrier.booking_calls(), 1);
}

#[tokio::test]
async fn due_schedule_books_without_timer() {
    let h = Harness::with_collection(
        InMemoryEventStore::new(),
        ManualScheduler::new(clock()),
        settings(),
        ComposerRegistry::with_defaults(),
        InMemoryCollectionService::with_booking_delay(Duration::zero()),
    );

    h.engine.start(domestic("1000")).await.unwrap();
    let instance = h.engine.wait_for_completion("1000").await.unwrap();

    assert_eq!(instance.status(), ProcessStatus::Succeeded);
    assert_eq!(h.carrier.booking_calls(), 1);
    assert_eq!(h.scheduler.parked(), 0);
    let events = h.engine.events("1000").await.unwrap();
    assert!(
        events
            .iter()
            .all(|e| e.event_type != "TimerScheduled" && e.event_type != "TimerFired")
    );
}

#[tokio::test]
async fn recovery_skips_finished_instances() {
    let h = Harness::new();
    h.complete(domestic("1000")).await;
    h.fail(two_legs("3001")).await;

    let restarted = h.restarted();
    assert_eq!(restarted.engine.recover().await.unwrap(), 0);
    assert_eq!(restarted.carrier.manifest_calls(), 0);
}

#[tokio::test]
async fn late_timer_misses_booking_window() {
    let h = Harness::new();
    h.engine.start(domestic("1000")).await.unwrap();
    h.scheduler.wait_for_parked(1).await;
    h.scheduler.advance_by(Duration::hours(2));

    let instance = h.engine.wait_for_completion("1000").await.unwrap();

    assert_eq!(instance.status(), ProcessStatus::Failed);
    assert_eq!(
        instance.failure().unwrap().description(),
        Some("Collection booking window missed")
    );
    assert_eq!(h.carrier.booking_calls(), 0);
}

#[tokio::test]
async fn transient_outage_is_retried() {
    let h = Harness::new();
    h.carrier.fail_next(2);

    let instance = h.complete(domestic("1000")).await;

    assert_eq!(instance.status(), ProcessStatus::Succeeded);
    assert_eq!(h.carrier.manifest_calls(), 3);
}

#[tokio::test]
async fn exhausted_retries_name_the_step() {
    let h = Harness::new();
    h.documents.fail_next(10);

    let instance = h.fail(domestic("1000")).await;

    let failure = instance.failure().unwrap();
    assert_eq!(failure.faults.len(), 1);
    let description = &failure.faults[0].description;
    assert!(description.contains("generate-labels"));
    assert!(!description.contains("unreachable"));
    assert_eq!(h.documents.calls(), 3);
}

#[tokio::test]
async fn unregistered_category_is_inconsistent_state() {
    let mut registry = ComposerRegistry::empty();
    registry.register(Arc::new(ShipmentComposer::domestic()));
    let h = Harness::with(
        InMemoryEventStore::new(),
        ManualScheduler::new(clock()),
        settings(),
        registry,
    );

    let instance = h.fail(two_legs("3000")).await;

    let failure = instance.failure().unwrap();
    assert_eq!(failure.faults[0].kind, FaultKind::InconsistentInternalState);
    assert_eq!(
        failure.description(),
        Some("No implementation found for process category 'international'")
    );
    assert_eq!(h.carrier.manifest_calls(), 0);
}

#[tokio::test]
async fn instances_run_concurrently() {
    let h = Harness::new();
    for id in ["1000", "2000", "3000"] {
        let request = if id == "1000" { domestic(id) } else { two_legs(id) };
        h.engine.start(request).await.unwrap();
    }

    h.scheduler.wait_for_parked(3).await;
    h.scheduler.advance_by(Duration::seconds(5));

    for id in ["1000", "2000", "3000"] {
        let instance = h.engine.wait_for_completion(id).await.unwrap();
        assert_eq!(instance.status(), ProcessStatus::Succeeded, "shipment {id}");
    }
    assert_eq!(h.carrier.booking_calls(), 3);
}
