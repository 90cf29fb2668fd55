use criterion::{Criterion, criterion_group, criterion_main};
use event_store::{
    AggregateId, AppendOptions, EventEnvelope, EventQuery, EventStore, EventStoreExt,
    InMemoryEventStore, Snapshot, Version,
};

fn stage_record(stream: &str, version: i64) -> EventEnvelope {
    EventEnvelope::builder()
        .aggregate_id(stream)
        .aggregate_type("ShipmentProcess")
        .event_type("StageCompleted")
        .version(Version::new(version))
        .payload_raw(serde_json::json!({
            "type": "StageCompleted",
            "data": {
                "correlation_id": format!("{stream}_manifestation"),
                "stage": format!("stage-{version}"),
                "result": {"case": "Success", "success": {"legs": []}}
            }
        }))
        .build()
}

fn bench_journal_append(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("event_store/journal_append_20", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryEventStore::new();
                for v in 1..=20 {
                    store
                        .append_event(
                            stage_record("1_process", v),
                            AppendOptions::expect_version(Version::new(v - 1)),
                        )
                        .await
                        .unwrap();
                }
            });
        });
    });
}

fn bench_replay_history(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let id = AggregateId::new("2_process");

    rt.block_on(async {
        let events: Vec<EventEnvelope> = (1..=100).map(|v| stage_record("2_process", v)).collect();
        store.append(events, AppendOptions::new()).await.unwrap();
    });

    c.bench_function("event_store/replay_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.get_events_for_aggregate(&id).await.unwrap();
            });
        });
    });
}

fn bench_load_with_snapshot(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let id = AggregateId::new("3_process");

    rt.block_on(async {
        let events: Vec<EventEnvelope> = (1..=100).map(|v| stage_record("3_process", v)).collect();
        store.append(events, AppendOptions::new()).await.unwrap();
        let snapshot = Snapshot::from_state(
            id.clone(),
            "ShipmentProcess",
            Version::new(95),
            &serde_json::json!({"status": "Pending"}),
        )
        .unwrap();
        store.save_snapshot(snapshot).await.unwrap();
    });

    c.bench_function("event_store/load_after_snapshot", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.load_aggregate(&id).await.unwrap();
            });
        });
    });
}

fn bench_recovery_scan(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();

    rt.block_on(async {
        for n in 0..50 {
            let stream = format!("{n}_process");
            let events: Vec<EventEnvelope> = (1..=20).map(|v| stage_record(&stream, v)).collect();
            store.append(events, AppendOptions::new()).await.unwrap();
        }
    });

    c.bench_function("event_store/recovery_scan_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .query_events(
                        EventQuery::new()
                            .aggregate_type("ShipmentProcess")
                            .to_version(Version::first()),
                    )
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_journal_append,
    bench_replay_history,
    bench_load_with_snapshot,
    bench_recovery_scan,
);
criterion_main!(benches);
