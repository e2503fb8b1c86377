use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use jobwatch_core::JobPayload;
use jobwatch_infra::store::{HistoryFilter, JobHistoryStore, PageRequest};
use jobwatch_infra::{HistoryRecorder, InMemoryHistoryStore, TrackingFilter};
use serde_json::json;

fn bench_tracking_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracking_filter");

    let skip: Vec<String> = (0..50).map(|i| format!("App\\Jobs\\Skipped{i}")).collect();
    let queues: Vec<String> = (0..10).map(|i| format!("queue-{i}")).collect();
    let filter = TrackingFilter::new(skip, queues);

    group.bench_function("tracked", |b| {
        b.iter(|| filter.should_track(black_box("App\\Jobs\\Export"), black_box("queue-9")))
    });
    group.bench_function("skipped", |b| {
        b.iter(|| filter.should_track(black_box("App\\Jobs\\Skipped49"), black_box("queue-0")))
    });
    group.finish();
}

fn bench_recorder_lifecycle(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let payload = JobPayload::new("App\\Jobs\\Export", json!({"report_id": 42})).to_value();

    let mut group = c.benchmark_group("recorder_lifecycle");
    group.throughput(Throughput::Elements(1));

    group.bench_function("start_and_complete", |b| {
        let store = InMemoryHistoryStore::arc();
        let recorder = HistoryRecorder::new(store, TrackingFilter::default());
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            let job_id = n.to_string();
            rt.block_on(async {
                recorder
                    .on_processing_started(
                        Some(job_id.clone()),
                        "App\\Jobs\\Export",
                        "default",
                        Some(1),
                        Some(payload.clone()),
                    )
                    .await;
                recorder.on_processed(Some(&job_id)).await;
            })
        })
    });
    group.finish();
}

fn bench_list_filtered(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let mut group = c.benchmark_group("list_filtered");

    for rows in [100usize, 1_000, 10_000].iter() {
        let store = InMemoryHistoryStore::arc();
        let recorder = HistoryRecorder::new(store.clone(), TrackingFilter::default());
        rt.block_on(async {
            for i in 0..*rows {
                let id = i.to_string();
                recorder
                    .on_processing_started(Some(id.clone()), "App\\Jobs\\Export", "default", None, None)
                    .await;
                if i % 4 == 0 {
                    recorder.on_failed(Some(&id), "timeout").await;
                }
            }
        });

        let filter = HistoryFilter {
            search: Some("timeout".into()),
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(rows), rows, |b, _| {
            b.iter(|| {
                rt.block_on(store.list(black_box(&filter), PageRequest::new(None, None, 25)))
                    .expect("list")
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_tracking_filter,
    bench_recorder_lifecycle,
    bench_list_filtered
);
criterion_main!(benches);
