use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use happyfactory_core::ProductId;
use happyfactory_events::{Subscriber, SubscriberError};
use happyfactory_infra::command_handler::CommandHandler;
use happyfactory_infra::config::ProjectionConfig;
use happyfactory_infra::event::DomainEvent;
use happyfactory_infra::event_store::{EventStore, InMemoryEventStore};
use happyfactory_infra::projections::ProjectionEngine;
use happyfactory_infra::read_model::InMemoryReadModel;
use happyfactory_inventory::InventoryReserved;
use happyfactory_products::ProductCreated;
use std::sync::Arc;

fn created(id: ProductId, i: usize) -> DomainEvent {
    ProductCreated::new(id, format!("Item {i}"), format!("SKU-{i}"), None)
        .unwrap()
        .into()
}

fn bench_command_execution_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("command_execution_latency");
    group.sample_size(1000);

    group.bench_function("create_product", |b| {
        let handler = CommandHandler::new(InMemoryEventStore::<DomainEvent>::new());
        b.iter(|| black_box(handler.create_product("Widget", "W-1").unwrap()));
    });

    group.finish();
}

fn bench_event_append_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_append_throughput");

    for batch_size in [1, 10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(BenchmarkId::new("batch_append", batch_size), batch_size, |b, &size| {
            let store = InMemoryEventStore::<DomainEvent>::new();
            let id = ProductId::new();

            b.iter(|| {
                let events: Vec<DomainEvent> = (0..size)
                    .map(|i| InventoryReserved::new(id, (i as u32) + 1, None).unwrap().into())
                    .collect();
                black_box(store.append_batch(events).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_subscriber_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("subscriber_fan_out");

    for subscribers in [1, 8, 64].iter() {
        group.bench_with_input(BenchmarkId::new("append_one", subscribers), subscribers, |b, &count| {
            let store = InMemoryEventStore::<DomainEvent>::new();
            for _ in 0..count {
                let sub: Arc<dyn Subscriber<DomainEvent>> =
                    Arc::new(|ev: &DomainEvent| -> Result<(), SubscriberError> {
                        black_box(ev);
                        Ok(())
                    });
                store.subscribe(sub).unwrap();
            }
            let event = created(ProductId::new(), 0);

            b.iter(|| black_box(store.append(event.clone()).unwrap()));
        });
    }

    group.finish();
}

fn bench_projection_rebuild_speed(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection_rebuild_speed");
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

    for event_count in [10, 100, 1000, 10000].iter() {
        group.bench_with_input(
            BenchmarkId::new("rebuild_from_events", event_count),
            event_count,
            |b, &count| {
                let store = Arc::new(InMemoryEventStore::<DomainEvent>::new());

                // Half creations, half reservations against them
                let ids: Vec<ProductId> = (0..count / 2).map(|_| ProductId::new()).collect();
                let mut events: Vec<DomainEvent> = ids.iter().enumerate().map(|(i, id)| created(*id, i)).collect();
                events.extend(
                    ids.iter()
                        .map(|id| DomainEvent::from(InventoryReserved::new(*id, 1, None).unwrap())),
                );
                store.append_batch(events).unwrap();

                let engine = ProjectionEngine::new(
                    Arc::clone(&store),
                    InMemoryReadModel::new(),
                    runtime.handle().clone(),
                    ProjectionConfig::default(),
                );

                b.iter(|| black_box(engine.rebuild().unwrap()));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_command_execution_latency,
    bench_event_append_throughput,
    bench_subscriber_fan_out,
    bench_projection_rebuild_speed
);
criterion_main!(benches);
