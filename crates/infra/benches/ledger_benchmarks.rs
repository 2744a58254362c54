use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::Utc;
use storeledger_catalog::{ProductId, StoreId};
use storeledger_core::AggregateId;
use storeledger_infra::ledger::{InMemoryStockLedger, MovementFilter, StockLedger};
use storeledger_inventory::{AdjustStock, StockKey, TransferStock};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("tokio runtime")
}

fn key() -> StockKey {
    StockKey::new(
        ProductId::new(AggregateId::new()),
        StoreId::new(AggregateId::new()),
    )
}

fn bench_adjust_latency(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("adjust_latency");
    group.sample_size(1000);

    group.bench_function("inbound_existing_entry", |b| {
        let ledger = InMemoryStockLedger::new();
        let k = key();
        b.iter(|| {
            rt.block_on(ledger.adjust(AdjustStock::inbound(k, black_box(1), Utc::now())))
                .unwrap()
        });
    });

    group.bench_function("in_then_out", |b| {
        let ledger = InMemoryStockLedger::new();
        let k = key();
        b.iter(|| {
            rt.block_on(async {
                ledger.adjust(AdjustStock::inbound(k, 2, Utc::now())).await.unwrap();
                ledger.adjust(AdjustStock::outbound(k, 2, Utc::now())).await.unwrap()
            })
        });
    });

    group.bench_function("rejected_outbound", |b| {
        let ledger = InMemoryStockLedger::new();
        let k = key();
        b.iter(|| {
            let res = rt.block_on(ledger.adjust(AdjustStock::outbound(k, black_box(1), Utc::now())));
            assert!(res.is_err());
        });
    });

    group.finish();
}

fn bench_transfer(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("transfer");
    group.throughput(Throughput::Elements(1));

    group.bench_function("ping_pong", |b| {
        let ledger = InMemoryStockLedger::new();
        let product = ProductId::new(AggregateId::new());
        let (a, z) = (StoreId::new(AggregateId::new()), StoreId::new(AggregateId::new()));
        rt.block_on(ledger.adjust(AdjustStock::inbound(StockKey::new(product, a), 1, Utc::now())))
            .unwrap();
        let mut forward = true;
        b.iter(|| {
            let (from_store, to_store) = if forward { (a, z) } else { (z, a) };
            forward = !forward;
            rt.block_on(ledger.transfer(TransferStock {
                product_id: product,
                from_store,
                to_store,
                amount: 1,
                occurred_at: Utc::now(),
            }))
            .unwrap()
        });
    });

    group.finish();
}

fn bench_movement_queries(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("movement_queries");

    for history in [100u64, 1_000, 10_000].iter() {
        let ledger = InMemoryStockLedger::new();
        let keys: Vec<StockKey> = (0..10).map(|_| key()).collect();
        rt.block_on(async {
            for i in 0..*history {
                let k = keys[(i % 10) as usize];
                ledger.adjust(AdjustStock::inbound(k, 1, Utc::now())).await.unwrap();
            }
        });
        let filter = MovementFilter {
            store_id: Some(keys[0].store_id),
            limit: Some(50),
            ..MovementFilter::default()
        };

        group.throughput(Throughput::Elements(*history));
        group.bench_with_input(BenchmarkId::new("filter_by_store", history), history, |b, _| {
            b.iter(|| rt.block_on(ledger.movements(black_box(&filter))).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_adjust_latency, bench_transfer, bench_movement_queries);
criterion_main!(benches);
