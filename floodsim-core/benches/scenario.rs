use criterion::{
    BenchmarkGroup, Criterion, Throughput, black_box, criterion_group, criterion_main,
    measurement::WallTime,
};
use floodsim_core::{
    GameDdosScenario, SimTime,
    scheduler::Scheduler,
};
use std::time::Duration;

fn schedule(c: &mut Criterion) {
    const EVENTS: u64 = 10_000;

    let mut group = c.benchmark_group("scheduler");
    group.throughput(Throughput::Elements(EVENTS));

    group.bench_function("schedule and drain", |b| {
        b.iter(|| {
            let mut scheduler = Scheduler::new();
            // interleaved times so the heap actually reorders
            for i in 0..EVENTS {
                scheduler.schedule(Duration::from_micros((i * 7_919) % 1_000), i);
            }
            let mut count = 0u64;
            while let Some(event) = scheduler.pop_until(SimTime::MAX) {
                count += black_box(event) & 1;
            }
            count
        })
    });

    group.finish();
}

fn bench_flood(group: &mut BenchmarkGroup<'_, WallTime>, attackers: usize) {
    let scenario = GameDdosScenario {
        num_clients: 5,
        num_attackers: attackers,
        sim_time: SimTime::from_secs(6),
        ..GameDdosScenario::default()
    };

    // the number of events is dominated by the flood packets
    let sent = scenario
        .run()
        .map(|outcome| outcome.summary.packets_sent)
        .unwrap_or_default();
    group.throughput(Throughput::Elements(sent));

    group.bench_function(format!("{attackers} attackers"), |b| {
        b.iter(|| scenario.run().unwrap())
    });
}

fn flood(c: &mut Criterion) {
    let mut group = c.benchmark_group("game flood");
    group.sample_size(10);

    for attackers in [0, 1, 10] {
        bench_flood(&mut group, attackers);
    }

    group.finish();
}

criterion_group!(benches, schedule, flood);
criterion_main!(benches);
