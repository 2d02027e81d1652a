//! Engine dispatch hot path: a full normal set scanned per event, for both
//! the all-miss and all-fire cases.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use sequent::{Check, Engine, Packet, RULE_CAPACITY, Rule};

struct Counter {
    fired: u64,
}

fn count(ctx: &mut Counter, _: &Packet<'_>, _: ()) -> bool {
    ctx.fired += 1;
    true
}

fn never(_: &Packet<'_>) -> bool {
    false
}

fn full_engine() -> Engine<Counter> {
    let mut engine: Engine<Counter> = Engine::new();
    for _ in 0..RULE_CAPACITY {
        engine
            .add_normal(Rule::on(Check::Event(0x10), count))
            .unwrap();
    }
    // Keep the production open so the rule set survives every iteration.
    engine.until(never);
    engine
}

fn bench_dispatch(c: &mut Criterion) {
    let miss = [0x04u8, 0x11, 0x00];
    let hit = [0x04u8, 0x10, 0x00];

    c.bench_function("dispatch_full_set_no_match", |b| {
        let mut engine = full_engine();
        let mut ctx = Counter { fired: 0 };
        b.iter(|| {
            let out = engine.dispatch(&mut ctx, &Packet::new(black_box(&miss)), 0);
            black_box(out)
        });
    });

    c.bench_function("dispatch_full_set_all_fire", |b| {
        let mut engine = full_engine();
        let mut ctx = Counter { fired: 0 };
        b.iter(|| {
            let out = engine.dispatch(&mut ctx, &Packet::new(black_box(&hit)), 0);
            black_box(out)
        });
    });
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
