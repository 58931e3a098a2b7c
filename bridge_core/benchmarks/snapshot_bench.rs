use bridge_core::{dispatch, observe, MemoryHost, WorldBuilder};
use bridge_runtime::{ActionCommand, ActionKind};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

fn bench_observe(c: &mut Criterion) {
    let mut group = c.benchmark_group("observe");

    for hand in [1usize, 8, 16, 32, 52] {
        group.bench_with_input(BenchmarkId::new("hand", hand), &hand, |b, &hand| {
            let host = MemoryHost::new(
                WorldBuilder::new()
                    .selecting_hand()
                    .standard_hand(hand)
                    .joker("Joker", "j_joker", 1)
                    .joker("Blueprint", "j_blueprint", 5)
                    .build(),
            );
            b.iter(|| observe(&host));
        });
    }

    group.finish();
}

fn bench_play(c: &mut Criterion) {
    let command = ActionCommand::new(ActionKind::PlayHand)
        .with_param("card_indices", vec![1, 2, 3, 4, 5]);
    c.bench_function("dispatch/play_hand", |b| {
        b.iter_batched(
            || {
                MemoryHost::new(
                    WorldBuilder::new()
                        .selecting_hand()
                        .standard_hand(8)
                        .deck_cards(40)
                        .build(),
                )
            },
            |mut host| dispatch(&mut host, &command),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(snapshot_benches, bench_observe, bench_play);
criterion_main!(snapshot_benches);
