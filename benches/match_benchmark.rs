//! Benchmarks for complete matches and the per-turn hot path.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use toe::game::economy::can_conquer;
use toe::{GameState, MatchConfig, PlayerSpec, Position, World, run_match};

fn config(debug: bool) -> MatchConfig {
    MatchConfig {
        players: vec![
            PlayerSpec::new("agg", "aggressive"),
            PlayerSpec::new("farm", "farmer"),
            PlayerSpec::new("rnd", "random"),
            PlayerSpec::new("pac", "harvester"),
        ],
        max_rounds: Some(200),
        debug,
        seed: Some(42),
        ..MatchConfig::default()
    }
}

fn bench_direct_match(c: &mut Criterion) {
    let config = config(true);
    c.bench_function("match_4p_direct", |b| {
        b.iter(|| black_box(run_match(black_box(&config))));
    });
}

fn bench_isolated_match(c: &mut Criterion) {
    let config = config(false);
    let mut group = c.benchmark_group("isolated");
    group.sample_size(10);
    group.bench_function("match_4p_isolated", |b| {
        b.iter(|| black_box(run_match(black_box(&config))));
    });
    group.finish();
}

fn bench_view_and_rules(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let mut state = GameState::new(World::new(40, 20).unwrap(), 50);
    state.add_player("a", "bench", Some(Position::new(10, 10)), &mut rng).unwrap();
    state.add_player("b", "bench", Some(Position::new(30, 10)), &mut rng).unwrap();

    c.bench_function("view_for_40x20", |b| {
        b.iter(|| black_box(state.view_for(black_box(0))));
    });
    c.bench_function("can_conquer", |b| {
        b.iter(|| black_box(can_conquer(&state.world, 0, 100, black_box(Position::new(11, 10)))));
    });
}

criterion_group!(benches, bench_direct_match, bench_isolated_match, bench_view_and_rules);
criterion_main!(benches);
