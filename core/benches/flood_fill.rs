use criterion::{Criterion, criterion_group, criterion_main};
use sapper_core::*;
use std::hint::black_box;

fn bench_generate(c: &mut Criterion) {
    let config = GameConfig::with_seed(16, 30, 99, 7);
    c.bench_function("generate expert", |b| {
        b.iter(|| Grid::new(black_box(&config)))
    });
}

fn bench_flood_fill(c: &mut Criterion) {
    // a lone mine in the corner makes the first click open almost everything
    let grid = Grid::from_mine_coords(200, 200, &[(199, 199)]).unwrap();
    c.bench_function("flood fill 200x200", |b| {
        b.iter(|| {
            let mut engine = Engine::from_grid(grid.clone());
            engine.start().unwrap();
            black_box(engine.click((0, 0)).unwrap())
        })
    });
}

criterion_group!(benches, bench_generate, bench_flood_fill);
criterion_main!(benches);
