use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::Vec2;
use stardrift_core::{SaveFile, World, WorldConfig};

fn populated_world() -> World {
    let mut config = WorldConfig {
        seed: 0x5EED,
        ..WorldConfig::default()
    };
    config.generation.asteroids_min = 8;
    config.generation.asteroids_max = 16;
    let mut world = World::new(config).expect("valid config");
    world.update_at(Vec2::ZERO, 0.0);
    world
}

fn bench_update(c: &mut Criterion) {
    let mut world = populated_world();
    c.bench_function("world_update_stationary", |b| {
        b.iter(|| black_box(world.update_at(Vec2::ZERO, 1.0 / 60.0)))
    });

    let mut world = populated_world();
    let step = world.config().cluster_size.x / 4.0;
    let mut focal = Vec2::ZERO;
    c.bench_function("world_update_streaming", |b| {
        b.iter(|| {
            focal.x += step;
            black_box(world.update_at(focal, 1.0 / 60.0))
        })
    });
}

fn bench_persistence(c: &mut Criterion) {
    let world = populated_world();
    c.bench_function("world_encode", |b| {
        b.iter(|| black_box(world.to_document().expect("encodable")))
    });

    let save = SaveFile::capture(&world, None).expect("encodable");
    let json = serde_json::to_string(&save).expect("serializable");
    c.bench_function("world_decode", |b| {
        b.iter(|| {
            let save: SaveFile = serde_json::from_str(black_box(&json)).expect("parsable");
            black_box(save.restore().expect("loadable"))
        })
    });
}

criterion_group!(benches, bench_update, bench_persistence);
criterion_main!(benches);
