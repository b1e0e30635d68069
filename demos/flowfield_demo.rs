//! Flow-field demo: one target, a random world, a few live obstacle edits.
//!
//! Run: cargo run --bin flowfield-demo
//! Set `FIELDPATH_SEED` for another world and `RUST_LOG=debug` for pass
//! summaries.

use fieldpath_core::Point;
use fieldpath_demos::{HEIGHT, UpdateCounter, WIDTH, random_point, random_world, render_flow};
use fieldpath_paths::{FlowField, FlowFieldConfig, FlowMap, Propagation};
use rand::SeedableRng;
use rand::rngs::StdRng;

const EDITS: usize = 3;

fn main() {
    fieldpath_demos::init_logging();
    let seed = fieldpath_demos::seed_from_env();
    let mut rng = StdRng::seed_from_u64(seed);

    let target = Point::new(WIDTH / 2, HEIGHT / 2);
    let unit = Point::ZERO;
    let grid = random_world(&mut rng, WIDTH, HEIGHT, 22, &[target, unit]);
    log::info!(
        "seed {seed}: {}x{} world with {} walls, target {target}",
        grid.cols(),
        grid.rows(),
        grid.obstacle_count()
    );

    // Same field, other worklist: the maps agree, only the work differs.
    let mut bucket = FlowField::new(FlowFieldConfig {
        propagation: Propagation::Bucket,
    });
    bucket.generate(&grid, target);

    let mut map = FlowMap::with_observer(grid, target, FlowFieldConfig::default(), UpdateCounter::default());
    log::info!(
        "lifo relaxed {} cells, bucket relaxed {}",
        map.field().relaxations(),
        bucket.relaxations()
    );
    let agree = bucket
        .nodes()
        .iter()
        .zip(map.field().nodes())
        .all(|(a, b)| a.distance == b.distance && a.direction == b.direction);
    if !agree {
        log::error!("propagation modes disagree");
        std::process::exit(1);
    }
    println!("{}", render_flow(map.grid(), map.field()));

    for edit in 1..=EDITS {
        let p = random_point(&mut rng, map.grid());
        if p == target {
            continue;
        }
        map.observer_mut().reset();
        let change = map.toggle_obstacle(p);
        log::info!(
            "edit {edit}: toggled {p} ({change:?}), {} updates over {} cells",
            map.observer().updates,
            map.observer().distinct_cells()
        );
        println!("{}", render_flow(map.grid(), map.field()));
    }

    match map.field().trace_from(unit) {
        Ok(path) => log::info!(
            "unit at {unit} reaches the target in {} moves, distance {}",
            path.len() - 1,
            map.field().distance_at(unit).unwrap_or_default()
        ),
        Err(e) => log::warn!("unit at {unit}: {e}"),
    }
}
