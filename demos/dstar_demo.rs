//! D* demo: an agent crosses a world it only discovers through its sensor.
//!
//! Run: cargo run --bin dstar-demo
//! Set `FIELDPATH_SEED` for another world. `RUST_LOG=debug` shows every
//! repair.

use fieldpath_core::{CostGrid, Point};
use fieldpath_demos::{HEIGHT, UpdateCounter, WIDTH, random_world, render_agent};
use fieldpath_paths::{Agent, DStarConfig, StepOutcome};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Print a frame every this many moves.
const FRAME_EVERY: usize = 8;

fn main() {
    fieldpath_demos::init_logging();
    let seed = fieldpath_demos::seed_from_env();
    let mut rng = StdRng::seed_from_u64(seed);

    let start = Point::new(0, HEIGHT - 1);
    let target = Point::new(WIDTH - 1, 0);
    let world = random_world(&mut rng, WIDTH, HEIGHT, 28, &[start, target]);
    let config = DStarConfig::default();
    log::info!(
        "seed {seed}: {start} -> {target}, {} walls, sensor radius {}",
        world.obstacle_count(),
        config.sensor_radius
    );

    // The agent starts out believing the world is open ground.
    let known = CostGrid::new(world.cols(), world.rows());
    let mut agent = Agent::new(known, start, target, config).with_observer(UpdateCounter::default());
    if let Err(e) = agent.plan(&world) {
        log::error!("initial plan failed: {e}");
        std::process::exit(1);
    }
    log::info!(
        "initial plan: {} expansions, {} node updates",
        agent.dstar().expansions(),
        agent.dstar().observer().updates
    );

    let mut moves = 0;
    loop {
        if moves >= config.max_steps {
            log::error!("gave up after {moves} moves");
            std::process::exit(1);
        }
        match agent.step(&world) {
            Ok(StepOutcome::Arrived) => break,
            Ok(StepOutcome::Moved(_)) => {
                moves += 1;
                if moves % FRAME_EVERY == 0 {
                    println!("{}", render_agent(&world, &agent));
                }
            }
            Err(e) => {
                println!("{}", render_agent(&world, &agent));
                log::error!("{e}");
                std::process::exit(1);
            }
        }
    }

    println!("{}", render_agent(&world, &agent));
    let counter = agent.dstar().observer();
    log::info!(
        "arrived after {} moves: {} expansions, {} node updates over {} cells, {} walls discovered",
        agent.trail().len() - 1,
        agent.dstar().expansions(),
        counter.updates,
        counter.distinct_cells(),
        agent.dstar().known().obstacle_count()
    );
}
