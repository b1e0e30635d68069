//! Shared setup and text rendering for the terminal demos.
//!
//! The demos pace the engines themselves: every frame is one call into the
//! library followed by a printout. Nothing here runs in the background.

use std::collections::HashSet;

use fieldpath_core::{CostGrid, DEFAULT_COST, IMPASSABLE, Point};
use fieldpath_paths::{Agent, Direction, FieldObserver, FlowField, SearchObserver, StepCost};
use rand::{Rng, RngExt};

pub const WIDTH: i32 = 48;
pub const HEIGHT: i32 = 18;

/// Seed used when `FIELDPATH_SEED` is unset or unreadable.
pub const DEFAULT_SEED: u64 = 42;

/// Install `env_logger` with an `info` default. `RUST_LOG` overrides it.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Read the world seed from `FIELDPATH_SEED`.
pub fn seed_from_env() -> u64 {
    match std::env::var("FIELDPATH_SEED") {
        Ok(s) => s.trim().parse().unwrap_or_else(|_| {
            log::warn!("FIELDPATH_SEED={s:?} is not a number, using {DEFAULT_SEED}");
            DEFAULT_SEED
        }),
        Err(_) => DEFAULT_SEED,
    }
}

/// A random world: about `wall_pct` percent walls, some rough terrain, and
/// every cell in `keep` left at the default cost.
pub fn random_world(rng: &mut impl Rng, cols: i32, rows: i32, wall_pct: u32, keep: &[Point]) -> CostGrid {
    let mut grid = CostGrid::new(cols, rows);
    for p in grid.bounds() {
        if keep.contains(&p) {
            continue;
        }
        let roll = rng.random_range(0..100);
        if roll < wall_pct {
            grid.set_cost(p, IMPASSABLE);
        } else if roll < wall_pct + 10 {
            grid.set_cost(p, rng.random_range(2..=5));
        }
    }
    grid
}

/// A random in-bounds cell.
pub fn random_point(rng: &mut impl Rng, grid: &CostGrid) -> Point {
    Point::new(rng.random_range(0..grid.cols()), rng.random_range(0..grid.rows()))
}

fn arrow(dir: Direction) -> char {
    match dir {
        Direction::Right => '→',
        Direction::TopRight => '↗',
        Direction::Top => '↑',
        Direction::TopLeft => '↖',
        Direction::Left => '←',
        Direction::BottomLeft => '↙',
        Direction::Bottom => '↓',
        Direction::BottomRight => '↘',
    }
}

/// One arrow per cell. `*` marks the target, `#` walls and `?` cells the
/// wavefront never reached.
pub fn render_flow(grid: &CostGrid, field: &FlowField) -> String {
    let mut out = String::with_capacity(grid.len() + grid.rows() as usize);
    for y in 0..grid.rows() {
        for x in 0..grid.cols() {
            let p = Point::new(x, y);
            let c = if field.target() == Some(p) {
                '*'
            } else if grid.is_impassable(p) {
                '#'
            } else {
                match field.direction_at(p) {
                    Some(dir) => arrow(dir),
                    None => '?',
                }
            };
            out.push(c);
        }
        out.push('\n');
    }
    out
}

/// The agent's view of `world`: `#` for walls it knows about, `+` for walls
/// it has not seen yet, `,` for rough terrain, `o` for its trail, `@` for the
/// agent and `X` for the target.
pub fn render_agent<C: StepCost, O: SearchObserver>(world: &CostGrid, agent: &Agent<C, O>) -> String {
    let known = agent.dstar().known();
    let trail: HashSet<Point> = agent.trail().iter().copied().collect();
    let mut out = String::with_capacity(world.len() + world.rows() as usize);
    for y in 0..world.rows() {
        for x in 0..world.cols() {
            let p = Point::new(x, y);
            let c = if p == agent.position() {
                '@'
            } else if p == agent.target() {
                'X'
            } else if known.is_impassable(p) {
                '#'
            } else if world.is_impassable(p) {
                '+'
            } else if trail.contains(&p) {
                'o'
            } else if world.cost(p).is_some_and(|c| c > DEFAULT_COST) {
                ','
            } else {
                '.'
            };
            out.push(c);
        }
        out.push('\n');
    }
    out
}

/// Counts observer notifications and the distinct cells they touched.
#[derive(Debug, Default)]
pub struct UpdateCounter {
    pub updates: usize,
    cells: HashSet<Point>,
}

impl UpdateCounter {
    pub fn distinct_cells(&self) -> usize {
        self.cells.len()
    }

    /// Forget everything counted so far.
    pub fn reset(&mut self) {
        self.updates = 0;
        self.cells.clear();
    }
}

impl FieldObserver for UpdateCounter {
    fn on_field_updated(&mut self, p: Point, _: Option<i32>, _: Option<Direction>) {
        self.updates += 1;
        self.cells.insert(p);
    }
}

impl SearchObserver for UpdateCounter {
    fn on_node_updated(&mut self, p: Point, _: i64, _: Option<Point>) {
        self.updates += 1;
        self.cells.insert(p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldpath_paths::{DStarConfig, FlowFieldConfig};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn random_world_keeps_cells_open() {
        let mut rng = StdRng::seed_from_u64(7);
        let keep = [Point::new(0, 0), Point::new(9, 9)];
        let grid = random_world(&mut rng, 10, 10, 90, &keep);
        for p in keep {
            assert_eq!(grid.cost(p), Some(DEFAULT_COST));
        }
        assert!(grid.obstacle_count() > 0);
    }

    #[test]
    fn flow_rendering() {
        let grid = CostGrid::from_ascii("..#\n...").unwrap();
        let mut field = FlowField::new(FlowFieldConfig::default());
        field.generate(&grid, Point::new(0, 0));
        assert_eq!(render_flow(&grid, &field), "*←#\n↑↖↖\n");
    }

    #[test]
    fn agent_rendering() {
        let world = CostGrid::from_ascii("...\n.#.\n...").unwrap();
        let agent = Agent::new(
            CostGrid::new(3, 3),
            Point::new(0, 0),
            Point::new(2, 2),
            DStarConfig::default(),
        );
        assert_eq!(render_agent(&world, &agent), "@..\n.+.\n..X\n");
    }
}
