//! A single agent walking a D* plan under partial knowledge.
//!
//! The agent only knows what its sensor has shown it. After each move it
//! compares the true costs within `sensor_radius` against its known map,
//! feeds every difference to the engine and repairs the plan before moving
//! again. Pacing is up to the caller: nothing here sleeps or spawns.

use fieldpath_core::{CostGrid, Point, Range};

use crate::dstar::{BLOCKED, DStar, DStarConfig};
use crate::error::PathError;
use crate::observer::SearchObserver;
use crate::traits::{Octile, StepCost};

/// Result of a successful [`Agent::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Moved to the given cell; the target is still ahead.
    Moved(Point),
    /// Standing on the target.
    Arrived,
}

pub struct Agent<C = Octile, O = ()> {
    dstar: DStar<C, O>,
    config: DStarConfig,
    position: Point,
    target: Point,
    planned: bool,
    trail: Vec<Point>,
}

impl Agent<Octile, ()> {
    /// An agent at `start` heading for `target`, believing `known` to be the
    /// map. Both points are clamped into the map.
    pub fn new(known: CostGrid, start: Point, target: Point, config: DStarConfig) -> Self {
        Self::with_step_cost(known, start, target, config, Octile::default())
    }
}

impl<C: StepCost> Agent<C, ()> {
    pub fn with_step_cost(
        known: CostGrid,
        start: Point,
        target: Point,
        config: DStarConfig,
        step_cost: C,
    ) -> Self {
        let position = known.clamp(start);
        let target = known.clamp(target);
        Self {
            dstar: DStar::with_step_cost(known, config.diagonals, step_cost),
            config,
            position,
            target,
            planned: false,
            trail: vec![position],
        }
    }
}

impl<C: StepCost, O: SearchObserver> Agent<C, O> {
    /// Report search updates to `observer`.
    pub fn with_observer<O2: SearchObserver>(self, observer: O2) -> Agent<C, O2> {
        Agent {
            dstar: self.dstar.with_observer(observer),
            config: self.config,
            position: self.position,
            target: self.target,
            planned: self.planned,
            trail: self.trail,
        }
    }

    #[inline]
    pub fn position(&self) -> Point {
        self.position
    }

    #[inline]
    pub fn target(&self) -> Point {
        self.target
    }

    #[inline]
    pub fn config(&self) -> DStarConfig {
        self.config
    }

    /// Every cell visited so far, starting position included.
    #[inline]
    pub fn trail(&self) -> &[Point] {
        &self.trail
    }

    #[inline]
    pub fn dstar(&self) -> &DStar<C, O> {
        &self.dstar
    }

    #[inline]
    pub fn arrived(&self) -> bool {
        self.position == self.target
    }

    /// Look around the start, then build the initial plan.
    pub fn plan(&mut self, world: &CostGrid) -> Result<(), PathError> {
        for p in self.sensor_range() {
            if let Some(cost) = world.cost(p) {
                self.dstar.update_cell(p, cost);
            }
        }
        self.planned = false;
        self.dstar.plan(self.position, self.target)?;
        self.planned = true;
        Ok(())
    }

    fn sensor_range(&self) -> Range {
        Range::around(self.position, self.config.sensor_radius).intersect(self.dstar.known().bounds())
    }

    /// Compare `world` against the known map around the agent and repair the
    /// plan if anything differs. Returns the number of cells that changed.
    pub fn sense(&mut self, world: &CostGrid) -> usize {
        let mut changed = 0;
        for p in self.sensor_range() {
            let Some(cost) = world.cost(p) else {
                continue;
            };
            if self.dstar.update_cell(p, cost).is_change() {
                changed += 1;
            }
        }
        if changed > 0 {
            log::debug!("sensor at {} saw {changed} changed cells", self.position);
            if self.planned {
                self.dstar.repair();
            }
        }
        changed
    }

    /// Move one cell along the plan.
    ///
    /// The agent senses before moving, so world changes made between steps
    /// are seen, and again after moving. Fails with
    /// [`PathError::NoPathFound`] when the current cell has no parent or the
    /// way to it is blocked on the known map.
    pub fn step(&mut self, world: &CostGrid) -> Result<StepOutcome, PathError> {
        if !self.planned {
            return Err(PathError::NotPlanned);
        }
        if self.arrived() {
            return Ok(StepOutcome::Arrived);
        }
        self.sense(world);

        let at = self.position;
        let next = self.dstar.parent(at).ok_or(PathError::NoPathFound { at })?;
        let h = self.dstar.h(at).unwrap_or(BLOCKED);
        if h >= BLOCKED || self.dstar.edge_cost(at, next) >= BLOCKED {
            log::warn!("agent stuck at {at}: target unreachable on known map");
            return Err(PathError::NoPathFound { at });
        }

        self.position = next;
        self.trail.push(next);
        log::trace!("agent moved {at} -> {next}");
        self.sense(world);

        if self.arrived() {
            Ok(StepOutcome::Arrived)
        } else {
            Ok(StepOutcome::Moved(next))
        }
    }

    /// Plan if needed, then step until arrival. Returns the trail.
    pub fn run(&mut self, world: &CostGrid) -> Result<&[Point], PathError> {
        if !self.planned {
            self.plan(world)?;
        }
        for _ in 0..self.config.max_steps {
            if self.step(world)? == StepOutcome::Arrived {
                log::debug!(
                    "arrived at {} after {} moves",
                    self.target,
                    self.trail.len() - 1
                );
                return Ok(&self.trail);
            }
        }
        if self.arrived() {
            return Ok(&self.trail);
        }
        Err(PathError::StepLimit {
            steps: self.config.max_steps,
        })
    }
}
