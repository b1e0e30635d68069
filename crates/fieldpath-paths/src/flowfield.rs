//! Flow fields: one shared direction map per target.
//!
//! Generation runs in two passes over the grid. The integration pass spreads
//! a wavefront from the target and stores, per cell, the cheapest cumulative
//! cost of reaching it through 4-connected moves. The flow pass then turns
//! that distance map into a compass [`Direction`] per cell by picking the
//! cheapest neighbour, with diagonals allowed only past a single blocking
//! cell.
//!
//! Agents then steer with an O(1) [`FlowField::direction_at`] lookup.

use fieldpath_core::{Cost, CostChange, CostGrid, DEFAULT_COST, IMPASSABLE, Point};

use crate::direction::Direction;
use crate::error::PathError;
use crate::observer::FieldObserver;

/// Distance of a cell the wavefront has not reached.
pub const UNINITIALIZED: i32 = -1;

/// Transient bookkeeping used while generating the integration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VisitState {
    #[default]
    Unvisited,
    Open,
    Closed,
}

/// Per-cell flow-field state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowNode {
    /// Cumulative cost to the target, or [`UNINITIALIZED`].
    pub distance: i32,
    pub direction: Option<Direction>,
    pub state: VisitState,
}

impl Default for FlowNode {
    fn default() -> Self {
        Self {
            distance: UNINITIALIZED,
            direction: None,
            state: VisitState::Unvisited,
        }
    }
}

/// Worklist discipline of the integration pass.
///
/// Both produce the same distances, and therefore the same directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Propagation {
    /// Label-correcting relaxation with a LIFO stack. A cell may be reopened
    /// several times before the field settles.
    #[default]
    Lifo,
    /// Dial's bucket queue: every cell is settled once, in distance order.
    Bucket,
}

/// Flow-field generation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlowFieldConfig {
    pub propagation: Propagation,
}

// Passable costs are 0..IMPASSABLE, so one slot per possible step size keeps
// a pending distance from wrapping onto the slot being drained.
const BUCKETS: usize = IMPASSABLE as usize;

/// Integration field plus flow field for one target.
///
/// `FlowField` keeps its node arena between generations; regenerating on a
/// grid of the same size allocates nothing.
#[derive(Debug, Clone, Default)]
pub struct FlowField {
    config: FlowFieldConfig,
    nodes: Vec<FlowNode>,
    cols: i32,
    rows: i32,
    target: Option<Point>,
    relaxations: usize,
    // scratch buffers
    stack: Vec<usize>,
    buckets: Vec<Vec<usize>>,
    nbuf: Vec<Point>,
}

impl FlowField {
    pub fn new(config: FlowFieldConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> FlowFieldConfig {
        self.config
    }

    /// Run both passes for `target` without notifications.
    pub fn generate(&mut self, grid: &CostGrid, target: Point) {
        self.generate_integration_field(grid, target, &mut ());
        self.generate_flow_field(grid, &mut ());
    }

    /// Fill every cell's distance to `target`.
    ///
    /// The target is clamped into the grid. Every distance and visit state
    /// is reset first, so nothing survives from a previous target.
    pub fn generate_integration_field(
        &mut self,
        grid: &CostGrid,
        target: Point,
        obs: &mut impl FieldObserver,
    ) {
        self.reset(grid, obs);
        if grid.is_empty() {
            self.target = None;
            return;
        }
        let target = grid.clamp(target);
        self.target = Some(target);
        let Some(ti) = grid.idx(target) else {
            return;
        };

        let seed = &mut self.nodes[ti];
        seed.distance = 0;
        seed.state = VisitState::Open;
        obs.on_field_updated(target, Some(0), None);

        // An impassable target is not a source: only the target itself gets
        // a distance.
        if grid.cost_at_idx(ti) == IMPASSABLE {
            seed.state = VisitState::Closed;
            log::debug!("target {target} is impassable, field left empty");
            return;
        }

        match self.config.propagation {
            Propagation::Lifo => self.propagate_lifo(grid, ti, obs),
            Propagation::Bucket => self.propagate_buckets(grid, ti, obs),
        }

        log::debug!(
            "integration field for target {target}: {} relaxations over {} cells",
            self.relaxations,
            grid.len()
        );
    }

    fn reset(&mut self, grid: &CostGrid, obs: &mut impl FieldObserver) {
        self.relaxations = 0;
        self.cols = grid.cols();
        self.rows = grid.rows();
        if self.nodes.len() != grid.len() {
            self.nodes.clear();
            self.nodes.resize(grid.len(), FlowNode::default());
            return;
        }
        for (i, node) in self.nodes.iter_mut().enumerate() {
            if node.distance != UNINITIALIZED || node.direction.is_some() {
                obs.on_field_updated(grid.point(i), None, None);
            }
            *node = FlowNode::default();
        }
    }

    fn propagate_lifo(&mut self, grid: &CostGrid, seed: usize, obs: &mut impl FieldObserver) {
        let mut stack = std::mem::take(&mut self.stack);
        let mut nbuf = std::mem::take(&mut self.nbuf);
        stack.clear();
        stack.push(seed);

        while let Some(ci) = stack.pop() {
            self.nodes[ci].state = VisitState::Closed;
            let cd = self.nodes[ci].distance;
            let cp = grid.point(ci);

            nbuf.clear();
            grid.neighbors(cp, false, &mut nbuf);
            for &np in nbuf.iter() {
                if let Some(ni) = self.relax(grid, cd, np, obs) {
                    if self.nodes[ni].state != VisitState::Open {
                        self.nodes[ni].state = VisitState::Open;
                        stack.push(ni);
                    }
                }
            }
        }

        self.stack = stack;
        self.nbuf = nbuf;
    }

    fn propagate_buckets(&mut self, grid: &CostGrid, seed: usize, obs: &mut impl FieldObserver) {
        let mut buckets = std::mem::take(&mut self.buckets);
        let mut nbuf = std::mem::take(&mut self.nbuf);
        buckets.resize_with(BUCKETS, Vec::new);
        buckets.iter_mut().for_each(Vec::clear);
        buckets[0].push(seed);
        let mut pending = 1usize;
        let mut d = 0i32;

        while pending > 0 {
            let slot = d as usize % BUCKETS;
            while let Some(ci) = buckets[slot].pop() {
                pending -= 1;
                let node = &mut self.nodes[ci];
                // Stale entry: the cell was lowered again after being queued.
                if node.distance != d || node.state == VisitState::Closed {
                    continue;
                }
                node.state = VisitState::Closed;
                let cp = grid.point(ci);

                nbuf.clear();
                grid.neighbors(cp, false, &mut nbuf);
                for &np in nbuf.iter() {
                    if let Some(ni) = self.relax(grid, d, np, obs) {
                        self.nodes[ni].state = VisitState::Open;
                        let nd = self.nodes[ni].distance;
                        buckets[nd as usize % BUCKETS].push(ni);
                        pending += 1;
                    }
                }
            }
            d += 1;
        }

        self.buckets = buckets;
        self.nbuf = nbuf;
    }

    /// Lower the distance of `np` through a neighbour at distance `from`.
    /// Returns the index of `np` if it improved.
    #[inline]
    fn relax(
        &mut self,
        grid: &CostGrid,
        from: i32,
        np: Point,
        obs: &mut impl FieldObserver,
    ) -> Option<usize> {
        let ni = grid.idx(np)?;
        let cost = grid.cost_at_idx(ni);
        if cost == IMPASSABLE {
            return None;
        }
        let nd = from + i32::from(cost);
        let node = &mut self.nodes[ni];
        if node.distance != UNINITIALIZED && node.distance <= nd {
            return None;
        }
        node.distance = nd;
        self.relaxations += 1;
        obs.on_field_updated(np, Some(nd), None);
        Some(ni)
    }

    /// Derive every cell's direction from the current integration field.
    pub fn generate_flow_field(&mut self, grid: &CostGrid, obs: &mut impl FieldObserver) {
        if self.nodes.len() != grid.len() {
            log::warn!(
                "flow field built for {} cells, grid has {}; integration pass needed",
                self.nodes.len(),
                grid.len()
            );
            self.nodes.clear();
            self.nodes.resize(grid.len(), FlowNode::default());
            return;
        }

        let mut routed = 0usize;
        for i in 0..self.nodes.len() {
            let p = grid.point(i);
            let direction = self.best_direction(grid, p, i);
            let node = &mut self.nodes[i];
            if node.direction != direction {
                node.direction = direction;
                let distance = (node.distance != UNINITIALIZED).then_some(node.distance);
                obs.on_field_updated(p, distance, direction);
            }
            routed += usize::from(direction.is_some());
        }
        log::debug!("flow field: {routed} of {} cells routed", self.nodes.len());
    }

    fn best_direction(&self, grid: &CostGrid, p: Point, i: usize) -> Option<Direction> {
        if grid.cost_at_idx(i) == IMPASSABLE || self.nodes[i].distance <= 0 {
            return None;
        }

        let mut best = i32::MAX;
        let mut best_dir = None;
        for dir in Direction::SCAN_ORDER {
            // No corner cutting: a diagonal needs at least one open flank.
            if let Some((a, b)) = dir.flanks() {
                if grid.is_impassable(p + a.offset()) && grid.is_impassable(p + b.offset()) {
                    continue;
                }
            }
            let np = p + dir.offset();
            let Some(ni) = grid.idx(np) else {
                continue;
            };
            if grid.cost_at_idx(ni) == IMPASSABLE {
                continue;
            }
            let nd = self.nodes[ni].distance;
            if nd != UNINITIALIZED && nd < best {
                best = nd;
                best_dir = Some(dir);
            }
        }
        best_dir
    }

    /// The clamped target of the last integration pass.
    #[inline]
    pub fn target(&self) -> Option<Point> {
        self.target
    }

    /// Number of distance improvements made by the last integration pass.
    #[inline]
    pub fn relaxations(&self) -> usize {
        self.relaxations
    }

    /// All nodes in row-major order.
    #[inline]
    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    #[inline]
    fn index(&self, p: Point) -> Option<usize> {
        if p.x < 0 || p.y < 0 || p.x >= self.cols || p.y >= self.rows {
            return None;
        }
        Some((p.y * self.cols + p.x) as usize)
    }

    /// Node at `p`, or `None` outside the generated grid.
    #[inline]
    pub fn node(&self, p: Point) -> Option<&FlowNode> {
        self.index(p).and_then(|i| self.nodes.get(i))
    }

    /// Distance from `p` to the target, `None` if the wavefront never
    /// reached `p`.
    #[inline]
    pub fn distance_at(&self, p: Point) -> Option<i32> {
        self.node(p)
            .map(|n| n.distance)
            .filter(|&d| d != UNINITIALIZED)
    }

    /// Direction an agent at `p` should move in.
    #[inline]
    pub fn direction_at(&self, p: Point) -> Option<Direction> {
        self.node(p).and_then(|n| n.direction)
    }

    /// Follow directions from `from` until the target.
    ///
    /// The returned path includes both endpoints.
    pub fn trace_from(&self, from: Point) -> Result<Vec<Point>, PathError> {
        let target = self.target.ok_or(PathError::NotPlanned)?;
        if self.distance_at(from).is_none() {
            return Err(PathError::NoPathFound { at: from });
        }
        let mut path = vec![from];
        let mut cur = from;
        while cur != target {
            // Longer than the grid: a stale field or a zero-cost cycle.
            if path.len() > self.nodes.len() {
                return Err(PathError::NoPathFound { at: cur });
            }
            let dir = self
                .direction_at(cur)
                .ok_or(PathError::NoPathFound { at: cur })?;
            cur = cur + dir.offset();
            path.push(cur);
        }
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// FlowMap
// ---------------------------------------------------------------------------

/// A grid, its flow field and the field's target, kept in sync.
///
/// Every cost change that actually alters the grid regenerates both passes
/// from the current target. There is no partial update.
#[derive(Debug, Clone)]
pub struct FlowMap<O = ()> {
    grid: CostGrid,
    field: FlowField,
    target: Point,
    observer: O,
}

impl FlowMap<()> {
    /// Build the map and generate its first field.
    pub fn new(grid: CostGrid, target: Point, config: FlowFieldConfig) -> Self {
        Self::with_observer(grid, target, config, ())
    }
}

impl<O: FieldObserver> FlowMap<O> {
    /// Like [`new`](FlowMap::new), reporting every field update to `observer`.
    pub fn with_observer(grid: CostGrid, target: Point, config: FlowFieldConfig, observer: O) -> Self {
        let target = grid.clamp(target);
        let mut map = Self {
            grid,
            field: FlowField::new(config),
            target,
            observer,
        };
        map.regenerate();
        map
    }

    #[inline]
    pub fn grid(&self) -> &CostGrid {
        &self.grid
    }

    #[inline]
    pub fn field(&self) -> &FlowField {
        &self.field
    }

    #[inline]
    pub fn target(&self) -> Point {
        self.target
    }

    #[inline]
    pub fn observer(&self) -> &O {
        &self.observer
    }

    #[inline]
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Move the target (clamped into the grid) and regenerate.
    pub fn set_target(&mut self, target: Point) {
        let target = self.grid.clamp(target);
        if target == self.target && self.field.target() == Some(target) {
            return;
        }
        self.target = target;
        self.regenerate();
    }

    /// Write a cost, regenerating the field if the grid changed.
    pub fn set_cost(&mut self, p: Point, cost: Cost) -> CostChange {
        let change = self.grid.set_cost(p, cost);
        if change.is_change() {
            log::debug!("grid change at {p}: {change:?}, regenerating flow field");
            self.regenerate();
        }
        change
    }

    pub fn add_obstacle(&mut self, p: Point) -> CostChange {
        self.set_cost(p, IMPASSABLE)
    }

    /// Clear an obstacle back to the default cost. Passable cells are left
    /// alone.
    pub fn remove_obstacle(&mut self, p: Point) -> CostChange {
        match self.grid.cost(p) {
            None => CostChange::OutOfBounds,
            Some(IMPASSABLE) => self.set_cost(p, DEFAULT_COST),
            Some(_) => CostChange::Unchanged,
        }
    }

    pub fn toggle_obstacle(&mut self, p: Point) -> CostChange {
        if self.grid.is_impassable(p) {
            self.remove_obstacle(p)
        } else {
            self.add_obstacle(p)
        }
    }

    /// Rebuild both passes from the current target.
    pub fn regenerate(&mut self) {
        self.field
            .generate_integration_field(&self.grid, self.target, &mut self.observer);
        self.field.generate_flow_field(&self.grid, &mut self.observer);
    }

    /// Give the grid back, dropping the field.
    pub fn into_grid(self) -> CostGrid {
        self.grid
    }
}
