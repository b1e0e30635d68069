//! Incremental replanning with D*.
//!
//! [`DStar`] keeps a back-pointer tree rooted at the target over the agent's
//! *known* map. When the known cost of a cell changes, the cell and its
//! neighbours are pushed back onto the open list and [`DStar::process_state`]
//! propagates the difference outwards. States whose estimate went up are
//! handled as RAISE states, states whose estimate is settled as LOWER
//! states. Only the part of the tree affected by the change is revisited.
//!
//! Search state lives in its own arena keyed by the grid's cell index, so it
//! never aliases flow-field state and each engine owns an independent copy.

use std::collections::BinaryHeap;

use fieldpath_core::{Cost, CostChange, CostGrid, IMPASSABLE, Point};

use crate::error::PathError;
use crate::observer::SearchObserver;
use crate::traits::{Octile, StepCost};

/// Estimate of a node that was never queued.
pub const INFINITE: i64 = i64::MAX;

/// Cost of an edge into, out of, or diagonally between known obstacles.
///
/// Large but finite: blocked edges take part in ordinary arithmetic so that
/// cells behind walls still get (huge) estimates.
pub const BLOCKED: i64 = 1 << 40;

/// Queue membership of a search node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tag {
    #[default]
    New,
    Open,
    Closed,
}

/// Per-cell D* state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchNode {
    /// Current estimate of the cost to the target.
    pub h: i64,
    /// Queue priority; a lower bound on `h` while open.
    pub key: i64,
    /// Cell index of the next node towards the target.
    pub parent: Option<usize>,
    pub tag: Tag,
}

impl Default for SearchNode {
    fn default() -> Self {
        Self {
            h: INFINITE,
            key: INFINITE,
            parent: None,
            tag: Tag::New,
        }
    }
}

/// Incremental search settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DStarConfig {
    /// Chebyshev radius of the square the agent observes after each move.
    pub sensor_radius: i32,
    /// Search 8-connected (true) or 4-connected (false).
    pub diagonals: bool,
    /// Moves an agent may make in [`Agent::run`](crate::Agent::run).
    pub max_steps: usize,
}

impl Default for DStarConfig {
    fn default() -> Self {
        Self {
            sensor_radius: 2,
            diagonals: true,
            max_steps: 10_000,
        }
    }
}

/// Open-list entry, ordered so `BinaryHeap` pops the smallest key first and
/// the lowest cell index among equal keys.
#[derive(Clone, Copy, Eq, PartialEq)]
struct QueueEntry {
    key: i64,
    idx: usize,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.key.cmp(&self.key).then(other.idx.cmp(&self.idx))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// D* search over a known cost map.
pub struct DStar<C = Octile, O = ()> {
    known: CostGrid,
    nodes: Vec<SearchNode>,
    open: BinaryHeap<QueueEntry>,
    target: Option<usize>,
    diagonals: bool,
    step_cost: C,
    observer: O,
    expansions: usize,
    nbuf: Vec<Point>,
}

impl DStar<Octile, ()> {
    /// Engine over `known` with octile step costs.
    pub fn new(known: CostGrid, diagonals: bool) -> Self {
        Self::with_step_cost(known, diagonals, Octile::default())
    }
}

impl<C: StepCost> DStar<C, ()> {
    pub fn with_step_cost(known: CostGrid, diagonals: bool, step_cost: C) -> Self {
        let len = known.len();
        Self {
            known,
            nodes: vec![SearchNode::default(); len],
            open: BinaryHeap::new(),
            target: None,
            diagonals,
            step_cost,
            observer: (),
            expansions: 0,
            nbuf: Vec::with_capacity(8),
        }
    }
}

impl<C: StepCost, O: SearchObserver> DStar<C, O> {
    /// Replace the observer, keeping all search state.
    pub fn with_observer<O2: SearchObserver>(self, observer: O2) -> DStar<C, O2> {
        DStar {
            known: self.known,
            nodes: self.nodes,
            open: self.open,
            target: self.target,
            diagonals: self.diagonals,
            step_cost: self.step_cost,
            observer,
            expansions: self.expansions,
            nbuf: self.nbuf,
        }
    }

    #[inline]
    pub fn observer(&self) -> &O {
        &self.observer
    }

    #[inline]
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// The agent's current picture of the map.
    #[inline]
    pub fn known(&self) -> &CostGrid {
        &self.known
    }

    #[inline]
    pub fn target(&self) -> Option<Point> {
        self.target.map(|i| self.known.point(i))
    }

    /// Number of states expanded by `process_state` since the last plan.
    #[inline]
    pub fn expansions(&self) -> usize {
        self.expansions
    }

    #[inline]
    pub fn node(&self, p: Point) -> Option<&SearchNode> {
        self.known.idx(p).map(|i| &self.nodes[i])
    }

    /// Current estimate at `p`; `None` if out of range or never reached.
    #[inline]
    pub fn h(&self, p: Point) -> Option<i64> {
        self.node(p).filter(|n| n.tag != Tag::New).map(|n| n.h)
    }

    #[inline]
    pub fn parent(&self, p: Point) -> Option<Point> {
        self.node(p)
            .and_then(|n| n.parent)
            .map(|i| self.known.point(i))
    }

    #[inline]
    pub fn tag(&self, p: Point) -> Option<Tag> {
        self.node(p).map(|n| n.tag)
    }

    // -----------------------------------------------------------------------
    // Costs
    // -----------------------------------------------------------------------

    /// Cost for an agent at `from` to step into the adjacent cell `to`,
    /// judged on the known map.
    ///
    /// [`BLOCKED`] if either end is a known obstacle, or if the move is
    /// diagonal and both cells flanking it are known obstacles. Any other
    /// edge costs at least 1, even over zero-cost terrain.
    pub fn edge_cost(&self, from: Point, to: Point) -> i64 {
        let Some(terrain) = self.passable_cost(to) else {
            return BLOCKED;
        };
        if self.passable_cost(from).is_none() {
            return BLOCKED;
        }
        if from.is_diagonal_to(to)
            && self.known.is_impassable(Point::new(to.x, from.y))
            && self.known.is_impassable(Point::new(from.x, to.y))
        {
            return BLOCKED;
        }
        self.step_cost.step_cost(from, to, terrain).max(1)
    }

    #[inline]
    fn passable_cost(&self, p: Point) -> Option<Cost> {
        self.known.cost(p).filter(|&c| c != IMPASSABLE)
    }

    #[inline]
    fn edge_idx(&self, from: usize, to: usize) -> i64 {
        self.edge_cost(self.known.point(from), self.known.point(to))
    }

    // -----------------------------------------------------------------------
    // Open list
    // -----------------------------------------------------------------------

    /// Set the estimate of `p` to `h` and put it on the open list.
    ///
    /// A new node is keyed by `h`, an open node by the lower of its key and
    /// `h`, a closed node by the lower of its previous estimate and `h`.
    pub fn insert(&mut self, p: Point, h: i64) {
        if let Some(i) = self.known.idx(p) {
            self.insert_idx(i, h);
        }
    }

    // The key keeps the lowest estimate the node had since it was last
    // closed; key < h marks a raised node.
    fn insert_idx(&mut self, i: usize, h: i64) {
        let node = &mut self.nodes[i];
        let key = match node.tag {
            Tag::New => h,
            Tag::Open => node.key.min(h),
            Tag::Closed => node.h.min(h),
        };
        let requeue = node.tag != Tag::Open || key != node.key;
        node.key = key;
        node.h = h;
        node.tag = Tag::Open;
        if requeue {
            self.open.push(QueueEntry { key, idx: i });
        }
        self.publish(i);
    }

    /// Drop stale heap entries and return the smallest live key.
    pub fn min_key(&mut self) -> Option<i64> {
        while let Some(top) = self.open.peek() {
            let node = &self.nodes[top.idx];
            if node.tag == Tag::Open && node.key == top.key {
                return Some(top.key);
            }
            self.open.pop();
        }
        None
    }

    /// Number of live entries on the open list.
    pub fn open_len(&self) -> usize {
        self.nodes.iter().filter(|n| n.tag == Tag::Open).count()
    }

    fn pop_min(&mut self) -> Option<(i64, usize)> {
        let key = self.min_key()?;
        let entry = self.open.pop()?;
        self.nodes[entry.idx].tag = Tag::Closed;
        Some((key, entry.idx))
    }

    #[inline]
    fn set_parent(&mut self, i: usize, parent: usize) {
        self.nodes[i].parent = Some(parent);
    }

    fn publish(&mut self, i: usize) {
        let n = self.nodes[i];
        let p = self.known.point(i);
        let parent = n.parent.map(|j| self.known.point(j));
        self.observer.on_node_updated(p, n.h, parent);
    }

    // -----------------------------------------------------------------------
    // ProcessState
    // -----------------------------------------------------------------------

    /// Expand the open node with the smallest key.
    ///
    /// Returns the smallest key left on the open list, or `None` once the
    /// list is empty.
    pub fn process_state(&mut self) -> Option<i64> {
        let (k_old, x) = self.pop_min()?;
        self.expansions += 1;

        let mut nbuf = std::mem::take(&mut self.nbuf);
        nbuf.clear();
        self.known
            .neighbors(self.known.point(x), self.diagonals, &mut nbuf);
        let mut buf = [0usize; 8];
        let mut count = 0;
        for i in nbuf.iter().filter_map(|&p| self.known.idx(p)) {
            buf[count] = i;
            count += 1;
        }
        self.nbuf = nbuf;
        let neighbors = &buf[..count];

        // A raised state first tries to lower itself through neighbours
        // whose estimates are already settled below k_old.
        if k_old < self.nodes[x].h {
            for &y in neighbors {
                let hy = self.nodes[y].h;
                let via = hy.saturating_add(self.edge_idx(x, y));
                if hy <= k_old && self.nodes[x].h > via {
                    self.set_parent(x, y);
                    self.nodes[x].h = via;
                    self.publish(x);
                }
            }
        }

        if k_old == self.nodes[x].h {
            // LOWER: x is settled, pass the improvement on.
            for &y in neighbors {
                let hx = self.nodes[x].h;
                let ny = self.nodes[y];
                let via = hx.saturating_add(self.edge_idx(y, x));
                if ny.tag == Tag::New
                    || (ny.parent == Some(x) && ny.h != via)
                    || (ny.parent != Some(x) && ny.h > via)
                {
                    self.set_parent(y, x);
                    self.insert_idx(y, via);
                }
            }
        } else {
            // RAISE: children take the new cost; better routes defer.
            for &y in neighbors {
                let hx = self.nodes[x].h;
                let ny = self.nodes[y];
                let via = hx.saturating_add(self.edge_idx(y, x));
                if ny.tag == Tag::New || (ny.parent == Some(x) && ny.h != via) {
                    self.set_parent(y, x);
                    self.insert_idx(y, via);
                } else if ny.parent != Some(x) && ny.h > via {
                    self.insert_idx(x, hx);
                } else if ny.parent != Some(x)
                    && hx > ny.h.saturating_add(self.edge_idx(x, y))
                    && ny.tag == Tag::Closed
                    && ny.h > k_old
                {
                    self.insert_idx(y, ny.h);
                }
            }
        }

        log::trace!(
            "expanded {} (k_old {k_old}, h {})",
            self.known.point(x),
            self.nodes[x].h
        );
        self.min_key()
    }

    // -----------------------------------------------------------------------
    // Planning and repair
    // -----------------------------------------------------------------------

    /// Build the back-pointer tree from scratch until `start` is settled.
    ///
    /// Both points are clamped into the map. All search state from earlier
    /// plans is discarded.
    pub fn plan(&mut self, start: Point, target: Point) -> Result<(), PathError> {
        if self.known.is_empty() {
            return Err(PathError::NoPathFound { at: start });
        }
        let start = self.known.clamp(start);
        let target = self.known.clamp(target);
        let (Some(si), Some(ti)) = (self.known.idx(start), self.known.idx(target)) else {
            return Err(PathError::NoPathFound { at: start });
        };

        self.nodes.iter_mut().for_each(|n| *n = SearchNode::default());
        self.open.clear();
        self.expansions = 0;
        self.target = Some(ti);
        self.insert_idx(ti, 0);

        while self.nodes[si].tag != Tag::Closed {
            if self.min_key().is_none() {
                log::warn!("open list ran dry before {start} was reached");
                return Err(PathError::NoPathFound { at: start });
            }
            self.process_state();
        }

        log::debug!(
            "planned {start} -> {target}: h {} after {} expansions",
            self.nodes[si].h,
            self.expansions
        );
        if self.nodes[si].h >= BLOCKED {
            log::warn!("no open route from {start} to {target}");
            return Err(PathError::NoPathFound { at: start });
        }
        Ok(())
    }

    /// Record a new known cost for `p` and queue the cells whose edges it
    /// touches. Nothing is propagated until [`repair`](Self::repair).
    pub fn update_cell(&mut self, p: Point, cost: Cost) -> CostChange {
        let change = self.known.set_cost(p, cost);
        if !change.is_change() {
            return change;
        }
        let mut nbuf = std::mem::take(&mut self.nbuf);
        nbuf.clear();
        nbuf.push(p);
        self.known.neighbors(p, self.diagonals, &mut nbuf);
        for &q in nbuf.iter() {
            let Some(i) = self.known.idx(q) else {
                continue;
            };
            if self.nodes[i].tag != Tag::New {
                let h = self.nodes[i].h;
                self.insert_idx(i, h);
            }
        }
        self.nbuf = nbuf;
        change
    }

    /// Run `process_state` until the open list is empty. Returns the number
    /// of states expanded.
    pub fn repair(&mut self) -> usize {
        let before = self.expansions;
        while self.min_key().is_some() {
            self.process_state();
        }
        let expanded = self.expansions - before;
        log::debug!("repair expanded {expanded} states");
        expanded
    }

    /// Follow back-pointers from `from` to the target. Both ends included.
    pub fn path_from(&self, from: Point) -> Result<Vec<Point>, PathError> {
        let target = self.target().ok_or(PathError::NotPlanned)?;
        let mut cur = from;
        let mut path = vec![cur];
        while cur != target {
            let next = self
                .parent(cur)
                .ok_or(PathError::NoPathFound { at: cur })?;
            if self.edge_cost(cur, next) >= BLOCKED || path.len() > self.nodes.len() {
                return Err(PathError::NoPathFound { at: cur });
            }
            path.push(next);
            cur = next;
        }
        Ok(path)
    }

    /// Sum of edge costs along `path` on the known map.
    pub fn path_cost(&self, path: &[Point]) -> i64 {
        path.windows(2)
            .map(|w| self.edge_cost(w[0], w[1]))
            .fold(0i64, i64::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldpath_core::IMPASSABLE;
    use rand::rngs::StdRng;
    use rand::{RngExt, SeedableRng};

    /// Bellman-Ford cost-to-target over unblocked edges.
    fn reference<C: StepCost, O: SearchObserver>(
        d: &DStar<C, O>,
        target: Point,
        diagonals: bool,
    ) -> Vec<Option<i64>> {
        let grid = d.known();
        let mut best: Vec<Option<i64>> = vec![None; grid.len()];
        best[grid.idx(target).unwrap()] = Some(0);
        let mut buf = Vec::new();
        let mut changed = true;
        while changed {
            changed = false;
            for p in grid.bounds() {
                buf.clear();
                grid.neighbors(p, diagonals, &mut buf);
                for &n in &buf {
                    let Some(hn) = best[grid.idx(n).unwrap()] else { continue };
                    let c = d.edge_cost(p, n);
                    if c >= BLOCKED {
                        continue;
                    }
                    let i = grid.idx(p).unwrap();
                    if best[i].is_none_or(|b| hn + c < b) {
                        best[i] = Some(hn + c);
                        changed = true;
                    }
                }
            }
        }
        best
    }

    fn assert_open_keys_bounded<C: StepCost, O: SearchObserver>(d: &DStar<C, O>, when: &str) {
        for (i, n) in d.nodes.iter().enumerate() {
            if n.tag == Tag::Open {
                assert!(n.key <= n.h, "{when}: key {} above h {} at {}", n.key, n.h, d.known.point(i));
            }
        }
    }

    fn random_grid(rng: &mut StdRng, cols: i32, rows: i32, keep: &[Point]) -> CostGrid {
        let mut grid = CostGrid::new(cols, rows);
        for p in grid.bounds() {
            let cost = match rng.random_range(0..8) {
                0 | 1 => IMPASSABLE,
                2 => rng.random_range(2..5),
                _ => 1,
            };
            grid.set_cost(p, cost);
        }
        for &p in keep {
            grid.set_cost(p, 1);
        }
        grid
    }

    #[derive(Default)]
    struct Recorder {
        calls: usize,
        last: std::collections::HashMap<Point, (i64, Option<Point>)>,
    }

    impl SearchObserver for Recorder {
        fn on_node_updated(&mut self, p: Point, h: i64, parent: Option<Point>) {
            self.calls += 1;
            self.last.insert(p, (h, parent));
        }
    }

    #[test]
    fn insert_keys_follow_tag() {
        let mut d = DStar::new(CostGrid::new(3, 3), true);
        let p = Point::new(1, 1);
        d.insert(p, 50);
        assert_eq!(d.node(p).unwrap().key, 50);
        assert_eq!(d.tag(p), Some(Tag::Open));
        d.insert(p, 70);
        assert_eq!((d.node(p).unwrap().key, d.h(p)), (50, Some(70)));
        d.insert(p, 30);
        assert_eq!((d.node(p).unwrap().key, d.h(p)), (30, Some(30)));

        // Expanding the only open node closes it and opens its neighbours.
        assert_eq!(d.process_state(), Some(40));
        assert_eq!(d.tag(p), Some(Tag::Closed));
        assert_eq!(d.parent(Point::new(0, 0)), Some(p));
        assert_eq!(d.h(Point::new(0, 0)), Some(44));

        // A closed node keeps its old estimate as key when raised.
        d.insert(p, 90);
        assert_eq!((d.node(p).unwrap().key, d.h(p)), (30, Some(90)));
        assert_eq!(d.min_key(), Some(30));
    }

    #[test]
    fn process_state_on_empty_queue() {
        let mut d = DStar::new(CostGrid::new(2, 2), true);
        assert_eq!(d.process_state(), None);
        assert_eq!(d.open_len(), 0);
        assert_eq!(d.path_from(Point::ZERO), Err(PathError::NotPlanned));
    }

    #[test]
    fn uniform_plan_follows_chebyshev_diagonal() {
        let mut d = DStar::new(CostGrid::new(5, 5), true);
        d.plan(Point::new(0, 0), Point::new(4, 4)).unwrap();
        let path = d.path_from(Point::new(0, 0)).unwrap();
        assert_eq!(path.len(), crate::chebyshev(Point::new(0, 0), Point::new(4, 4)) as usize + 1);
        assert_eq!(d.h(Point::new(0, 0)), Some(56));
        assert_eq!(d.h(Point::new(0, 0)), Some(crate::octile(Point::new(0, 0), Point::new(4, 4), 10, 14)));
        let hs: Vec<i64> = path.iter().map(|&p| d.h(p).unwrap()).collect();
        assert!(hs.windows(2).all(|w| w[0] > w[1]), "{hs:?}");
        assert_eq!(hs.last(), Some(&0));
    }

    #[test]
    fn four_connected_plan_walks_manhattan() {
        let mut d = DStar::new(CostGrid::new(5, 5), false);
        d.plan(Point::new(0, 0), Point::new(4, 4)).unwrap();
        let path = d.path_from(Point::new(0, 0)).unwrap();
        assert_eq!(path.len(), 9);
        assert_eq!(d.h(Point::new(0, 0)), Some(80));
        assert!(path.windows(2).all(|w| !w[0].is_diagonal_to(w[1])));
    }

    #[test]
    fn sealed_target_has_no_path() {
        let known = CostGrid::from_ascii(
            "\
.....
.###.
.#.#.
.###.
.....",
        )
        .unwrap();
        let mut d = DStar::new(known, true);
        assert_eq!(
            d.plan(Point::new(0, 0), Point::new(2, 2)),
            Err(PathError::NoPathFound { at: Point::new(0, 0) })
        );
    }

    #[test]
    fn plan_clamps_coordinates() {
        let mut d = DStar::new(CostGrid::new(4, 4), true);
        d.plan(Point::new(-5, -5), Point::new(10, 10)).unwrap();
        assert_eq!(d.target(), Some(Point::new(3, 3)));
        assert_eq!(d.tag(Point::new(0, 0)), Some(Tag::Closed));
    }

    #[test]
    fn edge_costs_respect_known_obstacles() {
        let d = DStar::new(CostGrid::from_ascii(".#\n#.").unwrap(), true);
        assert_eq!(d.edge_cost(Point::new(0, 0), Point::new(1, 1)), BLOCKED);
        assert_eq!(d.edge_cost(Point::new(0, 0), Point::new(1, 0)), BLOCKED);
        assert_eq!(d.edge_cost(Point::new(1, 0), Point::new(1, 1)), BLOCKED);

        let d = DStar::new(CostGrid::from_ascii("..\n#3").unwrap(), true);
        assert_eq!(d.edge_cost(Point::new(0, 0), Point::new(1, 1)), 42);
        assert_eq!(d.edge_cost(Point::new(1, 1), Point::new(0, 0)), 14);
        assert_eq!(d.edge_cost(Point::new(0, 0), Point::new(1, 0)), 10);
    }

    #[test]
    fn zero_cost_terrain_keeps_edges_positive() {
        let mut known = CostGrid::new(3, 1);
        known.set_cost(Point::new(1, 0), 0);
        let d = DStar::new(known, true);
        assert_eq!(d.edge_cost(Point::new(0, 0), Point::new(1, 0)), 1);
        assert_eq!(d.edge_cost(Point::new(1, 0), Point::new(0, 0)), 10);
    }

    #[test]
    fn plan_matches_reference() {
        let mut rng = StdRng::seed_from_u64(17);
        for round in 0..30 {
            let diagonals = round % 2 == 0;
            let start = Point::new(0, 0);
            let target = Point::new(rng.random_range(0..12), rng.random_range(0..10));
            let known = random_grid(&mut rng, 12, 10, &[start, target]);
            let mut d = DStar::new(known, diagonals);
            let expected = reference(&d, target, diagonals)[0];
            match d.plan(start, target) {
                Ok(()) => {
                    assert_eq!(d.h(start), expected);
                    let path = d.path_from(start).unwrap();
                    assert_eq!(Some(d.path_cost(&path)), expected);
                }
                Err(e) => {
                    assert_eq!(expected, None);
                    assert_eq!(e, PathError::NoPathFound { at: start });
                }
            }
        }
    }

    #[test]
    fn repair_agrees_with_fresh_plan() {
        let mut rng = StdRng::seed_from_u64(1234);
        for round in 0..20 {
            let diagonals = round % 3 != 0;
            let start = Point::new(1, 1);
            let target = Point::new(13, 10);
            let known = random_grid(&mut rng, 15, 12, &[start, target]);
            let mut d = DStar::new(known, diagonals);
            if d.plan(start, target).is_err() {
                continue;
            }

            for _ in 0..4 {
                for _ in 0..6 {
                    let p = Point::new(rng.random_range(0..15), rng.random_range(0..12));
                    if p == start || p == target {
                        continue;
                    }
                    let cost = match rng.random_range(0..3) {
                        0 => IMPASSABLE,
                        1 => rng.random_range(1..4),
                        _ => 1,
                    };
                    d.update_cell(p, cost);
                }
                d.repair();
                assert_eq!(d.open_len(), 0);

                let mut fresh = DStar::new(d.known().clone(), diagonals);
                match fresh.plan(start, target) {
                    Ok(()) => {
                        let path = d.path_from(start).unwrap();
                        assert_eq!(d.path_cost(&path), fresh.h(start).unwrap());
                        assert_eq!(d.h(start), fresh.h(start));
                    }
                    Err(_) => {
                        assert!(d.h(start).unwrap() >= BLOCKED);
                        assert!(d.path_from(start).is_err());
                    }
                }
            }
        }
    }

    #[test]
    fn repair_agrees_with_fresh_plan_over_free_terrain() {
        let mut rng = StdRng::seed_from_u64(808);
        let (start, target) = (Point::new(0, 0), Point::new(9, 7));
        let mut checked = 0;
        for round in 0..40 {
            let diagonals = round % 2 == 0;
            let mut known = random_grid(&mut rng, 10, 8, &[start, target]);
            for p in known.bounds() {
                if p != start && p != target && rng.random_range(0..6) == 0 {
                    known.set_cost(p, 0);
                }
            }
            let mut d = DStar::new(known, diagonals);
            if d.plan(start, target).is_err() {
                continue;
            }
            for _ in 0..3 {
                for _ in 0..5 {
                    let p = Point::new(rng.random_range(0..10), rng.random_range(0..8));
                    if p == start || p == target {
                        continue;
                    }
                    let cost = match rng.random_range(0..4) {
                        0 => IMPASSABLE,
                        1 => 0,
                        _ => rng.random_range(1..4),
                    };
                    d.update_cell(p, cost);
                }
                d.repair();

                let mut fresh = DStar::new(d.known().clone(), diagonals);
                match fresh.plan(start, target) {
                    Ok(()) => {
                        let path = d.path_from(start).unwrap();
                        assert_eq!(d.path_cost(&path), fresh.h(start).unwrap());
                        checked += 1;
                    }
                    Err(_) => assert!(d.path_from(start).is_err()),
                }
            }
        }
        assert!(checked > 0);
    }

    #[test]
    fn open_keys_never_exceed_estimates() {
        let mut rng = StdRng::seed_from_u64(4242);
        for round in 0..200 {
            let diagonals = round % 2 == 0;
            let start = Point::new(0, 0);
            let target = Point::new(rng.random_range(0..8), rng.random_range(0..8));
            let known = random_grid(&mut rng, 8, 8, &[start, target]);
            let mut d = DStar::new(known, diagonals);
            let _ = d.plan(start, target);
            assert_open_keys_bounded(&d, "plan");

            for _ in 0..4 {
                let p = Point::new(rng.random_range(0..8), rng.random_range(0..8));
                let cost = match rng.random_range(0..3) {
                    0 => IMPASSABLE,
                    _ => rng.random_range(1..5),
                };
                d.update_cell(p, cost);
                assert_open_keys_bounded(&d, "update_cell");
                while d.process_state().is_some() {
                    assert_open_keys_bounded(&d, "process_state");
                }
                assert_open_keys_bounded(&d, "drained");
            }
        }
    }

    #[test]
    fn update_cell_ignores_no_ops() {
        let mut d = DStar::new(CostGrid::new(4, 4), true);
        d.plan(Point::new(0, 0), Point::new(3, 3)).unwrap();
        d.repair();
        assert_eq!(d.update_cell(Point::new(1, 1), 1), CostChange::Unchanged);
        assert_eq!(d.min_key(), None);
        assert_eq!(d.update_cell(Point::new(8, 8), IMPASSABLE), CostChange::OutOfBounds);
        assert_eq!(d.update_cell(Point::new(1, 1), IMPASSABLE), CostChange::ObstacleAdded);
        assert!(d.min_key().is_some());
        assert!(d.repair() > 0);
        let path = d.path_from(Point::new(0, 0)).unwrap();
        assert!(!path.contains(&Point::new(1, 1)));
    }

    #[test]
    fn observer_tracks_published_state() {
        let mut d = DStar::new(CostGrid::new(6, 6), true).with_observer(Recorder::default());
        d.plan(Point::new(0, 0), Point::new(5, 2)).unwrap();
        d.update_cell(Point::new(3, 2), IMPASSABLE);
        d.repair();
        assert!(d.observer().calls > 0);
        for (&p, &(h, parent)) in &d.observer().last {
            assert_eq!(d.node(p).unwrap().h, h, "at {p}");
            assert_eq!(d.parent(p), parent, "at {p}");
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn config_from_json() {
        let cfg: DStarConfig =
            serde_json::from_str(r#"{"sensor_radius":3,"diagonals":false,"max_steps":50}"#).unwrap();
        assert_eq!(
            cfg,
            DStarConfig {
                sensor_radius: 3,
                diagonals: false,
                max_steps: 50
            }
        );
        let json = serde_json::to_string(&DStarConfig::default()).unwrap();
        assert_eq!(serde_json::from_str::<DStarConfig>(&json).unwrap(), DStarConfig::default());
    }
}
