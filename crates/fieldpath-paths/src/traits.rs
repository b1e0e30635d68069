use fieldpath_core::{Cost, Point};

/// Caller-supplied scaling of a single move between adjacent cells.
///
/// The incremental planner handles blocked cells and corner cutting itself;
/// implementors only price moves between passable cells.
pub trait StepCost {
    /// Cost of moving from `from` to the adjacent cell `to`, whose terrain
    /// cost is `terrain`. The planner raises anything below 1 to 1, so
    /// zero-cost terrain still has positive edges.
    fn step_cost(&self, from: Point, to: Point, terrain: Cost) -> i64;
}

/// Integer octile pricing: `cardinal` per straight step and `diagonal` per
/// diagonal step, each multiplied by the terrain cost of the cell entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Octile {
    pub cardinal: i64,
    pub diagonal: i64,
}

impl Default for Octile {
    fn default() -> Self {
        Self {
            cardinal: 10,
            diagonal: 14,
        }
    }
}

impl StepCost for Octile {
    #[inline]
    fn step_cost(&self, from: Point, to: Point, terrain: Cost) -> i64 {
        let scale = if from.is_diagonal_to(to) {
            self.diagonal
        } else {
            self.cardinal
        };
        scale * i64::from(terrain)
    }
}

impl<T: StepCost + ?Sized> StepCost for &T {
    #[inline]
    fn step_cost(&self, from: Point, to: Point, terrain: Cost) -> i64 {
        (**self).step_cost(from, to, terrain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octile_scales_diagonals_and_terrain() {
        let o = Octile::default();
        let p = Point::new(1, 1);
        assert_eq!(o.step_cost(p, Point::new(2, 1), 1), 10);
        assert_eq!(o.step_cost(p, Point::new(2, 2), 1), 14);
        assert_eq!(o.step_cost(p, Point::new(2, 2), 3), 42);
        assert_eq!(o.step_cost(p, Point::new(1, 0), 0), 0);
    }
}
