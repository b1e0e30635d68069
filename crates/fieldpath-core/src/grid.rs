//! The [`CostGrid`] substrate shared by every planning engine.
//!
//! Each cell owns exactly one terrain [`Cost`]. Cells are stored in a flat
//! row-major arena, so the index of a cell never changes after construction;
//! engines key their own per-cell state by that index. Toggling an obstacle
//! rewrites a cost in place, it never removes the cell.

use std::fmt;

use crate::geom::{Point, Range};

/// Terrain cost of entering a cell.
pub type Cost = u8;

/// Reserved cost meaning "cannot be entered".
pub const IMPASSABLE: Cost = Cost::MAX;

/// Cost given to every cell of a fresh grid.
pub const DEFAULT_COST: Cost = 1;

/// What a call to [`CostGrid::set_cost`] did to the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CostChange {
    /// The cell already had that cost.
    Unchanged,
    /// A passable cost was replaced by another passable cost.
    Changed,
    /// A passable cell became impassable.
    ObstacleAdded,
    /// An impassable cell became passable.
    ObstacleRemoved,
    /// The point lies outside the grid; nothing was written.
    OutOfBounds,
}

impl CostChange {
    /// Whether the grid contents differ after the call.
    #[inline]
    pub fn is_change(self) -> bool {
        matches!(
            self,
            Self::Changed | Self::ObstacleAdded | Self::ObstacleRemoved
        )
    }
}

/// A fixed `cols × rows` grid of terrain costs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CostGrid {
    cols: i32,
    rows: i32,
    cells: Vec<Cost>,
    obstacles: usize,
}

impl CostGrid {
    /// Create a grid where every cell costs [`DEFAULT_COST`].
    ///
    /// Negative dimensions are treated as zero.
    pub fn new(cols: i32, rows: i32) -> Self {
        let cols = cols.max(0);
        let rows = rows.max(0);
        Self {
            cols,
            rows,
            cells: vec![DEFAULT_COST; (cols as usize) * (rows as usize)],
            obstacles: 0,
        }
    }

    /// Parse a grid from ASCII art.
    ///
    /// `#` is impassable, `.` costs 1 and the digits `1`-`9` cost their
    /// value. Leading and trailing whitespace of the whole string is
    /// trimmed; every line must have the same width.
    pub fn from_ascii(s: &str) -> Result<Self, GridError> {
        let s = s.trim();
        let lines: Vec<&str> = s.lines().map(str::trim_end).collect();
        let cols = lines.first().map_or(0, |l| l.chars().count());
        if lines.iter().any(|l| l.chars().count() != cols) {
            return Err(GridError::InconsistentSize(s.to_string()));
        }

        let mut grid = Self::new(cols as i32, lines.len() as i32);
        for (y, line) in lines.iter().enumerate() {
            for (x, ch) in line.chars().enumerate() {
                let pos = Point::new(x as i32, y as i32);
                let cost = match ch {
                    '#' => IMPASSABLE,
                    '.' => DEFAULT_COST,
                    '1'..='9' => ch as Cost - b'0',
                    _ => return Err(GridError::InvalidChar { ch, pos }),
                };
                grid.set_cost(pos, cost);
            }
        }
        Ok(grid)
    }

    /// Number of columns (width).
    #[inline]
    pub fn cols(&self) -> i32 {
        self.cols
    }

    /// Number of rows (height).
    #[inline]
    pub fn rows(&self) -> i32 {
        self.rows
    }

    /// Number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the grid has no cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The range `[0, cols) × [0, rows)`.
    #[inline]
    pub fn bounds(&self) -> Range {
        Range::new(0, 0, self.cols, self.rows)
    }

    /// Whether `p` is a cell of this grid.
    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && p.x < self.cols && p.y < self.rows
    }

    /// Clamp `p` into `[0, cols-1] × [0, rows-1]`.
    #[inline]
    pub fn clamp(&self, p: Point) -> Point {
        self.bounds().clamp(p)
    }

    /// Flat arena index of `p`, or `None` if out of bounds.
    #[inline]
    pub fn idx(&self, p: Point) -> Option<usize> {
        if !self.contains(p) {
            return None;
        }
        Some((p.y as usize) * (self.cols as usize) + p.x as usize)
    }

    /// Point at arena index `i`.
    #[inline]
    pub fn point(&self, i: usize) -> Point {
        let w = self.cols.max(1) as usize;
        Point::new((i % w) as i32, (i / w) as i32)
    }

    /// Terrain cost at `p`, or `None` if out of bounds.
    #[inline]
    pub fn cost(&self, p: Point) -> Option<Cost> {
        self.idx(p).map(|i| self.cells[i])
    }

    /// Terrain cost at arena index `i`.
    #[inline]
    pub fn cost_at_idx(&self, i: usize) -> Cost {
        self.cells[i]
    }

    /// Whether `p` is impassable. Points outside the grid are impassable.
    #[inline]
    pub fn is_impassable(&self, p: Point) -> bool {
        self.cost(p).is_none_or(|c| c == IMPASSABLE)
    }

    /// Whether `p` is inside the grid and can be entered.
    #[inline]
    pub fn is_passable(&self, p: Point) -> bool {
        !self.is_impassable(p)
    }

    /// Number of impassable cells.
    #[inline]
    pub fn obstacle_count(&self) -> usize {
        self.obstacles
    }

    /// Write a new cost at `p` and keep the obstacle bookkeeping current.
    ///
    /// This never recomputes any derived field; callers react to the
    /// returned [`CostChange`].
    pub fn set_cost(&mut self, p: Point, value: Cost) -> CostChange {
        let Some(i) = self.idx(p) else {
            return CostChange::OutOfBounds;
        };
        let old = self.cells[i];
        if old == value {
            return CostChange::Unchanged;
        }
        self.cells[i] = value;
        let change = match (old == IMPASSABLE, value == IMPASSABLE) {
            (false, true) => {
                self.obstacles += 1;
                CostChange::ObstacleAdded
            }
            (true, false) => {
                self.obstacles -= 1;
                CostChange::ObstacleRemoved
            }
            _ => CostChange::Changed,
        };
        log::trace!("cost at {p} changed {old} -> {value} ({change:?})");
        change
    }

    /// Append the in-bounds neighbours of `p` to `buf`: the four sharing an
    /// edge, or all eight when `diagonals` is set. Clockwise from up.
    ///
    /// The caller clears `buf` before calling.
    pub fn neighbors(&self, p: Point, diagonals: bool, buf: &mut Vec<Point>) {
        if diagonals {
            buf.extend(p.neighbors_8().into_iter().filter(|&n| self.contains(n)));
        } else {
            buf.extend(p.neighbors_4().into_iter().filter(|&n| self.contains(n)));
        }
    }

    /// Row-major iterator over every cell and its cost.
    pub fn iter(&self) -> impl Iterator<Item = (Point, Cost)> + '_ {
        self.bounds().iter().zip(self.cells.iter().copied())
    }
}

/// Wire form of a [`CostGrid`]. A serialized `obstacles` field is ignored
/// and recounted from the cells.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawGrid {
    cols: i32,
    rows: i32,
    cells: Vec<Cost>,
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for CostGrid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let raw = RawGrid::deserialize(deserializer)?;
        if raw.cols < 0 || raw.rows < 0 {
            return Err(D::Error::custom(format!(
                "grid: negative dimensions {}x{}",
                raw.cols, raw.rows
            )));
        }
        let expected = raw.cols as usize * raw.rows as usize;
        if raw.cells.len() != expected {
            return Err(D::Error::custom(format!(
                "grid: {}x{} needs {expected} cells, got {}",
                raw.cols,
                raw.rows,
                raw.cells.len()
            )));
        }
        let obstacles = raw.cells.iter().filter(|&&c| c == IMPASSABLE).count();
        Ok(Self {
            cols: raw.cols,
            rows: raw.rows,
            cells: raw.cells,
            obstacles,
        })
    }
}

impl fmt::Display for CostGrid {
    /// Renders the grid in the format accepted by [`CostGrid::from_ascii`];
    /// costs above 9 are shown as `+`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.rows {
            for x in 0..self.cols {
                let ch = match self.cells[(y * self.cols + x) as usize] {
                    IMPASSABLE => '#',
                    DEFAULT_COST => '.',
                    c @ 2..=9 => (b'0' + c) as char,
                    _ => '+',
                };
                write!(f, "{ch}")?;
            }
            if y + 1 < self.rows {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Errors from parsing a [`CostGrid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// Lines have inconsistent widths.
    InconsistentSize(String),
    /// A character with no cost meaning was found.
    InvalidChar { ch: char, pos: Point },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InconsistentSize(s) => write!(f, "grid: inconsistent line widths:\n{s}"),
            Self::InvalidChar { ch, pos } => {
                write!(f, "grid: invalid character \u{201c}{ch}\u{201d} at {pos}")
            }
        }
    }
}

impl std::error::Error for GridError {}
