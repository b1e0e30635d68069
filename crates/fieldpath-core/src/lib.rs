//! Grid substrate for the fieldpath planners.
//!
//! This crate provides geometry primitives and [`CostGrid`], a fixed grid of
//! per-cell terrain costs with a reserved [`IMPASSABLE`] value. Planning
//! engines in `fieldpath-paths` consume it and key their own per-cell state
//! by the grid's stable cell index.

pub mod geom;
pub mod grid;

pub use geom::{Point, Range, RangeIter};
pub use grid::{Cost, CostChange, CostGrid, DEFAULT_COST, GridError, IMPASSABLE};
