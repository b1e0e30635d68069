//! Grid planners built on [`fieldpath_core::CostGrid`].
//!
//! Two engines live here:
//!
//! - **Flow fields** ([`FlowField`], [`FlowMap`]): a single-target
//!   integration pass followed by an 8-direction flow pass, so that any
//!   number of units can read their next move from one shared field.
//! - **D\*** ([`DStar`], [`Agent`]): an incremental planner that keeps a
//!   back-pointer tree towards the target and repairs only the affected
//!   part of it when the known costs change.
//!
//! Both engines key their per-cell state by the grid's cell index and reuse
//! their internal buffers between runs.
//!
//! # Extension points
//!
//! | Trait | Used by |
//! |---|---|
//! | [`StepCost`] | [`DStar`], [`Agent`] |
//! | [`FieldObserver`] | [`FlowField`], [`FlowMap`] |
//! | [`SearchObserver`] | [`DStar`], [`Agent`] |

mod agent;
mod direction;
mod distance;
mod dstar;
mod error;
mod flowfield;
pub mod observer;
mod traits;

pub use agent::{Agent, StepOutcome};
pub use direction::Direction;
pub use distance::{chebyshev, manhattan, octile};
pub use dstar::{BLOCKED, DStar, DStarConfig, INFINITE, SearchNode, Tag};
pub use error::PathError;
pub use flowfield::{
    FlowField, FlowFieldConfig, FlowMap, FlowNode, Propagation, UNINITIALIZED, VisitState,
};
pub use observer::{FieldObserver, SearchObserver};
pub use traits::{Octile, StepCost};
