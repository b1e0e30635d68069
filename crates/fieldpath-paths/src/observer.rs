//! Notification hooks for rendering or debugging layers.
//!
//! Engines call these synchronously whenever a cell's published state
//! changes. Implementations must return quickly; they get no say in the
//! search.

use fieldpath_core::Point;

use crate::direction::Direction;

/// Receives flow-field updates.
pub trait FieldObserver {
    /// `distance` is `None` while the cell is uninitialized.
    fn on_field_updated(&mut self, p: Point, distance: Option<i32>, direction: Option<Direction>);
}

/// Receives incremental-search updates.
pub trait SearchObserver {
    fn on_node_updated(&mut self, p: Point, h: i64, parent: Option<Point>);
}

impl FieldObserver for () {
    #[inline]
    fn on_field_updated(&mut self, _: Point, _: Option<i32>, _: Option<Direction>) {}
}

impl SearchObserver for () {
    #[inline]
    fn on_node_updated(&mut self, _: Point, _: i64, _: Option<Point>) {}
}

impl<T: FieldObserver + ?Sized> FieldObserver for &mut T {
    #[inline]
    fn on_field_updated(&mut self, p: Point, distance: Option<i32>, direction: Option<Direction>) {
        (**self).on_field_updated(p, distance, direction);
    }
}

impl<T: SearchObserver + ?Sized> SearchObserver for &mut T {
    #[inline]
    fn on_node_updated(&mut self, p: Point, h: i64, parent: Option<Point>) {
        (**self).on_node_updated(p, h, parent);
    }
}
