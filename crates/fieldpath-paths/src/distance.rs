use fieldpath_core::Point;

/// Manhattan (L1) distance between two points.
#[inline]
pub fn manhattan(a: Point, b: Point) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// Chebyshev (L∞) distance between two points.
#[inline]
pub fn chebyshev(a: Point, b: Point) -> i32 {
    (a.x - b.x).abs().max((a.y - b.y).abs())
}

/// Octile distance: the cost of the cheapest 8-connected walk on uniform
/// terrain, with `cardinal` per straight step and `diagonal` per diagonal one.
#[inline]
pub fn octile(a: Point, b: Point, cardinal: i64, diagonal: i64) -> i64 {
    let dx = i64::from((a.x - b.x).abs());
    let dy = i64::from((a.y - b.y).abs());
    let (lo, hi) = if dx < dy { (dx, dy) } else { (dy, dx) };
    diagonal * lo + cardinal * (hi - lo)
}
