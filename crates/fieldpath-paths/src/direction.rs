//! The fixed 8-direction compass used by flow fields.
//!
//! Angles are counter-clockwise from "right" in 45° steps. Offsets use the
//! grid's screen coordinates, so [`Direction::Top`] moves towards `y - 1`.

use fieldpath_core::Point;

/// One of the eight compass directions. "No direction" is `None` in an
/// `Option<Direction>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    Right,
    TopRight,
    Top,
    TopLeft,
    Left,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl Direction {
    /// All directions in angle order (0°, 45°, ..., 315°).
    pub const ALL: [Direction; 8] = [
        Self::Right,
        Self::TopRight,
        Self::Top,
        Self::TopLeft,
        Self::Left,
        Self::BottomLeft,
        Self::Bottom,
        Self::BottomRight,
    ];

    /// Order in which a flow-field cell scans its neighbours. Ties keep the
    /// earliest entry, so this order is part of the output format.
    pub const SCAN_ORDER: [Direction; 8] = [
        Self::Left,
        Self::Right,
        Self::Top,
        Self::Bottom,
        Self::TopLeft,
        Self::BottomLeft,
        Self::BottomRight,
        Self::TopRight,
    ];

    /// Angle in degrees, one of `0, 45, ..., 315`.
    #[inline]
    pub fn degrees(self) -> u16 {
        self as u16 * 45
    }

    /// Inverse of [`degrees`](Self::degrees). Any other angle gives `None`.
    pub fn from_degrees(deg: u16) -> Option<Self> {
        if deg % 45 != 0 {
            return None;
        }
        Self::ALL.get(usize::from(deg / 45)).copied()
    }

    /// Grid offset of one step in this direction.
    #[inline]
    pub fn offset(self) -> Point {
        match self {
            Self::Right => Point::new(1, 0),
            Self::TopRight => Point::new(1, -1),
            Self::Top => Point::new(0, -1),
            Self::TopLeft => Point::new(-1, -1),
            Self::Left => Point::new(-1, 0),
            Self::BottomLeft => Point::new(-1, 1),
            Self::Bottom => Point::new(0, 1),
            Self::BottomRight => Point::new(1, 1),
        }
    }

    /// The two cardinal directions flanking a diagonal, or `None` for a
    /// cardinal direction.
    pub fn flanks(self) -> Option<(Direction, Direction)> {
        match self {
            Self::TopRight => Some((Self::Top, Self::Right)),
            Self::TopLeft => Some((Self::Top, Self::Left)),
            Self::BottomLeft => Some((Self::Bottom, Self::Left)),
            Self::BottomRight => Some((Self::Bottom, Self::Right)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrees_are_multiples_of_45() {
        let degs: Vec<u16> = Direction::ALL.iter().map(|d| d.degrees()).collect();
        assert_eq!(degs, vec![0, 45, 90, 135, 180, 225, 270, 315]);
        for d in Direction::ALL {
            assert_eq!(Direction::from_degrees(d.degrees()), Some(d));
        }
        assert_eq!(Direction::from_degrees(360), None);
        assert_eq!(Direction::from_degrees(30), None);
    }

    #[test]
    fn flanks_only_for_diagonals() {
        for d in Direction::ALL {
            assert_eq!(d.degrees() % 90 != 0, d.flanks().is_some());
            if let Some((a, b)) = d.flanks() {
                assert_eq!(a.offset() + b.offset(), d.offset());
            }
        }
    }

    #[test]
    fn scan_order_is_a_permutation() {
        let mut seen = Direction::SCAN_ORDER.to_vec();
        seen.sort_by_key(|d| d.degrees());
        assert_eq!(seen, Direction::ALL.to_vec());
        assert!(Direction::SCAN_ORDER[..4].iter().all(|d| d.flanks().is_none()));
    }
}
