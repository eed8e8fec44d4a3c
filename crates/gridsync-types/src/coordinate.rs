use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer position of a cell in the grid.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: u32,
    pub y: u32,
}

impl Coordinate {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Debug for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(u32, u32)> for Coordinate {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

/// Dimensions of the grid, in cells.
///
/// Valid coordinates lie in `[0, width) × [0, height)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBounds {
    pub width: u32,
    pub height: u32,
}

impl GridBounds {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `true` if `coord` lies inside the grid.
    pub fn contains(&self, coord: Coordinate) -> bool {
        coord.x < self.width && coord.y < self.height
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Returns `true` if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Every in-bounds coordinate, column by column.
    pub fn coordinates(&self) -> impl Iterator<Item = Coordinate> {
        let height = self.height;
        (0..self.width).flat_map(move |x| (0..height).map(move |y| Coordinate::new(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_respects_exclusive_upper_bound() {
        let bounds = GridBounds::new(10, 5);
        assert!(bounds.contains(Coordinate::new(0, 0)));
        assert!(bounds.contains(Coordinate::new(9, 4)));
        assert!(!bounds.contains(Coordinate::new(10, 4)));
        assert!(!bounds.contains(Coordinate::new(9, 5)));
    }

    #[test]
    fn coordinates_cover_every_cell_once() {
        let bounds = GridBounds::new(3, 4);
        let coords: Vec<Coordinate> = bounds.coordinates().collect();
        assert_eq!(coords.len(), bounds.cell_count());
        let mut unique = coords.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 12);
        assert!(coords.iter().all(|c| bounds.contains(*c)));
    }

    #[test]
    fn zero_sized_bounds_are_empty() {
        assert!(GridBounds::new(0, 10).is_empty());
        assert!(GridBounds::new(10, 0).is_empty());
        assert_eq!(GridBounds::new(0, 10).coordinates().count(), 0);
    }

    #[test]
    fn display_and_tuple_conversion() {
        let c: Coordinate = (3, 4).into();
        assert_eq!(c, Coordinate::new(3, 4));
        assert_eq!(format!("{c}"), "(3, 4)");
    }
}
