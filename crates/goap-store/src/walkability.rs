//! The walkability grid: a column-major `bool` array over the world's
//! bounds.

use im::Vector;

/// An immutable, cheaply-clonable walkability grid.
#[derive(Debug, Clone)]
pub struct WalkabilityGrid {
    width: i32,
    height: i32,
    /// Column-major: `cells[x * height + y]`.
    cells: Vector<bool>,
}

impl WalkabilityGrid {
    /// Build a grid where every cell is walkable.
    #[must_use]
    pub fn all_walkable(width: i32, height: i32) -> Self {
        let size = usize_area(width, height);
        Self {
            width,
            height,
            cells: std::iter::repeat_n(true, size).collect(),
        }
    }

    /// Build a grid from a column-major override. The override must
    /// contain at least one walkable cell, and its length must equal
    /// `width * height`.
    #[must_use]
    pub fn from_override(width: i32, height: i32, cells: Vec<bool>) -> Option<Self> {
        if cells.len() != usize_area(width, height) || !cells.iter().any(|w| *w) {
            return None;
        }
        Some(Self {
            width,
            height,
            cells: cells.into_iter().collect(),
        })
    }

    /// Grid width.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Grid height.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Whether `(x, y)` is in bounds and walkable.
    #[must_use]
    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        self.index(x, y).and_then(|i| self.cells.get(i)).copied().unwrap_or(false)
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        #[allow(clippy::cast_sign_loss)]
        let (x, y, height) = (x as usize, y as usize, self.height as usize);
        Some(x * height + y)
    }

    /// Column-major snapshot of the grid, for persistence.
    #[must_use]
    pub fn to_vec(&self) -> Vec<bool> {
        self.cells.iter().copied().collect()
    }
}

fn usize_area(width: i32, height: i32) -> usize {
    #[allow(clippy::cast_sign_loss)]
    let (w, h) = (width.max(0) as usize, height.max(0) as usize);
    w.saturating_mul(h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_walkable_grid_covers_bounds() {
        let grid = WalkabilityGrid::all_walkable(3, 3);
        assert!(grid.is_walkable(0, 0));
        assert!(grid.is_walkable(2, 2));
    }

    #[test]
    fn out_of_bounds_is_never_walkable() {
        let grid = WalkabilityGrid::all_walkable(3, 3);
        assert!(!grid.is_walkable(-1, 0));
        assert!(!grid.is_walkable(3, 0));
    }

    #[test]
    fn override_requires_length_match() {
        assert!(WalkabilityGrid::from_override(2, 2, vec![true, true, true]).is_none());
    }

    #[test]
    fn override_requires_at_least_one_walkable_cell() {
        assert!(WalkabilityGrid::from_override(2, 2, vec![false; 4]).is_none());
    }

    #[test]
    fn round_trip_preserves_cells() {
        let cells = vec![true, false, false, true];
        let grid = WalkabilityGrid::from_override(2, 2, cells.clone());
        let grid = grid.unwrap_or_else(|| WalkabilityGrid::all_walkable(2, 2));
        assert_eq!(grid.to_vec(), cells);
    }
}
