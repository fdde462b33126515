use std::fmt;

use super::cell::{Cell, CellState};

/// A square, row-major matrix of cells.
///
/// Every position always holds exactly one cell whose coordinates match its
/// position. Out-of-range coordinates are never a fault: reads return `None`
/// and writes are ignored, which keeps neighborhood walks at the edges simple.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    cells: Vec<Cell>,
}

/// Number of cells in each state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CellCensus {
    pub vegetation: usize,
    pub terrain: usize,
    pub burning: usize,
    pub burnt: usize,
}

impl CellCensus {
    pub fn total(&self) -> usize {
        self.vegetation + self.terrain + self.burning + self.burnt
    }

    pub fn count(&self, state: CellState) -> usize {
        match state {
            CellState::Vegetation => self.vegetation,
            CellState::Terrain => self.terrain,
            CellState::Burning => self.burning,
            CellState::Burnt => self.burnt,
        }
    }
}

impl fmt::Display for CellCensus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} burning, {} vegetation, {} burnt, {} terrain",
            self.burning, self.vegetation, self.burnt, self.terrain
        )
    }
}

impl Grid {
    /// A `size × size` grid of terrain.
    pub fn new(size: usize) -> Grid {
        let cells = (0..size * size)
            .map(|i| Cell::new(CellState::Terrain, i % size, i / size))
            .collect();
        Grid { size, cells }
    }

    /// A `size × size` grid where each cell is independently vegetation with
    /// probability `generation`, terrain otherwise.
    pub fn seeded(size: usize, generation: f64, rng: &mut fastrand::Rng) -> Grid {
        let mut grid = Grid::new(size);
        grid.seed(generation, rng);
        grid
    }

    /// Re-randomizes every cell, discarding whatever was there (fire included).
    pub fn seed(&mut self, generation: f64, rng: &mut fastrand::Rng) {
        for cell in &mut self.cells {
            cell.state = if rng.f64() < generation {
                CellState::Vegetation
            } else {
                CellState::Terrain
            };
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[Cell]> {
        // `chunks` rejects a zero width; an empty grid has no cells to chunk anyway.
        self.cells.chunks(self.size.max(1))
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.size && y < self.size
    }

    pub fn index_of(&self, x: usize, y: usize) -> Option<usize> {
        self.contains(x, y).then(|| y * self.size + x)
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Cell> {
        self.index_of(x, y).map(|i| self.cells[i])
    }

    /// Sets the state at `(x, y)`. Returns `false`, leaving the grid
    /// untouched, when the position is outside the grid.
    pub fn set(&mut self, x: usize, y: usize, state: CellState) -> bool {
        match self.index_of(x, y) {
            Some(i) => {
                self.cells[i].state = state;
                true
            }
            None => false,
        }
    }

    /// Cells within Manhattan distance `radius` of `(x, y)`, clipped to the
    /// grid, in raster order (top row first, left to right).
    pub fn neighborhood(&self, x: usize, y: usize, radius: usize) -> Vec<Cell> {
        let mut out = Vec::with_capacity(2 * radius * (radius + 1) + 1);
        self.neighborhood_into(x, y, radius, &mut out);
        out
    }

    /// Same as [`Grid::neighborhood`] but writes into `out`, clearing it first.
    pub fn neighborhood_into(&self, x: usize, y: usize, radius: usize, out: &mut Vec<Cell>) {
        out.clear();
        if self.size == 0 {
            return;
        }
        let last = self.size - 1;
        let top = y.saturating_sub(radius);
        let bottom = y.saturating_add(radius).min(last);
        let left = x.saturating_sub(radius);
        let right = x.saturating_add(radius).min(last);

        for row in top..=bottom {
            let dy = y.abs_diff(row);
            for col in left..=right {
                if dy + x.abs_diff(col) <= radius {
                    out.push(self.cells[row * self.size + col]);
                }
            }
        }
    }

    pub fn census(&self) -> CellCensus {
        let mut census = CellCensus::default();
        for cell in &self.cells {
            match cell.state {
                CellState::Vegetation => census.vegetation += 1,
                CellState::Terrain => census.terrain += 1,
                CellState::Burning => census.burning += 1,
                CellState::Burnt => census.burnt += 1,
            }
        }
        census
    }

    pub fn any_burning(&self) -> bool {
        self.cells.iter().any(|c| c.state.burning())
    }

    pub fn random_position(&self, rng: &mut fastrand::Rng) -> Option<(usize, usize)> {
        if self.size == 0 {
            return None;
        }
        Some((rng.usize(..self.size), rng.usize(..self.size)))
    }

    /// Overwrites this grid with `other`, reusing the existing allocation.
    pub fn copy_from(&mut self, other: &Grid) {
        self.size = other.size;
        self.cells.clone_from(&other.cells);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets(grid: &Grid, x: usize, y: usize, radius: usize) -> Vec<(isize, isize)> {
        grid.neighborhood(x, y, radius)
            .iter()
            .map(|c| (c.x as isize - x as isize, c.y as isize - y as isize))
            .collect()
    }

    #[test]
    fn shape_holds_for_small_sizes() {
        let mut rng = fastrand::Rng::with_seed(7);
        for size in 0..=16 {
            let grid = Grid::seeded(size, 0.5, &mut rng);
            assert_eq!(grid.len(), size * size);
            assert_eq!(grid.rows().len(), size);
            for (y, row) in grid.rows().enumerate() {
                assert_eq!(row.len(), size);
                for (x, cell) in row.iter().enumerate() {
                    assert_eq!(cell.position(), (x, y));
                }
            }
        }
    }

    #[test]
    fn out_of_bounds_access_is_a_no_op() {
        let mut grid = Grid::new(4);
        let before = grid.clone();
        assert_eq!(grid.get(4, 0), None);
        assert_eq!(grid.get(0, 4), None);
        assert_eq!(grid.get(usize::MAX, usize::MAX), None);
        assert!(!grid.set(4, 4, CellState::Burning));
        assert!(!grid.set(0, 17, CellState::Burning));
        assert_eq!(grid, before);

        assert!(grid.set(3, 2, CellState::Burning));
        assert_eq!(grid.get(3, 2), Some(Cell::new(CellState::Burning, 3, 2)));
    }

    #[test]
    fn seeding_respects_extremes() {
        let mut rng = fastrand::Rng::with_seed(1);
        let all_vegetation = Grid::seeded(20, 1.0, &mut rng);
        assert_eq!(all_vegetation.census().vegetation, 400);
        let all_terrain = Grid::seeded(20, 0.0, &mut rng);
        assert_eq!(all_terrain.census().terrain, 400);
    }

    #[test]
    fn interior_neighborhood_is_a_diamond_in_raster_order() {
        let grid = Grid::new(500);
        assert_eq!(
            offsets(&grid, 50, 50, 2),
            vec![
                (0, -2),
                (-1, -1),
                (0, -1),
                (1, -1),
                (-2, 0),
                (-1, 0),
                (0, 0),
                (1, 0),
                (2, 0),
                (-1, 1),
                (0, 1),
                (1, 1),
                (0, 2),
            ]
        );
    }

    #[test]
    fn neighborhood_shrinks_at_edges() {
        let grid = Grid::new(10);
        assert_eq!(grid.neighborhood(0, 0, 2).len(), 6);
        assert_eq!(grid.neighborhood(9, 9, 2).len(), 6);
        assert_eq!(grid.neighborhood(0, 5, 2).len(), 9);
        assert_eq!(grid.neighborhood(5, 9, 2).len(), 9);
        assert_eq!(grid.neighborhood(1, 1, 2).len(), 11);
        assert_eq!(
            offsets(&grid, 0, 0, 2),
            vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (0, 2)]
        );
    }

    #[test]
    fn neighborhood_of_degenerate_inputs() {
        assert!(Grid::new(0).neighborhood(0, 0, 2).is_empty());
        assert_eq!(Grid::new(1).neighborhood(0, 0, 2).len(), 1);
        assert_eq!(Grid::new(5).neighborhood(2, 2, 0).len(), 1);
        assert!(Grid::new(5).neighborhood(40, 40, 2).is_empty());
    }

    #[test]
    fn census_counts_every_cell() {
        let mut grid = Grid::new(3);
        grid.set(0, 0, CellState::Burning);
        grid.set(1, 0, CellState::Burnt);
        grid.set(2, 0, CellState::Vegetation);
        let census = grid.census();
        assert_eq!(census.burning, 1);
        assert_eq!(census.burnt, 1);
        assert_eq!(census.vegetation, 1);
        assert_eq!(census.terrain, 6);
        assert_eq!(census.total(), 9);
        assert_eq!(census.count(CellState::Terrain), 6);
        assert_eq!(
            census.to_string(),
            "1 burning, 1 vegetation, 1 burnt, 6 terrain"
        );
        assert!(grid.any_burning());
    }

    #[test]
    fn copy_from_replaces_contents() {
        let mut rng = fastrand::Rng::with_seed(3);
        let source = Grid::seeded(8, 0.5, &mut rng);
        let mut target = Grid::new(8);
        target.copy_from(&source);
        assert_eq!(target, source);
    }
}
