use std::fmt;

use crate::util::Color;

const VEGETATION_COLOR: Color = Color::rgb(100, 250, 0);
const TERRAIN_COLOR: Color = Color::rgb(169, 169, 169);
const BURNING_COLOR: Color = Color::rgb(255, 165, 0);
const BURNT_COLOR: Color = Color::rgb(0, 0, 0);

/// The state a single grid position can be in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellState {
    /// Unburned fuel. Can be ignited by a burning neighbor.
    Vegetation,
    /// Impassable ground. Never transitions on its own.
    Terrain,
    Burning,
    /// Ash. May regrow into vegetation.
    Burnt,
}

impl CellState {
    pub const ALL: [CellState; 4] = [
        CellState::Vegetation,
        CellState::Terrain,
        CellState::Burning,
        CellState::Burnt,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CellState::Vegetation => "vegetation",
            CellState::Terrain => "terrain",
            CellState::Burning => "burning",
            CellState::Burnt => "burnt",
        }
    }

    /// Display color for renderers. Carries no meaning for the simulation.
    pub fn color(&self) -> Color {
        match self {
            CellState::Vegetation => VEGETATION_COLOR,
            CellState::Terrain => TERRAIN_COLOR,
            CellState::Burning => BURNING_COLOR,
            CellState::Burnt => BURNT_COLOR,
        }
    }

    pub fn burning(&self) -> bool {
        matches!(self, CellState::Burning)
    }
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One grid position: its state plus the coordinates it lives at.
///
/// The coordinates duplicate the cell's index in the grid so that a
/// neighborhood result can be mapped back to positions without extra
/// bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    pub state: CellState,
    pub x: usize,
    pub y: usize,
}

impl Cell {
    pub const fn new(state: CellState, x: usize, y: usize) -> Self {
        Self { state, x, y }
    }

    pub fn position(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    pub fn color(&self) -> Color {
        self.state.color()
    }
}
