//! The wildfire automaton: cells, the grid they live on, the probabilities
//! that drive them, and the engine that advances them tick by tick.

pub mod cell;
pub mod engine;
pub mod grid;
pub mod probability;
pub mod runner;

pub use cell::{Cell, CellState};
pub use engine::{COMBUSTION_TRIALS, Environment, SPREAD_RADIUS};
pub use grid::{CellCensus, Grid};
pub use probability::{
    InvalidProbability, ProbabilityModel, ProbabilityName, UnknownProbabilityName,
};
pub use runner::{Simulation, SimulationStatistics, spawn_simulation};
