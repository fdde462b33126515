//! Stochastic cellular-automaton wildfire simulation.
//!
//! An [`Environment`] owns a square grid of vegetation, terrain, fire and ash
//! and advances it one synchronous tick at a time. Renderers read the grid,
//! control surfaces read and write the five probabilities by name, and
//! [`spawn_simulation`] runs the whole thing on a worker thread.

use std::time::SystemTime;

pub mod sim;
pub mod util;

pub use sim::{
    Cell, CellCensus, CellState, Environment, Grid, InvalidProbability, ProbabilityModel,
    ProbabilityName, Simulation, SimulationStatistics, UnknownProbabilityName, spawn_simulation,
};

/// Routes `log` records to stderr with timestamps.
pub fn setup_logging(level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_seconds(SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
}
