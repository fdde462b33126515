use super::{
    cell::{Cell, CellState},
    grid::Grid,
    probability::{InvalidProbability, ProbabilityModel, ProbabilityName},
};

/// Manhattan radius a burning cell reaches when spreading.
pub const SPREAD_RADIUS: usize = 2;

/// Consecutive draws that must all pass for a spontaneous ignition.
pub const COMBUSTION_TRIALS: u32 = 5;

/// The wildfire automaton: two grid buffers, the probability model, and the
/// random source every draw comes from.
///
/// A tick reads only the front buffer and writes only the back buffer, then
/// flips which one is in front. Nothing outside `step` can observe the back
/// buffer, so readers always see a whole frame.
pub struct Environment {
    buffers: [Grid; 2],
    flipped_bufs: bool,
    model: ProbabilityModel,
    rng: fastrand::Rng,
    neighbors: Vec<Cell>,
    tick: u64,
}

impl Environment {
    /// Creates an environment whose draws come from an entropy-seeded source.
    pub fn new(size: usize, model: ProbabilityModel) -> Environment {
        Self::with_rng(size, model, fastrand::Rng::new())
    }

    /// Creates an environment that replays identically for the same seed.
    pub fn with_seed(size: usize, model: ProbabilityModel, seed: u64) -> Environment {
        Self::with_rng(size, model, fastrand::Rng::with_seed(seed))
    }

    pub fn with_rng(size: usize, model: ProbabilityModel, mut rng: fastrand::Rng) -> Environment {
        let front = Grid::seeded(size, model.generation(), &mut rng);
        let back = front.clone();
        log::debug!("seeded {size}x{size} grid: {:?}", front.census());
        Environment {
            buffers: [front, back],
            flipped_bufs: false,
            model,
            rng,
            neighbors: Vec::with_capacity(13),
            tick: 0,
        }
    }

    /// The current frame.
    pub fn grid(&self) -> &Grid {
        &self.buffers[self.flipped_bufs as usize]
    }

    fn grid_mut(&mut self) -> &mut Grid {
        &mut self.buffers[self.flipped_bufs as usize]
    }

    pub fn size(&self) -> usize {
        self.grid().size()
    }

    /// Number of ticks since construction or the last reset.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn probabilities(&self) -> &ProbabilityModel {
        &self.model
    }

    pub fn probability(&self, name: ProbabilityName) -> f64 {
        self.model.get(name)
    }

    /// Updates one probability. A new `generation` immediately re-seeds the
    /// whole grid; the others only take effect from the next tick on.
    pub fn set_probability(
        &mut self,
        name: ProbabilityName,
        value: f64,
    ) -> Result<(), InvalidProbability> {
        if let Err(e) = self.model.set(name, value) {
            log::warn!("{e}; keeping {name} at {}", self.model.get(name));
            return Err(e);
        }
        log::debug!("{name} probability set to {value}");
        if name == ProbabilityName::Generation {
            self.reseed();
        }
        Ok(())
    }

    /// Applies several updates, each validated on its own. The grid is
    /// re-seeded at most once, and only if `generation` was accepted.
    pub fn set_probabilities<I>(&mut self, updates: I) -> Vec<InvalidProbability>
    where
        I: IntoIterator<Item = (ProbabilityName, f64)>,
    {
        let mut reseed = false;
        let mut rejected = Vec::new();
        for (name, value) in updates {
            match self.model.set(name, value) {
                Ok(()) => reseed |= name == ProbabilityName::Generation,
                Err(e) => {
                    log::warn!("{e}; keeping {name} at {}", self.model.get(name));
                    rejected.push(e);
                }
            }
        }
        if reseed {
            self.reseed();
        }
        rejected
    }

    pub fn set_generation(&mut self, value: f64) -> Result<(), InvalidProbability> {
        self.set_probability(ProbabilityName::Generation, value)
    }
    pub fn set_ignition(&mut self, value: f64) -> Result<(), InvalidProbability> {
        self.set_probability(ProbabilityName::Ignition, value)
    }
    pub fn set_burnout(&mut self, value: f64) -> Result<(), InvalidProbability> {
        self.set_probability(ProbabilityName::Burnout, value)
    }
    pub fn set_resurrection(&mut self, value: f64) -> Result<(), InvalidProbability> {
        self.set_probability(ProbabilityName::Resurrection, value)
    }
    pub fn set_combustion(&mut self, value: f64) -> Result<(), InvalidProbability> {
        self.set_probability(ProbabilityName::Combustion, value)
    }

    /// Re-randomizes every cell from the current `generation`, fire included.
    pub fn reseed(&mut self) {
        let generation = self.model.generation();
        let index = self.flipped_bufs as usize;
        self.buffers[index].seed(generation, &mut self.rng);
        log::debug!("reseeded grid: {:?}", self.buffers[index].census());
    }

    /// Starts over on a fresh grid of the same size, keeping the probabilities.
    pub fn reset(&mut self) {
        self.reseed();
        self.tick = 0;
        log::info!("environment reset");
    }

    /// Overwrites a single cell. Out-of-range positions are ignored.
    pub fn set_cell(&mut self, x: usize, y: usize, state: CellState) -> bool {
        self.grid_mut().set(x, y, state)
    }

    /// Sets `(x, y)` alight whatever it currently holds. Out-of-range positions
    /// are ignored and `false` is returned.
    pub fn set_fire_at(&mut self, x: usize, y: usize) -> bool {
        let lit = self.set_cell(x, y, CellState::Burning);
        if lit {
            log::debug!("fire set at ({x}, {y})");
        }
        lit
    }

    /// Ignites a uniformly random vegetation cell and returns where.
    ///
    /// Positions are drawn until one holds vegetation. Returns `None` without
    /// drawing when the grid has no vegetation to burn.
    pub fn set_random_fire(&mut self) -> Option<(usize, usize)> {
        let index = self.flipped_bufs as usize;
        let grid = &mut self.buffers[index];
        if !grid
            .cells()
            .iter()
            .any(|c| c.state == CellState::Vegetation)
        {
            log::warn!("no vegetation left to ignite");
            return None;
        }
        loop {
            let (x, y) = grid.random_position(&mut self.rng)?;
            if grid.get(x, y).is_some_and(|c| c.state == CellState::Vegetation) {
                grid.set(x, y, CellState::Burning);
                log::debug!("random fire set at ({x}, {y})");
                return Some((x, y));
            }
        }
    }

    /// Advances the automaton by one tick.
    pub fn step(&mut self) -> &Grid {
        let [a, b] = &mut self.buffers;
        let (current, next) = if self.flipped_bufs { (&*b, a) } else { (&*a, b) };

        next.copy_from(current);
        for cell in current.cells() {
            apply_transition_rules(
                cell,
                current,
                next,
                &self.model,
                &mut self.rng,
                &mut self.neighbors,
            );
        }

        // Checked on the frame just computed, so a fire that burnt out this
        // tick already leaves the grid open to spontaneous ignition.
        if !next.any_burning() && combustion_roll(&self.model, &mut self.rng) {
            if let Some((x, y)) = next.random_position(&mut self.rng) {
                next.set(x, y, CellState::Burning);
                log::debug!("spontaneous ignition at ({x}, {y})");
            }
        }

        self.flipped_bufs = !self.flipped_bufs;
        self.tick += 1;
        log::trace!("tick {} complete", self.tick);
        self.grid()
    }
}

fn roll(rng: &mut fastrand::Rng, probability: f64) -> bool {
    rng.f64() < probability
}

/// All `COMBUSTION_TRIALS` draws must pass, making spontaneous fire rare.
fn combustion_roll(model: &ProbabilityModel, rng: &mut fastrand::Rng) -> bool {
    (0..COMBUSTION_TRIALS).all(|_| roll(rng, model.combustion()))
}

/// Writes the next state of `cell` (and of any neighbor it ignites) into
/// `next`. Decisions only ever look at `current`.
fn apply_transition_rules(
    cell: &Cell,
    current: &Grid,
    next: &mut Grid,
    model: &ProbabilityModel,
    rng: &mut fastrand::Rng,
    neighbors: &mut Vec<Cell>,
) {
    let (x, y) = cell.position();
    match cell.state {
        // Terrain is absorbing and vegetation only changes when a burning
        // neighbor ignites it, both already carried over by the copy.
        CellState::Terrain | CellState::Vegetation => {}
        CellState::Burnt => {
            if roll(rng, model.resurrection()) {
                next.set(x, y, CellState::Vegetation);
            }
        }
        CellState::Burning => {
            if roll(rng, model.burnout()) {
                next.set(x, y, CellState::Burnt);
                return;
            }

            current.neighborhood_into(x, y, SPREAD_RADIUS, neighbors);
            if rng.bool() {
                try_ignite(neighbors.iter(), next, model, rng);
            } else {
                try_ignite(neighbors.iter().rev(), next, model, rng);
            }

            if roll(rng, model.burnout()) {
                next.set(x, y, CellState::Burnt);
            }
        }
    }
}

/// Tries vegetation neighbors in order until one catches. At most one does.
fn try_ignite<'a>(
    neighbors: impl Iterator<Item = &'a Cell>,
    next: &mut Grid,
    model: &ProbabilityModel,
    rng: &mut fastrand::Rng,
) {
    for neighbor in neighbors.filter(|n| n.state == CellState::Vegetation) {
        if roll(rng, model.ignition()) {
            next.set(neighbor.x, neighbor.y, CellState::Burning);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(
        generation: f64,
        ignition: f64,
        burnout: f64,
        resurrection: f64,
        combustion: f64,
    ) -> ProbabilityModel {
        ProbabilityModel::new(generation, ignition, burnout, resurrection, combustion).unwrap()
    }

    #[test]
    fn same_seed_replays_the_same_run() {
        let mut a = Environment::with_seed(40, ProbabilityModel::default(), 99);
        let mut b = Environment::with_seed(40, ProbabilityModel::default(), 99);
        a.set_fire_at(20, 20);
        b.set_fire_at(20, 20);
        for _ in 0..25 {
            assert_eq!(a.step(), b.step());
        }
    }

    #[test]
    fn step_flips_buffers_and_counts_ticks() {
        let mut env = Environment::with_seed(4, ProbabilityModel::default(), 1);
        assert!(!env.flipped_bufs);
        env.step();
        assert!(env.flipped_bufs);
        env.step();
        assert!(!env.flipped_bufs);
        assert_eq!(env.tick(), 2);
    }

    #[test]
    fn resurrection_certainty_regrows_every_burnt_cell() {
        let mut env = Environment::with_seed(6, model(0.0, 0.0, 0.0, 1.0, 0.0), 5);
        for y in 0..6 {
            for x in 0..6 {
                env.set_cell(x, y, CellState::Burnt);
            }
        }
        env.step();
        assert_eq!(env.grid().census().vegetation, 36);
    }

    #[test]
    fn resurrection_zero_keeps_ash() {
        let mut env = Environment::with_seed(6, model(0.0, 0.0, 0.0, 0.0, 0.0), 5);
        env.set_cell(2, 2, CellState::Burnt);
        for _ in 0..10 {
            env.step();
        }
        assert_eq!(env.grid().get(2, 2).map(|c| c.state), Some(CellState::Burnt));
    }

    #[test]
    fn a_cell_ignited_this_tick_does_not_spread_until_the_next() {
        // A single row of vegetation with a fire at its left end.
        let mut env = Environment::with_seed(12, model(0.0, 1.0, 0.0, 0.0, 0.0), 11);
        for x in 0..12 {
            env.set_cell(x, 0, CellState::Vegetation);
        }
        env.set_fire_at(0, 0);

        env.step();
        assert_eq!(env.grid().census().burning, 2);

        env.step();
        let burning: Vec<_> = env
            .grid()
            .cells()
            .iter()
            .filter(|c| c.state.burning())
            .collect();
        assert!((3..=4).contains(&burning.len()), "got {}", burning.len());
        assert!(burning.iter().all(|c| c.y == 0 && c.x <= 4));
    }

    #[test]
    fn combustion_zero_never_ignites_an_idle_grid() {
        let mut env = Environment::with_seed(10, model(1.0, 1.0, 1.0, 1.0, 0.0), 8);
        for _ in 0..200 {
            env.step();
            assert!(!env.grid().any_burning());
        }
    }

    #[test]
    fn combustion_one_always_ignites_an_idle_grid() {
        let mut env = Environment::with_seed(10, model(0.0, 0.0, 1.0, 0.0, 1.0), 8);
        for _ in 0..50 {
            env.step();
            // Burnout certainty puts out last tick's fire, so a new one appears.
            assert_eq!(env.grid().census().burning, 1);
        }
    }

    #[test]
    fn random_fire_only_lands_on_vegetation() {
        let mut env = Environment::with_seed(30, model(0.2, 0.5, 0.5, 0.5, 0.5), 4);
        for _ in 0..20 {
            let before = env.grid().clone();
            let (x, y) = env.set_random_fire().unwrap();
            assert_eq!(before.get(x, y).map(|c| c.state), Some(CellState::Vegetation));
            assert_eq!(env.grid().get(x, y).map(|c| c.state), Some(CellState::Burning));
        }
    }

    #[test]
    fn random_fire_gives_up_without_vegetation() {
        let mut env = Environment::with_seed(5, model(0.0, 0.5, 0.5, 0.5, 0.5), 4);
        assert_eq!(env.set_random_fire(), None);
        assert!(!env.grid().any_burning());
        let mut empty = Environment::with_seed(0, ProbabilityModel::default(), 1);
        assert_eq!(empty.set_random_fire(), None);
    }

    #[test]
    fn set_fire_at_ignores_out_of_range() {
        let mut env = Environment::with_seed(5, ProbabilityModel::default(), 4);
        let before = env.grid().clone();
        assert!(!env.set_fire_at(5, 0));
        assert_eq!(env.grid(), &before);
        assert!(env.set_fire_at(4, 4));
        assert_eq!(env.grid().get(4, 4).map(|c| c.state), Some(CellState::Burning));
    }

    #[test]
    fn generation_change_reseeds_but_others_do_not() {
        let mut env = Environment::with_seed(20, model(0.5, 0.5, 0.5, 0.5, 0.5), 21);
        env.set_fire_at(3, 3);
        let before = env.grid().clone();
        env.set_burnout(0.9).unwrap();
        env.set_ignition(0.1).unwrap();
        env.set_resurrection(0.2).unwrap();
        env.set_combustion(0.3).unwrap();
        assert_eq!(env.grid(), &before);

        env.set_generation(1.0).unwrap();
        assert_eq!(env.grid().census().vegetation, 400);
        assert!(env.set_generation(1.5).is_err());
        assert_eq!(env.probability(ProbabilityName::Generation), 1.0);
        assert_eq!(env.grid().census().vegetation, 400);
    }

    #[test]
    fn batch_reseeds_once_when_generation_is_accepted() {
        let mut env = Environment::with_seed(10, model(1.0, 0.5, 0.5, 0.5, 0.5), 2);
        let rejected = env.set_probabilities([
            (ProbabilityName::Generation, 0.0),
            (ProbabilityName::Burnout, -3.0),
        ]);
        assert_eq!(rejected.len(), 1);
        assert_eq!(env.grid().census().terrain, 100);
        assert_eq!(env.probabilities().burnout(), 0.5);
    }

    #[test]
    fn reset_keeps_probabilities_and_clears_ticks() {
        let mut env = Environment::with_seed(10, model(1.0, 1.0, 0.0, 0.0, 0.0), 2);
        env.set_fire_at(5, 5);
        env.step();
        env.step();
        let model_before = *env.probabilities();
        env.reset();
        assert_eq!(env.tick(), 0);
        assert_eq!(env.probabilities(), &model_before);
        assert_eq!(env.grid().census().vegetation, 100);
    }
}
