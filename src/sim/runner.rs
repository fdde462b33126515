use std::{
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use arc_swap::ArcSwap;

use super::{
    engine::Environment,
    grid::Grid,
    probability::{InvalidProbability, ProbabilityModel, ProbabilityName},
};

#[non_exhaustive]
#[derive(Debug, Default)]
pub struct SimulationStatistics {
    pub ticks: u64,
    pub average_step_exec_time: Duration,
    pub segments: Vec<(&'static str, Duration)>,
}

/// Handle to an [`Environment`] ticking on its own thread.
///
/// Every mutation goes through the same mutex the worker holds while it
/// steps, so parameter writes and operator ignitions always land between
/// ticks. Finished frames are published through an [`ArcSwap`]; readers get
/// either the previous frame or the new one, never a mix.
pub struct Simulation {
    environment: Arc<Mutex<Environment>>,
    stop: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    latest_frame: Arc<ArcSwap<Grid>>,
    join_handle: thread::JoinHandle<SimulationStatistics>,
}

/// Spawn a simulation on a new thread, stepping `tick_rate` times per second.
/// A `tick_rate` of zero runs as fast as possible.
pub fn spawn_simulation(environment: Environment, tick_rate: u32) -> Simulation {
    let latest_frame = Arc::new(ArcSwap::from_pointee(environment.grid().clone()));
    let environment = Arc::new(Mutex::new(environment));
    let stop = Arc::new(AtomicBool::new(false));
    let paused = Arc::new(AtomicBool::new(false));
    let ticks = Arc::new(AtomicU64::new(0));

    let e = Arc::clone(&environment);
    let s = Arc::clone(&stop);
    let p = Arc::clone(&paused);
    let t = Arc::clone(&ticks);
    let l = Arc::clone(&latest_frame);
    let join_handle = thread::spawn(move || sim_thread(e, s, p, t, l, tick_rate));
    log::info!("simulation thread started at {tick_rate} ticks/s");

    Simulation {
        environment,
        stop,
        paused,
        ticks,
        latest_frame,
        join_handle,
    }
}

impl Simulation {
    /// Get the latest completed simulation frame.
    pub fn latest_frame(&self) -> Arc<Grid> {
        self.latest_frame.load_full()
    }

    /// Ticks completed by the worker thread.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn probabilities(&self) -> ProbabilityModel {
        *self.lock().probabilities()
    }

    pub fn set_probability(
        &self,
        name: ProbabilityName,
        value: f64,
    ) -> Result<(), InvalidProbability> {
        let mut environment = self.lock();
        environment.set_probability(name, value)?;
        if name == ProbabilityName::Generation {
            self.publish(&environment);
        }
        Ok(())
    }

    pub fn set_fire_at(&self, x: usize, y: usize) -> bool {
        let mut environment = self.lock();
        let lit = environment.set_fire_at(x, y);
        if lit {
            self.publish(&environment);
        }
        lit
    }

    pub fn set_random_fire(&self) -> Option<(usize, usize)> {
        let mut environment = self.lock();
        let lit = environment.set_random_fire();
        if lit.is_some() {
            self.publish(&environment);
        }
        lit
    }

    /// Fresh grid, same size and probabilities.
    pub fn reset(&self) {
        let mut environment = self.lock();
        environment.reset();
        self.publish(&environment);
    }

    pub fn toggle_pause(&self) -> bool {
        let paused = !self.paused.fetch_xor(true, Ordering::Relaxed);
        log::info!("Simulation {}", if paused { "paused" } else { "resumed" });
        paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn stop(self) -> SimulationStatistics {
        self.stop.store(true, Ordering::Relaxed);
        self.join_handle.join().expect("failed to join thread")
    }

    fn lock(&self) -> MutexGuard<'_, Environment> {
        self.environment
            .lock()
            .expect("a thread accessing the simulation panicked")
    }

    fn publish(&self, environment: &Environment) {
        self.latest_frame.store(Arc::new(environment.grid().clone()));
    }
}

/// `total / count`, or zero when nothing was counted.
fn average(total: Duration, count: u64) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    let nanos = total.as_nanos() / u128::from(count);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

macro_rules! segment_bench_while {
    (while ($cond:expr) { $({$name:literal : $($contents:tt)*}),+ $(,)? }) => {{
        let mut segments = vec![$(($name, std::time::Duration::new(0, 0))),+];
        let mut cur_segments = Vec::with_capacity(segments.len());
        let mut iter_count: u64 = 0;

        while $cond {
            cur_segments.clear();

            $(
                let segment_start = std::time::Instant::now();
                $($contents)*
                cur_segments.push(segment_start.elapsed());
            )+

            for (idx, item) in cur_segments.iter().enumerate() {
                segments[idx].1 += *item;
            }
            iter_count += 1;
        }

        for s in segments.iter_mut() {
            s.1 = average(s.1, iter_count);
        }
        segments
    }}
}

fn sim_thread(
    environment: Arc<Mutex<Environment>>,
    stop: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    latest_frame: Arc<ArcSwap<Grid>>,
    tick_rate: u32,
) -> SimulationStatistics {
    let tick_interval =
        (tick_rate > 0).then(|| Duration::from_secs_f64(f64::from(tick_rate).recip()));
    let mut end_of_last_step = Instant::now();
    let mut total_iterations: u64 = 0;
    let mut total_time = Duration::new(0, 0);
    let segments = segment_bench_while!(
    while (!stop.load(Ordering::Relaxed)) {
        {
            "lock environment":
            let mut environment = environment
                .lock()
                .expect("a thread accessing the simulation panicked");
            let running = !paused.load(Ordering::Relaxed);
        },
        {
            "apply transition rules":
            if running {
                environment.step();
            }
        },
        {
            "write frame":
            if running {
                latest_frame.store(Arc::new(environment.grid().clone()));
                ticks.fetch_add(1, Ordering::Relaxed);
            }
            drop(environment);
        },
        {
            "cleanup":
            if running {
                total_time += end_of_last_step.elapsed();
                total_iterations += 1;
            }
            match tick_interval {
                Some(interval) => {
                    if let Some(to_wait) = interval.checked_sub(end_of_last_step.elapsed()) {
                        thread::sleep(to_wait);
                    }
                }
                None if !running => thread::sleep(Duration::from_millis(1)),
                None => thread::yield_now(),
            }
            end_of_last_step = Instant::now();
        }
    }
    );
    log::info!("simulation thread stopped after {total_iterations} ticks");
    SimulationStatistics {
        ticks: total_iterations,
        average_step_exec_time: average(total_time, total_iterations),
        segments,
    }
}
