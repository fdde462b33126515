use std::time::{Duration, Instant};

use anyhow::{Context, ensure};
use clap::Parser;

use firegrid::{Environment, ProbabilityModel, ProbabilityName, spawn_simulation};

/// Runs the wildfire automaton without a display, logging how the fire spreads.
#[derive(Parser, Debug)]
#[command(name = "firegrid")]
#[command(about = "Stochastic cellular-automaton wildfire simulation", long_about = None)]
struct Args {
    /// Side length of the square grid
    #[arg(short, long, default_value_t = 100)]
    size: usize,

    /// Number of ticks to simulate
    #[arg(short, long, default_value_t = 200)]
    ticks: u64,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Probability override as NAME=VALUE, e.g. `-p burnout=0.3` (repeatable)
    #[arg(short = 'p', long = "probability", value_parser = parse_probability)]
    probabilities: Vec<(ProbabilityName, f64)>,

    /// Ignite the cell at X,Y before the first tick (repeatable)
    #[arg(long = "fire", value_parser = parse_position)]
    fires: Vec<(usize, usize)>,

    /// Ignite this many random vegetation cells before the first tick
    #[arg(long, default_value_t = 1)]
    random_fires: u32,

    /// Log a census of the grid every N ticks
    #[arg(long, default_value_t = 10)]
    report_every: u64,

    /// Tick on a worker thread at this rate (ticks per second) instead of as fast as possible
    #[arg(long)]
    tick_rate: Option<u32>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_probability(s: &str) -> Result<(ProbabilityName, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{s}`"))?;
    let name = name.parse::<ProbabilityName>().map_err(|e| e.to_string())?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad value for {name}: {e}"))?;
    Ok((name, value))
}

fn parse_position(s: &str) -> Result<(usize, usize), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got `{s}`"))?;
    let x = x.trim().parse().map_err(|e| format!("bad x `{x}`: {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y `{y}`: {e}"))?;
    Ok((x, y))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let level = match args.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    firegrid::setup_logging(level).context("failed to install logger")?;
    ensure!(args.size > 0, "grid size must be at least 1");
    ensure!(args.report_every > 0, "--report-every must be at least 1");

    // Rejected values are reported and the defaults kept.
    let mut model = ProbabilityModel::default();
    for rejected in model.apply(args.probabilities.iter().copied()) {
        log::warn!(
            "{rejected}; keeping {} at {}",
            rejected.name,
            model.get(rejected.name)
        );
    }
    for (name, value) in model.entries() {
        log::info!("{name:>12} = {value}");
    }

    let mut environment = match args.seed {
        Some(seed) => Environment::with_seed(args.size, model, seed),
        None => Environment::new(args.size, model),
    };
    for &(x, y) in &args.fires {
        if !environment.set_fire_at(x, y) {
            log::warn!("({x}, {y}) is outside the {0}x{0} grid", args.size);
        }
    }
    for _ in 0..args.random_fires {
        if environment.set_random_fire().is_none() {
            break;
        }
    }
    log::info!("tick 0: {}", environment.grid().census());

    match args.tick_rate {
        Some(rate) => run_threaded(environment, rate, &args),
        None => run_headless(environment, &args),
    }
    Ok(())
}

fn run_headless(mut environment: Environment, args: &Args) {
    let mut total_time = Duration::new(0, 0);
    for _ in 0..args.ticks {
        let start = Instant::now();
        environment.step();
        total_time += start.elapsed();
        let tick = environment.tick();
        if tick % args.report_every == 0 {
            log::info!("tick {tick}: {}", environment.grid().census());
        }
    }
    let average = total_time.div_f64(args.ticks.max(1) as f64);
    println!(
        "{} ticks on a {}x{} grid, average tick took {}μs",
        args.ticks,
        args.size,
        args.size,
        average.as_micros()
    );
}

fn run_threaded(environment: Environment, tick_rate: u32, args: &Args) {
    let sim = spawn_simulation(environment, tick_rate);
    let mut next_report = args.report_every;
    while sim.ticks() < args.ticks {
        let ticks = sim.ticks();
        if ticks >= next_report {
            log::info!("tick {ticks}: {}", sim.latest_frame().census());
            next_report = (ticks / args.report_every + 1) * args.report_every;
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    let stats = sim.stop();
    println!(
        "{} ticks, average tick took {}μs",
        stats.ticks,
        stats.average_step_exec_time.as_micros()
    );
    println!("\nSegments:\n");
    let longest_name = stats.segments.iter().map(|s| s.0.len()).max().unwrap_or(0);
    for (name, time) in stats.segments {
        println!("{} {}μs", pad(name, longest_name + 2), time.as_micros());
    }
}

fn pad(s: &str, len: usize) -> String {
    if s.len() >= len {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(len - s.len()))
}
