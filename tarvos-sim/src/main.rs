use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use tarvos_core::{Engine, GameStore, MemoryStore, Timestamp};
use tarvos_data::StaticData;

mod seed;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Seconds between scheduler passes
    #[arg(long, default_value_t = 1.0)]
    tick_interval: f64,

    /// Seconds between full-world resource resyncs
    #[arg(long, default_value_t = 300.0)]
    resync_interval: f64,

    /// Number of ticks to run (0 = run until interrupted)
    #[arg(short, long, default_value_t = 60)]
    ticks: u64,

    /// Advance a virtual clock instead of sleeping between ticks
    #[arg(long, default_value_t = false)]
    fast: bool,

    /// RNG seed for combat luck
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Load the world from a JSON snapshot instead of seeding the demo
    #[arg(long)]
    world: Option<PathBuf>,

    /// Write the final world state to a JSON snapshot
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn wall_clock() -> Timestamp {
    Timestamp::from_millis(Utc::now().timestamp_millis())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = std::str::FromStr::from_str(&args.log_level).unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    log::info!("Starting tarvos-sim...");

    let mut now = wall_clock();
    let store = match &args.world {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("opening world snapshot {}", path.display()))?;
            let store: MemoryStore =
                serde_json::from_reader(file).context("parsing world snapshot")?;
            log::info!("loaded world snapshot from {}", path.display());
            store
        }
        None => seed::demo_world(now),
    };

    let mut engine = Engine::new(store, StaticData::standard(), args.seed);
    let mut last_resync = now;
    let mut tick: u64 = 0;

    loop {
        tick += 1;
        let summary = engine.run_tick(now);
        if summary.jobs_processed + summary.deployment_groups + summary.returns_processed > 0 {
            log::info!(
                "tick {tick}: {} jobs, {} battles, {} returns ({} failures)",
                summary.jobs_processed,
                summary.deployment_groups,
                summary.returns_processed,
                summary.jobs_failed + summary.deployment_failures,
            );
        }

        if now.secs_since(last_resync) >= args.resync_interval {
            let cities = engine.run_world_resync(now);
            log::info!("tick {tick}: world resync over {cities} cities");
            last_resync = now;
        }

        if args.ticks != 0 && tick >= args.ticks {
            break;
        }

        if args.fast {
            now = now.plus_secs(args.tick_interval);
        } else {
            std::thread::sleep(std::time::Duration::from_secs_f64(args.tick_interval));
            now = wall_clock();
        }
    }

    log::info!("Simulation finished after {tick} ticks");

    if let Some(path) = &args.snapshot {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating snapshot {}", path.display()))?;
        serde_json::to_writer_pretty(file, engine.store()).context("writing snapshot")?;
        log::info!("wrote world snapshot to {}", path.display());
    }

    // A terse end-of-run census, mostly for eyeballing demo runs.
    for id in engine.store().city_ids() {
        if let Ok(city) = engine.store().city(id) {
            log::info!(
                "{}: score {}, {} | garrison {} units",
                city.name,
                city.score,
                city.resources,
                city.garrison.values().sum::<u32>(),
            );
        }
    }

    Ok(())
}
