use std::fs;

use anyhow::{Context, Result};
use serde::Serialize;
use tread_formats::SceneFile;

use tread_engine::cli;
use tread_engine::geometry::Point;
use tread_engine::mover::ActorId;
use tread_engine::scheduler::{WalkScheduler, WalkStatus};

/// One row of the movement log: where the actor stood after each tick.
#[derive(Serialize)]
struct MovementSample {
    tick: u64,
    position: [i32; 2],
    direction: &'static str,
    scale: i32,
    reel: u32,
    path: Option<String>,
}

fn main() -> Result<()> {
    let args = cli::parse()?;

    let data = fs::read(&args.scene)
        .with_context(|| format!("reading scene file {}", args.scene.display()))?;
    let scene = SceneFile::parse(&data)
        .with_context(|| format!("parsing scene file {}", args.scene.display()))?;

    let mut scheduler = WalkScheduler::new();
    scheduler
        .load_scene(&scene)
        .context("loading scene polygons")?;

    let actor = ActorId(1);
    let start = match args.start.as_deref() {
        Some(raw) => cli::parse_point(raw)?,
        None => default_start(&scheduler)
            .context("scene has no path polygon to place the actor in")?,
    };
    scheduler.declare_mover(actor, start, 10);

    println!(
        "Loaded scene {} ({} polygons), actor at {},{}",
        scene.name.as_deref().unwrap_or("<unnamed>"),
        scheduler.store().len(),
        start.x,
        start.y
    );

    let mut samples: Vec<MovementSample> = Vec::new();
    if let Some(raw) = args.dest.as_deref() {
        let dest = cli::parse_point(raw)?;
        let handle = scheduler
            .request_walk(actor, dest, args.ignore_path, None)
            .context("issuing walk request")?;

        for _ in 0..args.ticks {
            scheduler.tick().context("advancing scheduler tick")?;
            if let Some(sample) = capture_sample(&scheduler, actor) {
                if args.verbose {
                    println!(
                        "tick {:>4}  {:>4},{:<4} {}",
                        sample.tick, sample.position[0], sample.position[1], sample.direction
                    );
                }
                samples.push(sample);
            }
            if !scheduler.is_walking(actor) {
                break;
            }
        }

        let mover = scheduler.mover(actor).expect("actor declared above");
        let status = scheduler.poll(handle);
        println!(
            "Walk finished after {} ticks: {:?} at {},{}",
            scheduler.ticks(),
            status,
            mover.pos.x,
            mover.pos.y
        );
        if status == WalkStatus::InProgress {
            println!("Tick limit reached before the walk settled");
        }
    }

    if let Some(path) = args.movement_log_json.as_ref() {
        let json =
            serde_json::to_string_pretty(&samples).context("serializing movement log to JSON")?;
        fs::write(path, json)
            .with_context(|| format!("writing movement log to {}", path.display()))?;
        println!("Saved movement log to {}", path.display());
    }

    if let Some(path) = args.events_json.as_ref() {
        let events = scheduler.events();
        let json = serde_json::to_string_pretty(&events).context("serializing event log")?;
        fs::write(path, json)
            .with_context(|| format!("writing event log to {}", path.display()))?;
        println!("Saved event log to {}", path.display());
    }

    if let Some(path) = args.snapshot_json.as_ref() {
        let snapshot = scheduler.snapshot();
        let json =
            serde_json::to_string_pretty(&snapshot).context("serializing save snapshot")?;
        fs::write(path, json)
            .with_context(|| format!("writing snapshot to {}", path.display()))?;
        println!("Saved snapshot to {}", path.display());
    }

    Ok(())
}

fn default_start(scheduler: &WalkScheduler) -> Option<Point> {
    let store = scheduler.store();
    store
        .ids()
        .find(|&id| {
            store
                .poly(id)
                .map(|poly| poly.kind.is_path())
                .unwrap_or(false)
        })
        .map(|id| store.pseudo_centre(id))
}

fn capture_sample(scheduler: &WalkScheduler, actor: ActorId) -> Option<MovementSample> {
    let mover = scheduler.mover(actor)?;
    let path = mover
        .cur_path
        .and_then(|id| scheduler.store().poly(id))
        .map(|poly| poly.name.clone());
    Some(MovementSample {
        tick: scheduler.ticks(),
        position: [mover.pos.x, mover.pos.y],
        direction: mover.direction.label(),
        scale: mover.scale,
        reel: mover.cur_reel,
        path,
    })
}
