use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use clap::Parser;

use crate::geometry::Point;

/// Host binary that loads a scene and drives scripted walks through the
/// tick scheduler.
#[derive(Parser, Debug)]
#[command(about = "Drive actor walks across a scene's path polygons", version)]
pub struct Args {
    /// Path to the scene polygon file
    #[arg(long)]
    pub scene: PathBuf,

    /// Actor start position as x,y (default: pseudo-centre of the first
    /// path polygon)
    #[arg(long)]
    pub start: Option<String>,

    /// Walk destination as x,y
    #[arg(long)]
    pub dest: Option<String>,

    /// Walk ignoring path polygons
    #[arg(long)]
    pub ignore_path: bool,

    /// Maximum number of scheduler ticks to run
    #[arg(long, default_value_t = 400)]
    pub ticks: u64,

    /// Path to write the per-tick movement log as JSON
    #[arg(long)]
    pub movement_log_json: Option<PathBuf>,

    /// Path to write the engine event log as JSON
    #[arg(long)]
    pub events_json: Option<PathBuf>,

    /// Path to write a save-state snapshot as JSON after the run
    #[arg(long)]
    pub snapshot_json: Option<PathBuf>,

    /// Print every movement sample instead of the summary
    #[arg(long)]
    pub verbose: bool,
}

pub fn parse() -> Result<Args> {
    let args = Args::parse();
    if args.dest.is_none() && args.movement_log_json.is_some() {
        bail!("--movement-log-json requires --dest");
    }
    Ok(args)
}

/// Parse an "x,y" coordinate pair.
pub fn parse_point(raw: &str) -> Result<Point> {
    let mut parts = raw.split(',');
    let x = parts
        .next()
        .ok_or_else(|| anyhow!("missing x in coordinate '{raw}'"))?
        .trim()
        .parse()?;
    let y = parts
        .next()
        .ok_or_else(|| anyhow!("missing y in coordinate '{raw}'"))?
        .trim()
        .parse()?;
    if parts.next().is_some() {
        bail!("too many components in coordinate '{raw}'");
    }
    Ok(Point::new(x, y))
}
