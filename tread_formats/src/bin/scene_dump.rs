use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tread_formats::SceneFile;

/// Dump a parsed scene file as JSON for inspection.
#[derive(Parser, Debug)]
#[command(about = "Dump a scene polygon file as JSON", version)]
struct Args {
    /// Path to the scene file
    scene: PathBuf,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let data = fs::read(&args.scene)
        .with_context(|| format!("reading scene file {}", args.scene.display()))?;
    let scene = SceneFile::parse(&data)
        .with_context(|| format!("parsing scene file {}", args.scene.display()))?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&scene)?
    } else {
        serde_json::to_string(&scene)?
    };
    println!("{json}");
    Ok(())
}
