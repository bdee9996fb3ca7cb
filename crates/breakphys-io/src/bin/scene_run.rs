use std::path::PathBuf;
use anyhow::Result;
use clap::{ArgAction, Parser};
use breakphys_io::{hex32, load_scene, run_scene, scene_hash};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name="scene_run", version, about="Run a breakable-body scene and report every fracture")]
struct Opts {
    /// Path to a scene .json
    scene: PathBuf,

    /// Override the tick count from the scene file
    #[arg(long)]
    ticks: Option<u32>,

    /// Override the timestep from the scene file (seconds)
    #[arg(long)]
    dt: Option<f32>,

    /// Print the scene hash and the final world step hash
    #[arg(long, action=ArgAction::SetTrue)]
    hash: bool,
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut sd = load_scene(&opts.scene)?;
    if let Some(dt) = opts.dt { sd.dt = dt; }
    if let Some(t) = opts.ticks { sd.ticks = t; }

    let mut scene = sd.build()?;
    let summary = run_scene(&mut scene, sd.ticks, sd.dt);

    for f in &summary.fractures {
        println!("tick {:5}  breakable {:3}  fragments={}  impulse=({:+.3},{:+.3})",
                 f.tick, f.breakable, f.fragments, f.impulse.x, f.impulse.y);
    }
    for f in &summary.failures {
        println!("tick {:5}  breakable {:3}  failed: {}", f.tick, f.breakable, f.error);
    }
    println!("Ticks:     {}", summary.ticks);
    println!("Fractures: {}", summary.fractures.len());
    println!("Intact:    {}", summary.intact);
    println!("Failed:    {}", summary.failures.len());
    if opts.hash {
        println!("Scene:     {}", hex32(&scene_hash(&sd)?));
        println!("Step:      {}", hex32(&summary.step_hash));
    }
    Ok(())
}
