use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use argh::FromArgs;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use murmuration::Parameters;
use murmuration::Simulation;
use murmuration::audio::{AmplitudeSource, Silence, SineTone};
use murmuration::render::{FanOut, FrameRecorder, PositionLog, RenderSink};

/// Headless bird murmuration: lead birds flock, followers chase the nearest lead.
#[derive(FromArgs)]
struct Args {
    /// number of ticks to simulate
    #[argh(option, default = "600")]
    frames: usize,

    /// seed for a reproducible run
    #[argh(option)]
    seed: Option<u64>,

    /// JSON file with simulation parameters
    #[argh(option)]
    config: Option<PathBuf>,

    /// override the follower count
    #[argh(option)]
    particles: Option<usize>,

    /// override the lead count (1 to 5)
    #[argh(option)]
    leads: Option<usize>,

    /// directory to write PNG frames into
    #[argh(option)]
    output: Option<PathBuf>,

    /// file to write a JSON-lines position trace into
    #[argh(option)]
    trace: Option<PathBuf>,

    /// audio input: "silent" or "tone"
    #[argh(option, default = "String::from(\"tone\")")]
    audio: String,

    /// ticks per second, used to size synthetic audio blocks
    #[argh(option, default = "60")]
    tick_rate: u32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: Args = argh::from_env();

    let mut params = match &args.config {
        Some(path) => Parameters::from_json_file(path)?,
        None => Parameters::default(),
    };
    if let Some(particles) = args.particles {
        params.particle_count = particles;
    }
    if let Some(leads) = args.leads {
        params.lead_count = leads;
    }

    let mut source: Box<dyn AmplitudeSource> = match args.audio.as_str() {
        "silent" => Box::new(Silence),
        "tone" => Box::new(SineTone::new(220.0, 4.0, args.tick_rate)),
        other => bail!("unknown audio source {other:?}, expected \"silent\" or \"tone\""),
    };

    info!("Starting bird murmuration...");
    let mut sim = Simulation::new(params, args.seed).context("invalid simulation parameters")?;

    let mut sinks = FanOut::new();
    if let Some(dir) = &args.output {
        let recorder = FrameRecorder::new(dir, &params)
            .with_context(|| format!("failed to prepare frame directory {}", dir.display()))?
            .with_particle_colours(sim.particles().colours());
        sinks.push(Box::new(recorder));
        info!("writing frames to {}", dir.display());
    }
    if let Some(path) = &args.trace {
        let file = File::create(path)
            .with_context(|| format!("failed to create trace file {}", path.display()))?;
        sinks.push(Box::new(PositionLog::new(BufWriter::new(file))));
        info!("writing position trace to {}", path.display());
    }

    let pbar = ProgressBar::new(args.frames as u64);
    pbar.set_style(ProgressStyle::with_template(
        "[{elapsed_precise}/{eta_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
    )?);

    let mut held_leads = 0;
    let mut held_particles = 0;
    let mut loudest: f32 = 0.0;
    for _ in 0..args.frames {
        let report = sim.step(source.as_mut(), &mut sinks);
        held_leads += report.held_leads;
        held_particles += report.held_particles;
        loudest = loudest.max(report.amplitude);
        pbar.set_message(format!("amp {:.3}", report.amplitude));
        pbar.inc(1);
    }
    pbar.finish();
    let finished = sinks.finish();
    let failed_writes = sinks.failures();
    if failed_writes > 0 {
        warn!("{failed_writes} frame or trace writes failed");
    }
    finished.context("failed to flush output")?;

    if held_leads + held_particles > 0 {
        warn!("{held_leads} lead and {held_particles} particle updates were held back as non-finite");
    }
    info!(
        "Shutting down after {} ticks (peak amplitude {loudest:.3})",
        sim.tick()
    );
    Ok(())
}
