mod simulation;

use anyhow::Context;
use biolum_common::{TracerEngine, TracerOptions};
use clap::Parser;
use rand::{SeedableRng, rngs::StdRng};
use simulation::{Simulation, SimulationParameters};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Where to write the JSON record, stdout if omitted
    #[clap(long)]
    output: Option<PathBuf>,

    /// Seed for the random number generator, drawn from the OS if omitted
    #[clap(long)]
    seed: Option<u64>,

    #[command(flatten)]
    parameters: SimulationParameters,

    #[command(flatten)]
    tracer: TracerOptions,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let tracer = TracerEngine::new(&args.tracer)?;
    debug!("Log filter: {}", tracer.filter());
    debug!("{args:?}");

    let simulation = Simulation::new(&args.parameters)?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let record = simulation.generate(&mut rng)?;
    info!(
        "Simulated {} samples over {} s",
        record.len(),
        args.parameters.seconds
    );

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };
    serde_json::to_writer(&mut writer, &record)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
