use anyhow::{Context, anyhow};
use biolum_common::{TracerEngine, TracerOptions};
use biolum_proxies::{
    BioluminescenceRecord, Pipeline,
    parameters::{PipelineParameters, UnmixArgs},
};
use clap::Parser;
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::PathBuf,
};
use tracing::{debug, info};

// cargo run --bin biolum-simulator -- --seconds 600 --seed 1 --output record.json
// cargo run --bin biolum-proxies -- --input record.json --output proxies.json --ratio-adinos 2e9

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// JSON record with "time", "intensity" and optionally "flow" and "fluorescence"
    #[clap(long)]
    input: PathBuf,

    /// Where to write the JSON results, stdout if omitted
    #[clap(long)]
    output: Option<PathBuf>,

    /// Indent the JSON output
    #[clap(long)]
    pretty: bool,

    #[command(flatten)]
    parameters: PipelineParameters,

    #[command(flatten)]
    unmix: UnmixArgs,

    #[command(flatten)]
    tracer: TracerOptions,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let tracer = TracerEngine::new(&args.tracer)?;
    debug!("Log filter: {}", tracer.filter());
    debug!("{args:?}");

    let file = File::open(&args.input)
        .with_context(|| format!("cannot open {}", args.input.display()))?;
    let record: BioluminescenceRecord = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("cannot parse {}", args.input.display()))?;
    info!("Loaded {} samples from {}", record.len(), args.input.display());

    let unmix_parameters = match (args.unmix.parameters(), &record.fluorescence) {
        (Some(parameters), _) => Some(parameters?),
        (None, Some(_)) => {
            return Err(anyhow!(
                "the record has a fluorescence series, --ratio-adinos must be supplied"
            ));
        }
        (None, None) => None,
    };

    let pipeline = Pipeline::new(&args.parameters)?;
    let output = pipeline.run(&record, unmix_parameters.as_ref())?;

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };
    if args.pretty {
        serde_json::to_writer_pretty(&mut writer, &output)?;
    } else {
        serde_json::to_writer(&mut writer, &output)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
