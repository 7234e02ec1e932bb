use anyhow::{Context, Result};
use ccreloc::{ConversionConfig, ConversionInputs, ConversionPipeline, DifferentialTimeMode};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ccreloc",
    version,
    about = "Build GrowClust input files from cross-correlation pairs",
    long_about = None,
    after_help = "Example:\n  ccreloc --config templates/config.json --traveltime templates/travel_time.dat \\\n    --ccpairs templates/ccpairs --stations templates/stations_filtered.csv \\\n    --catalog results/gamma_catalog.csv --output relocation/growclust"
)]
struct Cli {
    /// JSON configuration (min_cc_score, traveltime_shape, ...)
    #[arg(long, default_value = "templates/config.json")]
    config: PathBuf,

    /// Flat float32 travel-time table
    #[arg(long, default_value = "templates/travel_time.dat")]
    traveltime: PathBuf,

    /// Correlation pair files or directories (searched for *.json)
    #[arg(long, num_args = 1.., default_value = "templates/ccpairs")]
    ccpairs: Vec<PathBuf>,

    /// Station table CSV (station, latitude, longitude[, network])
    #[arg(long, default_value = "templates/stations_filtered.csv")]
    stations: PathBuf,

    /// Event catalog CSV; evlist.txt is skipped when absent
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Output directory
    #[arg(long, short, default_value = "relocation/growclust")]
    output: PathBuf,

    /// Override the configured correlation threshold
    #[arg(long)]
    min_cc_score: Option<f64>,

    /// Add the refined correlation lag to the model differential time
    #[arg(long)]
    corrected: bool,

    /// Prefix station codes with the network code
    #[arg(long)]
    with_network: bool,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut config = ConversionConfig::from_json_file(&cli.config)
        .with_context(|| format!("loading configuration {}", cli.config.display()))?;
    if let Some(min_cc_score) = cli.min_cc_score {
        config.min_cc_score = min_cc_score;
    }
    if cli.corrected {
        config.differential_time_mode = DifferentialTimeMode::CorrelationCorrected;
    }
    if cli.with_network {
        config.station_code_with_network = true;
    }

    let inputs = ConversionInputs {
        traveltime: cli.traveltime,
        ccpairs: cli.ccpairs,
        stations: cli.stations,
        catalog: cli.catalog,
        output_dir: cli.output,
    };

    let pipeline = ConversionPipeline::new(config).context("invalid configuration")?;
    let summary = pipeline.run(&inputs).context("conversion failed")?;
    println!("{}", summary);

    Ok(())
}
