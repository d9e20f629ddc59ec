//! gwinject command-line front end
//!
//! # Commands
//!
//! - `generate-waveforms`: sample a prior and store raw polarizations
//! - `inject`: inject simulated signals into every segment of a time-slide
//!
//! Settings come from the YAML configuration (see `GwInjectConfig`); flags
//! given on the command line take precedence. Any failure is logged and the
//! process exits with code 1.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use gwinject_core::observe::{init_logging, LogConfig};
use gwinject_core::{GwInjectConfig, InjectResult};
use gwinject_sim::waveforms::LOG_FILE_NAME;
use gwinject_sim::{
    generate_waveforms, GenerateWaveformsOptions, PriorDict, TimeSlide,
    TimeslideInjectionPipeline,
};

/// Gravitational-wave signal generation and injection
#[derive(Parser)]
#[command(name = "gwinject")]
#[command(version)]
#[command(about = "Simulate compact-binary signals and inject them into detector background")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to the standard search path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbosity: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample a prior and write raw (plus, cross) waveforms to <outdir>/signals.gwd
    GenerateWaveforms(GenerateArgs),
    /// Inject signals into every segment of a background time-slide
    Inject(InjectArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// YAML prior file
    #[arg(long)]
    prior_file: PathBuf,

    /// Number of waveforms to generate
    #[arg(long)]
    n_samples: usize,

    /// Output directory
    #[arg(long)]
    outdir: PathBuf,

    /// Waveform duration in seconds
    #[arg(long, default_value_t = 8.0)]
    waveform_duration: f64,

    /// Sample rate in Hz
    #[arg(long, default_value_t = 4096.0)]
    sample_rate: f64,

    /// Seed the prior so repeated runs give identical output
    #[arg(long)]
    deterministic: bool,

    /// Regenerate even if the signal file already exists
    #[arg(long)]
    force_generation: bool,

    /// Debug-level logging with source locations
    #[arg(long)]
    verbose: bool,
}

#[derive(Args)]
struct InjectArgs {
    /// Background time-slide directory
    #[arg(long)]
    source: PathBuf,

    /// Output time-slide directory
    #[arg(long)]
    destination: PathBuf,

    /// YAML prior file
    #[arg(long)]
    prior_file: PathBuf,

    /// Detectors to inject into, e.g. H1,L1
    #[arg(long, value_delimiter = ',')]
    ifos: Option<Vec<String>>,

    /// Seconds between signal centres
    #[arg(long)]
    spacing: Option<f64>,

    /// Output chunk length in seconds
    #[arg(long)]
    file_length: Option<f64>,

    /// Minimum waveform frequency and high-pass corner in Hz
    #[arg(long)]
    fmin: Option<f64>,

    /// Seconds excluded at both segment edges
    #[arg(long)]
    buffer: Option<f64>,

    /// PSD segment length in seconds
    #[arg(long)]
    fftlength: Option<f64>,

    /// Prior seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => GwInjectConfig::load_from(path),
        None => GwInjectConfig::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("gwinject: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::GenerateWaveforms(args) => run_generate(args, config, cli.verbosity),
        Commands::Inject(args) => run_inject(args, config, cli.verbosity),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "gwinject failed");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(logging: LogConfig) -> InjectResult<()> {
    init_logging(&logging)?;
    Ok(())
}

fn run_generate(args: GenerateArgs, config: GwInjectConfig, verbosity: u8) -> InjectResult<()> {
    std::fs::create_dir_all(&args.outdir)?;

    let logging = if args.verbose {
        LogConfig::verbose()
    } else {
        config.logging.clone()
    };
    setup_logging(
        logging
            .with_verbosity(verbosity)
            .with_file(args.outdir.join(LOG_FILE_NAME)),
    )?;

    let mut options = GenerateWaveformsOptions::new(args.prior_file, args.n_samples, args.outdir);
    options.waveform = config.waveform;
    options.waveform.duration = args.waveform_duration;
    options.waveform.sample_rate = args.sample_rate;
    options.deterministic = args.deterministic;
    options.force_generation = args.force_generation;

    let path = generate_waveforms(&options)?;
    tracing::info!(path = %path.display(), "Signal file ready");
    Ok(())
}

/// Command-line flags replace the matching configuration values.
fn apply_overrides(config: &mut GwInjectConfig, args: &InjectArgs) {
    if let Some(ifos) = &args.ifos {
        config.injection.ifos = ifos.clone();
    }
    if let Some(spacing) = args.spacing {
        config.injection.spacing = spacing;
    }
    if let Some(file_length) = args.file_length {
        config.injection.file_length = file_length;
    }
    if let Some(buffer) = args.buffer {
        config.injection.buffer = buffer;
    }
    if let Some(fftlength) = args.fftlength {
        config.injection.fftlength = fftlength;
    }
    if let Some(fmin) = args.fmin {
        config.waveform.minimum_frequency = fmin;
    }
}

fn run_inject(args: InjectArgs, mut config: GwInjectConfig, verbosity: u8) -> InjectResult<()> {
    setup_logging(config.logging.clone().with_verbosity(verbosity))?;
    apply_overrides(&mut config, &args);

    let pipeline = TimeslideInjectionPipeline::from_config(&config)?;
    let mut prior = PriorDict::from_file(&args.prior_file, args.seed)?;
    let source = TimeSlide::open(&args.source)?;

    let summary = pipeline.run(&source, &args.destination, &mut prior)?;
    tracing::info!(
        destination = %summary.destination.path().display(),
        injections = summary.manifest.len(),
        segments = summary.manifest.num_segments(),
        livetime = summary.destination.livetime(),
        elapsed_secs = summary.elapsed_secs,
        "Done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 8] = [
        "gwinject",
        "inject",
        "--source",
        "bg",
        "--destination",
        "out",
        "--prior-file",
        "prior.yaml",
    ];

    fn inject_args(extra: &[&str]) -> InjectArgs {
        let argv = REQUIRED.iter().chain(extra.iter()).copied();
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Inject(args) => args,
            Commands::GenerateWaveforms(_) => panic!("expected the inject command"),
        }
    }

    #[test]
    fn test_absent_flags_keep_config() {
        let mut config = GwInjectConfig::default();
        config.injection.spacing = 12.0;
        config.waveform.minimum_frequency = 15.0;
        let before = config.clone();

        apply_overrides(&mut config, &inject_args(&[]));
        assert_eq!(config, before);
    }

    #[test]
    fn test_flags_replace_config() {
        let mut config = GwInjectConfig::default();
        let args = inject_args(&[
            "--ifos",
            "H1,L1,V1",
            "--spacing",
            "32",
            "--file-length",
            "4096",
            "--buffer",
            "8",
            "--fftlength",
            "4",
            "--fmin",
            "10",
        ]);
        apply_overrides(&mut config, &args);

        assert_eq!(config.injection.ifos, vec!["H1", "L1", "V1"]);
        assert_eq!(config.injection.spacing, 32.0);
        assert_eq!(config.injection.file_length, 4096.0);
        assert_eq!(config.injection.buffer, 8.0);
        assert_eq!(config.injection.fftlength, 4.0);
        assert_eq!(config.waveform.minimum_frequency, 10.0);
        assert_eq!(config.injection.prefix, GwInjectConfig::default().injection.prefix);
    }

    #[test]
    fn test_partial_flags() {
        let mut config = GwInjectConfig::default();
        apply_overrides(&mut config, &inject_args(&["--ifos", "V1", "--buffer", "2"]));

        let defaults = GwInjectConfig::default();
        assert_eq!(config.injection.ifos, vec!["V1"]);
        assert_eq!(config.injection.buffer, 2.0);
        assert_eq!(config.injection.spacing, defaults.injection.spacing);
        assert_eq!(config.waveform, defaults.waveform);
    }
}
