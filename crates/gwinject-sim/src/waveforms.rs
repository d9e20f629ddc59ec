//! Standalone raw-waveform generation
//!
//! Samples `n` parameter sets from a prior file, generates their high-passed
//! `(plus, cross)` polarizations and stores everything in
//! `<outdir>/signals.gwd`:
//!
//! | dataset        | shape                     |
//! |----------------|---------------------------|
//! | one per prior  | `[n]`                     |
//! | `signals`      | `[n, 2, waveform_size]`   |
//!
//! with attributes `size`, `sample_rate` and `waveform_duration`. An
//! existing output file is left untouched unless regeneration is forced.

use std::path::PathBuf;
use std::sync::Arc;

use gwinject_core::{
    InjectResult, SignalBatchGenerator, WaveformGeneratorConfig, WaveformModel,
};

use crate::container::DatasetFile;
use crate::prior::{PriorDict, PriorSampler};

/// Output file name inside `outdir`
pub const SIGNALS_FILE_NAME: &str = "signals.gwd";
/// Log file written next to the output by the command-line driver
pub const LOG_FILE_NAME: &str = "generate_waveforms.log";
/// Dataset holding the polarization stack
pub const SIGNALS_DATASET: &str = "signals";

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateWaveformsOptions {
    /// YAML prior definition
    pub prior_file: PathBuf,
    pub n_samples: usize,
    pub outdir: PathBuf,
    /// Model and sampling; `duration` and `sample_rate` set the output shape
    pub waveform: WaveformGeneratorConfig,
    /// Seed the prior for reproducible output
    pub deterministic: bool,
    pub seed: u64,
    /// Regenerate even if the output file exists
    pub force_generation: bool,
}

impl GenerateWaveformsOptions {
    pub fn new(prior_file: impl Into<PathBuf>, n_samples: usize, outdir: impl Into<PathBuf>) -> Self {
        Self {
            prior_file: prior_file.into(),
            n_samples,
            outdir: outdir.into(),
            waveform: WaveformGeneratorConfig {
                duration: 8.0,
                sample_rate: 4096.0,
                ..Default::default()
            },
            deterministic: false,
            seed: 0,
            force_generation: false,
        }
    }

    pub fn signal_file(&self) -> PathBuf {
        self.outdir.join(SIGNALS_FILE_NAME)
    }
}

/// Generate with the configured approximant. Returns the output path.
pub fn generate_waveforms(options: &GenerateWaveformsOptions) -> InjectResult<PathBuf> {
    let model = options.waveform.build()?;
    generate_waveforms_with_model(options, model)
}

/// Generate with an explicit model; `options.waveform` is ignored.
pub fn generate_waveforms_with_model(
    options: &GenerateWaveformsOptions,
    model: Arc<dyn WaveformModel>,
) -> InjectResult<PathBuf> {
    std::fs::create_dir_all(&options.outdir)?;
    let signal_file = options.signal_file();
    if signal_file.exists() && !options.force_generation {
        tracing::info!(path = %signal_file.display(), "Signal file already exists, skipping generation");
        return Ok(signal_file);
    }

    let seed = options.deterministic.then_some(options.seed);
    let mut prior = PriorDict::from_file(&options.prior_file, seed)?;
    let params = prior.sample(options.n_samples)?;

    let generator = SignalBatchGenerator::new(model)?;
    tracing::info!(
        n_samples = options.n_samples,
        approximant = generator.model().approximant(),
        sample_rate = generator.sample_rate(),
        waveform_duration = generator.duration(),
        deterministic = options.deterministic,
        "Generating waveforms"
    );
    let signals = generator.generate(&params)?;
    signals.ensure_finite()?;

    let (n, _, size) = signals.shape();
    let mut file = DatasetFile::new();
    for (name, values) in params.iter() {
        file.create_dataset(name, vec![n], values.to_vec())?;
    }
    file.create_dataset(SIGNALS_DATASET, vec![n, 2, size], signals.into_flat())?;
    file.set_attr("size", n as u64);
    file.set_attr("sample_rate", generator.sample_rate());
    file.set_attr("waveform_duration", generator.duration());
    file.write(&signal_file)?;

    tracing::info!(path = %signal_file.display(), "Finished generating waveforms");
    Ok(signal_file)
}
