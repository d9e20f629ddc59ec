//! Fixtures shared by the pipeline tests.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::path::Path;
use std::sync::Arc;

use gwinject_core::waveform::NewtonianChirp;
use gwinject_core::{InjectResult, InjectionConfig, ParameterSet, RawWaveformBatch, WaveformModel};

use crate::store::write_timeseries;

pub const FS: f64 = 256.0;
pub const DURATION: f64 = 4.0;

/// Nearby heavy binaries over the whole sky.
pub const PRIOR_YAML: &str = r#"
mass_1: {distribution: uniform, minimum: 25.0, maximum: 35.0}
mass_2: {distribution: uniform, minimum: 20.0, maximum: 25.0}
luminosity_distance: {distribution: uniform, minimum: 100.0, maximum: 400.0}
theta_jn: {distribution: sine}
phase: {distribution: uniform, minimum: 0.0, maximum: 6.283185307179586}
ra: {distribution: uniform, minimum: 0.0, maximum: 6.283185307179586}
dec: {distribution: cosine}
psi: {distribution: uniform, minimum: 0.0, maximum: 3.141592653589793}
geocent_time: {distribution: constant, value: 0.0}
"#;

pub fn write_prior(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("prior.yaml");
    std::fs::write(&path, PRIOR_YAML).unwrap();
    path
}

pub fn chirp_model() -> Arc<dyn WaveformModel> {
    Arc::new(NewtonianChirp::new(FS, DURATION, 20.0, 50.0))
}

pub fn injection_config(ifos: &[&str]) -> InjectionConfig {
    InjectionConfig {
        ifos: ifos.iter().map(|s| s.to_string()).collect(),
        spacing: 8.0,
        file_length: 32.0,
        buffer: 0.0,
        fftlength: 2.0,
        prefix: "inj".to_string(),
    }
}

/// Gaussian background at strain scale, split into `chunk`-second files.
pub fn write_background(
    root: &Path,
    t0: f64,
    seconds: f64,
    chunk: f64,
    fs: f64,
    ifos: &[&str],
    seed: u64,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1e-21).unwrap();
    let mut start = t0;
    while start < t0 + seconds {
        let stop = (start + chunk).min(t0 + seconds);
        let n = ((stop - start) * fs).round() as usize;
        let times: Vec<f64> = (0..n).map(|i| start + i as f64 / fs).collect();
        let channels: Vec<Vec<f64>> = ifos
            .iter()
            .map(|_| (0..n).map(|_| normal.sample(&mut rng)).collect())
            .collect();
        let named: Vec<(&str, &[f64])> = ifos
            .iter()
            .zip(&channels)
            .map(|(name, data)| (*name, data.as_slice()))
            .collect();
        write_timeseries(root, "background", &times, fs, &named).unwrap();
        start = stop;
    }
}

/// Model whose output is poisoned with NaN.
pub struct NanModel;

impl WaveformModel for NanModel {
    fn sample_rate(&self) -> f64 {
        FS
    }
    fn duration(&self) -> f64 {
        DURATION
    }
    fn minimum_frequency(&self) -> f64 {
        20.0
    }
    fn reference_frequency(&self) -> f64 {
        50.0
    }
    fn approximant(&self) -> &str {
        "Nan"
    }
    fn generate(&self, params: &ParameterSet) -> InjectResult<RawWaveformBatch> {
        let size = self.waveform_size();
        RawWaveformBatch::from_flat(vec![f64::NAN; params.len() * 2 * size], params.len(), size)
    }
}

/// Model that emits silence.
pub struct SilentModel;

impl WaveformModel for SilentModel {
    fn sample_rate(&self) -> f64 {
        FS
    }
    fn duration(&self) -> f64 {
        DURATION
    }
    fn minimum_frequency(&self) -> f64 {
        20.0
    }
    fn reference_frequency(&self) -> f64 {
        50.0
    }
    fn approximant(&self) -> &str {
        "Silent"
    }
    fn generate(&self, params: &ParameterSet) -> InjectResult<RawWaveformBatch> {
        Ok(RawWaveformBatch::zeros(params.len(), self.waveform_size()))
    }
}
