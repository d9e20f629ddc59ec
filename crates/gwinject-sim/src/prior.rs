//! Prior sampling
//!
//! Source parameters are drawn from independent one-dimensional priors, one
//! per parameter name, declared in a YAML prior file:
//!
//! ```yaml
//! mass_1: {distribution: uniform, minimum: 5.0, maximum: 100.0}
//! mass_2: {distribution: uniform, minimum: 5.0, maximum: 100.0}
//! luminosity_distance: {distribution: power_law, alpha: 2.0, minimum: 100.0, maximum: 3000.0}
//! theta_jn: {distribution: sine}
//! dec: {distribution: cosine}
//! ra: {distribution: uniform, minimum: 0.0, maximum: 6.283185307179586}
//! psi: {distribution: uniform, minimum: 0.0, maximum: 3.141592653589793}
//! phase: {distribution: uniform, minimum: 0.0, maximum: 6.283185307179586}
//! geocent_time: {distribution: constant, value: 0.0}
//! ```
//!
//! Bounded distributions are sampled by inverting their CDF.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, PI};
use std::path::Path;

use gwinject_core::{ConfigError, InjectResult, InjectionError, ParameterSet};

/// Source of parameter tables.
pub trait PriorSampler: Send {
    /// Draw `n` independent parameter sets.
    fn sample(&mut self, n: usize) -> InjectResult<ParameterSet>;
}

/// One-dimensional prior distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "distribution", rename_all = "snake_case")]
pub enum Prior {
    Constant {
        value: f64,
    },
    Uniform {
        minimum: f64,
        maximum: f64,
    },
    /// Uniform in the logarithm
    LogUniform {
        minimum: f64,
        maximum: f64,
    },
    /// `p(x) ∝ x^alpha`
    PowerLaw {
        alpha: f64,
        minimum: f64,
        maximum: f64,
    },
    /// `p(x) ∝ sin x`, e.g. inclination
    Sine {
        #[serde(default)]
        minimum: f64,
        #[serde(default = "default_pi")]
        maximum: f64,
    },
    /// `p(x) ∝ cos x`, e.g. declination
    Cosine {
        #[serde(default = "default_minus_half_pi")]
        minimum: f64,
        #[serde(default = "default_half_pi")]
        maximum: f64,
    },
    Gaussian {
        mu: f64,
        sigma: f64,
    },
}

fn default_pi() -> f64 {
    PI
}

fn default_half_pi() -> f64 {
    FRAC_PI_2
}

fn default_minus_half_pi() -> f64 {
    -FRAC_PI_2
}

impl Prior {
    fn bounds(&self) -> Option<(f64, f64)> {
        match *self {
            Prior::Uniform { minimum, maximum }
            | Prior::LogUniform { minimum, maximum }
            | Prior::PowerLaw { minimum, maximum, .. }
            | Prior::Sine { minimum, maximum }
            | Prior::Cosine { minimum, maximum } => Some((minimum, maximum)),
            Prior::Constant { .. } | Prior::Gaussian { .. } => None,
        }
    }

    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let invalid = |reason: String| {
            Err(ConfigError::ValidationError(format!("prior '{}': {}", name, reason)))
        };
        if let Some((lo, hi)) = self.bounds() {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return invalid(format!("need finite minimum < maximum, got [{}, {}]", lo, hi));
            }
        }
        match *self {
            Prior::Constant { value } if !value.is_finite() => invalid("value must be finite".into()),
            Prior::LogUniform { minimum, .. } | Prior::PowerLaw { minimum, .. }
                if minimum <= 0.0 =>
            {
                invalid("minimum must be positive".into())
            }
            Prior::Gaussian { mu, sigma } if !(mu.is_finite() && sigma > 0.0) => {
                invalid("need finite mu and positive sigma".into())
            }
            Prior::Sine { minimum, maximum } if minimum < 0.0 || maximum > PI => {
                invalid("sine prior must lie within [0, π]".into())
            }
            Prior::Cosine { minimum, maximum } if minimum < -FRAC_PI_2 || maximum > FRAC_PI_2 => {
                invalid("cosine prior must lie within [-π/2, π/2]".into())
            }
            _ => Ok(()),
        }
    }

    /// Draw one value.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            Prior::Constant { value } => value,
            Prior::Uniform { minimum, maximum } => minimum + rng.gen::<f64>() * (maximum - minimum),
            Prior::LogUniform { minimum, maximum } => {
                let (a, b) = (minimum.ln(), maximum.ln());
                (a + rng.gen::<f64>() * (b - a)).exp()
            }
            Prior::PowerLaw {
                alpha,
                minimum,
                maximum,
            } => {
                let u = rng.gen::<f64>();
                if (alpha + 1.0).abs() < 1e-12 {
                    minimum * (maximum / minimum).powf(u)
                } else {
                    let k = alpha + 1.0;
                    let (a, b) = (minimum.powf(k), maximum.powf(k));
                    (a + u * (b - a)).powf(1.0 / k)
                }
            }
            Prior::Sine { minimum, maximum } => {
                let (ca, cb) = (minimum.cos(), maximum.cos());
                (ca - rng.gen::<f64>() * (ca - cb)).clamp(-1.0, 1.0).acos()
            }
            Prior::Cosine { minimum, maximum } => {
                let (sa, sb) = (minimum.sin(), maximum.sin());
                (sa + rng.gen::<f64>() * (sb - sa)).clamp(-1.0, 1.0).asin()
            }
            Prior::Gaussian { mu, sigma } => match Normal::new(mu, sigma) {
                Ok(normal) => normal.sample(rng),
                Err(_) => mu,
            },
        }
    }
}

/// Named independent priors with their own random stream.
#[derive(Debug, Clone)]
pub struct PriorDict {
    priors: BTreeMap<String, Prior>,
    rng: StdRng,
}

impl PriorDict {
    /// Seeded when `seed` is given; otherwise seeded from OS entropy.
    pub fn new(priors: BTreeMap<String, Prior>, seed: Option<u64>) -> InjectResult<Self> {
        if priors.is_empty() {
            return Err(ConfigError::ValidationError("prior file declares no parameters".into()).into());
        }
        for (name, prior) in &priors {
            prior.validate(name)?;
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { priors, rng })
    }

    pub fn parse(yaml: &str, seed: Option<u64>) -> InjectResult<Self> {
        let priors: BTreeMap<String, Prior> = serde_yaml::from_str(yaml)
            .map_err(|e| InjectionError::Config(ConfigError::ParseError(e.to_string())))?;
        Self::new(priors, seed)
    }

    pub fn from_file(path: impl AsRef<Path>, seed: Option<u64>) -> InjectResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            InjectionError::Config(ConfigError::ReadError(format!("{}: {}", path.display(), e)))
        })?;
        Self::parse(&yaml, seed)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.priors.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&Prior> {
        self.priors.get(name)
    }
}

impl PriorSampler for PriorDict {
    fn sample(&mut self, n: usize) -> InjectResult<ParameterSet> {
        let mut set = ParameterSet::with_len(n);
        for (name, prior) in &self.priors {
            let column: Vec<f64> = (0..n).map(|_| prior.sample(&mut self.rng)).collect();
            set.insert(name.clone(), column)?;
        }
        Ok(set)
    }
}
