//! Background and output store
//!
//! A time-slide lives in one directory of chunk files. Each chunk holds the
//! shared time index `t` and one strain dataset per detector over a
//! contiguous window, and is named after that window:
//!
//! ```text
//! <prefix>-<t0>-<length>.gwd        e.g.  inj-1240000000-1024.gwd
//! ```
//!
//! Chunks whose windows abut form a [`Segment`]; a gap starts a new one.
//!
//! ```text
//! chunks    [0,32) [32,64)        [128,160) [160,192)
//! segments  |---- [0,64) ----|    |---- [128,192) ----|
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gwinject_core::{ConfigError, GpsSeconds, InjectResult, InjectionError, Sample, TimeSeries};

use crate::container::{DatasetFile, EXTENSION};

/// Name of the time index dataset in every chunk
pub const TIME_DATASET: &str = "t";

/// Two chunk boundaries closer than this (seconds) are treated as equal
const CONTIGUITY_TOLERANCE: f64 = 1e-6;

/// Render a GPS time or duration for a file name.
fn format_seconds(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// File name of the chunk covering `[t0, t0 + length)`.
pub fn chunk_file_name(prefix: &str, t0: GpsSeconds, length: f64) -> String {
    format!(
        "{}-{}-{}.{}",
        prefix,
        format_seconds(t0),
        format_seconds(length),
        EXTENSION
    )
}

/// Parse `<prefix>-<t0>-<length>.gwd` into its parts.
///
/// A negative `t0` shows up as a doubled separator (`inj--5-32.gwd`); the
/// minus sign belongs to the time, not the prefix.
pub fn parse_chunk_file_name(name: &str) -> Option<(String, GpsSeconds, f64)> {
    let stem = name.strip_suffix(EXTENSION)?.strip_suffix('.')?;
    let (rest, length) = stem.rsplit_once('-')?;
    let length: f64 = length.parse().ok()?;
    let mut sep = rest.rfind('-')?;
    if sep > 0 && rest.as_bytes()[sep - 1] == b'-' {
        sep -= 1;
    }
    let prefix = &rest[..sep];
    let t0: f64 = rest[sep + 1..].parse().ok()?;
    if prefix.is_empty() || !(length > 0.0) || !t0.is_finite() {
        return None;
    }
    Some((prefix.to_string(), t0, length))
}

/// Persist one chunk: the time index plus one series per detector.
///
/// Returns the path written. Every channel must match the time index in
/// length.
pub fn write_timeseries(
    root: &Path,
    prefix: &str,
    times: &[GpsSeconds],
    sample_rate: f64,
    channels: &[(&str, &[Sample])],
) -> InjectResult<PathBuf> {
    if prefix.is_empty() || prefix.ends_with('-') {
        return Err(ConfigError::ValidationError(format!(
            "chunk prefix '{}' must be non-empty and must not end with '-'",
            prefix
        ))
        .into());
    }
    let Some(&t0) = times.first() else {
        return Err(InjectionError::Shape(
            "cannot write a chunk with an empty time index".to_string(),
        ));
    };
    let duration = times.len() as f64 / sample_rate;

    let mut file = DatasetFile::new();
    file.create_dataset(TIME_DATASET, vec![times.len()], times.to_vec())?;
    for (name, data) in channels {
        if data.len() != times.len() {
            return Err(InjectionError::length_mismatch(
                &format!("channel '{}' vs time index", name),
                times.len(),
                data.len(),
            ));
        }
        file.create_dataset(*name, vec![data.len()], data.to_vec())?;
    }
    file.set_attr("t0", t0);
    file.set_attr("sample_rate", sample_rate);
    file.set_attr("duration", duration);

    let path = root.join(chunk_file_name(prefix, t0, duration));
    file.write(&path)?;
    tracing::trace!(path = %path.display(), samples = times.len(), "Wrote chunk");
    Ok(path)
}

/// Contiguous `[t0, tf)` stretch of a time-slide backed by chunk files.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    t0: GpsSeconds,
    tf: GpsSeconds,
    files: Vec<PathBuf>,
}

/// Loaded contents of a segment: one series per requested detector on a
/// shared time base.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentData {
    pub times: Vec<GpsSeconds>,
    pub sample_rate: f64,
    /// In the order the detectors were requested
    pub series: Vec<TimeSeries>,
}

impl Segment {
    pub fn new(t0: GpsSeconds, tf: GpsSeconds, files: Vec<PathBuf>) -> Self {
        Self { t0, tf, files }
    }

    pub fn t0(&self) -> GpsSeconds {
        self.t0
    }

    pub fn tf(&self) -> GpsSeconds {
        self.tf
    }

    pub fn duration(&self) -> f64 {
        self.tf - self.t0
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Read and concatenate every chunk for the requested detectors.
    pub fn load(&self, ifos: &[&str]) -> InjectResult<SegmentData> {
        let mut times = Vec::new();
        let mut channels: Vec<Vec<Sample>> = vec![Vec::new(); ifos.len()];
        let mut sample_rate: Option<f64> = None;

        for path in &self.files {
            let file = DatasetFile::open(path)?;
            let rate = file.require_f64_attr("sample_rate")?;
            match sample_rate {
                None => sample_rate = Some(rate),
                Some(r) if (r - rate).abs() > 1e-9 * r => {
                    return Err(InjectionError::Format {
                        path: path.display().to_string(),
                        reason: format!("sample rate {} Hz differs from segment rate {} Hz", rate, r),
                    });
                }
                Some(_) => {}
            }

            let t = file.require(TIME_DATASET)?.data();
            for (channel, ifo) in channels.iter_mut().zip(ifos) {
                let data = file.require(ifo)?.data();
                if data.len() != t.len() {
                    return Err(InjectionError::Format {
                        path: path.display().to_string(),
                        reason: format!(
                            "dataset '{}' has {} samples but time index has {}",
                            ifo,
                            data.len(),
                            t.len()
                        ),
                    });
                }
                channel.extend_from_slice(data);
            }
            times.extend_from_slice(t);
        }

        let sample_rate = sample_rate.ok_or_else(|| {
            InjectionError::InsufficientData(format!(
                "segment [{}, {}) has no chunk files",
                self.t0, self.tf
            ))
        })?;
        let t0 = times.first().copied().unwrap_or(self.t0);
        let series = channels
            .into_iter()
            .map(|data| TimeSeries::new(t0, sample_rate, data))
            .collect();

        Ok(SegmentData {
            times,
            sample_rate,
            series,
        })
    }
}

/// A directory of chunk files grouped into contiguous segments.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSlide {
    root: PathBuf,
    segments: Vec<Segment>,
}

impl TimeSlide {
    /// Index an existing time-slide directory.
    pub fn open(root: impl Into<PathBuf>) -> InjectResult<Self> {
        let root = root.into();

        let mut chunks: Vec<(GpsSeconds, f64, PathBuf)> = Vec::new();
        for entry in std::fs::read_dir(&root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            if let Some((_, t0, length)) = parse_chunk_file_name(&name.to_string_lossy()) {
                chunks.push((t0, length, entry.path()));
            }
        }
        chunks.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut segments: Vec<Segment> = Vec::new();
        for (t0, length, path) in chunks {
            match segments.last_mut() {
                Some(seg) if (t0 - seg.tf).abs() < CONTIGUITY_TOLERANCE => {
                    seg.tf = t0 + length;
                    seg.files.push(path);
                }
                _ => segments.push(Segment::new(t0, t0 + length, vec![path])),
            }
        }

        tracing::debug!(root = %root.display(), segments = segments.len(), "Opened time-slide");
        Ok(Self { root, segments })
    }

    /// Create (or reuse) an empty destination directory.
    pub fn create(root: impl Into<PathBuf>) -> InjectResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            segments: Vec::new(),
        })
    }

    /// Root directory
    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Total seconds of data covered by all segments.
    pub fn livetime(&self) -> f64 {
        self.segments.iter().map(Segment::duration).sum()
    }

    /// Chunk files grouped by prefix.
    pub fn files_by_prefix(&self) -> BTreeMap<String, Vec<PathBuf>> {
        let mut map: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for path in self.segments.iter().flat_map(|s| s.files.iter()) {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if let Some((prefix, _, _)) = parse_chunk_file_name(&name) {
                map.entry(prefix).or_default().push(path.clone());
            }
        }
        map
    }
}
