//! Dataset container: self-describing `.gwd` files
//!
//! A container holds named, shaped `f64` datasets plus scalar attributes.
//! It is the on-disk format for output chunks, the injection manifest and
//! the generated-signals file.
//!
//! ## Format
//!
//! The file starts with a JSON header line terminated by `\n`, followed by
//! the little-endian `f64` payload of every dataset back to back. The header
//! carries a format tag, a version, the attributes and a dataset table:
//!
//! ```text
//! {"format":"gwd","version":1,"attrs":{"t0":0.0,...},
//!  "datasets":[{"name":"H1","shape":[8192],"offset":0},...]}\n
//! <f64 LE> <f64 LE> ...
//! ```
//!
//! `offset` counts values, not bytes. Files are written to a temporary
//! sibling and renamed into place, so readers never see a partial file.
//!
//! ## Example
//!
//! ```rust,no_run
//! use gwinject_sim::container::DatasetFile;
//!
//! let mut file = DatasetFile::new();
//! file.create_dataset("H1", vec![4], vec![0.0, 1.0, 2.0, 3.0])?;
//! file.set_attr("sample_rate", 2048.0);
//! file.write("/tmp/chunk.gwd")?;
//!
//! let back = DatasetFile::open("/tmp/chunk.gwd")?;
//! assert_eq!(back.require("H1")?.data(), &[0.0, 1.0, 2.0, 3.0]);
//! # Ok::<(), gwinject_core::InjectionError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use gwinject_core::{InjectResult, InjectionError};

/// File extension of dataset containers
pub const EXTENSION: &str = "gwd";

const FORMAT_TAG: &str = "gwd";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    format: String,
    version: u32,
    #[serde(default)]
    attrs: BTreeMap<String, serde_json::Value>,
    datasets: Vec<DatasetEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DatasetEntry {
    name: String,
    shape: Vec<usize>,
    offset: u64,
}

/// A shaped block of values stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Dataset {
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// In-memory image of a `.gwd` file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetFile {
    attrs: BTreeMap<String, serde_json::Value>,
    datasets: BTreeMap<String, Dataset>,
    source: Option<PathBuf>,
}

impl DatasetFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a dataset. The shape must account for every value.
    pub fn create_dataset(
        &mut self,
        name: impl Into<String>,
        shape: Vec<usize>,
        data: Vec<f64>,
    ) -> InjectResult<()> {
        let name = name.into();
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(InjectionError::length_mismatch(
                &format!("dataset '{}' of shape {:?}", name, shape),
                expected,
                data.len(),
            ));
        }
        self.datasets.insert(name, Dataset { shape, data });
        Ok(())
    }

    pub fn dataset(&self, name: &str) -> Option<&Dataset> {
        self.datasets.get(name)
    }

    /// Fetch a dataset that must be present.
    pub fn require(&self, name: &str) -> InjectResult<&Dataset> {
        self.datasets.get(name).ok_or_else(|| InjectionError::Format {
            path: self.source_display(),
            reason: format!("missing dataset '{}'", name),
        })
    }

    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.attrs.insert(name.into(), value.into());
    }

    pub fn attr(&self, name: &str) -> Option<&serde_json::Value> {
        self.attrs.get(name)
    }

    /// Numeric attribute that must be present.
    pub fn require_f64_attr(&self, name: &str) -> InjectResult<f64> {
        self.attrs
            .get(name)
            .and_then(serde_json::Value::as_f64)
            .ok_or_else(|| InjectionError::Format {
                path: self.source_display(),
                reason: format!("missing numeric attribute '{}'", name),
            })
    }

    /// Path this container was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn source_display(&self) -> String {
        self.source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<memory>".to_string())
    }

    /// Write atomically: temporary sibling, then rename.
    pub fn write(&self, path: impl AsRef<Path>) -> InjectResult<()> {
        let path = path.as_ref();

        let mut offset = 0u64;
        let datasets = self
            .datasets
            .iter()
            .map(|(name, ds)| {
                let entry = DatasetEntry {
                    name: name.clone(),
                    shape: ds.shape.clone(),
                    offset,
                };
                offset += ds.data.len() as u64;
                entry
            })
            .collect();
        let header = Header {
            format: FORMAT_TAG.to_string(),
            version: FORMAT_VERSION,
            attrs: self.attrs.clone(),
            datasets,
        };
        let header_line = serde_json::to_string(&header)
            .map_err(|e| InjectionError::Serialization(e.to_string()))?;

        let tmp = temporary_sibling(path);
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            writer.write_all(header_line.as_bytes())?;
            writer.write_all(b"\n")?;
            for ds in self.datasets.values() {
                for value in &ds.data {
                    writer.write_all(&value.to_le_bytes())?;
                }
            }
            writer.flush()?;
        }
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn open(path: impl AsRef<Path>) -> InjectResult<Self> {
        let path = path.as_ref();
        let malformed = |reason: String| InjectionError::Format {
            path: path.display().to_string(),
            reason,
        };

        let mut reader = BufReader::new(File::open(path)?);
        let mut line = String::new();
        reader.read_line(&mut line)?;
        let header: Header = serde_json::from_str(line.trim_end())
            .map_err(|e| malformed(format!("bad header: {}", e)))?;
        if header.format != FORMAT_TAG {
            return Err(malformed(format!("unexpected format tag '{}'", header.format)));
        }
        if header.version != FORMAT_VERSION {
            return Err(malformed(format!("unsupported version {}", header.version)));
        }

        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;
        if payload.len() % 8 != 0 {
            return Err(malformed(format!(
                "payload of {} bytes is not a whole number of f64 values",
                payload.len()
            )));
        }
        let values: Vec<f64> = payload
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect();

        let mut datasets = BTreeMap::new();
        for entry in header.datasets {
            let len = entry
                .shape
                .iter()
                .try_fold(1usize, |acc, &d| acc.checked_mul(d));
            let end = usize::try_from(entry.offset)
                .ok()
                .zip(len)
                .and_then(|(start, len)| start.checked_add(len).map(|end| (start, end)));
            let (start, end) = match end {
                Some((start, end)) if end <= values.len() => (start, end),
                _ => {
                    return Err(malformed(format!(
                        "dataset '{}' (offset {}, shape {:?}) does not fit a payload of {} values",
                        entry.name,
                        entry.offset,
                        entry.shape,
                        values.len()
                    )));
                }
            };
            datasets.insert(
                entry.name,
                Dataset {
                    shape: entry.shape,
                    data: values[start..end].to_vec(),
                },
            );
        }

        Ok(Self {
            attrs: header.attrs,
            datasets,
            source: Some(path.to_path_buf()),
        })
    }
}

fn temporary_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> DatasetFile {
        let mut file = DatasetFile::new();
        file.create_dataset("t", vec![4], vec![10.0, 10.5, 11.0, 11.5]).unwrap();
        file.create_dataset("signals", vec![2, 2, 1], vec![1.0, -2.0, 3.5, f64::MIN_POSITIVE])
            .unwrap();
        file.set_attr("sample_rate", 2.0);
        file.set_attr("size", 2u64);
        file
    }

    #[test]
    fn test_write_open_preserves_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.gwd");
        let original = sample();
        original.write(&path).unwrap();

        let back = DatasetFile::open(&path).unwrap();
        assert_eq!(back.source(), Some(path.as_path()));
        assert_eq!(back.require("t").unwrap(), original.require("t").unwrap());
        assert_eq!(back.require("signals").unwrap().shape(), &[2, 2, 1]);
        assert_eq!(back.require("signals").unwrap().data()[3], f64::MIN_POSITIVE);
        assert_eq!(back.require_f64_attr("sample_rate").unwrap(), 2.0);
        assert_eq!(back.attr("size").and_then(|v| v.as_u64()), Some(2));
        assert_eq!(back.dataset_names().collect::<Vec<_>>(), vec!["signals", "t"]);

        // No temporary file left behind
        let names: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_shape_must_match_data() {
        let mut file = DatasetFile::new();
        let err = file.create_dataset("x", vec![2, 3], vec![0.0; 5]).unwrap_err();
        assert!(matches!(err, InjectionError::Shape(_)));
    }

    #[test]
    fn test_missing_dataset_is_format_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.gwd");
        sample().write(&path).unwrap();
        let back = DatasetFile::open(&path).unwrap();
        match back.require("L1") {
            Err(InjectionError::Format { path: p, reason }) => {
                assert!(p.ends_with("sample.gwd"));
                assert!(reason.contains("L1"));
            }
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.gwd");
        sample().write(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 8]).unwrap();
        assert!(matches!(
            DatasetFile::open(&path),
            Err(InjectionError::Format { .. })
        ));
    }

    fn write_raw(path: &Path, datasets: &str, values: &[f64]) {
        let mut bytes = format!(
            "{{\"format\":\"{}\",\"version\":{},\"datasets\":{}}}\n",
            FORMAT_TAG, FORMAT_VERSION, datasets
        )
        .into_bytes();
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_out_of_range_offset_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.gwd");
        for datasets in [
            r#"[{"name":"x","shape":[1],"offset":18446744073709551615}]"#,
            r#"[{"name":"x","shape":[18446744073709551615,2],"offset":0}]"#,
            r#"[{"name":"x","shape":[2],"offset":0}]"#,
        ] {
            write_raw(&path, datasets, &[1.0]);
            assert!(matches!(
                DatasetFile::open(&path),
                Err(InjectionError::Format { .. })
            ));
        }

        write_raw(&path, r#"[{"name":"x","shape":[1],"offset":1}]"#, &[1.0, 2.0]);
        let file = DatasetFile::open(&path).unwrap();
        assert_eq!(file.require("x").unwrap().data(), &[2.0]);
    }

    #[test]
    fn test_garbage_header_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("junk.gwd");
        std::fs::write(&path, b"not json\n").unwrap();
        assert!(matches!(
            DatasetFile::open(&path),
            Err(InjectionError::Format { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            DatasetFile::open(dir.path().join("absent.gwd")),
            Err(InjectionError::Io(_))
        ));
    }
}
