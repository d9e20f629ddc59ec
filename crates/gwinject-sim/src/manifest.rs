//! Injection manifest
//!
//! Accumulates the parameters of every injected signal across a run, in
//! segment order, and writes them once at the end to
//! `<destination>/params.gwd`. Each parameter becomes one dataset holding
//! its full concatenated sequence; the `size` attribute records the total
//! number of injections.
//!
//! The manifest takes the place of the `params.h5` HDF5 file written by
//! earlier tooling. It uses the same dataset-per-parameter layout and the
//! same `size` attribute, stored in the `.gwd` container instead, so readers
//! of the old file need only the new name and the container reader.

use std::path::{Path, PathBuf};

use gwinject_core::{InjectResult, ParameterSet};

use crate::container::DatasetFile;

/// File name of the manifest at the destination root
pub const MANIFEST_FILE_NAME: &str = "params.gwd";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InjectionManifest {
    parameters: ParameterSet,
    segments: usize,
}

impl InjectionManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one segment's parameters below those already recorded.
    ///
    /// Every segment must carry the same parameter names.
    pub fn append(&mut self, segment: &ParameterSet) -> InjectResult<()> {
        self.parameters.extend(segment)?;
        self.segments += 1;
        Ok(())
    }

    /// Total injections recorded
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Segments appended so far
    pub fn num_segments(&self) -> usize {
        self.segments
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.parameters.get(name)
    }

    /// Write `<root>/params.gwd` and return its path.
    pub fn write(&self, root: &Path) -> InjectResult<PathBuf> {
        let mut file = DatasetFile::new();
        for (name, values) in self.parameters.iter() {
            file.create_dataset(name, vec![values.len()], values.to_vec())?;
        }
        file.set_attr("size", self.parameters.len() as u64);

        let path = root.join(MANIFEST_FILE_NAME);
        file.write(&path)?;
        tracing::info!(
            path = %path.display(),
            injections = self.parameters.len(),
            parameters = self.parameters.num_columns(),
            "Wrote injection manifest"
        );
        Ok(path)
    }

    /// Read a manifest previously written by [`InjectionManifest::write`].
    pub fn open(root: &Path) -> InjectResult<Self> {
        let file = DatasetFile::open(root.join(MANIFEST_FILE_NAME))?;
        let size = file.require_f64_attr("size")? as usize;
        let mut parameters = ParameterSet::with_len(size);
        for name in file.dataset_names() {
            parameters.insert(name, file.require(name)?.data().to_vec())?;
        }
        Ok(Self {
            parameters,
            segments: 0,
        })
    }
}
