//! Parameter tables
//!
//! A [`ParameterSet`] is a column-oriented table of physical parameters:
//! each named column holds one value per candidate signal, and every column
//! has the same length. The length is checked on every insertion so callers
//! can index rows without re-validating.
//!
//! ```text
//!            row 0    row 1    row 2
//! ra       [ 1.20,    0.33,    5.91 ]
//! dec      [-0.40,    0.12,    0.98 ]
//! psi      [ 2.10,    0.07,    1.55 ]
//! ```

use std::collections::BTreeMap;

use crate::types::{InjectResult, InjectionError};

/// Right ascension (rad)
pub const RA: &str = "ra";
/// Declination (rad)
pub const DEC: &str = "dec";
/// Polarization angle (rad)
pub const PSI: &str = "psi";
/// Geocentric coalescence time (GPS s)
pub const GEOCENT_TIME: &str = "geocent_time";

/// Column-oriented table of named parameter sequences sharing one length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    columns: BTreeMap<String, Vec<f64>>,
    len: usize,
}

impl ParameterSet {
    /// Create an empty table whose columns must all have `len` rows.
    pub fn with_len(len: usize) -> Self {
        Self {
            columns: BTreeMap::new(),
            len,
        }
    }

    /// Build a table from named columns, checking that all lengths agree.
    pub fn from_columns<I, S>(columns: I) -> InjectResult<Self>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut iter = columns.into_iter().peekable();
        let len = iter.peek().map(|(_, v)| v.len()).unwrap_or(0);
        let mut set = Self::with_len(len);
        for (name, values) in iter {
            set.insert(name, values)?;
        }
        Ok(set)
    }

    /// Number of rows (candidate signals).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of named columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Fetch a column that a consumer cannot do without.
    pub fn require(&self, name: &str) -> InjectResult<&[f64]> {
        self.get(name)
            .ok_or_else(|| InjectionError::Parameter(format!("missing parameter '{}'", name)))
    }

    /// Insert or replace a column. Fails with a shape error if the column
    /// length differs from the table length.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) -> InjectResult<()> {
        let name = name.into();
        if values.len() != self.len {
            return Err(InjectionError::length_mismatch(
                &format!("parameter column '{}'", name),
                self.len,
                values.len(),
            ));
        }
        self.columns.insert(name, values);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<f64>> {
        self.columns.remove(name)
    }

    /// One row as a name -> value map.
    pub fn row(&self, row: usize) -> Option<BTreeMap<&str, f64>> {
        if row >= self.len {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|(k, v)| (k.as_str(), v[row]))
                .collect(),
        )
    }

    /// Iterate over `(name, column)` pairs in sorted name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Append the rows of `other` below the rows of `self`. Both tables must
    /// carry exactly the same column names.
    pub fn extend(&mut self, other: &ParameterSet) -> InjectResult<()> {
        if self.columns.is_empty() && self.len == 0 {
            *self = other.clone();
            return Ok(());
        }
        let same_keys = self.columns.len() == other.columns.len()
            && self.columns.keys().all(|k| other.columns.contains_key(k));
        if !same_keys {
            let ours: Vec<&str> = self.names().collect();
            let theirs: Vec<&str> = other.names().collect();
            return Err(InjectionError::Shape(format!(
                "cannot append parameter table with columns {:?} to table with columns {:?}",
                theirs, ours
            )));
        }
        for (name, column) in self.columns.iter_mut() {
            column.extend_from_slice(&other.columns[name]);
        }
        self.len += other.len;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sky(n: usize) -> ParameterSet {
        ParameterSet::from_columns([
            (RA, (0..n).map(|i| i as f64 * 0.1).collect()),
            (DEC, vec![0.5; n]),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_columns_checks_lengths() {
        let err = ParameterSet::from_columns([(RA, vec![1.0, 2.0]), (DEC, vec![1.0])]).unwrap_err();
        assert!(matches!(err, InjectionError::Shape(_)));
    }

    #[test]
    fn test_insert_and_row() {
        let mut params = sky(3);
        params.insert(PSI, vec![0.0, 1.0, 2.0]).unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params.num_columns(), 3);

        let row = params.row(1).unwrap();
        assert_eq!(row[PSI], 1.0);
        assert_eq!(row[DEC], 0.5);
        assert!(params.row(3).is_none());

        assert!(params.insert(GEOCENT_TIME, vec![0.0; 2]).is_err());
    }

    #[test]
    fn test_require_missing_is_parameter_error() {
        let params = sky(2);
        assert!(params.require(RA).is_ok());
        assert!(matches!(params.require(PSI), Err(InjectionError::Parameter(_))));
    }

    #[test]
    fn test_extend_preserves_order() {
        let mut all = ParameterSet::default();
        all.extend(&sky(2)).unwrap();
        all.extend(&sky(3)).unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all.get(RA).unwrap(), &[0.0, 0.1, 0.0, 0.1, 0.2]);
    }

    #[test]
    fn test_extend_rejects_different_columns() {
        let mut all = sky(2);
        let other = ParameterSet::from_columns([(RA, vec![1.0])]).unwrap();
        assert!(matches!(all.extend(&other), Err(InjectionError::Shape(_))));
    }

    #[test]
    fn test_empty_with_len_keeps_row_count() {
        let params = ParameterSet::with_len(4);
        assert_eq!(params.len(), 4);
        assert_eq!(params.num_columns(), 0);
        assert!(params.row(0).unwrap().is_empty());
    }
}
