//! Ordered detector set
//!
//! Each entry keeps a detector together with the catalog function and the
//! field it was built from, so the three can never drift out of alignment.

use mlj_catalog::sparse::{has_sparse_variant, to_sparse};
use mlj_catalog::{Aggregation, Field};
use mlj_config::Detector;

/// A detector with the function and field it was built from
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorEntry {
    /// Detector as submitted, sparse variant included
    pub detector: Detector,
    /// Standard (non-sparse) catalog entry
    pub aggregation: Aggregation,
    /// Field the detector runs on
    pub field: Field,
}

impl DetectorEntry {
    /// Bundle a detector with its catalog entry and field
    #[must_use]
    pub fn new(detector: Detector, aggregation: Aggregation, field: Field) -> Self {
        Self {
            detector,
            aggregation,
            field,
        }
    }

    /// Point the detector function at the sparse or standard variant
    ///
    /// Functions without a sparse counterpart are left as they are.
    pub fn apply_sparse_data(&mut self, sparse_data: bool) {
        let id = self.aggregation.id;
        if has_sparse_variant(id) {
            self.detector.function = if sparse_data { to_sparse(id) } else { id };
        }
    }
}

/// Ordered collection of detector entries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorSet {
    entries: Vec<DetectorEntry>,
}

impl DetectorSet {
    /// Empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn push(&mut self, entry: DetectorEntry) {
        self.entries.push(entry);
    }

    /// Replace the entry at `index`; false when out of range
    pub fn replace(&mut self, index: usize, entry: DetectorEntry) -> bool {
        match self.entries.get_mut(index) {
            Some(slot) => {
                *slot = entry;
                true
            }
            None => false,
        }
    }

    /// Remove the entry at `index`, if present
    pub fn remove(&mut self, index: usize) -> Option<DetectorEntry> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Switch every entry to or from its sparse variant
    pub fn apply_sparse_data(&mut self, sparse_data: bool) {
        for entry in &mut self.entries {
            entry.apply_sparse_data(sparse_data);
        }
    }

    /// Number of detectors
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no detectors
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&DetectorEntry> {
        self.entries.get(index)
    }

    /// All entries in order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[DetectorEntry] {
        &self.entries
    }

    /// Iterate entries in order
    pub fn iter(&self) -> impl Iterator<Item = &DetectorEntry> {
        self.entries.iter()
    }

    /// Detector definitions, in order
    #[must_use]
    pub fn detectors(&self) -> Vec<Detector> {
        self.entries.iter().map(|e| e.detector.clone()).collect()
    }
}
