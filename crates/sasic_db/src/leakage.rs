//! Leakage-optimal input vectors per cell type.

use std::collections::BTreeMap;

/// `cell_type -> {input_port: 0|1}`, keyed by the exact type string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeakageTable {
    vectors: BTreeMap<String, BTreeMap<String, bool>>,
}

impl LeakageTable {
    /// An empty table; every lookup falls back to the caller's heuristic.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the value `port` of `cell_type` should be held at.
    pub fn insert(&mut self, cell_type: impl Into<String>, port: impl Into<String>, high: bool) {
        self.vectors
            .entry(cell_type.into())
            .or_default()
            .insert(port.into(), high);
    }

    /// The preferred value for one port, `Some(true)` meaning tie high.
    pub fn value(&self, cell_type: &str, port: &str) -> Option<bool> {
        self.vectors.get(cell_type)?.get(port).copied()
    }

    /// The whole vector for a type.
    pub fn vector(&self, cell_type: &str) -> Option<&BTreeMap<String, bool>> {
        self.vectors.get(cell_type)
    }

    /// `(cell_type, vector)` pairs sorted by type.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, bool>)> {
        self.vectors.iter().map(|(t, v)| (t.as_str(), v))
    }

    /// Number of types with a vector.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Returns `true` if no vectors are known.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}
