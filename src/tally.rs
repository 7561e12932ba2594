//! Vote tally snapshots.

use serde::Serialize;
use std::collections::BTreeMap;

/// A snapshot mapping category label to current count, rebuilt from scratch
/// on every poll cycle and discarded after broadcast. Serializes as a plain
/// JSON object (`{"a": 7, "b": 3}`), labels in lexical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VoteTally {
    counts: BTreeMap<String, i64>,
}

impl VoteTally {
    /// Fold one query result into a fresh tally.
    ///
    /// Labels in `seed_labels` are always present, defaulting to 0 until the
    /// store reports them. Labels observed in `rows` are carried verbatim,
    /// whether or not they were seeded. No other labels are invented, and
    /// nothing from a previous tally survives.
    pub fn from_rows(
        seed_labels: &[String],
        rows: impl IntoIterator<Item = (String, i64)>,
    ) -> Self {
        let mut counts: BTreeMap<String, i64> =
            seed_labels.iter().map(|label| (label.clone(), 0)).collect();
        for (label, count) in rows {
            counts.insert(label, count);
        }
        Self { counts }
    }

    /// Count for one label, if present.
    pub fn count(&self, label: &str) -> Option<i64> {
        self.counts.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
