//! Measurement outcome counts.

use std::collections::btree_map::{self, BTreeMap};
use std::iter::FromIterator;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, RmError};

/// Ordered mapping from measured bitstring to its number of occurrences.
///
/// Keys are expected to be strings of `0`/`1` of uniform length. Nothing is
/// assumed about a mapping until [`OutcomeCounts::validate`] has accepted it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutcomeCounts(BTreeMap<String, u64>);

impl OutcomeCounts {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Wraps an existing map.
    pub fn from_map(map: BTreeMap<String, u64>) -> Self {
        Self(map)
    }

    /// Adds `count` occurrences of `outcome`, accumulating with existing entries.
    ///
    /// The accumulated count saturates at `u64::MAX`.
    pub fn add(&mut self, outcome: impl Into<String>, count: u64) {
        let entry = self.0.entry(outcome.into()).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    /// Sets the count for `outcome`, replacing any previous value.
    pub fn insert(&mut self, outcome: impl Into<String>, count: u64) -> Option<u64> {
        self.0.insert(outcome.into(), count)
    }

    /// Returns the count recorded for `outcome`.
    pub fn get(&self, outcome: &str) -> Option<u64> {
        self.0.get(outcome).copied()
    }

    /// Number of distinct outcomes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no outcome has been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates outcomes in ascending key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, u64> {
        self.0.iter()
    }

    /// Sum of all counts; a total beyond `u64::MAX` is an error.
    pub fn shots(&self) -> Result<u64, RmError> {
        self.0.iter().try_fold(0u64, |total, (outcome, count)| {
            total.checked_add(*count).ok_or_else(|| {
                RmError::Counts(
                    ErrorInfo::new("counts-overflow", "outcome counts sum beyond u64::MAX")
                        .with_context("key", outcome)
                        .with_context("partial", total),
                )
            })
        })
    }

    /// Length of the first key, if any.
    pub fn num_bits(&self) -> Option<usize> {
        self.0.keys().next().map(String::len)
    }

    /// Borrows the underlying map.
    pub fn as_map(&self) -> &BTreeMap<String, u64> {
        &self.0
    }

    /// Checks that the mapping is non-empty, binary and of uniform width.
    ///
    /// Returns the common bitstring width.
    pub fn validate(&self) -> Result<usize, RmError> {
        let width = self.num_bits().ok_or_else(|| {
            RmError::Counts(
                ErrorInfo::new("counts-empty", "outcome counts contain no entries")
                    .with_hint("every cell needs at least one measured bitstring"),
            )
        })?;
        if width == 0 {
            return Err(RmError::Counts(ErrorInfo::new(
                "counts-empty-key",
                "outcome counts contain an empty bitstring",
            )));
        }
        for key in self.0.keys() {
            if let Some(bad) = key.chars().find(|c| *c != '0' && *c != '1') {
                return Err(RmError::Counts(
                    ErrorInfo::new("counts-non-binary", "bitstring contains a non-binary character")
                        .with_context("key", key)
                        .with_context("char", bad),
                ));
            }
            if key.len() != width {
                return Err(RmError::Counts(
                    ErrorInfo::new("counts-width-mismatch", "bitstrings have different lengths")
                        .with_context("key", key)
                        .with_context("expected", width)
                        .with_context("found", key.len()),
                ));
            }
        }
        Ok(width)
    }

    /// Parses a JSON object of `bitstring -> count`.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, RmError> {
        let counts: Self = serde_json::from_slice(bytes)?;
        Ok(counts)
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for OutcomeCounts {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut counts = OutcomeCounts::new();
        for (outcome, count) in iter {
            counts.add(outcome, count);
        }
        counts
    }
}

impl From<BTreeMap<String, u64>> for OutcomeCounts {
    fn from(map: BTreeMap<String, u64>) -> Self {
        Self(map)
    }
}

impl<'a> IntoIterator for &'a OutcomeCounts {
    type Item = (&'a String, &'a u64);
    type IntoIter = btree_map::Iter<'a, String, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
