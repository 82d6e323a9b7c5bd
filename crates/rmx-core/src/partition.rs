//! Partition specifications and resolved bit ranges.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Caller-facing description of the subsystem to analyse.
///
/// Negative bounds in [`PartitionSpec::Range`] follow the slice convention
/// where `-1` names the last bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionSpec {
    /// The whole measured range.
    #[default]
    Full,
    /// Window of `d` bits at the end of the measured range.
    Degree(i64),
    /// Signed `[start, end)` pair, wrapping when the normalized start exceeds the end.
    Range(i64, i64),
}

impl From<i64> for PartitionSpec {
    fn from(degree: i64) -> Self {
        PartitionSpec::Degree(degree)
    }
}

impl From<(i64, i64)> for PartitionSpec {
    fn from((start, end): (i64, i64)) -> Self {
        PartitionSpec::Range(start, end)
    }
}

impl From<Option<(i64, i64)>> for PartitionSpec {
    fn from(range: Option<(i64, i64)>) -> Self {
        range.map_or(PartitionSpec::Full, PartitionSpec::from)
    }
}

impl fmt::Display for PartitionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionSpec::Full => write!(f, "full"),
            PartitionSpec::Degree(d) => write!(f, "degree {d}"),
            PartitionSpec::Range(a, b) => write!(f, "range ({a}, {b})"),
        }
    }
}

/// Resolved partition with `0 <= start, end <= register_len`.
///
/// When `wrap` is set the range covers `[start, register_len)` followed by
/// `[0, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitRange {
    /// First bit of the range.
    pub start: usize,
    /// One past the last bit of the range.
    pub end: usize,
    /// Whether the range crosses the end of the register.
    pub wrap: bool,
    /// Length of the register the range was resolved against.
    pub register_len: usize,
}

impl BitRange {
    /// Contiguous `[0, register_len)` range.
    pub fn full(register_len: usize) -> Self {
        Self {
            start: 0,
            end: register_len,
            wrap: false,
            register_len,
        }
    }

    /// Number of bits covered.
    pub fn len(&self) -> usize {
        if self.wrap {
            self.register_len - self.start + self.end
        } else {
            self.end - self.start
        }
    }

    /// Whether the range covers no bits.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Signed bounds in the form accepted by `cycling_slice`.
    ///
    /// Wrapping ranges report a negative start so the extractor concatenates
    /// the tail and the head of the register.
    pub fn slice_bounds(&self) -> (i64, i64) {
        if self.wrap {
            (
                self.start as i64 - self.register_len as i64,
                self.end as i64,
            )
        } else {
            (self.start as i64, self.end as i64)
        }
    }

    /// Register positions covered, in extraction order.
    pub fn positions(&self) -> Vec<usize> {
        if self.wrap {
            (self.start..self.register_len).chain(0..self.end).collect()
        } else {
            (self.start..self.end).collect()
        }
    }
}

impl fmt::Display for BitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wrap {
            write!(f, "cycling-[{}, {})", self.start, self.end)
        } else {
            write!(f, "[{}, {})", self.start, self.end)
        }
    }
}
