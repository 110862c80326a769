// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `TimingRecord` — a mergeable accumulator of named durations and a
//! completion count. Workers bracket a unit of work (one chunk's generation,
//! one chunk's upload) with a key and report the accumulated record back to
//! the coordinator, which folds every session's record into one
//! process-lifetime total for the shutdown report.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingRecord {
    times: BTreeMap<String, f64>,
    count: u64,
}

impl TimingRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `duration` to the running total for `key`, creating it at zero
    /// if this is the first measurement under that key.
    pub fn add(&mut self, key: impl Into<String>, duration: Duration) {
        *self.times.entry(key.into()).or_insert(0.0) += duration.as_secs_f64();
    }

    pub fn increment(&mut self) {
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Merges `other` into `self`: keys present in both are summed, keys
    /// present only in `other` are copied over, counts add.
    pub fn combine(&mut self, other: &TimingRecord) {
        for (key, val) in &other.times {
            *self.times.entry(key.clone()).or_insert(0.0) += val;
        }
        self.count += other.count;
    }

    /// A column-aligned, human-readable report: per-key total, average per
    /// completed unit, and percentage of the grand total.
    pub fn report(&self) -> String {
        let width = self.times.keys().map(|k| k.len()).max().unwrap_or(5);
        let sum: f64 = self.times.values().sum();
        let mut out = String::from("Times\n");
        let _ = write!(out, "count={} with a total time of {:.3}", self.count, sum);
        if sum != 0.0 && self.count != 0 {
            let _ = write!(out, " and avg of {:.3}", sum / self.count as f64);
        }
        out.push('\n');
        for (key, val) in &self.times {
            let _ = write!(out, "{key:<width$}={val:9.3}");
            if self.count != 0 {
                let _ = write!(out, "   avg={:9.3}", val / self.count as f64);
            }
            if sum != 0.0 {
                let _ = write!(out, " {:3.1}%", val * 100.0 / sum);
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_sums_overlapping_keys_and_copies_disjoint_ones() {
        let mut a = TimingRecord::new();
        a.add("generate", Duration::from_secs(1));
        a.increment();

        let mut b = TimingRecord::new();
        b.add("generate", Duration::from_secs(2));
        b.add("upload", Duration::from_millis(500));
        b.increment();

        a.combine(&b);

        assert_eq!(a.count(), 2);
        assert_eq!(a.times.get("generate"), Some(&3.0));
        assert_eq!(a.times.get("upload"), Some(&0.5));
    }

    #[test]
    fn report_on_empty_record_does_not_divide_by_zero() {
        let record = TimingRecord::new();
        let report = record.report();
        assert!(report.contains("count=0"));
    }
}
