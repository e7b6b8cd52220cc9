// msasieve: Curate per-gene multiple sequence alignments by target species group.
//
// Copyright 2025 Tommi Mäklin [tommi@maklin.fi].
//
// Copyrights in this project are retained by contributors. No copyright assignment
// is required to contribute to this project.
//
// Except as otherwise noted (below and/or in individual files), this
// project is licensed under the Apache License, Version 2.0
// <LICENSE-APACHE> or <http://www.apache.org/licenses/LICENSE-2.0> or
// the MIT license, <LICENSE-MIT> or <http://opensource.org/licenses/MIT>,
// at your option.
//

//! Decide whether an archive is worth keeping for a target group.
//!
//! Two metrics are computed from the target group side of a
//! [Partition](crate::Partition):
//!
//!   - group size: the number of target group species in the archive.
//!   - diversity: the number of distinct sequence lengths after removing gaps.
//!
//! An archive is retained if the group size passes the configured
//! [CountPredicate] and the diversity is at least the diversity threshold.
//!

use crate::Alignment;
use crate::GAP;

use std::collections::HashSet;

/// Which side of the count threshold a retained group must be on.
///
/// Both comparisons are strict. [AtLeast](CountPredicate::AtLeast) suits a
/// rare target group that should be well represented, while
/// [AtMost](CountPredicate::AtMost) selects sparse archives for a target group
/// that is usually present in large numbers.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountPredicate {
    /// Group size must be greater than the threshold.
    AtLeast,
    /// Group size must be less than the threshold.
    AtMost,
}

impl CountPredicate {
    pub fn accepts(
        &self,
        group_size: usize,
        threshold: usize,
    ) -> bool {
        match self {
            CountPredicate::AtLeast => group_size > threshold,
            CountPredicate::AtMost => group_size < threshold,
        }
    }
}

impl std::str::FromStr for CountPredicate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "at-least" | "at_least" => Ok(CountPredicate::AtLeast),
            "at-most" | "at_most" => Ok(CountPredicate::AtMost),
            _ => Err(format!("'{}' is not a valid CountPredicate", s)),
        }
    }
}

/// Outcome of [QualityFilter::evaluate] and the metrics behind it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FilterDecision {
    pub retain: bool,
    pub group_size: usize,
    pub diversity: usize,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct QualityFilter {
    pub predicate: CountPredicate,
    pub count_threshold: usize,
    pub diversity_threshold: usize,
}

impl QualityFilter {
    /// Evaluate the target group side of an archive.
    pub fn evaluate(
        &self,
        group: &Alignment,
    ) -> FilterDecision {
        let group_size = group.len();
        let diversity = diversity(group);
        let retain = self.predicate.accepts(group_size, self.count_threshold)
            && diversity >= self.diversity_threshold;
        FilterDecision { retain, group_size, diversity }
    }
}

/// Remove all gap characters from `sequence`.
pub fn strip_gaps(
    sequence: &str,
) -> String {
    sequence.replace(GAP, "")
}

/// Length of `sequence` without gaps.
pub fn ungapped_len(
    sequence: &str,
) -> usize {
    sequence.chars().filter(|x| *x != GAP).count()
}

/// Number of distinct ungapped sequence lengths in `alignment`.
pub fn diversity(
    alignment: &Alignment,
) -> usize {
    alignment.values()
             .map(|sequence| ungapped_len(sequence))
             .collect::<HashSet<usize>>()
             .len()
}
