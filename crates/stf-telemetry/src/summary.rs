// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Aggregated view over the report list of a run.

use std::collections::BTreeMap;
use std::fmt;
use stf_core::{Severity, StfReport};

/// Counts of reports per severity, for presenting the outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSummary {
    counts: BTreeMap<Severity, usize>,
}

impl ReportSummary {
    /// Summarizes `reports`.
    pub fn from_reports(reports: &[StfReport]) -> Self {
        let mut summary = Self::default();
        for report in reports {
            *summary.counts.entry(report.severity).or_default() += 1;
        }
        summary
    }

    /// The number of reports of exactly `severity`.
    pub fn count(&self, severity: Severity) -> usize {
        self.counts.get(&severity).copied().unwrap_or(0)
    }

    /// The total number of reports.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// The highest severity seen.
    pub fn worst(&self) -> Option<Severity> {
        self.counts.keys().next_back().copied()
    }

    /// Returns `true` if any report is at or above `severity`.
    pub fn has_at_least(&self, severity: Severity) -> bool {
        self.worst().is_some_and(|worst| worst >= severity)
    }
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.counts.is_empty() {
            return write!(f, "no reports");
        }
        let parts: Vec<String> = self
            .counts
            .iter()
            .rev()
            .map(|(severity, count)| format!("{count} {severity}"))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}
