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

//! The diagnostic channel shared by import and export runs.
//!
//! Every recoverable condition encountered during a run is turned into a
//! [`StfReport`] and handed to a [`ReportLog`]. The log is the single gate that
//! decides whether the run continues: reports below its threshold are kept
//! and surfaced to the caller afterwards, reports at or above it abort the run
//! with [`StfError::Aborted`].

use crate::{container::ContainerError, host::HostObject};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a report, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Developer-level tracing of the walk.
    Debug,
    /// Noteworthy but expected events.
    Info,
    /// Something was skipped, the output is still usable.
    Warn,
    /// Something failed, the output is likely incomplete.
    Error,
    /// Structural corruption. Always aborts, regardless of the threshold.
    Fatal,
}

impl Severity {
    fn log_level(self) -> log::Level {
        match self {
            Severity::Debug => log::Level::Debug,
            Severity::Info => log::Level::Info,
            Severity::Warn => log::Level::Warn,
            Severity::Error | Severity::Fatal => log::Level::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Debug => write!(f, "Debug"),
            Severity::Info => write!(f, "Info"),
            Severity::Warn => write!(f, "Warn"),
            Severity::Error => write!(f, "Error"),
            Severity::Fatal => write!(f, "Fatal"),
        }
    }
}

/// A single diagnostic record.
#[derive(Debug, Clone)]
pub struct StfReport {
    /// How serious the condition is.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
    /// The resource ID the report is about, if any.
    pub stf_id: Option<String>,
    /// The type tag of the module or resource involved, if any.
    pub stf_type: Option<String>,
    /// The host object involved, if any.
    pub object: Option<HostObject>,
}

impl StfReport {
    /// Creates a report with no attached context.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            stf_id: None,
            stf_type: None,
            object: None,
        }
    }

    /// Attaches the resource ID this report concerns.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.stf_id = Some(id.into());
        self
    }

    /// Attaches the type tag this report concerns.
    pub fn with_type(mut self, stf_type: impl Into<String>) -> Self {
        self.stf_type = Some(stf_type.into());
        self
    }

    /// Attaches the host object this report concerns.
    pub fn with_object(mut self, object: HostObject) -> Self {
        self.object = Some(object);
        self
    }
}

impl fmt::Display for StfReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.severity)?;
        if let Some(stf_type) = &self.stf_type {
            write!(f, " {stf_type}")?;
        }
        if let Some(id) = &self.stf_id {
            write!(f, " ({id})")?;
        }
        if let Some(object) = &self.object {
            write!(f, " <{}>", object.type_name())?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Errors that terminate an import or export run.
#[derive(Debug, thiserror::Error)]
pub enum StfError {
    /// A report crossed the abort threshold.
    #[error("run aborted: {0}")]
    Aborted(Box<StfReport>),
    /// The binary container could not be read.
    #[error(transparent)]
    Container(#[from] ContainerError),
    /// The JSON definition could not be encoded or decoded.
    #[error("invalid STF definition: {0}")]
    Definition(#[from] serde_json::Error),
    /// Reading or writing a file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the engine.
pub type StfResult<T> = Result<T, StfError>;

/// Accumulates the reports of one run and gates them against a threshold.
#[derive(Debug, Clone)]
pub struct ReportLog {
    threshold: Severity,
    reports: Vec<StfReport>,
}

impl ReportLog {
    /// Creates an empty log aborting at `threshold` and above.
    pub fn new(threshold: Severity) -> Self {
        Self {
            threshold,
            reports: Vec::new(),
        }
    }

    /// The severity at which reports abort the run.
    pub fn threshold(&self) -> Severity {
        self.threshold
    }

    /// Records a report.
    ///
    /// # Errors
    /// Returns [`StfError::Aborted`] carrying the report when its severity is
    /// at or above the threshold, or when it is [`Severity::Fatal`]. The report
    /// is recorded in both cases, so it is the last entry of the list on abort.
    pub fn report(&mut self, report: StfReport) -> StfResult<()> {
        log::log!(report.severity.log_level(), "{}", report);
        let aborts = report.severity >= self.threshold || report.severity == Severity::Fatal;
        self.reports.push(report.clone());
        if aborts {
            Err(StfError::Aborted(Box::new(report)))
        } else {
            Ok(())
        }
    }

    /// Records `report` as [`Severity::Fatal`] and returns the abort error.
    ///
    /// Used on structural corruption paths, where continuing is never an option.
    pub fn fatal(&mut self, mut report: StfReport) -> StfError {
        report.severity = Severity::Fatal;
        log::error!("{}", report);
        self.reports.push(report.clone());
        StfError::Aborted(Box::new(report))
    }

    /// All reports recorded so far, in order.
    pub fn reports(&self) -> &[StfReport] {
        &self.reports
    }

    /// Returns the highest severity recorded so far.
    pub fn worst(&self) -> Option<Severity> {
        self.reports.iter().map(|r| r.severity).max()
    }

    /// Consumes the log, returning the recorded reports.
    pub fn into_reports(self) -> Vec<StfReport> {
        self.reports
    }
}

impl Default for ReportLog {
    fn default() -> Self {
        Self::new(Severity::Error)
    }
}
