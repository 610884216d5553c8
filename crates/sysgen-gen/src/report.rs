//! Run summaries.

use std::fmt;
use std::path::PathBuf;

use sysgen_prog::Revision;

use crate::writer::WriteStatus;

/// What was produced for one target.
#[derive(Debug, Clone)]
pub struct TargetReport {
    pub arch: String,
    pub revision: Revision,
    pub status: WriteStatus,
}

/// What was produced for one OS.
#[derive(Debug, Clone)]
pub struct OsReport {
    pub os: String,
    pub targets: Vec<TargetReport>,
    /// Path of the aggregated C header.
    pub c_table: PathBuf,
}

impl OsReport {
    pub fn written(&self) -> usize {
        self.count(WriteStatus::Written)
    }

    pub fn unchanged(&self) -> usize {
        self.count(WriteStatus::Unchanged)
    }

    fn count(&self, status: WriteStatus) -> usize {
        self.targets.iter().filter(|t| t.status == status).count()
    }
}

impl fmt::Display for OsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} targets, {} written, {} unchanged",
            self.os,
            self.targets.len(),
            self.written(),
            self.unchanged()
        )
    }
}

/// Every OS processed by a successful run, in processing order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub oses: Vec<OsReport>,
}

impl RunReport {
    pub fn written(&self) -> usize {
        self.oses.iter().map(OsReport::written).sum()
    }
}
