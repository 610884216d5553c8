//! Per-target work records.

use std::collections::BTreeSet;

use sysgen_prog::Revision;
use sysgen_targets::Target;

use crate::error::{ErrorKind, GenError};
use crate::writer::WriteStatus;

/// The outcome of compiling one target.
///
/// Owned by the task that compiles the target until the join barrier, then
/// read by the collector.
#[derive(Debug)]
pub struct Job {
    pub target: Target,
    pub ok: bool,
    /// Diagnostic lines, in the order they were reported.
    pub errors: Vec<String>,
    pub unsupported: BTreeSet<String>,
    /// The target's C-table fragment.
    pub arch_data: Vec<u8>,
    pub revision: Option<Revision>,
    pub status: Option<WriteStatus>,
    /// Class of the failure when `ok` is false.
    pub failure: Option<ErrorKind>,
    /// A fatal output error hit by the task, reported after the join.
    pub output_error: Option<GenError>,
}

impl Job {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            ok: false,
            errors: Vec::new(),
            unsupported: BTreeSet::new(),
            arch_data: Vec::new(),
            revision: None,
            status: None,
            failure: None,
            output_error: None,
        }
    }

    /// Mark the job failed with the given diagnostic lines.
    pub fn fail<I, S>(&mut self, kind: ErrorKind, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ok = false;
        self.failure = Some(kind);
        self.errors.extend(lines.into_iter().map(Into::into));
    }

    /// A job whose task panicked before producing a result.
    pub fn panicked(target: Target, message: &str) -> Self {
        let mut job = Job::new(target);
        let line = format!("{}: generation task panicked: {message}", job.target.name());
        job.fail(ErrorKind::Compile, [line]);
        job
    }
}
