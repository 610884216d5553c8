//! Generation orchestrator for syscall descriptions.
//!
//! For every OS in a target catalog, the descriptions are parsed once and one
//! compilation task per target runs concurrently. Each task loads its
//! architecture's constants, compiles, emits a data-definition artifact and a
//! C-table fragment, and writes the data definition if its content changed.
//! After all tasks of an OS join, diagnostics are printed, the cross-target
//! unsupported-symbol rule is enforced, and the per-OS C header is written.

pub mod config;
pub mod emit;
pub mod error;
pub mod job;
pub mod orchestrate;
pub mod report;
pub mod template;
pub mod writer;

pub use config::GeneratorConfig;
pub use emit::{emit, Artifacts, ArchData, SyscallRow};
pub use error::{ErrorKind, GenError, Result};
pub use job::Job;
pub use orchestrate::{check_unsupported, Generator};
pub use report::{OsReport, RunReport, TargetReport};
pub use template::CTableTemplate;
pub use writer::WriteStatus;
