//! Compiled syscall program model.
//!
//! These are the values a description compiler produces for one target and
//! the generator serializes: syscalls, resources, struct layouts, constants,
//! plus the positioned diagnostics collaborators report and the content
//! revision stamped into generated artifacts.

pub mod consts;
pub mod diag;
pub mod hash;
pub mod program;

pub use consts::{sorted_consts, ConstMap, ConstValue};
pub use diag::{Diagnostic, Diagnostics, Pos};
pub use hash::Revision;
pub use program::{Field, Program, Resource, StructDesc, Syscall, Type, SYNTHETIC_PREFIX};
