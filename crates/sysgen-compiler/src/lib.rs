//! Description parsing, constant loading, and compilation for the syscall
//! table generator.
//!
//! The generator drives three collaborators through the traits defined here.
//! The implementations in this crate read a small TOML-based description
//! format and `NAME = value` constant files:
//!
//! - [`ast`]: description files into an [`Ast`](ast::Ast)
//! - [`consts`]: per-architecture constant tables
//! - [`compile`]: type resolution and per-target struct layout
//! - [`pattern`]: `*` wildcard file patterns

pub mod ast;
pub mod compile;
pub mod consts;
pub mod pattern;

use std::path::Path;

use sysgen_prog::{ConstMap, Diagnostics, Program};
use sysgen_targets::Target;

pub use ast::{Ast, TomlDescriptionParser};
pub use compile::LayoutCompiler;
pub use consts::ConstFileLoader;

/// Parses the description files of one OS into a shared AST.
pub trait DescriptionParser: Sync {
    fn parse(&self, pattern: &Path) -> Result<Ast, Diagnostics>;
}

/// Loads the numeric constants of one architecture.
///
/// `pattern` may contain an `{arch}` placeholder.
pub trait ConstantLoader: Sync {
    fn load(&self, pattern: &Path, arch: &str) -> Result<ConstMap, Diagnostics>;
}

/// Compiles an AST plus constants into a program for one target.
pub trait Compiler: Sync {
    fn compile(&self, ast: &Ast, consts: &ConstMap, target: &Target) -> Result<Program, Diagnostics>;
}
