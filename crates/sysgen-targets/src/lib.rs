//! Target catalog for the syscall table generator.
//!
//! A target is one (operating system, architecture) pair together with the
//! ABI parameters that parametrize a compilation: pointer size, page layout of
//! the executor data area, whether calls dispatch by number, and the C macros
//! that identify the architecture at executor compile time.

pub mod catalog;
pub mod error;
pub mod parse;
pub mod target;

pub use catalog::TargetCatalog;
pub use error::{Result, TargetError};
pub use target::Target;
