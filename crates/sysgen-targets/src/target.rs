//! The per-target ABI record.

use serde::{Deserialize, Serialize};

/// Page size used by every built-in target except ppc64le.
pub const DEFAULT_PAGE_SIZE: u64 = 4 << 10;

/// Number of pages in the executor data area.
pub const DEFAULT_NUM_PAGES: u64 = 4 << 10;

/// Offset of the executor data area in the address space.
pub const DEFAULT_DATA_OFFSET: u64 = 512 << 20;

/// An (OS, architecture) pair with its ABI parameters.
///
/// Targets are supplied by the [`TargetCatalog`](crate::TargetCatalog) and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Target {
    /// Operating system name (e.g., "linux").
    pub os: String,
    /// Architecture name (e.g., "amd64").
    pub arch: String,
    /// Pointer size in bytes.
    pub ptr_size: u64,
    /// Page size in bytes.
    pub page_size: u64,
    /// Number of pages in the executor data area.
    pub num_pages: u64,
    /// Address of the executor data area.
    pub data_offset: u64,
    /// Whether syscalls dispatch through plain numeric codes.
    #[serde(default = "default_syscall_numbers")]
    pub syscall_numbers: bool,
    /// C preprocessor macros identifying this architecture.
    pub c_arch: Vec<String>,
}

fn default_syscall_numbers() -> bool {
    true
}

impl Target {
    /// Construct a target with the default executor data layout.
    pub fn new(
        os: impl Into<String>,
        arch: impl Into<String>,
        ptr_size: u64,
        c_arch: &[&str],
    ) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
            ptr_size,
            page_size: DEFAULT_PAGE_SIZE,
            num_pages: DEFAULT_NUM_PAGES,
            data_offset: DEFAULT_DATA_OFFSET,
            syscall_numbers: true,
            c_arch: c_arch.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Override the page size.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Mark the target as dispatching through callbacks instead of numbers.
    pub fn without_syscall_numbers(mut self) -> Self {
        self.syscall_numbers = false;
        self
    }

    /// `os/arch`, as used in progress output.
    pub fn name(&self) -> String {
        format!("{}/{}", self.os, self.arch)
    }
}
