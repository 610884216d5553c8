//! Generator configuration.

use std::path::PathBuf;

use crate::template::CTableTemplate;

/// Where descriptions are read from and artifacts written to, plus the
/// C-table template. Built once at startup and shared read-only by every task.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Base directory all other paths are relative to.
    pub root: PathBuf,
    /// Directory holding one subdirectory of descriptions per OS.
    pub sys_dir: PathBuf,
    /// Directory receiving the per-OS C headers.
    pub executor_dir: PathBuf,
    /// File pattern of description files within an OS directory.
    pub description_pattern: String,
    /// File pattern of constant files; `{arch}` is replaced per target.
    pub const_pattern: String,
    pub template: CTableTemplate,
}

impl GeneratorConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sys_dir: PathBuf::from("sys"),
            executor_dir: PathBuf::from("executor"),
            description_pattern: "*.toml".into(),
            const_pattern: "*_{arch}.const".into(),
            template: CTableTemplate::default(),
        }
    }

    fn os_dir(&self, os: &str) -> PathBuf {
        self.root.join(&self.sys_dir).join(os)
    }

    pub fn description_glob(&self, os: &str) -> PathBuf {
        self.os_dir(os).join(&self.description_pattern)
    }

    pub fn const_glob(&self, os: &str) -> PathBuf {
        self.os_dir(os).join(&self.const_pattern)
    }

    pub fn gen_dir(&self, os: &str) -> PathBuf {
        self.os_dir(os).join("gen")
    }

    /// `<root>/<sys>/<os>/gen/<arch>.json`
    pub fn data_definition_path(&self, os: &str, arch: &str) -> PathBuf {
        self.gen_dir(os).join(format!("{arch}.json"))
    }

    /// `<root>/<executor>/syscalls_<os>.h`
    pub fn c_table_path(&self, os: &str) -> PathBuf {
        self.root
            .join(&self.executor_dir)
            .join(format!("syscalls_{os}.h"))
    }
}
