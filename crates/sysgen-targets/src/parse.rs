//! TOML loading and validation for target catalogs.
//!
//! A catalog file lists targets as an array of tables:
//!
//! ```toml
//! [[target]]
//! os = "linux"
//! arch = "amd64"
//! ptr-size = 8
//! page-size = 4096
//! num-pages = 4096
//! data-offset = 536870912
//! c-arch = ["__x86_64__"]
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;

use crate::catalog::TargetCatalog;
use crate::error::{Result, TargetError};
use crate::target::Target;

/// A validation issue found in a target definition.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Human-readable description, naming the target.
    pub message: String,
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    target: Vec<Target>,
}

/// Load a catalog from a TOML file.
pub fn load_catalog_toml(path: &Path) -> Result<TargetCatalog> {
    if !path.exists() {
        return Err(TargetError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    parse_catalog_toml(&content)
}

/// Parse and validate a catalog from a TOML string.
pub fn parse_catalog_toml(toml_str: &str) -> Result<TargetCatalog> {
    let file: CatalogFile = toml::from_str(toml_str)?;
    TargetCatalog::new(file.target)
}

/// Validate target definitions for structural correctness.
///
/// Returns `Ok(())` if valid, or `Err(issues)` with every problem found.
pub fn validate_targets(targets: &[Target]) -> std::result::Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    let mut seen = BTreeSet::new();

    for t in targets {
        let name = t.name();
        let mut issue = |message: String| {
            issues.push(ValidationIssue { message })
        };

        if t.os.is_empty() || t.arch.is_empty() {
            issue(format!("target '{name}' has an empty os or arch"));
        }
        if t.ptr_size != 4 && t.ptr_size != 8 {
            issue(format!("{name}: pointer size {} is not 4 or 8", t.ptr_size));
        }
        if !t.page_size.is_power_of_two() {
            issue(format!("{name}: page size {} is not a power of 2", t.page_size));
        }
        if t.num_pages == 0 {
            issue(format!("{name}: num-pages is 0"));
        }
        if t.c_arch.is_empty() {
            issue(format!("{name}: no C architecture macros"));
        }
        if !seen.insert((t.os.as_str(), t.arch.as_str())) {
            issue(format!("duplicate target {name}"));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}
