//! The set of known targets, grouped by operating system.

use std::collections::BTreeMap;

use crate::error::{Result, TargetError};
use crate::parse::validate_targets;
use crate::target::Target;

/// An ordered, validated collection of targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCatalog {
    targets: Vec<Target>,
}

impl TargetCatalog {
    /// Build a catalog, rejecting structurally invalid or duplicate targets.
    pub fn new(targets: Vec<Target>) -> Result<Self> {
        if let Err(issues) = validate_targets(&targets) {
            let detail = issues
                .iter()
                .map(|i| i.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(TargetError::Validation { detail });
        }
        Ok(Self { targets })
    }

    /// The targets the generator knows about out of the box.
    pub fn builtin() -> Self {
        Self {
            targets: builtin_targets(),
        }
    }

    /// All targets in catalog order.
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Look up a single target.
    pub fn get(&self, os: &str, arch: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.os == os && t.arch == arch)
    }

    /// Distinct OS names, sorted.
    pub fn os_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.targets.iter().map(|t| t.os.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Keep only targets whose OS is listed. An empty list keeps everything.
    pub fn retain_os(&mut self, os: &[String]) {
        if os.is_empty() {
            return;
        }
        self.targets.retain(|t| os.iter().any(|o| *o == t.os));
    }

    /// Group targets by OS. OS keys are sorted; each group is sorted by arch.
    pub fn by_os(&self) -> BTreeMap<String, Vec<Target>> {
        let mut groups: BTreeMap<String, Vec<Target>> = BTreeMap::new();
        for target in &self.targets {
            groups.entry(target.os.clone()).or_default().push(target.clone());
        }
        for group in groups.values_mut() {
            group.sort_by(|a, b| a.arch.cmp(&b.arch));
        }
        groups
    }
}

fn builtin_targets() -> Vec<Target> {
    vec![
        Target::new("linux", "amd64", 8, &["__x86_64__"]),
        Target::new("linux", "386", 4, &["__i386__"]),
        Target::new("linux", "arm64", 8, &["__aarch64__"]),
        Target::new("linux", "arm", 4, &["__arm__"]),
        Target::new("linux", "ppc64le", 8, &["__ppc64__", "__PPC64__", "__powerpc64__"])
            .with_page_size(64 << 10),
        Target::new("freebsd", "amd64", 8, &["__x86_64__"]),
        Target::new("fuchsia", "amd64", 8, &["__x86_64__"]).without_syscall_numbers(),
        Target::new("fuchsia", "arm64", 8, &["__aarch64__"]).without_syscall_numbers(),
        Target::new("windows", "amd64", 8, &["_M_X64"]).without_syscall_numbers(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_is_valid() {
        let builtin = TargetCatalog::builtin();
        let rebuilt = TargetCatalog::new(builtin.targets().to_vec()).unwrap();
        assert_eq!(rebuilt, builtin);
    }

    #[test]
    fn grouped_and_sorted() {
        let groups = TargetCatalog::builtin().by_os();
        let oses: Vec<&str> = groups.keys().map(String::as_str).collect();
        assert_eq!(oses, vec!["freebsd", "fuchsia", "linux", "windows"]);
        let linux: Vec<&str> = groups["linux"].iter().map(|t| t.arch.as_str()).collect();
        assert_eq!(linux, vec!["386", "amd64", "arm", "arm64", "ppc64le"]);
    }

    #[test]
    fn retain_restricts_oses() {
        let mut catalog = TargetCatalog::builtin();
        catalog.retain_os(&["linux".to_string()]);
        assert_eq!(catalog.os_names(), vec!["linux"]);
        assert_eq!(catalog.len(), 5);

        let mut all = TargetCatalog::builtin();
        all.retain_os(&[]);
        assert_eq!(all.len(), TargetCatalog::builtin().len());
    }

    #[test]
    fn rejects_duplicates() {
        let t = Target::new("linux", "amd64", 8, &["__x86_64__"]);
        let err = TargetCatalog::new(vec![t.clone(), t]).unwrap_err();
        assert!(err.to_string().contains("duplicate target linux/amd64"));
    }

    #[test]
    fn lookup() {
        let catalog = TargetCatalog::builtin();
        assert_eq!(catalog.get("linux", "ppc64le").unwrap().page_size, 64 << 10);
        assert!(!catalog.get("windows", "amd64").unwrap().syscall_numbers);
        assert!(catalog.get("plan9", "386").is_none());
    }
}
