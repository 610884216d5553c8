//! `sysgen.toml` parsing and generator configuration.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sysgen_gen::GeneratorConfig;
use sysgen_targets::parse::load_catalog_toml;
use sysgen_targets::TargetCatalog;

/// Name of the manifest file searched for from the working directory up.
pub const MANIFEST_FILE: &str = "sysgen.toml";

/// The top-level manifest. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SysgenManifest {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub targets: TargetsConfig,
}

/// Input and output locations, relative to the manifest directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PathsConfig {
    /// Directory with one description subdirectory per OS.
    #[serde(default)]
    pub sys: Option<String>,
    /// Directory receiving `syscalls_<os>.h`.
    #[serde(default)]
    pub executor: Option<String>,
    #[serde(default)]
    pub description_pattern: Option<String>,
    /// May contain `{arch}`.
    #[serde(default)]
    pub const_pattern: Option<String>,
}

/// Target selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetsConfig {
    /// Only generate these OSes. Empty means all.
    #[serde(default)]
    pub os: Vec<String>,
    /// A `[[target]]` catalog replacing the built-in one.
    #[serde(default)]
    pub file: Option<String>,
}

impl SysgenManifest {
    /// Search upward from `start_dir` for a `sysgen.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: SysgenManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a manifest from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing sysgen.toml")
    }

    /// Build the generator configuration rooted at `root`.
    pub fn generator_config(&self, root: &Path) -> GeneratorConfig {
        let mut config = GeneratorConfig::new(root);
        let paths = &self.paths;
        if let Some(sys) = &paths.sys {
            config.sys_dir = PathBuf::from(sys);
        }
        if let Some(executor) = &paths.executor {
            config.executor_dir = PathBuf::from(executor);
        }
        if let Some(pattern) = &paths.description_pattern {
            config.description_pattern = pattern.clone();
        }
        if let Some(pattern) = &paths.const_pattern {
            config.const_pattern = pattern.clone();
        }
        config
    }

    /// The selected targets: the catalog file if configured, otherwise the
    /// built-in catalog, restricted to the configured OSes.
    pub fn catalog(&self, root: &Path) -> Result<TargetCatalog> {
        let mut catalog = match &self.targets.file {
            Some(file) => {
                let path = root.join(file);
                load_catalog_toml(&path)
                    .with_context(|| format!("loading target catalog {}", path.display()))?
            }
            None => TargetCatalog::builtin(),
        };
        catalog.retain_os(&self.targets.os);
        if catalog.is_empty() {
            bail!("no targets selected (os filter: {})", self.targets.os.join(", "));
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_manifest() {
        let manifest = SysgenManifest::from_str(
            r#"
[paths]
sys = "descriptions"
executor = "exec"
description-pattern = "*.txt"
const-pattern = "*_{arch}.consts"

[targets]
os = ["linux", "freebsd"]
file = "targets.toml"
"#,
        )
        .unwrap();
        assert_eq!(manifest.paths.sys.as_deref(), Some("descriptions"));
        assert_eq!(manifest.targets.os, vec!["linux", "freebsd"]);

        let config = manifest.generator_config(Path::new("/src"));
        assert_eq!(
            config.description_glob("linux"),
            PathBuf::from("/src/descriptions/linux/*.txt")
        );
        assert_eq!(
            config.const_glob("linux"),
            PathBuf::from("/src/descriptions/linux/*_{arch}.consts")
        );
        assert_eq!(
            config.c_table_path("linux"),
            PathBuf::from("/src/exec/syscalls_linux.h")
        );
    }

    #[test]
    fn empty_manifest_uses_defaults() {
        let manifest = SysgenManifest::from_str("").unwrap();
        let config = manifest.generator_config(Path::new("/src"));
        assert_eq!(
            config.data_definition_path("linux", "amd64"),
            PathBuf::from("/src/sys/linux/gen/amd64.json")
        );
        let catalog = manifest.catalog(Path::new("/src")).unwrap();
        assert_eq!(catalog, TargetCatalog::builtin());
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(SysgenManifest::from_str("[paths]\nsource = \"sys\"\n").is_err());
    }

    #[test]
    fn os_filter() {
        let manifest = SysgenManifest::from_str("[targets]\nos = [\"fuchsia\"]\n").unwrap();
        let catalog = manifest.catalog(Path::new("/src")).unwrap();
        assert_eq!(catalog.os_names(), vec!["fuchsia"]);
        assert_eq!(catalog.len(), 2);

        let manifest = SysgenManifest::from_str("[targets]\nos = [\"plan9\"]\n").unwrap();
        let err = manifest.catalog(Path::new("/src")).unwrap_err();
        assert_eq!(err.to_string(), "no targets selected (os filter: plan9)");
    }

    #[test]
    fn catalog_file_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("targets.toml"),
            r#"
[[target]]
os = "netbsd"
arch = "amd64"
ptr-size = 8
page-size = 4096
num-pages = 4096
data-offset = 536870912
c-arch = ["__x86_64__"]
"#,
        )
        .unwrap();
        let manifest = SysgenManifest::from_str("[targets]\nfile = \"targets.toml\"\n").unwrap();
        let catalog = manifest.catalog(dir.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("netbsd", "amd64").unwrap().syscall_numbers);

        let missing = SysgenManifest::from_str("[targets]\nfile = \"nope.toml\"\n").unwrap();
        let err = missing.catalog(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("loading target catalog"));
    }

    #[test]
    fn find_searches_upward() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "[targets]\nos = [\"linux\"]\n").unwrap();
        let nested = dir.path().join("sys/linux");
        std::fs::create_dir_all(&nested).unwrap();

        let (manifest, root) = SysgenManifest::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(root, dir.path());
        assert_eq!(manifest.targets.os, vec!["linux"]);
    }
}
