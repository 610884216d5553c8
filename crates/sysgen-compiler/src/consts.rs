//! Per-architecture constant files.
//!
//! A constant file holds `NAME = value` lines; values are decimal or
//! `0x`-prefixed hex, `#` starts a comment line. Several files may define the
//! same name as long as they agree on its value.

use std::path::{Path, PathBuf};

use sysgen_prog::{ConstMap, Diagnostics, Pos};

use crate::pattern;
use crate::ConstantLoader;

/// Placeholder replaced by the architecture name in constant patterns.
pub const ARCH_PLACEHOLDER: &str = "{arch}";

/// Loads `NAME = value` constant files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstFileLoader;

impl ConstantLoader for ConstFileLoader {
    fn load(&self, pattern: &Path, arch: &str) -> Result<ConstMap, Diagnostics> {
        let pattern = PathBuf::from(pattern.to_string_lossy().replace(ARCH_PLACEHOLDER, arch));
        let files = pattern::expand(&pattern).map_err(|e| {
            let mut d = Diagnostics::new();
            d.push(Pos::file(pattern.display().to_string()), e.to_string());
            d
        })?;

        let mut consts = ConstMap::new();
        let mut diags = Diagnostics::new();
        for path in &files {
            let file = path.display().to_string();
            match std::fs::read_to_string(path) {
                Ok(source) => parse_consts(&file, &source, &mut consts, &mut diags),
                Err(e) => diags.push(Pos::file(&file), format!("failed to read: {e}")),
            }
        }
        diags.into_result(consts)
    }
}

/// Parse one constant file into `consts`.
pub fn parse_consts(file: &str, source: &str, consts: &mut ConstMap, diags: &mut Diagnostics) {
    for (idx, line) in source.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let col = line.len() - line.trim_start().len() + 1;
        let pos = Pos::new(file, idx + 1, col);

        let Some((name, value)) = trimmed.split_once('=') else {
            diags.push(pos, format!("expected 'NAME = value', got '{trimmed}'"));
            continue;
        };
        let name = name.trim();
        if !is_ident(name) {
            diags.push(pos, format!("bad constant name '{name}'"));
            continue;
        }
        let Some(value) = parse_value(value.trim()) else {
            diags.push(pos, format!("bad value '{}' for {name}", value.trim()));
            continue;
        };
        match consts.get(name) {
            Some(&prev) if prev != value => {
                diags.push(pos, format!("conflicting values for {name}: {prev} and {value}"));
            }
            Some(_) => {}
            None => {
                consts.insert(name.to_string(), value);
            }
        }
    }
}

/// Parse a decimal, negative decimal, or `0x` hex integer literal.
///
/// Negative values wrap to their two's-complement `u64` representation.
pub fn parse_value(s: &str) -> Option<u64> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok();
    }
    if let Some(neg) = s.strip_prefix('-') {
        return neg.parse::<i64>().ok().map(|v| v.wrapping_neg() as u64);
    }
    s.parse::<u64>().ok()
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> (ConstMap, Diagnostics) {
        let mut consts = ConstMap::new();
        let mut diags = Diagnostics::new();
        parse_consts("fs_amd64.const", source, &mut consts, &mut diags);
        (consts, diags)
    }

    #[test]
    fn values() {
        assert_eq!(parse_value("0"), Some(0));
        assert_eq!(parse_value("4096"), Some(4096));
        assert_eq!(parse_value("0x20000000"), Some(512 << 20));
        assert_eq!(parse_value("-1"), Some(u64::MAX));
        assert_eq!(parse_value("-100"), Some((-100i64) as u64));
        assert_eq!(parse_value("12a"), None);
        assert_eq!(parse_value(""), None);
    }

    #[test]
    fn parse_file() {
        let (consts, diags) = parse(
            "# Code generated by extractor.\n\nAT_FDCWD = 18446744073709551516\n__NR_open = 2\nO_CREAT = 0x40\n",
        );
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(consts.len(), 3);
        assert_eq!(consts["__NR_open"], 2);
        assert_eq!(consts["O_CREAT"], 64);
    }

    #[test]
    fn malformed_lines_positioned() {
        let (consts, diags) = parse("GOOD = 1\n  no equals sign\n1BAD = 2\nX = nope\n");
        assert_eq!(consts.len(), 1);
        let lines: Vec<String> = diags.iter().map(|d| d.to_string()).collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("fs_amd64.const:2:3: expected 'NAME = value'"));
        assert!(lines[1].starts_with("fs_amd64.const:3:1: bad constant name '1BAD'"));
        assert!(lines[2].starts_with("fs_amd64.const:4:1: bad value 'nope' for X"));
    }

    #[test]
    fn duplicate_values() {
        let (consts, diags) = parse("A = 1\nA = 1\nA = 2\n");
        assert_eq!(consts["A"], 1);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.0[0].message, "conflicting values for A: 1 and 2");
    }

    #[test]
    fn loader_substitutes_arch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fs_amd64.const"), "__NR_open = 2\n").unwrap();
        std::fs::write(dir.path().join("net_amd64.const"), "__NR_socket = 41\n").unwrap();
        std::fs::write(dir.path().join("fs_arm64.const"), "__NR_openat = 56\n").unwrap();

        let consts = ConstFileLoader
            .load(&dir.path().join("*_{arch}.const"), "amd64")
            .unwrap();
        assert_eq!(consts.len(), 2);
        assert_eq!(consts["__NR_socket"], 41);

        let err = ConstFileLoader
            .load(&dir.path().join("*_{arch}.const"), "riscv64")
            .unwrap_err();
        assert!(err.0[0].to_string().contains("*_riscv64.const: no files matched"));
    }
}
