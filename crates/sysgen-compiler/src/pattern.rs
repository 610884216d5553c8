//! File patterns with `*` wildcards in the file name.

use std::path::{Path, PathBuf};

/// Errors expanding a file pattern.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("no files matched by pattern")]
    NoMatch,

    #[error("pattern has no file name component")]
    NoFileName,

    #[error("reading directory {}: {source}", dir.display())]
    Io {
        dir: PathBuf,
        source: std::io::Error,
    },
}

/// List the files matching `pattern`, sorted by path.
///
/// Only the final component may contain wildcards.
pub fn expand(pattern: &Path) -> Result<Vec<PathBuf>, PatternError> {
    let name_pattern = pattern
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or(PatternError::NoFileName)?;
    let dir = match pattern.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let entries = std::fs::read_dir(&dir).map_err(|source| PatternError::Io {
        dir: dir.clone(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| PatternError::Io {
            dir: dir.clone(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if wildcard_match(name_pattern, name) {
                files.push(path);
            }
        }
    }

    if files.is_empty() {
        return Err(PatternError::NoMatch);
    }
    files.sort();
    Ok(files)
}

/// Match `name` against `pattern`, where `*` matches any run of characters.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let p = pattern.as_bytes();
    let n = name.as_bytes();
    let (mut pi, mut ni) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ni < n.len() {
        if pi < p.len() && p[pi] == b'*' {
            star = Some((pi, ni));
            pi += 1;
        } else if pi < p.len() && p[pi] == n[ni] {
            pi += 1;
            ni += 1;
        } else if let Some((sp, sn)) = star {
            pi = sp + 1;
            ni = sn + 1;
            star = Some((sp, sn + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&b| b == b'*')
}
