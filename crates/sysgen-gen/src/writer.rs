//! Idempotent persistence of generated artifacts.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{GenError, Result};

/// Prefix of every aggregated C header.
pub const C_TABLE_HEADER: &str = "// AUTOGENERATED FILE\n\n";

/// Whether a data definition had to be rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Written,
    Unchanged,
}

/// Re-emit JSON pretty-printed with sorted keys and a trailing newline.
pub fn canonicalize(raw: &[u8]) -> serde_json::Result<Vec<u8>> {
    let value: serde_json::Value = serde_json::from_slice(raw)?;
    let mut out = serde_json::to_vec_pretty(&value)?;
    out.push(b'\n');
    Ok(out)
}

/// Canonicalize and write a data definition unless the file already holds
/// exactly those bytes.
pub fn write_data_definition(path: &Path, raw: &[u8]) -> Result<WriteStatus> {
    let formatted = canonicalize(raw).map_err(|source| GenError::Format {
        path: path.to_path_buf(),
        raw: String::from_utf8_lossy(raw).into_owned(),
        source,
    })?;

    match fs::read(path) {
        Ok(existing) if existing == formatted => return Ok(WriteStatus::Unchanged),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(GenError::ReadFile {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    write_file(path, &formatted)?;
    Ok(WriteStatus::Written)
}

/// Concatenate per-target fragments under the header and write them.
pub fn write_c_table<'a>(path: &Path, fragments: impl IntoIterator<Item = &'a [u8]>) -> Result<()> {
    let mut buf = C_TABLE_HEADER.as_bytes().to_vec();
    for fragment in fragments {
        buf.extend_from_slice(fragment);
    }
    write_file(path, &buf)
}

/// Write `data` to `path`, creating parent directories as needed.
pub fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| GenError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, data).map_err(|source| GenError::WriteFile {
        path: path.to_path_buf(),
        source,
    })
}
