//! Turning a compiled program into the per-target artifacts.
//!
//! The data definition is a JSON document holding four named tables plus a
//! `target` header that refers to them by name. Its revision is the SHA-256
//! of the document as generated up to the revision entry, which is appended
//! last. The C-table fragment carries the same revision so the executor and
//! the data definition can be matched at run time.
//!
//! Nothing here touches the filesystem.

use serde::Serialize;
use sysgen_prog::{sorted_consts, ConstMap, Program, Revision, Syscall};
use sysgen_targets::Target;

use crate::error::{GenError, Result};
use crate::template::CTableTemplate;

/// Marker stored under the `autogenerated` key.
pub const AUTOGENERATED: &str = "AUTOGENERATED FILE";

/// Everything produced for one target.
#[derive(Debug, Clone)]
pub struct Artifacts {
    /// Raw (not yet canonicalized) data-definition text.
    pub data_definition: Vec<u8>,
    pub revision: Revision,
    /// This target's C-table fragment.
    pub arch_data: Vec<u8>,
}

/// One row of the C syscall table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyscallRow {
    pub name: String,
    pub call_name: String,
    pub nr: u64,
    /// Whether the row references a callback named after the call.
    pub need_call: bool,
}

/// Inputs of one C-table fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchData {
    pub arch: String,
    pub c_arch: Vec<String>,
    pub revision: String,
    pub page_size: u64,
    pub num_pages: u64,
    pub data_offset: u64,
    pub rows: Vec<SyscallRow>,
}

impl ArchData {
    pub fn new(target: &Target, revision: &Revision, syscalls: &[Syscall]) -> Self {
        Self {
            arch: target.arch.clone(),
            c_arch: target.c_arch.clone(),
            revision: revision.to_string(),
            page_size: target.page_size,
            num_pages: target.num_pages,
            data_offset: target.data_offset,
            rows: syscall_rows(target, syscalls),
        }
    }
}

#[derive(Serialize)]
struct TargetHeader<'a> {
    os: &'a str,
    arch: &'a str,
    ptr_size: u64,
    page_size: u64,
    num_pages: u64,
    data_offset: u64,
    syscall_numbers: bool,
    revision: String,
    resources: String,
    struct_descs: String,
    syscalls: String,
    consts: String,
}

/// Emit the data definition, its revision, and the C-table fragment.
pub fn emit(
    target: &Target,
    prog: &Program,
    consts: &ConstMap,
    template: &CTableTemplate,
) -> Result<Artifacts> {
    let mut data_definition = generate_data_definition(target, prog, consts)?;
    let revision = Revision::compute(&data_definition);
    append_revision(&mut data_definition, &target.arch, &revision)?;

    let arch_data = template
        .render(&ArchData::new(target, &revision, &prog.syscalls))
        .into_bytes();

    Ok(Artifacts {
        data_definition,
        revision,
        arch_data,
    })
}

fn table_name(table: &str, arch: &str) -> String {
    format!("{table}_{arch}")
}

fn json<T: Serialize + ?Sized>(table: &str, value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|source| GenError::Serialize {
        table: table.to_string(),
        source,
    })
}

/// The data definition up to, but not including, the revision entry.
///
/// The returned text is an unterminated JSON object; every entry ends with
/// `,\n`.
pub fn generate_data_definition(target: &Target, prog: &Program, consts: &ConstMap) -> Result<Vec<u8>> {
    let arch = target.arch.as_str();
    let header = TargetHeader {
        os: &target.os,
        arch,
        ptr_size: target.ptr_size,
        page_size: target.page_size,
        num_pages: target.num_pages,
        data_offset: target.data_offset,
        syscall_numbers: target.syscall_numbers,
        revision: table_name("revision", arch),
        resources: table_name("resources", arch),
        struct_descs: table_name("struct_descs", arch),
        syscalls: table_name("syscalls", arch),
        consts: table_name("consts", arch),
    };

    let entries = [
        ("autogenerated".to_string(), json("autogenerated", AUTOGENERATED)?),
        ("target".to_string(), json("target", &header)?),
        (header.resources.clone(), json(&header.resources, &prog.resources)?),
        (header.struct_descs.clone(), json(&header.struct_descs, &prog.struct_descs)?),
        (header.syscalls.clone(), json(&header.syscalls, &prog.syscalls)?),
        (header.consts.clone(), json(&header.consts, &sorted_consts(consts))?),
    ];

    let mut out = String::from("{\n");
    for (key, value) in &entries {
        out.push_str(&json(key, key)?);
        out.push_str(": ");
        out.push_str(value);
        out.push_str(",\n");
    }
    Ok(out.into_bytes())
}

/// Append the `revision_<arch>` entry and close the document.
pub fn append_revision(buf: &mut Vec<u8>, arch: &str, revision: &Revision) -> Result<()> {
    let key = table_name("revision", arch);
    let entry = format!("{}: {}\n}}\n", json(&key, &key)?, json(&key, revision.as_str())?);
    buf.extend_from_slice(entry.as_bytes());
    Ok(())
}

/// Project syscalls into C-table rows, sorted by name.
///
/// A row references its callback when the target does not dispatch by
/// number, or when the call is synthetic.
pub fn syscall_rows(target: &Target, syscalls: &[Syscall]) -> Vec<SyscallRow> {
    let mut rows: Vec<SyscallRow> = syscalls
        .iter()
        .map(|c| SyscallRow {
            name: c.name.clone(),
            call_name: c.call_name.clone(),
            nr: c.nr,
            need_call: !target.syscall_numbers || c.is_synthetic(),
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}
