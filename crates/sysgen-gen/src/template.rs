//! The C-table fragment template.

use std::fmt::Write;

use crate::emit::ArchData;

/// Names used in the generated C table. Built once and shared by every task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CTableTemplate {
    /// Macro holding the architecture name, as read by the executor.
    pub arch_macro: String,
    /// Prefix of the layout and revision `#define`s (`SYZ_REVISION`, ...).
    pub macro_prefix: String,
    /// Element type of the syscall table.
    pub entry_type: String,
    /// Name of the syscall table.
    pub table_name: String,
    /// Name of the table length variable.
    pub count_name: String,
    /// Cast applied to callback references.
    pub callback_type: String,
}

impl Default for CTableTemplate {
    fn default() -> Self {
        Self {
            arch_macro: "GOARCH".into(),
            macro_prefix: "SYZ_".into(),
            entry_type: "call_t".into(),
            table_name: "syscalls".into(),
            count_name: "syscall_count".into(),
            callback_type: "syscall_t".into(),
        }
    }
}

impl CTableTemplate {
    /// Render one preprocessor-guarded block for a single architecture.
    pub fn render(&self, data: &ArchData) -> String {
        let p = &self.macro_prefix;
        let mut out = String::new();

        out.push_str("\n#if ");
        for m in &data.c_arch {
            let _ = write!(out, "defined({m}) || ");
        }
        out.push_str("0\n");

        let _ = writeln!(out, "#define {} \"{}\"", self.arch_macro, data.arch);
        let _ = writeln!(out, "#define {p}REVISION \"{}\"", data.revision);
        let _ = writeln!(out, "#define {p}PAGE_SIZE {}", data.page_size);
        let _ = writeln!(out, "#define {p}NUM_PAGES {}", data.num_pages);
        let _ = writeln!(out, "#define {p}DATA_OFFSET {}", data.data_offset);
        let _ = writeln!(out, "unsigned {} = {};", self.count_name, data.rows.len());
        let _ = writeln!(out, "{} {}[] = {{", self.entry_type, self.table_name);
        for row in &data.rows {
            // Numbers are printed as the executor's 32-bit signed field.
            let nr = row.nr as i32;
            if row.need_call {
                let _ = writeln!(
                    out,
                    "\t{{\"{}\", {nr}, ({}){}}},",
                    row.name, self.callback_type, row.call_name
                );
            } else {
                let _ = writeln!(out, "\t{{\"{}\", {nr}}},", row.name);
            }
        }
        out.push_str("};\n#endif\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::SyscallRow;

    fn data(rows: Vec<SyscallRow>) -> ArchData {
        ArchData {
            arch: "amd64".into(),
            c_arch: vec!["__x86_64__".into()],
            revision: "abc123".into(),
            page_size: 4096,
            num_pages: 4096,
            data_offset: 512 << 20,
            rows,
        }
    }

    #[test]
    fn renders_guarded_block() {
        let rows = vec![
            SyscallRow {
                name: "close".into(),
                call_name: "close".into(),
                nr: 3,
                need_call: false,
            },
            SyscallRow {
                name: "syz_open_dev$tty".into(),
                call_name: "syz_open_dev".into(),
                nr: u64::MAX,
                need_call: true,
            },
        ];
        let got = CTableTemplate::default().render(&data(rows));
        let want = "\n#if defined(__x86_64__) || 0\n\
#define GOARCH \"amd64\"\n\
#define SYZ_REVISION \"abc123\"\n\
#define SYZ_PAGE_SIZE 4096\n\
#define SYZ_NUM_PAGES 4096\n\
#define SYZ_DATA_OFFSET 536870912\n\
unsigned syscall_count = 2;\n\
call_t syscalls[] = {\n\
\t{\"close\", 3},\n\
\t{\"syz_open_dev$tty\", -1, (syscall_t)syz_open_dev},\n\
};\n\
#endif\n";
        assert_eq!(got, want);
    }

    #[test]
    fn multiple_guard_macros() {
        let mut d = data(Vec::new());
        d.c_arch = vec!["__ppc64__".into(), "__PPC64__".into()];
        let got = CTableTemplate::default().render(&d);
        assert!(got.starts_with("\n#if defined(__ppc64__) || defined(__PPC64__) || 0\n"));
        assert!(got.contains("unsigned syscall_count = 0;\n"));
    }
}
