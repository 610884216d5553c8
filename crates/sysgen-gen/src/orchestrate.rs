//! Per-OS scheduling of target compilations.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::thread;

use sysgen_compiler::{Ast, Compiler, ConstantLoader, DescriptionParser};
use sysgen_prog::{Diagnostics, Revision};
use sysgen_targets::{Target, TargetCatalog};

use crate::config::GeneratorConfig;
use crate::emit;
use crate::error::{ErrorKind, GenError, Result};
use crate::job::Job;
use crate::report::{OsReport, RunReport, TargetReport};
use crate::writer::{self, WriteStatus};

/// Drives the collaborators over a target catalog.
///
/// All fields are shared read-only by the per-target tasks.
pub struct Generator<'a> {
    config: &'a GeneratorConfig,
    parser: &'a dyn DescriptionParser,
    loader: &'a dyn ConstantLoader,
    compiler: &'a dyn Compiler,
}

/// Successful per-target results.
struct TaskOutput {
    unsupported: BTreeSet<String>,
    revision: Revision,
    arch_data: Vec<u8>,
    status: WriteStatus,
}

enum TaskError {
    Diagnostics(ErrorKind, Diagnostics),
    Output(GenError),
}

impl<'a> Generator<'a> {
    pub fn new(
        config: &'a GeneratorConfig,
        parser: &'a dyn DescriptionParser,
        loader: &'a dyn ConstantLoader,
        compiler: &'a dyn Compiler,
    ) -> Self {
        Self {
            config,
            parser,
            loader,
            compiler,
        }
    }

    /// Generate every OS in the catalog, in OS name order. The first failing
    /// OS stops the run.
    pub fn run(&self, catalog: &TargetCatalog, out: &mut dyn Write) -> Result<RunReport> {
        let mut report = RunReport::default();
        for (os, targets) in catalog.by_os() {
            report.oses.push(self.generate_os(&os, &targets, out)?);
        }
        Ok(report)
    }

    /// Generate all targets of one OS and write its C header.
    pub fn generate_os(&self, os: &str, targets: &[Target], out: &mut dyn Write) -> Result<OsReport> {
        let ast = match self.parser.parse(&self.config.description_glob(os)) {
            Ok(ast) => ast,
            Err(diags) => {
                for d in &diags {
                    writeln!(out, "{d}")?;
                }
                return Err(GenError::Parse {
                    os: os.to_string(),
                    count: diags.len(),
                });
            }
        };

        let mut targets = targets.to_vec();
        targets.sort_by(|a, b| a.arch.cmp(&b.arch));
        let mut jobs = self.run_jobs(&ast, targets);

        // The first output error in arch order is returned as the cause;
        // later ones are printed with their target's diagnostics.
        let cause = jobs.iter().position(|j| j.output_error.is_some());
        for (i, job) in jobs.iter().enumerate() {
            writeln!(out, "generating {}...", job.target.name())?;
            for line in &job.errors {
                writeln!(out, "{line}")?;
            }
            if let Some(err) = &job.output_error {
                if let GenError::Format { raw, .. } = err {
                    writeln!(out, "{raw}")?;
                }
                if cause != Some(i) {
                    writeln!(out, "{err}")?;
                }
            }
        }

        if let Some(err) = cause.and_then(|i| jobs[i].output_error.take()) {
            return Err(err);
        }
        let failed: Vec<&Job> = jobs.iter().filter(|j| !j.ok).collect();
        if let Some(first) = failed.first() {
            return Err(GenError::TargetsFailed {
                os: os.to_string(),
                targets: failed.iter().map(|j| j.target.name()).collect(),
                kind: first.failure.unwrap_or(ErrorKind::Compile),
            });
        }

        check_unsupported(os, &jobs)?;

        let c_table = self.config.c_table_path(os);
        writer::write_c_table(&c_table, jobs.iter().map(|j| j.arch_data.as_slice()))?;

        let targets = jobs
            .into_iter()
            .filter_map(|j| {
                Some(TargetReport {
                    arch: j.target.arch,
                    revision: j.revision?,
                    status: j.status?,
                })
            })
            .collect();
        Ok(OsReport {
            os: os.to_string(),
            targets,
            c_table,
        })
    }

    /// One scoped thread per target; every handle is joined before any
    /// result is returned. Jobs come back in the order of `targets`.
    fn run_jobs(&self, ast: &Ast, targets: Vec<Target>) -> Vec<Job> {
        thread::scope(|s| {
            let handles: Vec<_> = targets
                .into_iter()
                .map(|target| {
                    let fallback = target.clone();
                    (fallback, s.spawn(move || self.run_job(target, ast)))
                })
                .collect();
            handles
                .into_iter()
                .map(|(target, handle)| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| Job::panicked(target, &panic_message(&*payload)))
                })
                .collect()
        })
    }

    fn run_job(&self, target: Target, ast: &Ast) -> Job {
        let mut job = Job::new(target);
        match self.build_target(&job.target, ast) {
            Ok(output) => {
                job.ok = true;
                job.unsupported = output.unsupported;
                job.revision = Some(output.revision);
                job.arch_data = output.arch_data;
                job.status = Some(output.status);
            }
            Err(TaskError::Diagnostics(kind, diags)) => {
                job.fail(kind, diags.iter().map(|d| d.to_string()));
            }
            Err(TaskError::Output(err)) => {
                job.fail(ErrorKind::Output, std::iter::empty::<String>());
                job.output_error = Some(err);
            }
        }
        job
    }

    fn build_target(&self, target: &Target, ast: &Ast) -> std::result::Result<TaskOutput, TaskError> {
        let consts = self
            .loader
            .load(&self.config.const_glob(&target.os), &target.arch)
            .map_err(|d| TaskError::Diagnostics(ErrorKind::Input, d))?;
        let prog = self
            .compiler
            .compile(ast, &consts, target)
            .map_err(|d| TaskError::Diagnostics(ErrorKind::Compile, d))?;

        let artifacts =
            emit::emit(target, &prog, &consts, &self.config.template).map_err(TaskError::Output)?;
        let path = self.config.data_definition_path(&target.os, &target.arch);
        let status =
            writer::write_data_definition(&path, &artifacts.data_definition).map_err(TaskError::Output)?;

        Ok(TaskOutput {
            unsupported: prog.unsupported,
            revision: artifacts.revision,
            arch_data: artifacts.arch_data,
            status,
        })
    }
}

/// Fail if some symbol is unsupported by every job of the OS.
///
/// Symbols are examined in sorted order, so the reported one is the
/// lexicographically first offender.
pub fn check_unsupported(os: &str, jobs: &[Job]) -> Result<()> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for job in jobs {
        for symbol in &job.unsupported {
            *counts.entry(symbol.as_str()).or_default() += 1;
        }
    }
    match counts.into_iter().find(|&(_, n)| n == jobs.len()) {
        Some((symbol, _)) => Err(GenError::Unsupported {
            os: os.to_string(),
            symbol: symbol.to_string(),
        }),
        None => Ok(()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use sysgen_prog::{ConstMap, Pos, Program, Syscall};

    /// Returns an empty AST, or diagnostics when `fail` is set.
    struct FixedParser {
        fail: bool,
    }

    impl DescriptionParser for FixedParser {
        fn parse(&self, pattern: &Path) -> std::result::Result<Ast, Diagnostics> {
            if self.fail {
                let mut d = Diagnostics::new();
                d.push(Pos::new(pattern.display().to_string(), 3, 5), "unexpected token");
                return Err(d);
            }
            Ok(Ast::default())
        }
    }

    /// Every arch gets `__NR_getpid`; arm64 lacks `O_LARGEFILE`.
    struct MapLoader;

    impl ConstantLoader for MapLoader {
        fn load(&self, _pattern: &Path, arch: &str) -> std::result::Result<ConstMap, Diagnostics> {
            if arch == "bad" {
                let mut d = Diagnostics::new();
                d.push(Pos::new("sys_bad.const", 1, 1), "bad value 'x' for A");
                return Err(d);
            }
            let mut consts = ConstMap::new();
            consts.insert("__NR_getpid".into(), if arch == "amd64" { 39 } else { 172 });
            if arch != "arm64" {
                consts.insert("O_LARGEFILE".into(), 0x8000);
            }
            Ok(consts)
        }
    }

    /// Emits one syscall per program; missing constants become unsupported.
    /// Panics on the "mips" arch.
    struct StubCompiler {
        needs: &'static [&'static str],
    }

    impl Compiler for StubCompiler {
        fn compile(
            &self,
            _ast: &Ast,
            consts: &ConstMap,
            target: &Target,
        ) -> std::result::Result<Program, Diagnostics> {
            if target.arch == "mips" {
                panic!("layout overflow");
            }
            let mut prog = Program::default();
            for need in self.needs {
                if !consts.contains_key(*need) {
                    prog.unsupported.insert(need.to_string());
                }
            }
            prog.syscalls.push(Syscall {
                id: 0,
                nr: consts.get("__NR_getpid").copied().unwrap_or(0),
                name: "getpid".into(),
                call_name: "getpid".into(),
                args: Vec::new(),
                ret: None,
            });
            Ok(prog)
        }
    }

    fn linux(arches: &[&str]) -> Vec<Target> {
        arches
            .iter()
            .map(|a| Target::new("linux", *a, 8, &["__linux__"]))
            .collect()
    }

    fn job_with(unsupported: &[&str]) -> Job {
        let mut job = Job::new(Target::new("linux", "amd64", 8, &["__x86_64__"]));
        job.ok = true;
        job.unsupported = unsupported.iter().map(|s| s.to_string()).collect();
        job
    }

    #[test]
    fn unsupported_everywhere_is_an_error() {
        let jobs = vec![job_with(&["O_CRAET", "ZZZ"]), job_with(&["ZZZ", "O_CRAET"])];
        let err = check_unsupported("linux", &jobs).unwrap_err();
        assert_eq!(err.to_string(), "O_CRAET is unsupported on all arches (typo?)");
    }

    #[test]
    fn unsupported_somewhere_is_fine() {
        let jobs = vec![job_with(&["O_LARGEFILE"]), job_with(&[]), job_with(&["O_LARGEFILE"])];
        assert!(check_unsupported("linux", &jobs).is_ok());
        assert!(check_unsupported("linux", &[]).is_ok());
    }

    #[test]
    fn generates_all_targets() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig::new(dir.path());
        let compiler = StubCompiler { needs: &["O_LARGEFILE"] };
        let gen = Generator::new(&config, &FixedParser { fail: false }, &MapLoader, &compiler);

        let mut out = Vec::new();
        let report = gen
            .generate_os("linux", &linux(&["arm64", "amd64"]), &mut out)
            .unwrap();
        let out = String::from_utf8(out).unwrap();
        assert_eq!(out, "generating linux/amd64...\ngenerating linux/arm64...\n");

        let arches: Vec<&str> = report.targets.iter().map(|t| t.arch.as_str()).collect();
        assert_eq!(arches, vec!["amd64", "arm64"]);
        assert_eq!(report.written(), 2);
        assert!(config.data_definition_path("linux", "amd64").exists());
        assert!(config.data_definition_path("linux", "arm64").exists());

        let header = std::fs::read_to_string(config.c_table_path("linux")).unwrap();
        assert!(header.starts_with("// AUTOGENERATED FILE\n"));
        assert_eq!(header.matches("#if defined(__linux__) || 0").count(), 2);
        assert!(header.find("\"amd64\"").unwrap() < header.find("\"arm64\"").unwrap());
    }

    #[test]
    fn symbol_missing_on_all_targets_fails_the_os() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig::new(dir.path());
        let compiler = StubCompiler { needs: &["O_LARGEFILE", "O_CRAET"] };
        let gen = Generator::new(&config, &FixedParser { fail: false }, &MapLoader, &compiler);

        let err = gen
            .generate_os("linux", &linux(&["amd64", "arm64"]), &mut Vec::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Consistency);
        assert_eq!(err.to_string(), "O_CRAET is unsupported on all arches (typo?)");
        assert!(!config.c_table_path("linux").exists());
    }

    #[test]
    fn parse_failure_prints_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig::new(dir.path());
        let compiler = StubCompiler { needs: &[] };
        let gen = Generator::new(&config, &FixedParser { fail: true }, &MapLoader, &compiler);

        let mut out = Vec::new();
        let err = gen.generate_os("linux", &linux(&["amd64"]), &mut out).unwrap_err();
        assert!(matches!(err, GenError::Parse { count: 1, .. }));
        let out = String::from_utf8(out).unwrap();
        assert!(out.ends_with(":3:5: unexpected token\n"), "{out}");
        assert!(!out.contains("generating"));
    }

    #[test]
    fn failed_and_panicking_tasks_are_reported_after_join() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig::new(dir.path());
        let compiler = StubCompiler { needs: &[] };
        let gen = Generator::new(&config, &FixedParser { fail: false }, &MapLoader, &compiler);

        let mut out = Vec::new();
        let err = gen
            .generate_os("linux", &linux(&["mips", "amd64", "bad"]), &mut out)
            .unwrap_err();
        match &err {
            GenError::TargetsFailed { targets, kind, .. } => {
                assert_eq!(targets, &vec!["linux/bad".to_string(), "linux/mips".to_string()]);
                assert_eq!(*kind, ErrorKind::Input);
            }
            other => panic!("unexpected error: {other}"),
        }

        let out = String::from_utf8(out).unwrap();
        assert_eq!(
            out,
            "generating linux/amd64...\n\
generating linux/bad...\n\
sys_bad.const:1:1: bad value 'x' for A\n\
generating linux/mips...\n\
linux/mips: generation task panicked: layout overflow\n"
        );
        // The healthy target still ran to completion.
        assert!(config.data_definition_path("linux", "amd64").exists());
        assert!(!config.c_table_path("linux").exists());
    }

    #[test]
    fn run_stops_at_first_failing_os() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig::new(dir.path());
        let compiler = StubCompiler { needs: &[] };
        let gen = Generator::new(&config, &FixedParser { fail: false }, &MapLoader, &compiler);

        let catalog = TargetCatalog::new(vec![
            Target::new("akaros", "bad", 8, &["__x86_64__"]),
            Target::new("linux", "amd64", 8, &["__x86_64__"]),
        ])
        .unwrap();
        let err = gen.run(&catalog, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, GenError::TargetsFailed { ref os, .. } if os == "akaros"));
        assert!(!config.data_definition_path("linux", "amd64").exists());
    }
}
