//! sysgen: generates per-target syscall data definitions and the executor's
//! C syscall tables from syscall descriptions.

mod manifest;
mod memprofile;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use sysgen_compiler::{ConstFileLoader, LayoutCompiler, TomlDescriptionParser};
use sysgen_gen::{Generator, RunReport};

use manifest::SysgenManifest;
use memprofile::CountingAlloc;

#[global_allocator]
static ALLOC: CountingAlloc = CountingAlloc::new();

#[derive(Parser)]
#[command(
    name = "sysgen",
    version,
    about = "Generate syscall data definitions and executor syscall tables"
)]
struct Cli {
    /// Write a heap profile to this file when the run ends
    #[arg(long, value_name = "PATH")]
    memprofile: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let mut failed = false;
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        failed = true;
    }
    // The profile covers the whole run, whether or not generation succeeded.
    if let Some(path) = &cli.memprofile {
        if let Err(e) = memprofile::write_profile(path, &ALLOC.snapshot()) {
            eprintln!("error: {e:#}");
            failed = true;
        }
    }
    if failed {
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    generate(&cwd, &mut out)?;
    Ok(())
}

/// Generate everything selected by the manifest found from `cwd`, or the
/// built-in defaults rooted at `cwd` when there is none.
fn generate(cwd: &Path, out: &mut dyn Write) -> anyhow::Result<RunReport> {
    let (manifest, root) = match SysgenManifest::find_and_load(cwd)? {
        Some(found) => found,
        None => (SysgenManifest::default(), cwd.to_path_buf()),
    };
    let config = manifest.generator_config(&root);
    let catalog = manifest.catalog(&root)?;

    let generator = Generator::new(&config, &TomlDescriptionParser, &ConstFileLoader, &LayoutCompiler);
    let report = generator.run(&catalog, out)?;
    for os in &report.oses {
        writeln!(out, "{os}")?;
    }
    Ok(report)
}
