//! The stubgen driver: discovers a C corpus, scans it in parallel, resolves
//! signatures for every called-but-undefined function, and writes a
//! compilable stub source/header pair. This is normally used through the
//! `stubgen` binary, but is exposed as a library crate as well.

pub mod cli;
mod discover;
mod scanner;

pub use scanner::ScanStats;

use render_stubs::RenderedStubs;
use std::fs;
use std::path::PathBuf;
use stubgen_core::Config;
use stubgen_core::diagnostics::DiagnosticSink;
use stubgen_core::symbols::SymbolTable;
use stubgen_core::syntax::Frontend;
use thiserror::Error;
use tracing::info;

/// A failure that aborts the whole run. Per-unit and per-symbol problems are
/// diagnostics instead, and never surface here.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("no translation unit could be scanned; nothing to do")]
    NoUsableInput,
    #[error("output artifact {0} already exists (pass --force to overwrite)")]
    OutputExists(PathBuf),
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize diagnostics: {0}")]
    DiagnosticsJson(#[from] serde_json::Error),
}

/// What a completed run did, for logging and exit-code decisions.
#[derive(Debug)]
pub struct RunSummary {
    pub units_scanned: usize,
    pub units_failed: usize,
    pub stubs_emitted: usize,
    pub diagnostics: usize,
}

/// Performs the complete stub-generation process: discover, scan, resolve,
/// render, write.
pub fn generate(config: &Config, frontend: &dyn Frontend) -> Result<RunSummary, GenerateError> {
    let mut sink = DiagnosticSink::new();
    let units = discover::discover(&config.sources, &mut sink);
    info!("discovered {} translation units", units.len());

    let mut table = SymbolTable::new();
    let stats = scanner::scan(&units, frontend, config.jobs, &mut table, &mut sink);
    if stats.scanned == 0 {
        return Err(GenerateError::NoUsableInput);
    }

    // The merge barrier: resolution and rendering only start once every
    // worker has finished.
    resolve_signatures::resolve(&mut table, config.widen, &mut sink);
    let stubs = render_stubs::render(&table, &config.basename, &mut sink);
    write_outputs(config, &stubs)?;

    if let Some(path) = &config.diagnostics {
        fs::write(path, sink.to_json()?)?;
        info!("wrote diagnostics to {}", path.display());
    }

    let summary = RunSummary {
        units_scanned: stats.scanned,
        units_failed: stats.failed,
        stubs_emitted: stubs.stubs,
        diagnostics: sink.len(),
    };
    info!(
        "scanned {} units ({} failed), emitted {} stubs, {} diagnostics",
        summary.units_scanned, summary.units_failed, summary.stubs_emitted, summary.diagnostics
    );
    Ok(summary)
}

fn write_outputs(config: &Config, stubs: &RenderedStubs) -> Result<(), GenerateError> {
    fs::create_dir_all(&config.output)?;
    let header = config.output.join(format!("{}.h", config.basename));
    let source = config.output.join(format!("{}.c", config.basename));
    if !config.force {
        for path in [&header, &source] {
            if path.exists() {
                return Err(GenerateError::OutputExists(path.clone()));
            }
        }
    }
    fs::write(&header, &stubs.header)?;
    fs::write(&source, &stubs.source)?;
    info!(
        "wrote {} and {}",
        header.display(),
        source.display()
    );
    Ok(())
}
