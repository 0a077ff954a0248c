//! Parallel unit scanning.
//!
//! Workers pull unit paths from a shared cursor, run the front-end and the
//! collector, and send per-unit outcomes over a channel. The driving thread
//! merges findings into the symbol table as outcomes arrive, so the table is
//! never shared between threads; commutativity of the merge makes the
//! arrival order irrelevant.

use std::num::NonZero;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::channel;
use std::thread;
use stubgen_core::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Location};
use stubgen_core::symbols::{SymbolTable, UnitFindings};
use stubgen_core::syntax::Frontend;
use tracing::{debug, info};

pub struct ScanStats {
    pub scanned: usize,
    pub failed: usize,
}

enum Outcome {
    Scanned {
        findings: UnitFindings,
        skipped: Vec<Diagnostic>,
    },
    Failed {
        detail: String,
    },
}

/// Scans every unit and merges the findings into `table`. A unit that fails
/// or panics becomes a [CorpusIoFailure] diagnostic; the scan continues with
/// the remaining units.
///
/// [CorpusIoFailure]: DiagnosticKind::CorpusIoFailure
pub fn scan(
    units: &[PathBuf],
    frontend: &dyn Frontend,
    jobs: Option<usize>,
    table: &mut SymbolTable,
    sink: &mut DiagnosticSink,
) -> ScanStats {
    let mut stats = ScanStats {
        scanned: 0,
        failed: 0,
    };
    if units.is_empty() {
        return stats;
    }
    let workers = worker_count(jobs, units.len());
    info!("scanning {} units with {workers} workers", units.len());

    let cursor = AtomicUsize::new(0);
    let (sender, receiver) = channel();
    thread::scope(|scope| {
        for _ in 0..workers {
            let sender = sender.clone();
            let cursor = &cursor;
            scope.spawn(move || {
                loop {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(unit) = units.get(index) else { break };
                    // Frontend::parse_unit is not necessarily unwind safe; the
                    // state it might leave behind lives in this thread and is
                    // dropped with the closure, so AssertUnwindSafe holds.
                    let result = catch_unwind(AssertUnwindSafe(|| {
                        frontend.parse_unit(unit).map(|parsed| {
                            let findings = collect_calls::collect(&parsed);
                            (findings, parsed.skipped)
                        })
                    }));
                    let outcome = match result {
                        Ok(Ok((findings, skipped))) => Outcome::Scanned { findings, skipped },
                        Ok(Err(e)) => Outcome::Failed {
                            detail: e.to_string(),
                        },
                        Err(panic_error) => Outcome::Failed {
                            detail: format!("scan panicked: {panic_error:?}"),
                        },
                    };
                    if sender.send((unit.clone(), outcome)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(sender);
        for (unit, outcome) in receiver {
            match outcome {
                Outcome::Scanned { findings, skipped } => {
                    debug!("merging findings from {}", unit.display());
                    sink.extend(skipped);
                    table.merge_unit(findings);
                    stats.scanned += 1;
                }
                Outcome::Failed { detail } => {
                    sink.push(
                        Diagnostic::new(DiagnosticKind::CorpusIoFailure, detail)
                            .at(Location::new(unit)),
                    );
                    stats.failed += 1;
                }
            }
        }
    });
    stats
}

fn worker_count(jobs: Option<usize>, units: usize) -> usize {
    let default = thread::available_parallelism()
        .map(NonZero::get)
        .unwrap_or(1);
    jobs.unwrap_or(default).clamp(1, units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use stubgen_core::syntax::{FrontendError, ParsedUnit};
    use stubgen_core::test_util::{CannedFrontend, UnitBuilder};
    use stubgen_core::types::{Signature, TypeRef};

    #[test]
    fn merges_every_unit_regardless_of_worker_count() {
        let frontend = CannedFrontend::new()
            .with_unit(
                UnitBuilder::new("a.c")
                    .declares("ext", Signature::new(vec![], TypeRef::int()))
                    .calls("ext", vec![], true)
                    .build(),
            )
            .with_unit(UnitBuilder::new("b.c").calls("ext", vec![], false).build());
        let units = vec![PathBuf::from("a.c"), PathBuf::from("b.c")];

        for jobs in [Some(1), Some(2), None] {
            let mut table = SymbolTable::new();
            let mut sink = DiagnosticSink::new();
            let stats = scan(&units, &frontend, jobs, &mut table, &mut sink);
            assert_eq!(stats.scanned, 2);
            assert_eq!(stats.failed, 0);
            assert_eq!(table.symbol("ext").unwrap().call_sites.len(), 2);
            assert!(sink.is_empty());
        }
    }

    #[test]
    fn failed_unit_is_reported_and_the_scan_continues() {
        let frontend = CannedFrontend::new()
            .with_unit(UnitBuilder::new("good.c").calls("f", vec![], false).build());
        let units = vec![PathBuf::from("bad.c"), PathBuf::from("good.c")];

        let mut table = SymbolTable::new();
        let mut sink = DiagnosticSink::new();
        let stats = scan(&units, &frontend, Some(2), &mut table, &mut sink);
        assert_eq!(stats.scanned, 1);
        assert_eq!(stats.failed, 1);
        assert!(table.symbol("f").is_some());
        assert_eq!(sink.records()[0].kind, DiagnosticKind::CorpusIoFailure);
    }

    #[test]
    fn skipped_nodes_are_forwarded_to_the_sink() {
        let frontend = CannedFrontend::new().with_unit(
            UnitBuilder::new("a.c")
                .calls("f", vec![], false)
                .skipped(Diagnostic::new(
                    DiagnosticKind::UnsupportedConstruct,
                    "inline assembly".to_string(),
                ))
                .build(),
        );
        let units = vec![PathBuf::from("a.c")];
        let mut table = SymbolTable::new();
        let mut sink = DiagnosticSink::new();
        let stats = scan(&units, &frontend, Some(1), &mut table, &mut sink);
        assert_eq!(stats.scanned, 1);
        assert_eq!(sink.records()[0].kind, DiagnosticKind::UnsupportedConstruct);
    }

    struct PanickingFrontend;

    impl Frontend for PanickingFrontend {
        fn parse_unit(&self, unit: &Path) -> Result<ParsedUnit, FrontendError> {
            panic!("cannot parse {}", unit.display());
        }
    }

    #[test]
    fn panicking_unit_becomes_a_diagnostic() {
        let units = vec![PathBuf::from("a.c")];
        let mut table = SymbolTable::new();
        let mut sink = DiagnosticSink::new();
        let stats = scan(&units, &PanickingFrontend, Some(1), &mut table, &mut sink);
        assert_eq!(stats.scanned, 0);
        assert_eq!(stats.failed, 1);
        assert!(sink.records()[0].message.contains("panicked"));
    }

    #[test]
    fn worker_count_is_clamped_to_the_unit_count() {
        assert_eq!(worker_count(Some(8), 3), 3);
        assert_eq!(worker_count(Some(0), 3), 1);
        assert!(worker_count(None, 100) >= 1);
    }
}
