//! Corpus discovery: expands the configured source paths into the list of
//! translation units to scan.

use std::path::{Path, PathBuf};
use stubgen_core::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Location};
use tracing::debug;
use walkdir::WalkDir;

/// Expands files and directories into a sorted, deduplicated list of `.c`
/// units. Unreadable entries become [CorpusIoFailure] diagnostics and the
/// walk continues.
///
/// [CorpusIoFailure]: DiagnosticKind::CorpusIoFailure
pub fn discover(sources: &[PathBuf], sink: &mut DiagnosticSink) -> Vec<PathBuf> {
    let mut units = Vec::new();
    for source in sources {
        for entry in WalkDir::new(source).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    let path = entry.path();
                    if is_c_source(path) {
                        units.push(path.to_path_buf());
                    } else {
                        debug!("skipping non-C file {}", path.display());
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    let location = e
                        .path()
                        .map(Location::new)
                        .unwrap_or_else(|| Location::new(source.clone()));
                    sink.push(
                        Diagnostic::new(DiagnosticKind::CorpusIoFailure, e.to_string())
                            .at(location),
                    );
                }
            }
        }
    }
    units.sort_unstable();
    units.dedup();
    units
}

fn is_c_source(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "c")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use stubgen_core::test_util::tempdir;

    #[cfg(not(miri))]
    #[test]
    fn finds_c_files_sorted_and_deduplicated() -> std::io::Result<()> {
        let dir = tempdir()?;
        let root = dir.path();
        fs::create_dir(root.join("sub"))?;
        fs::write(root.join("zed.c"), "")?;
        fs::write(root.join("sub/abc.c"), "")?;
        fs::write(root.join("notes.txt"), "")?;
        fs::write(root.join("header.h"), "")?;

        let mut sink = DiagnosticSink::new();
        // The directory plus one of its files, to exercise deduplication.
        let units = discover(
            &[root.to_path_buf(), root.join("zed.c")],
            &mut sink,
        );
        assert_eq!(units, vec![root.join("sub/abc.c"), root.join("zed.c")]);
        assert!(sink.is_empty());
        Ok(())
    }

    #[cfg(not(miri))]
    #[test]
    fn missing_source_becomes_a_diagnostic() {
        let mut sink = DiagnosticSink::new();
        let units = discover(&[PathBuf::from("/does/not/exist")], &mut sink);
        assert!(units.is_empty());
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].kind, DiagnosticKind::CorpusIoFailure);
    }
}
