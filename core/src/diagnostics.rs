//! Structured diagnostic records for everything the pipeline could not
//! resolve. These are collected across the run and can be exported as JSON
//! for CI reporting; they are never fatal on their own.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

/// A position within a scanned translation unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u64>,
}

impl Location {
    pub fn new<P: Into<PathBuf>>(file: P) -> Location {
        Location {
            file: file.into(),
            line: None,
            column: None,
        }
    }

    pub fn with_line<P: Into<PathBuf>>(file: P, line: u64) -> Location {
        Location {
            file: file.into(),
            line: Some(line),
            column: None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
            if let Some(column) = self.column {
                write!(f, ":{column}")?;
            }
        }
        Ok(())
    }
}

/// Why a node, symbol, or unit was excluded from stub generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A single syntax-tree node could not be modeled; that node was skipped
    /// and unit scanning continued.
    UnsupportedConstruct,
    /// Two sources of truth disagree about a symbol's signature; no stub is
    /// emitted for it.
    ConflictingSymbol,
    /// A stub candidate references a type that cannot be fully described;
    /// that one stub is skipped.
    UnresolvedType,
    /// A translation unit could not be read or parsed at all; the run
    /// continues with the remaining units.
    CorpusIoFailure,
}

/// One diagnostic record, consumable by a caller for CI reporting.
#[derive(Clone, Debug, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: String) -> Diagnostic {
        Diagnostic {
            kind,
            symbol: None,
            location: None,
            message,
        }
    }

    pub fn for_symbol(kind: DiagnosticKind, symbol: &str, message: String) -> Diagnostic {
        Diagnostic {
            kind,
            symbol: Some(symbol.to_string()),
            location: None,
            message,
        }
    }

    pub fn at(mut self, location: Location) -> Diagnostic {
        self.location = Some(location);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.symbol, &self.location) {
            (Some(symbol), Some(location)) => {
                write!(f, "{location}: {symbol}: {}", self.message)
            }
            (Some(symbol), None) => write!(f, "{symbol}: {}", self.message),
            (None, Some(location)) => write!(f, "{location}: {}", self.message),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

/// Accumulates diagnostics across the run. Each record is also logged as a
/// warning the moment it is recorded.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    records: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> DiagnosticSink {
        DiagnosticSink::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        warn!("{diagnostic}");
        self.records.push(diagnostic);
    }

    /// Records a batch of diagnostics, e.g. one unit's skipped nodes.
    pub fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, diagnostics: I) {
        for diagnostic in diagnostics {
            self.push(diagnostic);
        }
    }

    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serializes all records as a JSON array.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records)
    }
}
