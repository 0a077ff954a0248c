//! The normalized syntax-tree contract between the parser front-end and the
//! rest of the pipeline. The collector, resolver, and renderer only ever see
//! these nodes, so a different parser can be substituted without touching
//! any of them.

use crate::diagnostics::{Diagnostic, Location};
use crate::types::{Signature, TypeRef};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Which flavor of aggregate a tag declaration introduced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateKind {
    Struct,
    Union,
    Enum,
}

/// One normalized top-level observation within a translation unit.
#[derive(Clone, Debug)]
pub enum UnitNode {
    FunctionDeclaration {
        name: String,
        signature: Signature,
        /// `static` storage; such declarations cannot be satisfied from a
        /// separate stub translation unit.
        storage_static: bool,
        location: Location,
    },
    FunctionDefinition {
        name: String,
        signature: Signature,
        storage_static: bool,
        location: Location,
    },
    CallExpression {
        callee: String,
        /// Argument types as best determinable from the tree;
        /// [TypeRef::unknown] for arguments that could not be resolved.
        args: Vec<TypeRef>,
        /// False when the call sits in statement position and its result is
        /// discarded.
        result_used: bool,
        location: Location,
    },
    TypedefDeclaration {
        name: String,
        underlying: TypeRef,
    },
    AggregateTypeDeclaration {
        kind: AggregateKind,
        tag: String,
        /// Whether a complete definition (with a body) was seen, as opposed
        /// to a forward declaration.
        complete: bool,
    },
}

/// One adapted translation unit: the normalized nodes plus the diagnostics
/// for every node that had to be skipped. Skipped nodes never block the rest
/// of the unit.
#[derive(Clone, Debug)]
pub struct ParsedUnit {
    pub path: PathBuf,
    pub nodes: Vec<UnitNode>,
    pub skipped: Vec<Diagnostic>,
}

impl ParsedUnit {
    pub fn new<P: Into<PathBuf>>(path: P) -> ParsedUnit {
        ParsedUnit {
            path: path.into(),
            nodes: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// A pluggable parser front-end. One capability: produce normalized nodes
/// for a translation unit.
pub trait Frontend: Send + Sync {
    fn parse_unit(&self, unit: &Path) -> Result<ParsedUnit, FrontendError>;
}

/// A unit-level front-end failure. Fatal only for the unit it names; the
/// driver reports it and continues with the remaining units.
#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("failed to read translation unit: {0}")]
    Io(#[from] std::io::Error),
    #[error("parser output could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("parser failed on {unit} ({detail})")]
    ParserFailed { unit: PathBuf, detail: String },
}
