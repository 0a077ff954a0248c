//! Core data model for stubgen: C type and signature modeling, the
//! process-wide symbol table, the normalized syntax-tree contract consumed
//! from the parser front-end, diagnostics, and run configuration.

pub mod config;
pub mod diagnostics;
pub mod symbols;
pub mod syntax;
pub mod test_util;
pub mod types;

pub use config::Config;
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Location};
pub use symbols::{CallSite, Declaration, Origin, Symbol, SymbolTable, TypeRegistry, UnitFindings};
pub use syntax::{AggregateKind, Frontend, FrontendError, ParsedUnit, UnitNode};
pub use types::{Signature, TypeKind, TypeRef, WideningPolicy};
