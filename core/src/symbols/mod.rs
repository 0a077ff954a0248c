//! The process-wide symbol registry.
//!
//! Each scanned translation unit contributes a [UnitFindings]; the table is
//! built by merging those findings one unit at a time. The merge is pure and
//! commutative — the final table depends only on the set of findings, never
//! on the order units were scanned — which is what allows units to be
//! scanned in parallel and merged as they complete.

#[cfg(test)]
mod tests;

use crate::diagnostics::Location;
use crate::syntax::AggregateKind;
use crate::types::{Signature, TypeRef};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Deterministic ordering key for locations, used to break ties between
/// equivalent declarations found in different units.
fn location_rank(location: &Location) -> (&std::path::Path, u64, u64) {
    (
        &location.file,
        location.line.unwrap_or(0),
        location.column.unwrap_or(0),
    )
}

/// How the table came to know a symbol's signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// At least one explicit prototype was found, and all found prototypes
    /// agree.
    DeclaredExplicit,
    /// No prototype anywhere; the signature can only come from call-site
    /// inference.
    InferredFromCall,
    /// Two sources of truth disagree. Sticky: once conflicting, always
    /// conflicting.
    Conflicting,
}

/// An explicit prototype contribution, with where it was found.
#[derive(Clone, Debug)]
pub struct Declaration {
    pub signature: Signature,
    pub location: Location,
}

/// One call expression referencing a symbol. The unit it occurs in is the
/// location's file.
#[derive(Clone, Debug)]
pub struct CallSite {
    pub location: Location,
    pub args: Vec<TypeRef>,
    pub result_used: bool,
}

/// Everything known about one external function name. C external identifiers
/// share a single flat namespace, so one entry covers the whole corpus.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: String,
    pub origin: Origin,
    /// The resolved signature; filled in by the resolver after all units
    /// have merged.
    pub signature: Option<Signature>,
    /// Whether any unit defines this symbol. A defined symbol is permanently
    /// excluded from stub generation.
    pub defined: bool,
    /// Every structurally distinct explicit declaration seen, so conflict
    /// diagnostics can name all of them.
    pub declarations: Vec<Declaration>,
    pub call_sites: Vec<CallSite>,
}

impl Symbol {
    fn new(name: &str, origin: Origin) -> Symbol {
        Symbol {
            name: name.to_string(),
            origin,
            signature: None,
            defined: false,
            declarations: Vec::new(),
            call_sites: Vec::new(),
        }
    }

    /// Whether this symbol is eligible for stub generation: never defined,
    /// called at least once, and not conflicting.
    pub fn stub_candidate(&self) -> bool {
        !self.defined && !self.call_sites.is_empty() && self.origin != Origin::Conflicting
    }
}

/// One translation unit's partial contribution to the table. Built by the
/// collector; consumed exactly once by [SymbolTable::merge_unit].
#[derive(Clone, Debug, Default)]
pub struct UnitFindings {
    pub definitions: Vec<(String, Location)>,
    pub declarations: Vec<(String, Declaration)>,
    pub calls: Vec<(String, CallSite)>,
    pub aggregates: Vec<(AggregateKind, String, bool)>,
}

impl UnitFindings {
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
            && self.declarations.is_empty()
            && self.calls.is_empty()
            && self.aggregates.is_empty()
    }
}

/// Which type tags the corpus itself declares. The renderer consults this to
/// decide whether a stub signature can be fully described.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    /// struct/union tag -> whether a complete definition was seen.
    records: HashMap<String, bool>,
    enums: HashSet<String>,
}

impl TypeRegistry {
    pub fn record_aggregate(&mut self, kind: AggregateKind, tag: &str, complete: bool) {
        match kind {
            AggregateKind::Struct | AggregateKind::Union => {
                let entry = self.records.entry(tag.to_string()).or_insert(false);
                *entry |= complete;
            }
            AggregateKind::Enum => {
                self.enums.insert(tag.to_string());
            }
        }
    }

    pub fn knows_enum(&self, tag: &str) -> bool {
        self.enums.contains(tag)
    }

    /// Whether a complete (non-forward) definition of this record tag was
    /// seen anywhere in the corpus.
    pub fn has_complete_record(&self, tag: &str) -> bool {
        self.records.get(tag).copied().unwrap_or(false)
    }
}

/// The registry of every external function name seen across the corpus,
/// keyed by name, plus the type tags the corpus declares.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
    types: TypeRegistry,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Merges one unit's findings into the table. Commutative: merging the
    /// same set of findings in any order produces the same table.
    pub fn merge_unit(&mut self, findings: UnitFindings) {
        for (kind, tag, complete) in findings.aggregates {
            self.types.record_aggregate(kind, &tag, complete);
        }
        for (name, location) in findings.definitions {
            debug!("{name} defined at {location}");
            // A definition's signature arrives separately through
            // `declarations`, keeping this arm order-independent.
            self.entry(&name, Origin::InferredFromCall).defined = true;
        }
        for (name, declaration) in findings.declarations {
            self.record_declaration(&name, declaration);
        }
        for (name, call) in findings.calls {
            let symbol = self.entry(&name, Origin::InferredFromCall);
            symbol.call_sites.push(call);
        }
    }

    fn record_declaration(&mut self, name: &str, declaration: Declaration) {
        let symbol = self.entry(name, Origin::DeclaredExplicit);
        match symbol
            .declarations
            .iter_mut()
            .find(|d| d.signature == declaration.signature)
        {
            Some(existing) => {
                // Structural equality ignores qualifiers, so a redeclaration
                // can still refine the stored spelling. Union the qualifiers
                // and keep the earliest location so the merged entry does not
                // depend on scan order.
                existing.signature = existing.signature.union_const(&declaration.signature);
                if location_rank(&declaration.location) < location_rank(&existing.location) {
                    existing.location = declaration.location;
                }
            }
            None => symbol.declarations.push(declaration),
        }
        // A second structurally distinct declaration makes the symbol
        // conflicting; an InferredFromCall symbol upgrades to
        // DeclaredExplicit, never the reverse.
        symbol.origin = if symbol.declarations.len() > 1 {
            Origin::Conflicting
        } else if symbol.origin == Origin::Conflicting {
            Origin::Conflicting
        } else {
            Origin::DeclaredExplicit
        };
    }

    fn entry(&mut self, name: &str, origin_if_new: Origin) -> &mut Symbol {
        self.symbols
            .entry(name.to_string())
            .or_insert_with(|| Symbol::new(name, origin_if_new))
    }

    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn symbol_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.symbols.get_mut(name)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    /// Symbol names in lexicographic order, for diff-stable output.
    pub fn names_sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.symbols.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
