//! Turns one parsed translation unit into its [UnitFindings] contribution.
//!
//! The collector is per-unit and pure, which is what lets units be scanned
//! in parallel: each worker collects independently and the findings are
//! merged into the symbol table afterwards.

use std::collections::HashSet;
use stubgen_core::symbols::{CallSite, Declaration, UnitFindings};
use stubgen_core::syntax::{ParsedUnit, UnitNode};
use tracing::debug;

/// Collects every symbol observation in one unit.
///
/// Rules applied here rather than at merge time:
/// - `static` functions have internal linkage; their declarations never
///   describe an external symbol and are dropped.
/// - Calls to a function the same unit defines (static or not) resolve
///   within that unit and are dropped.
/// - A definition contributes its prototype too, so a corpus that defines a
///   function in one unit and calls it nowhere still knows its signature.
pub fn collect(unit: &ParsedUnit) -> UnitFindings {
    let defined_here: HashSet<&str> = unit
        .nodes
        .iter()
        .filter_map(|node| match node {
            UnitNode::FunctionDefinition { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();

    let mut findings = UnitFindings::default();
    for node in &unit.nodes {
        match node {
            UnitNode::FunctionDeclaration {
                name,
                signature,
                storage_static,
                location,
            } => {
                if *storage_static {
                    debug!("skipping static declaration of {name} at {location}");
                    continue;
                }
                findings.declarations.push((
                    name.clone(),
                    Declaration {
                        signature: signature.clone(),
                        location: location.clone(),
                    },
                ));
            }
            UnitNode::FunctionDefinition {
                name,
                signature,
                storage_static,
                location,
            } => {
                if *storage_static {
                    debug!("skipping static definition of {name} at {location}");
                    continue;
                }
                findings.definitions.push((name.clone(), location.clone()));
                findings.declarations.push((
                    name.clone(),
                    Declaration {
                        signature: signature.clone(),
                        location: location.clone(),
                    },
                ));
            }
            UnitNode::CallExpression {
                callee,
                args,
                result_used,
                location,
            } => {
                if defined_here.contains(callee.as_str()) {
                    debug!("call to {callee} at {location} resolves within its own unit");
                    continue;
                }
                findings.calls.push((
                    callee.clone(),
                    CallSite {
                        location: location.clone(),
                        args: args.clone(),
                        result_used: *result_used,
                    },
                ));
            }
            UnitNode::AggregateTypeDeclaration {
                kind,
                tag,
                complete,
            } => {
                findings.aggregates.push((*kind, tag.clone(), *complete));
            }
            // Typedefs were already resolved into the types the front-end
            // handed us.
            UnitNode::TypedefDeclaration { .. } => {}
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use stubgen_core::syntax::AggregateKind;
    use stubgen_core::test_util::UnitBuilder;
    use stubgen_core::types::{Signature, TypeRef};

    fn sig_int_to_void() -> Signature {
        Signature::new(vec![TypeRef::int()], TypeRef::void())
    }

    #[test]
    fn declarations_and_calls_are_collected() {
        let unit = UnitBuilder::new("a.c")
            .declares("bar", sig_int_to_void())
            .calls("bar", vec![TypeRef::int()], false)
            .calls("baz", vec![], true)
            .build();
        let findings = collect(&unit);
        assert!(findings.definitions.is_empty());
        assert_eq!(findings.declarations.len(), 1);
        assert_eq!(findings.declarations[0].0, "bar");
        assert_eq!(findings.calls.len(), 2);
        assert_eq!(findings.calls[1].0, "baz");
        assert!(findings.calls[1].1.result_used);
    }

    #[test]
    fn definition_contributes_its_prototype() {
        let unit = UnitBuilder::new("a.c")
            .defines("helper", sig_int_to_void())
            .build();
        let findings = collect(&unit);
        assert_eq!(findings.definitions.len(), 1);
        assert_eq!(findings.declarations.len(), 1);
        assert_eq!(findings.declarations[0].1.signature, sig_int_to_void());
    }

    #[test]
    fn static_functions_stay_internal() {
        let unit = UnitBuilder::new("a.c")
            .declares_static("local_decl", sig_int_to_void())
            .defines_static("local_def", sig_int_to_void())
            .calls("local_def", vec![TypeRef::int()], false)
            .build();
        let findings = collect(&unit);
        assert!(findings.definitions.is_empty());
        assert!(findings.declarations.is_empty());
        assert!(findings.calls.is_empty());
    }

    #[test]
    fn calls_resolved_within_the_unit_are_dropped() {
        let unit = UnitBuilder::new("a.c")
            .defines("here", sig_int_to_void())
            .calls("here", vec![TypeRef::int()], false)
            .calls("elsewhere", vec![], false)
            .build();
        let findings = collect(&unit);
        assert_eq!(findings.calls.len(), 1);
        assert_eq!(findings.calls[0].0, "elsewhere");
    }

    #[test]
    fn typedefs_contribute_nothing() {
        let unit = UnitBuilder::new("a.c")
            .typedef("len_t", TypeRef::long())
            .build();
        assert!(collect(&unit).is_empty());
    }

    #[test]
    fn aggregates_are_forwarded() {
        let unit = UnitBuilder::new("a.c")
            .aggregate(AggregateKind::Struct, "point", true)
            .aggregate(AggregateKind::Enum, "mode", true)
            .build();
        let findings = collect(&unit);
        assert_eq!(findings.aggregates.len(), 2);
        assert_eq!(findings.aggregates[0].1, "point");
    }
}
