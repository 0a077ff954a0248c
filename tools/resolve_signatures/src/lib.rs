//! Assigns each undefined, called symbol a signature.
//!
//! Two paths: a symbol with an explicit prototype takes it verbatim; a
//! symbol with none gets its signature inferred by folding the argument
//! types of every call site. Symbols whose sources of truth disagree are
//! marked conflicting and reported, never guessed at.

use std::collections::BTreeSet;
use stubgen_core::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use stubgen_core::symbols::{CallSite, Origin, Symbol, SymbolTable};
use stubgen_core::types::{Signature, TypeKind, TypeRef, WideningPolicy, widen};
use tracing::debug;

/// Resolves signatures in place. Symbols that are defined somewhere, or that
/// are never called, are left untouched; they produce no stub and no
/// diagnostic.
pub fn resolve(table: &mut SymbolTable, policy: WideningPolicy, sink: &mut DiagnosticSink) {
    let names: Vec<String> = table
        .names_sorted()
        .into_iter()
        .map(str::to_string)
        .collect();
    for name in names {
        let Some(symbol) = table.symbol_mut(&name) else {
            continue;
        };
        if symbol.defined || symbol.call_sites.is_empty() {
            continue;
        }
        match symbol.origin {
            Origin::Conflicting => sink.push(conflicting_declarations(symbol)),
            Origin::DeclaredExplicit => {
                debug!("{name}: taking declared prototype");
                symbol.signature = Some(symbol.declarations[0].signature.clone());
            }
            Origin::InferredFromCall => match infer(&symbol.call_sites, policy) {
                Ok(signature) => {
                    debug!("{name}: inferred {signature}");
                    symbol.signature = Some(signature);
                }
                Err(detail) => {
                    symbol.origin = Origin::Conflicting;
                    sink.push(Diagnostic::for_symbol(
                        DiagnosticKind::ConflictingSymbol,
                        &name,
                        detail,
                    ));
                }
            },
        }
    }
}

fn conflicting_declarations(symbol: &Symbol) -> Diagnostic {
    // Sorted so the message is stable across scan orders.
    let spellings: BTreeSet<String> = symbol
        .declarations
        .iter()
        .map(|d| format!("{} at {}", d.signature, d.location))
        .collect();
    Diagnostic::for_symbol(
        DiagnosticKind::ConflictingSymbol,
        &symbol.name,
        format!(
            "declarations disagree: {}",
            spellings.into_iter().collect::<Vec<_>>().join(" vs ")
        ),
    )
}

/// Folds all call sites of an undeclared symbol into one signature.
fn infer(call_sites: &[CallSite], policy: WideningPolicy) -> Result<Signature, String> {
    let arities: BTreeSet<usize> = call_sites.iter().map(|c| c.args.len()).collect();
    if arities.len() > 1 {
        return Err(format!(
            "call sites disagree on argument count: {}",
            arities
                .into_iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(" vs ")
        ));
    }

    let arity = call_sites[0].args.len();
    let mut params = Vec::with_capacity(arity);
    for position in 0..arity {
        let mut acc = TypeRef::unknown();
        for call in call_sites {
            acc = widen(&acc, &call.args[position], policy).ok_or_else(|| {
                format!(
                    "call sites disagree on argument {}: {} vs {}",
                    position + 1,
                    acc.render(),
                    call.args[position].render()
                )
            })?;
        }
        // Nothing resolvable at any call site; `void *` accepts whatever the
        // caller was passing.
        if matches!(acc.kind, TypeKind::Unknown) {
            acc = TypeRef::pointer(TypeRef::void());
        }
        params.push(acc);
    }

    // With no prototype anywhere, the return type is unobservable beyond
    // whether anyone looks at it.
    let ret = if call_sites.iter().any(|c| c.result_used) {
        TypeRef::int()
    } else {
        TypeRef::void()
    };
    Ok(Signature::new(params, ret))
}
