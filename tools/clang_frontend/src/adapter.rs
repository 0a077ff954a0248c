//! Lowers a clang syntax tree into the normalized node sequence consumed by
//! the collector. Nodes that cannot be modeled are skipped one at a time
//! with an UnsupportedConstruct diagnostic; they never abort the unit.

use crate::clang::{Clang, ReferencedDecl};
use crate::types::{TypedefMap, parse_signature, parse_type};
use clang_ast::Node;
use std::path::{Path, PathBuf};
use stubgen_core::diagnostics::{Diagnostic, DiagnosticKind, Location};
use stubgen_core::syntax::{AggregateKind, ParsedUnit, UnitNode};
use stubgen_core::types::TypeRef;
use tracing::debug;

/// Adapts one translation unit's AST.
pub fn adapt(unit: &Path, ast: &Node<Clang>) -> ParsedUnit {
    let mut ctx = Adapter {
        unit: unit.to_path_buf(),
        out: ParsedUnit::new(unit),
        typedefs: TypedefMap::new(),
    };
    for child in &ast.inner {
        ctx.top_level(child);
    }
    ctx.out
}

struct Adapter {
    unit: PathBuf,
    out: ParsedUnit,
    /// Typedefs seen so far in this unit; C guarantees declaration before
    /// use, so a single in-order pass suffices.
    typedefs: TypedefMap,
}

impl Adapter {
    fn top_level(&mut self, node: &Node<Clang>) {
        match &node.kind {
            Clang::TypedefDecl { name, qtype, .. } => {
                match parse_type(qtype.canonical(), &self.typedefs) {
                    Ok(underlying) => {
                        self.typedefs.insert(name.clone(), underlying.clone());
                        self.out.nodes.push(UnitNode::TypedefDeclaration {
                            name: name.clone(),
                            underlying,
                        });
                    }
                    Err(e) => self.skip(node, &format!("typedef {name}: {e}")),
                }
            }
            Clang::RecordDecl {
                name,
                tag_used,
                complete_definition,
                ..
            } => {
                let Some(tag) = name else {
                    debug!("ignoring anonymous record in {}", self.unit.display());
                    return;
                };
                let kind = match tag_used.as_deref() {
                    Some("union") => AggregateKind::Union,
                    _ => AggregateKind::Struct,
                };
                self.out.nodes.push(UnitNode::AggregateTypeDeclaration {
                    kind,
                    tag: tag.clone(),
                    complete: complete_definition.unwrap_or(false),
                });
            }
            Clang::EnumDecl { name, .. } => {
                let Some(tag) = name else {
                    debug!("ignoring anonymous enum in {}", self.unit.display());
                    return;
                };
                self.out.nodes.push(UnitNode::AggregateTypeDeclaration {
                    kind: AggregateKind::Enum,
                    tag: tag.clone(),
                    complete: true,
                });
            }
            Clang::FunctionDecl {
                name,
                storage_class,
                qtype,
                ..
            } => {
                let signature = match parse_signature(qtype.canonical(), &self.typedefs) {
                    Ok(signature) => signature,
                    Err(e) => {
                        self.skip(node, &format!("function {name}: {e}"));
                        return;
                    }
                };
                let storage_static = storage_class.as_deref() == Some("static");
                let location = self.location(node);
                let has_body = node
                    .inner
                    .iter()
                    .any(|child| matches!(child.kind, Clang::CompoundStmt { .. }));
                self.out.nodes.push(if has_body {
                    UnitNode::FunctionDefinition {
                        name: name.clone(),
                        signature,
                        storage_static,
                        location,
                    }
                } else {
                    UnitNode::FunctionDeclaration {
                        name: name.clone(),
                        signature,
                        storage_static,
                        location,
                    }
                });
                // Calls live in the body (and in parameter defaults never,
                // this being C), so only definitions need the walk.
                for child in &node.inner {
                    self.walk(child, false);
                }
            }
            Clang::Other { kind } => {
                if let Some(kind) = kind
                    && is_unsupported_kind(kind)
                {
                    self.skip(node, &format!("unsupported construct {kind}"));
                } else {
                    debug!("ignoring top-level {kind:?}");
                }
            }
            other => debug!("ignoring top-level node {other:?}"),
        }
    }

    /// Walks a function body collecting call expressions.
    /// `statement_position` is true when `node` is a direct child of a
    /// compound statement, i.e. its value is discarded.
    fn walk(&mut self, node: &Node<Clang>, statement_position: bool) {
        match &node.kind {
            Clang::CallExpr { .. } => {
                self.call_expr(node, statement_position);
                return;
            }
            Clang::CompoundStmt { .. } => {
                for child in &node.inner {
                    self.walk(child, true);
                }
                return;
            }
            Clang::Other { kind: Some(kind) } if is_unsupported_kind(kind) => {
                self.skip(node, &format!("unsupported construct {kind}"));
                return;
            }
            _ => {}
        }
        for child in &node.inner {
            self.walk(child, false);
        }
    }

    fn call_expr(&mut self, node: &Node<Clang>, statement_position: bool) {
        let Some(callee) = node.inner.first().and_then(callee_name) else {
            // An indirect call through a function pointer references no
            // external symbol.
            debug!("ignoring indirect call in {}", self.unit.display());
            self.walk_children_of_call(node);
            return;
        };
        let args: Vec<TypeRef> = node.inner[1..]
            .iter()
            .map(|arg| {
                arg.kind
                    .expr_type()
                    .and_then(|q| parse_type(q.canonical(), &self.typedefs).ok())
                    .unwrap_or_else(TypeRef::unknown)
            })
            .collect();
        let location = self.location(node);
        self.out.nodes.push(UnitNode::CallExpression {
            callee,
            args,
            result_used: !statement_position,
            location,
        });
        self.walk_children_of_call(node);
    }

    /// Continues into a call's arguments; nested calls are their own
    /// call sites and are always in value position.
    fn walk_children_of_call(&mut self, node: &Node<Clang>) {
        for child in &node.inner {
            self.walk(child, false);
        }
    }

    fn skip(&mut self, node: &Node<Clang>, message: &str) {
        self.out.skipped.push(
            Diagnostic::new(DiagnosticKind::UnsupportedConstruct, message.to_string())
                .at(self.location(node)),
        );
    }

    fn location(&self, node: &Node<Clang>) -> Location {
        match node.kind.loc().and_then(|l| l.spelling_loc.as_ref()) {
            Some(sl) => Location {
                file: PathBuf::from(sl.file.to_string()),
                line: Some(sl.line as u64),
                column: Some(sl.col as u64),
            },
            None => Location::new(self.unit.clone()),
        }
    }
}

/// Resolves a call's callee expression to a function name, looking through
/// the implicit function-to-pointer cast and any parentheses.
fn callee_name(node: &Node<Clang>) -> Option<String> {
    match &node.kind {
        Clang::DeclRefExpr {
            referenced_decl: Some(ReferencedDecl { name, kind }),
            ..
        } => {
            if kind.as_deref() == Some("FunctionDecl") {
                name.clone()
            } else {
                None
            }
        }
        Clang::ImplicitCastExpr { .. } | Clang::ParenExpr { .. } => {
            node.inner.first().and_then(callee_name)
        }
        _ => None,
    }
}

/// Node kinds the analysis refuses to model: C++ constructs and inline
/// assembly.
fn is_unsupported_kind(kind: &str) -> bool {
    kind.starts_with("CXX") || kind.ends_with("AsmStmt") || kind == "LinkageSpecDecl"
}
