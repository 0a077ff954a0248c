//! Renders the resolved symbol table into a compilable stub pair: a header
//! with one prototype per candidate and a source file with one trivially
//! returning definition per candidate.
//!
//! Output is deterministic: candidates are emitted in name order and the
//! same table always renders byte-identical text.

use std::collections::BTreeSet;
use std::fmt::Write;
use stubgen_core::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use stubgen_core::symbols::{SymbolTable, TypeRegistry};
use stubgen_core::types::{RecordKind, Signature, TypeKind, TypeRef};
use tracing::{debug, info};

/// The generated stub pair, ready to be written to `<basename>.h` and
/// `<basename>.c`.
pub struct RenderedStubs {
    pub header: String,
    pub source: String,
    /// How many stub definitions went into `source`.
    pub stubs: usize,
}

/// Renders stubs for every candidate in the table. Candidates whose
/// signature cannot be fully described in C get an [UnresolvedType]
/// diagnostic and are skipped one at a time; they never abort the render.
///
/// [UnresolvedType]: DiagnosticKind::UnresolvedType
pub fn render(table: &SymbolTable, basename: &str, sink: &mut DiagnosticSink) -> RenderedStubs {
    let registry = table.types();
    let mut emitted: Vec<(&str, &Signature)> = Vec::new();
    for name in table.names_sorted() {
        let symbol = table
            .symbol(name)
            .filter(|s| s.stub_candidate())
            .and_then(|s| s.signature.as_ref());
        let Some(signature) = symbol else { continue };
        match describable(signature, registry) {
            Ok(()) => emitted.push((name, signature)),
            Err(detail) => {
                sink.push(Diagnostic::for_symbol(
                    DiagnosticKind::UnresolvedType,
                    name,
                    detail,
                ));
            }
        }
    }
    debug!("rendering {} stubs under basename {basename}", emitted.len());

    info!("rendered {} stub definitions", emitted.len());
    RenderedStubs {
        header: render_header(&emitted, basename),
        source: render_source(&emitted, basename),
        stubs: emitted.len(),
    }
}

fn render_header(emitted: &[(&str, &Signature)], basename: &str) -> String {
    let guard = guard_name(basename);
    let mut out = String::new();
    let _ = writeln!(out, "#ifndef {guard}");
    let _ = writeln!(out, "#define {guard}");
    out.push('\n');

    let forwards = forward_declarations(emitted);
    if !forwards.is_empty() {
        for line in &forwards {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }

    for (name, signature) in emitted {
        let _ = writeln!(out, "{};", prototype(name, signature));
    }
    if !emitted.is_empty() {
        out.push('\n');
    }
    let _ = writeln!(out, "#endif /* {guard} */");
    out
}

fn render_source(emitted: &[(&str, &Signature)], basename: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#include \"{basename}.h\"");
    for (name, signature) in emitted {
        out.push('\n');
        let _ = writeln!(out, "{} {{", prototype(name, signature));
        for index in 0..signature.params.len() {
            let _ = writeln!(out, "    (void)p{index};");
        }
        for line in return_statement(&signature.ret) {
            let _ = writeln!(out, "    {line}");
        }
        out.push_str("}\n");
    }
    out
}

/// `ret name(type p0, type p1)`, with `void` for an empty parameter list.
fn prototype(name: &str, signature: &Signature) -> String {
    let params = if signature.params.is_empty() && !signature.variadic {
        "void".to_string()
    } else {
        let mut rendered: Vec<String> = signature
            .params
            .iter()
            .enumerate()
            .map(|(index, param)| param.render_named(&format!("p{index}")))
            .collect();
        if signature.variadic {
            rendered.push("...".to_string());
        }
        rendered.join(", ")
    };
    signature.ret.render_named(&format!("{name}({params})"))
}

/// The body's return, by return-type category. By-value aggregates need a
/// zero-initialized local since `{0}` is not an expression in C99.
fn return_statement(ret: &TypeRef) -> Vec<String> {
    match &ret.kind {
        TypeKind::Void => Vec::new(),
        TypeKind::Integer { .. } | TypeKind::Enum { .. } => vec!["return 0;".to_string()],
        // 0 is the null pointer constant.
        TypeKind::Pointer(_) | TypeKind::FunctionPointer(_) => vec!["return 0;".to_string()],
        TypeKind::Floating(_) => vec!["return 0.0;".to_string()],
        TypeKind::Record { .. } => vec![
            format!("{} = {{0}};", ret.render_named("result")),
            "return result;".to_string(),
        ],
        // Ruled out by describable().
        TypeKind::Array { .. } | TypeKind::Unknown => Vec::new(),
    }
}

/// Every struct/union tag the emitted prototypes reference through a
/// pointer, as sorted `struct foo;` lines. By-value uses are not forward
/// declarable and were vetted by [describable] instead.
fn forward_declarations(emitted: &[(&str, &Signature)]) -> Vec<String> {
    let mut tags = BTreeSet::new();
    for (_, signature) in emitted {
        collect_pointee_tags(&signature.ret, &mut tags);
        for param in &signature.params {
            collect_pointee_tags(param, &mut tags);
        }
    }
    tags.into_iter().collect()
}

fn collect_pointee_tags(ty: &TypeRef, tags: &mut BTreeSet<String>) {
    match &ty.kind {
        TypeKind::Pointer(pointee) => {
            if let TypeKind::Record { kind, tag } = &pointee.kind {
                let keyword = match kind {
                    RecordKind::Struct => "struct",
                    RecordKind::Union => "union",
                };
                tags.insert(format!("{keyword} {tag};"));
            }
            collect_pointee_tags(pointee, tags);
        }
        TypeKind::Array { element, .. } => collect_pointee_tags(element, tags),
        TypeKind::FunctionPointer(sig) => {
            collect_pointee_tags(&sig.ret, tags);
            for param in &sig.params {
                collect_pointee_tags(param, tags);
            }
        }
        _ => {}
    }
}

/// Whether a signature can be written out as compilable C given what the
/// corpus declares.
fn describable(signature: &Signature, registry: &TypeRegistry) -> Result<(), String> {
    value_type_ok(&signature.ret, registry)
        .map_err(|detail| format!("return type: {detail}"))?;
    for (index, param) in signature.params.iter().enumerate() {
        value_type_ok(param, registry)
            .map_err(|detail| format!("parameter {}: {detail}", index + 1))?;
    }
    Ok(())
}

/// Checks a type used by value (parameter or return position).
fn value_type_ok(ty: &TypeRef, registry: &TypeRegistry) -> Result<(), String> {
    if ty.contains_unknown() {
        return Err("could not be resolved".to_string());
    }
    match &ty.kind {
        TypeKind::Array { .. } => Err(format!("by-value array {}", ty.render())),
        TypeKind::Record { tag, .. } if !registry.has_complete_record(tag) => Err(format!(
            "{} passed by value without a complete definition",
            ty.render()
        )),
        TypeKind::Record { .. } => Ok(()),
        // Enum tags cannot be forward declared at all.
        TypeKind::Enum { tag } if !registry.knows_enum(tag) => {
            Err(format!("enum {tag} is never declared"))
        }
        TypeKind::Pointer(pointee) => pointee_type_ok(pointee, registry),
        TypeKind::FunctionPointer(sig) => {
            describable(sig, registry).map_err(|detail| format!("function pointer {detail}"))
        }
        _ => Ok(()),
    }
}

/// Checks a type referenced through a pointer. Records only need a forward
/// declaration here, which the header supplies.
fn pointee_type_ok(ty: &TypeRef, registry: &TypeRegistry) -> Result<(), String> {
    match &ty.kind {
        TypeKind::Record { .. } => Ok(()),
        TypeKind::Enum { tag } if !registry.knows_enum(tag) => {
            Err(format!("enum {tag} is never declared"))
        }
        TypeKind::Pointer(pointee) | TypeKind::Array { element: pointee, .. } => {
            pointee_type_ok(pointee, registry)
        }
        TypeKind::FunctionPointer(sig) => {
            describable(sig, registry).map_err(|detail| format!("function pointer {detail}"))
        }
        _ => Ok(()),
    }
}

fn guard_name(basename: &str) -> String {
    let mut guard: String = basename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    guard.push_str("_H");
    guard
}
