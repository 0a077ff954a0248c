use super::*;
use crate::types::TypeRef;

fn loc(file: &str, line: u64) -> Location {
    Location::with_line(file, line)
}

fn decl(sig: Signature, file: &str, line: u64) -> Declaration {
    Declaration {
        signature: sig,
        location: loc(file, line),
    }
}

fn call(args: Vec<TypeRef>, file: &str, line: u64) -> CallSite {
    CallSite {
        location: loc(file, line),
        args,
        result_used: true,
    }
}

fn int_sig() -> Signature {
    Signature::new(vec![TypeRef::int()], TypeRef::int())
}

fn long_sig() -> Signature {
    Signature::new(vec![TypeRef::long()], TypeRef::int())
}

#[test]
fn call_then_declaration_upgrades_origin() {
    let mut table = SymbolTable::new();
    table.merge_unit(UnitFindings {
        calls: vec![("foo".into(), call(vec![TypeRef::int()], "a.c", 10))],
        ..Default::default()
    });
    assert_eq!(table.symbol("foo").unwrap().origin, Origin::InferredFromCall);

    table.merge_unit(UnitFindings {
        declarations: vec![("foo".into(), decl(int_sig(), "b.h", 3))],
        ..Default::default()
    });
    let foo = table.symbol("foo").unwrap();
    assert_eq!(foo.origin, Origin::DeclaredExplicit);
    assert_eq!(foo.call_sites.len(), 1);
}

#[test]
fn identical_declarations_do_not_conflict() {
    let mut table = SymbolTable::new();
    table.merge_unit(UnitFindings {
        declarations: vec![("bar".into(), decl(int_sig(), "a.c", 1))],
        ..Default::default()
    });
    table.merge_unit(UnitFindings {
        declarations: vec![("bar".into(), decl(int_sig(), "b.c", 2))],
        ..Default::default()
    });
    let bar = table.symbol("bar").unwrap();
    assert_eq!(bar.origin, Origin::DeclaredExplicit);
    assert_eq!(bar.declarations.len(), 1);
}

#[test]
fn distinct_declarations_conflict_and_stick() {
    let mut table = SymbolTable::new();
    table.merge_unit(UnitFindings {
        declarations: vec![("baz".into(), decl(int_sig(), "a.c", 1))],
        ..Default::default()
    });
    table.merge_unit(UnitFindings {
        declarations: vec![("baz".into(), decl(long_sig(), "b.c", 2))],
        ..Default::default()
    });
    assert_eq!(table.symbol("baz").unwrap().origin, Origin::Conflicting);
    assert_eq!(table.symbol("baz").unwrap().declarations.len(), 2);

    // A third declaration matching the first does not un-conflict it.
    table.merge_unit(UnitFindings {
        declarations: vec![("baz".into(), decl(int_sig(), "c.c", 3))],
        ..Default::default()
    });
    assert_eq!(table.symbol("baz").unwrap().origin, Origin::Conflicting);
}

#[test]
fn defined_symbols_are_never_candidates() {
    let mut table = SymbolTable::new();
    table.merge_unit(UnitFindings {
        definitions: vec![("qux".into(), loc("a.c", 5))],
        declarations: vec![("qux".into(), decl(int_sig(), "a.c", 5))],
        calls: vec![("qux".into(), call(vec![], "a.c", 20))],
        ..Default::default()
    });
    let qux = table.symbol("qux").unwrap();
    assert!(qux.defined);
    assert!(!qux.stub_candidate());
}

#[test]
fn candidate_requires_a_call() {
    let mut table = SymbolTable::new();
    table.merge_unit(UnitFindings {
        declarations: vec![("unused".into(), decl(int_sig(), "a.h", 1))],
        ..Default::default()
    });
    assert!(!table.symbol("unused").unwrap().stub_candidate());
}

#[test]
fn merge_is_commutative() {
    let unit_a = UnitFindings {
        definitions: vec![("local".into(), loc("a.c", 1))],
        declarations: vec![
            ("foo".into(), decl(int_sig(), "a.c", 2)),
            ("baz".into(), decl(int_sig(), "a.c", 3)),
        ],
        calls: vec![
            ("foo".into(), call(vec![TypeRef::int()], "a.c", 10)),
            ("frob".into(), call(vec![], "a.c", 11)),
        ],
        aggregates: vec![(AggregateKind::Struct, "cfg".into(), false)],
    };
    let unit_b = UnitFindings {
        declarations: vec![("baz".into(), decl(long_sig(), "b.c", 4))],
        calls: vec![("foo".into(), call(vec![TypeRef::long()], "b.c", 12))],
        aggregates: vec![(AggregateKind::Struct, "cfg".into(), true)],
        ..Default::default()
    };

    let mut forward = SymbolTable::new();
    forward.merge_unit(unit_a.clone());
    forward.merge_unit(unit_b.clone());
    let mut backward = SymbolTable::new();
    backward.merge_unit(unit_b);
    backward.merge_unit(unit_a);

    assert_eq!(forward.names_sorted(), backward.names_sorted());
    for name in forward.names_sorted() {
        let f = forward.symbol(name).unwrap();
        let b = backward.symbol(name).unwrap();
        assert_eq!(f.origin, b.origin, "origin differs for {name}");
        assert_eq!(f.defined, b.defined, "defined differs for {name}");
        assert_eq!(
            f.call_sites.len(),
            b.call_sites.len(),
            "call sites differ for {name}"
        );
        let mut f_decls: Vec<String> =
            f.declarations.iter().map(|d| d.signature.to_string()).collect();
        let mut b_decls: Vec<String> =
            b.declarations.iter().map(|d| d.signature.to_string()).collect();
        f_decls.sort();
        b_decls.sort();
        assert_eq!(f_decls, b_decls, "declarations differ for {name}");
    }
    assert!(forward.types().has_complete_record("cfg"));
    assert!(backward.types().has_complete_record("cfg"));
}

#[test]
fn equivalent_declarations_merge_order_independently() {
    // Equality ignores qualifiers, so these two prototypes dedup to one
    // entry. The kept spelling and location must not depend on which unit
    // merged first.
    let qualified = Signature::new(
        vec![TypeRef::pointer(TypeRef::char().into_const())],
        TypeRef::void(),
    );
    let plain = Signature::new(vec![TypeRef::pointer(TypeRef::char())], TypeRef::void());
    let unit_a = UnitFindings {
        declarations: vec![("write_log".into(), decl(qualified, "a.h", 4))],
        ..Default::default()
    };
    let unit_b = UnitFindings {
        declarations: vec![("write_log".into(), decl(plain, "b.h", 9))],
        ..Default::default()
    };

    let mut forward = SymbolTable::new();
    forward.merge_unit(unit_a.clone());
    forward.merge_unit(unit_b.clone());
    let mut backward = SymbolTable::new();
    backward.merge_unit(unit_b);
    backward.merge_unit(unit_a);

    for table in [&forward, &backward] {
        let symbol = table.symbol("write_log").unwrap();
        assert_eq!(symbol.origin, Origin::DeclaredExplicit);
        assert_eq!(symbol.declarations.len(), 1);
        assert_eq!(
            symbol.declarations[0].signature.to_string(),
            "void (const char *)"
        );
        assert_eq!(symbol.declarations[0].location, loc("a.h", 4));
    }
}

#[test]
fn type_registry_tracks_completeness() {
    let mut registry = TypeRegistry::default();
    registry.record_aggregate(AggregateKind::Struct, "timer", false);
    assert!(!registry.has_complete_record("timer"));
    registry.record_aggregate(AggregateKind::Struct, "timer", true);
    assert!(registry.has_complete_record("timer"));
    // A later forward declaration does not lose completeness.
    registry.record_aggregate(AggregateKind::Struct, "timer", false);
    assert!(registry.has_complete_record("timer"));

    registry.record_aggregate(AggregateKind::Enum, "state", true);
    assert!(registry.knows_enum("state"));
    assert!(!registry.knows_enum("mode"));
}
