//! Semantic model of C types and function signatures.
//!
//! A [TypeRef] is the canonical description of a C type after typedef
//! expansion; two TypeRefs compare equal iff they are structurally identical.
//! Qualifiers are kept for rendering but ignored by equality and hashing, so
//! `const char *` and `char *` never produce a spurious signature conflict.


use serde::Deserialize;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Width of a C integer type, ordered by conversion rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntWidth {
    Bool,
    Char,
    Short,
    Int,
    Long,
    LongLong,
}

/// Width of a C floating-point type, ordered by conversion rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FloatWidth {
    Float,
    Double,
    LongDouble,
}

/// Whether an aggregate tag names a struct or a union.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Struct,
    Union,
}

/// The shape of a C type, without qualifiers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    Integer { width: IntWidth, signed: bool },
    Floating(FloatWidth),
    Pointer(Box<TypeRef>),
    Array { element: Box<TypeRef>, len: Option<u64> },
    Record { kind: RecordKind, tag: String },
    Enum { tag: String },
    FunctionPointer(Box<Signature>),
    /// An argument whose type could not be resolved locally. Participates in
    /// inference as a bottom element; never rendered into output.
    Unknown,
}

/// A canonical C type. See the module docs for the equality contract.
#[derive(Clone, Debug)]
pub struct TypeRef {
    pub is_const: bool,
    pub kind: TypeKind,
}

// Equality and hashing deliberately skip `is_const`.
impl PartialEq for TypeRef {
    fn eq(&self, other: &TypeRef) -> bool {
        self.kind == other.kind
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
    }
}

impl TypeRef {
    pub fn new(kind: TypeKind) -> TypeRef {
        TypeRef {
            is_const: false,
            kind,
        }
    }

    /// The same type with a `const` qualifier. Only affects rendering.
    pub fn into_const(mut self) -> TypeRef {
        self.is_const = true;
        self
    }

    /// Merges the qualifiers of a structurally equal `other` into this
    /// type: `const` survives if either side has it, at every level. Folds
    /// that meet the same type with different spellings stay independent of
    /// the order the operands arrive in.
    pub fn union_const(&self, other: &TypeRef) -> TypeRef {
        let kind = match (&self.kind, &other.kind) {
            (TypeKind::Pointer(a), TypeKind::Pointer(b)) => {
                TypeKind::Pointer(Box::new(a.union_const(b)))
            }
            (TypeKind::Array { element: a, len }, TypeKind::Array { element: b, .. }) => {
                TypeKind::Array {
                    element: Box::new(a.union_const(b)),
                    len: *len,
                }
            }
            (TypeKind::FunctionPointer(a), TypeKind::FunctionPointer(b)) => {
                TypeKind::FunctionPointer(Box::new(a.union_const(b)))
            }
            _ => self.kind.clone(),
        };
        TypeRef {
            is_const: self.is_const || other.is_const,
            kind,
        }
    }

    pub fn void() -> TypeRef {
        TypeRef::new(TypeKind::Void)
    }

    pub fn integer(width: IntWidth, signed: bool) -> TypeRef {
        TypeRef::new(TypeKind::Integer { width, signed })
    }

    pub fn int() -> TypeRef {
        TypeRef::integer(IntWidth::Int, true)
    }

    pub fn uint() -> TypeRef {
        TypeRef::integer(IntWidth::Int, false)
    }

    pub fn long() -> TypeRef {
        TypeRef::integer(IntWidth::Long, true)
    }

    pub fn char() -> TypeRef {
        TypeRef::integer(IntWidth::Char, true)
    }

    pub fn floating(width: FloatWidth) -> TypeRef {
        TypeRef::new(TypeKind::Floating(width))
    }

    pub fn double() -> TypeRef {
        TypeRef::floating(FloatWidth::Double)
    }

    pub fn pointer(pointee: TypeRef) -> TypeRef {
        TypeRef::new(TypeKind::Pointer(Box::new(pointee)))
    }

    pub fn array(element: TypeRef, len: Option<u64>) -> TypeRef {
        TypeRef::new(TypeKind::Array {
            element: Box::new(element),
            len,
        })
    }

    pub fn record(kind: RecordKind, tag: &str) -> TypeRef {
        TypeRef::new(TypeKind::Record {
            kind,
            tag: tag.to_string(),
        })
    }

    pub fn enumeration(tag: &str) -> TypeRef {
        TypeRef::new(TypeKind::Enum {
            tag: tag.to_string(),
        })
    }

    pub fn function_pointer(signature: Signature) -> TypeRef {
        TypeRef::new(TypeKind::FunctionPointer(Box::new(signature)))
    }

    pub fn unknown() -> TypeRef {
        TypeRef::new(TypeKind::Unknown)
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Void)
    }

    /// True if this type or any type it contains is [TypeKind::Unknown].
    pub fn contains_unknown(&self) -> bool {
        match &self.kind {
            TypeKind::Unknown => true,
            TypeKind::Pointer(pointee) => pointee.contains_unknown(),
            TypeKind::Array { element, .. } => element.contains_unknown(),
            TypeKind::FunctionPointer(sig) => {
                sig.ret.contains_unknown() || sig.params.iter().any(TypeRef::contains_unknown)
            }
            _ => false,
        }
    }

    /// Renders this type as a C declaration of `name`, e.g.
    /// `render_named("p0")` on pointer-to-function-returning-int yields
    /// `int (*p0)(void)`. An empty name renders the abstract type.
    pub fn render_named(&self, name: &str) -> String {
        self.declarator(name)
    }

    /// Renders the abstract type, e.g. `const char *`.
    pub fn render(&self) -> String {
        self.declarator("").trim_end().to_string()
    }

    fn declarator(&self, inner: &str) -> String {
        match &self.kind {
            TypeKind::Pointer(pointee) => {
                let star = if self.is_const {
                    format!("*const {inner}")
                } else {
                    format!("*{inner}")
                };
                pointee.declarator(&star)
            }
            TypeKind::Array { element, len } => {
                // A pointer declarator binds looser than [], so parenthesize.
                let inner = if inner.starts_with('*') {
                    format!("({inner})")
                } else {
                    inner.to_string()
                };
                let dims = match len {
                    Some(n) => format!("{inner}[{n}]"),
                    None => format!("{inner}[]"),
                };
                element.declarator(&dims)
            }
            TypeKind::FunctionPointer(sig) => {
                let params = sig.render_params();
                sig.ret.declarator(&format!("(*{inner})({params})"))
            }
            _ => {
                let spelled = self.base_spelling();
                if inner.is_empty() {
                    spelled
                } else {
                    format!("{spelled} {inner}")
                }
            }
        }
    }

    fn base_spelling(&self) -> String {
        let prefix = if self.is_const { "const " } else { "" };
        let base = match &self.kind {
            TypeKind::Void => "void".to_string(),
            TypeKind::Integer { width, signed } => {
                let name = match width {
                    IntWidth::Bool => return format!("{prefix}_Bool"),
                    IntWidth::Char => "char",
                    IntWidth::Short => "short",
                    IntWidth::Int => "int",
                    IntWidth::Long => "long",
                    IntWidth::LongLong => "long long",
                };
                if *signed {
                    name.to_string()
                } else {
                    format!("unsigned {name}")
                }
            }
            TypeKind::Floating(width) => match width {
                FloatWidth::Float => "float".to_string(),
                FloatWidth::Double => "double".to_string(),
                FloatWidth::LongDouble => "long double".to_string(),
            },
            TypeKind::Record { kind, tag } => match kind {
                RecordKind::Struct => format!("struct {tag}"),
                RecordKind::Union => format!("union {tag}"),
            },
            TypeKind::Enum { tag } => format!("enum {tag}"),
            TypeKind::Unknown => "<unknown>".to_string(),
            // Handled in declarator().
            TypeKind::Pointer(_) | TypeKind::Array { .. } | TypeKind::FunctionPointer(_) => {
                unreachable!("compound kinds render via declarator")
            }
        };
        format!("{prefix}{base}")
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// A function signature. Parameter names are not part of the model and play
/// no role in equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    pub params: Vec<TypeRef>,
    pub ret: TypeRef,
    pub variadic: bool,
}

impl Signature {
    pub fn new(params: Vec<TypeRef>, ret: TypeRef) -> Signature {
        Signature {
            params,
            ret,
            variadic: false,
        }
    }

    pub fn variadic(params: Vec<TypeRef>, ret: TypeRef) -> Signature {
        Signature {
            params,
            ret,
            variadic: true,
        }
    }

    /// Pairwise [TypeRef::union_const] over two structurally equal
    /// signatures.
    pub fn union_const(&self, other: &Signature) -> Signature {
        Signature {
            params: self
                .params
                .iter()
                .zip(&other.params)
                .map(|(a, b)| a.union_const(b))
                .collect(),
            ret: self.ret.union_const(&other.ret),
            variadic: self.variadic,
        }
    }

    /// Renders the parameter list without names, `void` for an empty one.
    pub fn render_params(&self) -> String {
        if self.params.is_empty() && !self.variadic {
            return "void".to_string();
        }
        let mut rendered: Vec<String> = self.params.iter().map(TypeRef::render).collect();
        if self.variadic {
            rendered.push("...".to_string());
        }
        rendered.join(", ")
    }
}

// Display writes the abstract function type, e.g. `int (int, char *, ...)`.
impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.ret.render(), self.render_params())
    }
}

/// How to unify two same-rank integer types that disagree in signedness when
/// inferring a parameter type from call sites.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WideningPolicy {
    /// Take the signed type.
    #[default]
    PreferSigned,
    /// Take the unsigned type.
    PreferUnsigned,
    /// Refuse to choose; the symbol becomes Conflicting.
    Conflict,
}

/// Computes the widest type compatible with both `a` and `b`, or `None` if
/// the two are irreconcilable. Commutative and associative (up to the
/// policy's tie-break), so call-site folds are order-independent.
pub fn widen(a: &TypeRef, b: &TypeRef, policy: WideningPolicy) -> Option<TypeRef> {
    // Arrays decay to pointers at call sites.
    let a = decayed(a);
    let b = decayed(b);
    if a == b {
        // Equality ignores qualifiers, so union them; otherwise the fold
        // would keep whichever spelling arrived first.
        return Some(a.union_const(&b));
    }
    match (&a.kind, &b.kind) {
        (TypeKind::Unknown, _) => Some(b),
        (_, TypeKind::Unknown) => Some(a),
        (
            TypeKind::Integer {
                width: wa,
                signed: _,
            },
            TypeKind::Integer {
                width: wb,
                signed: _,
            },
        ) => match wa.cmp(wb) {
            std::cmp::Ordering::Less => Some(b),
            std::cmp::Ordering::Greater => Some(a),
            // Same rank, so the two must disagree in signedness (structurally
            // equal types were handled above).
            std::cmp::Ordering::Equal => match policy {
                WideningPolicy::PreferSigned => Some(TypeRef::integer(*wa, true)),
                WideningPolicy::PreferUnsigned => Some(TypeRef::integer(*wa, false)),
                WideningPolicy::Conflict => None,
            },
        },
        (TypeKind::Floating(wa), TypeKind::Floating(wb)) => {
            Some(TypeRef::floating(std::cmp::max(*wa, *wb)))
        }
        // Enums unify with integers (and with differently-tagged enums) at
        // their underlying int rank.
        (TypeKind::Enum { .. }, TypeKind::Integer { .. }) => widen(&TypeRef::int(), &b, policy),
        (TypeKind::Integer { .. }, TypeKind::Enum { .. }) => widen(&a, &TypeRef::int(), policy),
        (TypeKind::Enum { .. }, TypeKind::Enum { .. }) => Some(TypeRef::int()),
        (TypeKind::Pointer(pa), TypeKind::Pointer(pb)) => {
            // `void *` is compatible with any object pointer.
            if pa.is_void() {
                Some(b)
            } else if pb.is_void() {
                Some(a)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn decayed(ty: &TypeRef) -> TypeRef {
    match &ty.kind {
        TypeKind::Array { element, .. } => TypeRef::pointer((**element).clone()),
        _ => ty.clone(),
    }
}
