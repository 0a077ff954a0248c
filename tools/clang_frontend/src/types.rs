//! Parses clang's canonical C type spellings (`const char *`,
//! `int (*)(int, ...)`, `struct timer_cfg [4]`) into the semantic model.
//!
//! Spellings are expected to be desugared (typedefs expanded by clang); a
//! typedef map covers the cases where clang only provides the sugared
//! spelling. Anything the grammar below cannot express — anonymous
//! aggregates, blocks, vector extensions — is a [TypeParseError], which the
//! adapter turns into a skipped node or an unknown argument type.

use std::collections::HashMap;
use stubgen_core::types::{FloatWidth, IntWidth, RecordKind, Signature, TypeKind, TypeRef};
use thiserror::Error;

/// A spelling the parser cannot model.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot model C type `{spelling}`: {detail}")]
pub struct TypeParseError {
    pub spelling: String,
    pub detail: String,
}

/// Typedef name -> already-canonicalized underlying type.
pub type TypedefMap = HashMap<String, TypeRef>;

/// Parses a (possibly qualified) C type spelling.
pub fn parse_type(spelling: &str, typedefs: &TypedefMap) -> Result<TypeRef, TypeParseError> {
    let mut parser = Parser::new(spelling, typedefs)?;
    let ty = parser.parse_full_type()?;
    parser.expect_end()?;
    Ok(ty)
}

/// Parses a function type spelling (a FunctionDecl's `qualType`, e.g.
/// `void (int, char *)`) into a [Signature].
pub fn parse_signature(spelling: &str, typedefs: &TypedefMap) -> Result<Signature, TypeParseError> {
    let mut parser = Parser::new(spelling, typedefs)?;
    let base = parser.parse_specifiers()?;
    let declarator = parser.parse_declarator()?;
    parser.expect_end()?;
    match apply(&declarator, Applied::Ty(base), &mut |detail| {
        parser.error(detail)
    })? {
        Applied::Func(signature) => Ok(signature),
        Applied::Ty(_) => Err(parser.error("not a function type")),
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Number(u64),
    Star,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Ellipsis,
}

/// An abstract declarator. `Pointer` binds looser than the suffix forms,
/// matching C's declarator precedence.
enum Declarator {
    Empty,
    Pointer {
        is_const: bool,
        inner: Box<Declarator>,
    },
    Group(Box<Declarator>),
    ArraySuffix {
        inner: Box<Declarator>,
        len: Option<u64>,
    },
    FuncSuffix {
        inner: Box<Declarator>,
        params: Vec<TypeRef>,
        variadic: bool,
    },
}

/// Intermediate result while folding a declarator onto a base type. A bare
/// function type only exists mid-fold; at the surface it either becomes a
/// [Signature] (for function declarations) or decays to a function pointer.
enum Applied {
    Ty(TypeRef),
    Func(Signature),
}

fn apply(
    declarator: &Declarator,
    applied: Applied,
    error: &mut dyn FnMut(&str) -> TypeParseError,
) -> Result<Applied, TypeParseError> {
    match declarator {
        Declarator::Empty => Ok(applied),
        Declarator::Group(inner) => apply(inner, applied, error),
        Declarator::Pointer { is_const, inner } => {
            let pointed = match applied {
                Applied::Ty(ty) => {
                    let mut ptr = TypeRef::pointer(ty);
                    ptr.is_const = *is_const;
                    ptr
                }
                Applied::Func(signature) => TypeRef::function_pointer(signature),
            };
            apply(inner, Applied::Ty(pointed), error)
        }
        Declarator::ArraySuffix { inner, len } => match applied {
            Applied::Ty(ty) => apply(inner, Applied::Ty(TypeRef::array(ty, *len)), error),
            Applied::Func(_) => Err(error("array of functions")),
        },
        Declarator::FuncSuffix {
            inner,
            params,
            variadic,
        } => match applied {
            Applied::Ty(ret) => apply(
                inner,
                Applied::Func(Signature {
                    params: params.clone(),
                    ret,
                    variadic: *variadic,
                }),
                error,
            ),
            Applied::Func(_) => Err(error("function returning a function")),
        },
    }
}

struct Parser<'a> {
    spelling: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    typedefs: &'a TypedefMap,
}

impl<'a> Parser<'a> {
    fn new(spelling: &'a str, typedefs: &'a TypedefMap) -> Result<Parser<'a>, TypeParseError> {
        let tokens = tokenize(spelling)
            .map_err(|detail| TypeParseError {
                spelling: spelling.to_string(),
                detail,
            })?;
        Ok(Parser {
            spelling,
            tokens,
            pos: 0,
            typedefs,
        })
    }

    fn error(&self, detail: &str) -> TypeParseError {
        TypeParseError {
            spelling: self.spelling.to_string(),
            detail: detail.to_string(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), TypeParseError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {what}")))
        }
    }

    fn expect_end(&self) -> Result<(), TypeParseError> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(self.error("trailing tokens"))
        }
    }

    /// Parses a complete type: specifiers plus an abstract declarator. A
    /// bare function type decays to a function pointer.
    fn parse_full_type(&mut self) -> Result<TypeRef, TypeParseError> {
        let base = self.parse_specifiers()?;
        let declarator = self.parse_declarator()?;
        let spelling = self.spelling.to_string();
        match apply(&declarator, Applied::Ty(base), &mut |detail| TypeParseError {
            spelling: spelling.clone(),
            detail: detail.to_string(),
        })? {
            Applied::Ty(ty) => Ok(ty),
            Applied::Func(signature) => Ok(TypeRef::function_pointer(signature)),
        }
    }

    /// Parses qualifiers and the base type. Consumes trailing qualifiers
    /// (`char const`) as well as leading ones.
    fn parse_specifiers(&mut self) -> Result<TypeRef, TypeParseError> {
        let mut is_const = self.skip_qualifiers();
        let mut ty = self.parse_base()?;
        is_const |= self.skip_qualifiers();
        ty.is_const = is_const;
        Ok(ty)
    }

    /// Consumes qualifier keywords; returns whether `const` was among them.
    /// `volatile` and `restrict` are irrelevant to stub generation and are
    /// dropped.
    fn skip_qualifiers(&mut self) -> bool {
        let mut saw_const = false;
        while let Some(Token::Ident(word)) = self.peek() {
            match word.as_str() {
                "const" => saw_const = true,
                "volatile" | "restrict" | "__restrict" | "__restrict__" => {}
                _ => break,
            }
            self.pos += 1;
        }
        saw_const
    }

    fn parse_base(&mut self) -> Result<TypeRef, TypeParseError> {
        let Some(Token::Ident(word)) = self.bump() else {
            return Err(self.error("expected a type name"));
        };
        match word.as_str() {
            "void" => Ok(TypeRef::void()),
            "_Bool" => Ok(TypeRef::integer(IntWidth::Bool, false)),
            "float" => Ok(TypeRef::floating(FloatWidth::Float)),
            "struct" | "union" | "enum" => {
                let Some(Token::Ident(tag)) = self.bump() else {
                    return Err(self.error("anonymous aggregate"));
                };
                Ok(match word.as_str() {
                    "struct" => TypeRef::record(RecordKind::Struct, &tag),
                    "union" => TypeRef::record(RecordKind::Union, &tag),
                    _ => TypeRef::enumeration(&tag),
                })
            }
            "signed" | "unsigned" | "char" | "short" | "int" | "long" | "double" => {
                self.parse_integerish(&word)
            }
            other => match self.typedefs.get(other) {
                Some(underlying) => Ok(underlying.clone()),
                None => Err(self.error(&format!("unknown type name `{other}`"))),
            },
        }
    }

    /// Parses multi-word arithmetic types: `unsigned long long int`,
    /// `long double`, `signed char`, and friends.
    fn parse_integerish(&mut self, first: &str) -> Result<TypeRef, TypeParseError> {
        let mut signed: Option<bool> = None;
        let mut longs = 0u32;
        let mut base: Option<&str> = None;
        let mut next = Some(first.to_string());
        while let Some(word) = next {
            match word.as_str() {
                "signed" => signed = Some(true),
                "unsigned" => signed = Some(false),
                "long" => longs += 1,
                "char" | "short" | "int" | "double" => {
                    if base.is_some() {
                        return Err(self.error("conflicting type specifiers"));
                    }
                    base = Some(match word.as_str() {
                        "char" => "char",
                        "short" => "short",
                        "int" => "int",
                        _ => "double",
                    });
                }
                _ => return Err(self.error("unexpected word in arithmetic type")),
            }
            let more = matches!(
                self.peek(),
                Some(Token::Ident(w)) if matches!(
                    w.as_str(),
                    "signed" | "unsigned" | "char" | "short" | "int" | "long" | "double"
                )
            );
            next = if more {
                match self.bump() {
                    Some(Token::Ident(w)) => Some(w),
                    _ => None,
                }
            } else {
                None
            };
        }
        if base == Some("double") {
            if signed.is_some() {
                return Err(self.error("signed double"));
            }
            return Ok(TypeRef::floating(if longs > 0 {
                FloatWidth::LongDouble
            } else {
                FloatWidth::Double
            }));
        }
        let signed = signed.unwrap_or(true);
        let width = match (base, longs) {
            (Some("char"), 0) => IntWidth::Char,
            (Some("short"), 0) => IntWidth::Short,
            (Some("int") | None, 0) => IntWidth::Int,
            (Some("int") | None, 1) => IntWidth::Long,
            (Some("int") | None, 2) => IntWidth::LongLong,
            _ => return Err(self.error("conflicting type specifiers")),
        };
        Ok(TypeRef::integer(width, signed))
    }

    fn parse_declarator(&mut self) -> Result<Declarator, TypeParseError> {
        if self.eat(&Token::Star) {
            let is_const = self.skip_qualifiers();
            let inner = self.parse_declarator()?;
            return Ok(Declarator::Pointer {
                is_const,
                inner: Box::new(inner),
            });
        }
        // A parenthesized group is a nested declarator only if it starts
        // with one; otherwise the parenthesis opens a parameter list.
        let mut declarator = if self.peek() == Some(&Token::LParen)
            && matches!(self.peek_at(1), Some(Token::Star) | Some(Token::LParen))
        {
            self.bump();
            let inner = self.parse_declarator()?;
            self.expect(Token::RParen, "`)`")?;
            Declarator::Group(Box::new(inner))
        } else {
            Declarator::Empty
        };
        loop {
            if self.eat(&Token::LParen) {
                let (params, variadic) = self.parse_params()?;
                declarator = Declarator::FuncSuffix {
                    inner: Box::new(declarator),
                    params,
                    variadic,
                };
            } else if self.eat(&Token::LBracket) {
                let len = match self.peek() {
                    Some(Token::Number(n)) => {
                        let n = *n;
                        self.bump();
                        Some(n)
                    }
                    _ => None,
                };
                self.expect(Token::RBracket, "`]`")?;
                // Successive dimensions wrap the previous declarator, which
                // applies them base-outward; `int [2][3]` therefore ends up
                // as array-of-2 of array-of-3.
                declarator = Declarator::ArraySuffix {
                    inner: Box::new(declarator),
                    len,
                };
            } else {
                return Ok(declarator);
            }
        }
    }

    /// Parses a parameter list after the opening parenthesis has been
    /// consumed. Returns the parameter types and the variadic flag.
    fn parse_params(&mut self) -> Result<(Vec<TypeRef>, bool), TypeParseError> {
        if self.eat(&Token::RParen) {
            return Ok((Vec::new(), false));
        }
        // `(void)` means no parameters.
        if self.peek() == Some(&Token::Ident("void".to_string()))
            && self.peek_at(1) == Some(&Token::RParen)
        {
            self.pos += 2;
            return Ok((Vec::new(), false));
        }
        let mut params = Vec::new();
        let mut variadic = false;
        loop {
            if self.eat(&Token::Ellipsis) {
                variadic = true;
                self.expect(Token::RParen, "`)` after `...`")?;
                break;
            }
            params.push(self.parse_full_type()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(Token::RParen, "`)`")?;
            break;
        }
        Ok((params, variadic))
    }
}

fn tokenize(spelling: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = spelling.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '.' => {
                let rest = &spelling[start..];
                if rest.starts_with("...") {
                    chars.next();
                    chars.next();
                    chars.next();
                    tokens.push(Token::Ellipsis);
                } else {
                    return Err("stray `.`".to_string());
                }
            }
            c if c.is_ascii_digit() => {
                let mut end = start;
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_ascii_digit() {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let number = spelling[start..end]
                    .parse::<u64>()
                    .map_err(|e| e.to_string())?;
                tokens.push(Token::Number(number));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = start;
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(spelling[start..end].to_string()));
            }
            other => return Err(format!("unexpected character `{other}`")),
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none() -> TypedefMap {
        TypedefMap::new()
    }

    #[test]
    fn base_types() {
        assert_eq!(parse_type("int", &none()), Ok(TypeRef::int()));
        assert_eq!(parse_type("unsigned int", &none()), Ok(TypeRef::uint()));
        assert_eq!(parse_type("unsigned", &none()), Ok(TypeRef::uint()));
        assert_eq!(
            parse_type("unsigned long long", &none()),
            Ok(TypeRef::integer(IntWidth::LongLong, false))
        );
        assert_eq!(
            parse_type("long int", &none()),
            Ok(TypeRef::integer(IntWidth::Long, true))
        );
        assert_eq!(
            parse_type("signed char", &none()),
            Ok(TypeRef::integer(IntWidth::Char, true))
        );
        assert_eq!(
            parse_type("_Bool", &none()),
            Ok(TypeRef::integer(IntWidth::Bool, false))
        );
        assert_eq!(
            parse_type("long double", &none()),
            Ok(TypeRef::floating(FloatWidth::LongDouble))
        );
        assert_eq!(parse_type("void", &none()), Ok(TypeRef::void()));
    }

    #[test]
    fn tagged_types() {
        assert_eq!(
            parse_type("struct timer_cfg", &none()),
            Ok(TypeRef::record(RecordKind::Struct, "timer_cfg"))
        );
        assert_eq!(
            parse_type("union blob *", &none()),
            Ok(TypeRef::pointer(TypeRef::record(RecordKind::Union, "blob")))
        );
        assert_eq!(
            parse_type("enum state", &none()),
            Ok(TypeRef::enumeration("state"))
        );
    }

    #[test]
    fn pointers_and_qualifiers() {
        assert_eq!(
            parse_type("char *", &none()),
            Ok(TypeRef::pointer(TypeRef::char()))
        );
        let parsed = parse_type("const char *", &none()).unwrap();
        assert_eq!(parsed, TypeRef::pointer(TypeRef::char()));
        match &parsed.kind {
            TypeKind::Pointer(pointee) => assert!(pointee.is_const),
            other => panic!("expected pointer, got {other:?}"),
        }
        // `char const *` spells the same type.
        assert_eq!(parse_type("char const *", &none()), Ok(parsed));
        assert_eq!(
            parse_type("void **", &none()),
            Ok(TypeRef::pointer(TypeRef::pointer(TypeRef::void())))
        );
        assert_eq!(
            parse_type("char *restrict", &none()),
            Ok(TypeRef::pointer(TypeRef::char()))
        );
    }

    #[test]
    fn arrays() {
        assert_eq!(
            parse_type("int [8]", &none()),
            Ok(TypeRef::array(TypeRef::int(), Some(8)))
        );
        assert_eq!(
            parse_type("char []", &none()),
            Ok(TypeRef::array(TypeRef::char(), None))
        );
        // Leftmost dimension is outermost.
        assert_eq!(
            parse_type("int [2][3]", &none()),
            Ok(TypeRef::array(TypeRef::array(TypeRef::int(), Some(3)), Some(2)))
        );
        // Array of pointers vs pointer to array.
        assert_eq!(
            parse_type("int *[4]", &none()),
            Ok(TypeRef::array(TypeRef::pointer(TypeRef::int()), Some(4)))
        );
        assert_eq!(
            parse_type("int (*)[4]", &none()),
            Ok(TypeRef::pointer(TypeRef::array(TypeRef::int(), Some(4))))
        );
    }

    #[test]
    fn function_pointers() {
        assert_eq!(
            parse_type("void (*)(int, char *)", &none()),
            Ok(TypeRef::function_pointer(Signature::new(
                vec![TypeRef::int(), TypeRef::pointer(TypeRef::char())],
                TypeRef::void()
            )))
        );
        assert_eq!(
            parse_type("int (*)(void)", &none()),
            Ok(TypeRef::function_pointer(Signature::new(
                vec![],
                TypeRef::int()
            )))
        );
        assert_eq!(
            parse_type("int (*)(const char *, ...)", &none()),
            Ok(TypeRef::function_pointer(Signature::variadic(
                vec![TypeRef::pointer(TypeRef::char().into_const())],
                TypeRef::int()
            )))
        );
    }

    #[test]
    fn signatures() {
        assert_eq!(
            parse_signature("void (int, char *)", &none()),
            Ok(Signature::new(
                vec![TypeRef::int(), TypeRef::pointer(TypeRef::char())],
                TypeRef::void()
            ))
        );
        assert_eq!(
            parse_signature("int (void)", &none()),
            Ok(Signature::new(vec![], TypeRef::int()))
        );
        assert_eq!(
            parse_signature("int (const char *, ...)", &none()),
            Ok(Signature::variadic(
                vec![TypeRef::pointer(TypeRef::char().into_const())],
                TypeRef::int()
            ))
        );
        // Unprototyped declaration `int foo();`.
        assert_eq!(
            parse_signature("int ()", &none()),
            Ok(Signature::new(vec![], TypeRef::int()))
        );
    }

    #[test]
    fn signature_returning_function_pointer() {
        let expected = Signature::new(
            vec![],
            TypeRef::function_pointer(Signature::new(vec![TypeRef::int()], TypeRef::int())),
        );
        assert_eq!(parse_signature("int (*(void))(int)", &none()), Ok(expected));
    }

    #[test]
    fn typedefs_resolve() {
        let mut typedefs = TypedefMap::new();
        typedefs.insert("uint32_t".to_string(), TypeRef::uint());
        assert_eq!(parse_type("uint32_t", &typedefs), Ok(TypeRef::uint()));
        assert_eq!(
            parse_type("uint32_t *", &typedefs),
            Ok(TypeRef::pointer(TypeRef::uint()))
        );
        assert_eq!(
            parse_signature("uint32_t (uint32_t)", &typedefs),
            Ok(Signature::new(vec![TypeRef::uint()], TypeRef::uint()))
        );
    }

    #[test]
    fn unknown_names_fail() {
        let err = parse_type("opaque_handle_t", &none()).unwrap_err();
        assert!(err.detail.contains("opaque_handle_t"));
        assert!(parse_type("struct (unnamed at x.c:1:1)", &none()).is_err());
        assert!(parse_signature("int", &none()).is_err());
    }
}
