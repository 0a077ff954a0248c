//! The subset of the Clang AST relevant to stub analysis.
//!
//! Clang is asked for its JSON AST dump and the result is deserialized via
//! the `clang-ast` crate. Only the node kinds the adapter inspects are
//! modeled; everything else lands in [Clang::Other].

use serde::Deserialize;

/// Represents a (possibly) qualified type in the Clang AST, such as `int`,
/// `const int`, or `const volatile int`.
/// Clang Docs on QualType: https://clang.llvm.org/doxygen/classclang_1_1QualType.html
#[derive(Deserialize, Debug)]
pub struct QualType {
    /// String representation of the desugared type, i.e., it will have
    /// `typedefs` and `typeofs` resolved.
    #[serde(rename = "desugaredQualType")]
    pub desugared_qual_type: Option<String>,
    /// String representation of the type as written in the source code,
    /// i.e., it may include `typedefs` and `typeofs`.
    #[serde(rename = "qualType")]
    pub qual_type: String,
}

impl QualType {
    /// The spelling to hand to the type parser: desugared when clang
    /// provides it, as written otherwise.
    pub fn canonical(&self) -> &str {
        self.desugared_qual_type
            .as_deref()
            .unwrap_or(&self.qual_type)
    }
}

/// The declaration a DeclRefExpr refers to.
#[derive(Deserialize, Debug)]
pub struct ReferencedDecl {
    pub name: Option<String>,
    pub kind: Option<String>,
}

/// Represents a node in the Clang AST.
#[derive(Deserialize, Debug)]
pub enum Clang {
    TranslationUnitDecl,
    /// Clang Docs: https://clang.llvm.org/doxygen/classclang_1_1TypedefDecl.html
    TypedefDecl {
        loc: Option<clang_ast::SourceLocation>,
        name: String,
        #[serde(rename = "type")]
        qtype: QualType,
    },
    /// Clang Docs: https://clang.llvm.org/doxygen/classclang_1_1FunctionDecl.html
    FunctionDecl {
        loc: Option<clang_ast::SourceLocation>,
        name: String,
        #[serde(rename = "storageClass")]
        storage_class: Option<String>,
        #[serde(rename = "type")]
        qtype: QualType,
    },
    /// Clang Docs: https://clang.llvm.org/doxygen/classclang_1_1RecordDecl.html
    RecordDecl {
        loc: Option<clang_ast::SourceLocation>,
        name: Option<String>,
        #[serde(rename = "tagUsed")]
        tag_used: Option<String>,
        #[serde(rename = "completeDefinition")]
        complete_definition: Option<bool>,
    },
    /// Clang Docs: https://clang.llvm.org/doxygen/classclang_1_1EnumDecl.html
    EnumDecl {
        loc: Option<clang_ast::SourceLocation>,
        name: Option<String>,
    },
    /// Clang Docs: https://clang.llvm.org/doxygen/classclang_1_1ParmVarDecl.html
    ParmVarDecl {
        name: Option<String>,
        #[serde(rename = "type")]
        qtype: Option<QualType>,
    },
    /// A function body (or plain block).
    CompoundStmt {},
    /// Clang Docs: https://clang.llvm.org/doxygen/classclang_1_1CallExpr.html
    CallExpr {
        loc: Option<clang_ast::SourceLocation>,
        #[serde(rename = "type")]
        qtype: Option<QualType>,
    },
    /// A reference to a declared entity; how a call names its callee.
    DeclRefExpr {
        #[serde(rename = "type")]
        qtype: Option<QualType>,
        #[serde(rename = "referencedDecl")]
        referenced_decl: Option<ReferencedDecl>,
    },
    ImplicitCastExpr {
        #[serde(rename = "type")]
        qtype: Option<QualType>,
    },
    ParenExpr {
        #[serde(rename = "type")]
        qtype: Option<QualType>,
    },
    IntegerLiteral {
        #[serde(rename = "type")]
        qtype: Option<QualType>,
    },
    FloatingLiteral {
        #[serde(rename = "type")]
        qtype: Option<QualType>,
    },
    CharacterLiteral {
        #[serde(rename = "type")]
        qtype: Option<QualType>,
    },
    StringLiteral {
        #[serde(rename = "type")]
        qtype: Option<QualType>,
    },
    UnaryOperator {
        #[serde(rename = "type")]
        qtype: Option<QualType>,
    },
    BinaryOperator {
        #[serde(rename = "type")]
        qtype: Option<QualType>,
    },
    ConditionalOperator {
        #[serde(rename = "type")]
        qtype: Option<QualType>,
    },
    CStyleCastExpr {
        #[serde(rename = "type")]
        qtype: Option<QualType>,
    },
    MemberExpr {
        #[serde(rename = "type")]
        qtype: Option<QualType>,
    },
    ArraySubscriptExpr {
        #[serde(rename = "type")]
        qtype: Option<QualType>,
    },
    /// sizeof / _Alignof.
    UnaryExprOrTypeTraitExpr {
        #[serde(rename = "type")]
        qtype: Option<QualType>,
    },
    ConstantExpr {
        #[serde(rename = "type")]
        qtype: Option<QualType>,
    },
    /// Every other node kind.
    Other {
        kind: Option<String>,
    },
}

impl Clang {
    /// Returns the source location of this AST node, if available.
    pub fn loc(&self) -> Option<&clang_ast::SourceLocation> {
        match self {
            Clang::TypedefDecl { loc, .. }
            | Clang::FunctionDecl { loc, .. }
            | Clang::RecordDecl { loc, .. }
            | Clang::EnumDecl { loc, .. }
            | Clang::CallExpr { loc, .. } => loc.as_ref(),
            _ => None,
        }
    }

    /// Returns the result type of this node when it is an expression.
    pub fn expr_type(&self) -> Option<&QualType> {
        match self {
            Clang::CallExpr { qtype, .. }
            | Clang::DeclRefExpr { qtype, .. }
            | Clang::ImplicitCastExpr { qtype }
            | Clang::ParenExpr { qtype }
            | Clang::IntegerLiteral { qtype }
            | Clang::FloatingLiteral { qtype }
            | Clang::CharacterLiteral { qtype }
            | Clang::StringLiteral { qtype }
            | Clang::UnaryOperator { qtype }
            | Clang::BinaryOperator { qtype }
            | Clang::ConditionalOperator { qtype }
            | Clang::CStyleCastExpr { qtype }
            | Clang::MemberExpr { qtype }
            | Clang::ArraySubscriptExpr { qtype }
            | Clang::UnaryExprOrTypeTraitExpr { qtype }
            | Clang::ConstantExpr { qtype } => qtype.as_ref(),
            _ => None,
        }
    }
}
