//! Place to put utilities that are only used by tests.

use crate::diagnostics::{Diagnostic, Location};
use crate::syntax::{AggregateKind, Frontend, FrontendError, ParsedUnit, UnitNode};
use crate::types::{Signature, TypeRef};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Returns a new temporary directory. Unlike the defaults in the `tempfile`
/// crate, this directory is not world-accessible.
#[cfg(not(miri))]
pub fn tempdir() -> std::io::Result<tempfile::TempDir> {
    use std::fs::Permissions;
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(Permissions::from_mode(0o700));
    }
    builder.tempdir()
}

/// Builder for hand-assembled [ParsedUnit]s, so pipeline tests don't need a
/// real parser front-end.
///
/// # Example
/// ```
/// use stubgen_core::test_util::UnitBuilder;
/// use stubgen_core::types::{Signature, TypeRef};
/// let unit = UnitBuilder::new("a.c")
///     .declares("bar", Signature::new(vec![TypeRef::int()], TypeRef::void()))
///     .calls("bar", vec![TypeRef::int()], false)
///     .build();
/// assert_eq!(unit.nodes.len(), 2);
/// ```
pub struct UnitBuilder {
    unit: ParsedUnit,
    next_line: u64,
}

impl UnitBuilder {
    pub fn new(path: &str) -> UnitBuilder {
        UnitBuilder {
            unit: ParsedUnit::new(path),
            next_line: 1,
        }
    }

    fn location(&mut self) -> Location {
        let line = self.next_line;
        self.next_line += 1;
        Location::with_line(self.unit.path.clone(), line)
    }

    pub fn declares(mut self, name: &str, signature: Signature) -> UnitBuilder {
        let location = self.location();
        self.unit.nodes.push(UnitNode::FunctionDeclaration {
            name: name.to_string(),
            signature,
            storage_static: false,
            location,
        });
        self
    }

    pub fn declares_static(mut self, name: &str, signature: Signature) -> UnitBuilder {
        let location = self.location();
        self.unit.nodes.push(UnitNode::FunctionDeclaration {
            name: name.to_string(),
            signature,
            storage_static: true,
            location,
        });
        self
    }

    pub fn defines(mut self, name: &str, signature: Signature) -> UnitBuilder {
        let location = self.location();
        self.unit.nodes.push(UnitNode::FunctionDefinition {
            name: name.to_string(),
            signature,
            storage_static: false,
            location,
        });
        self
    }

    pub fn defines_static(mut self, name: &str, signature: Signature) -> UnitBuilder {
        let location = self.location();
        self.unit.nodes.push(UnitNode::FunctionDefinition {
            name: name.to_string(),
            signature,
            storage_static: true,
            location,
        });
        self
    }

    pub fn calls(mut self, callee: &str, args: Vec<TypeRef>, result_used: bool) -> UnitBuilder {
        let location = self.location();
        self.unit.nodes.push(UnitNode::CallExpression {
            callee: callee.to_string(),
            args,
            result_used,
            location,
        });
        self
    }

    pub fn aggregate(mut self, kind: AggregateKind, tag: &str, complete: bool) -> UnitBuilder {
        self.unit.nodes.push(UnitNode::AggregateTypeDeclaration {
            kind,
            tag: tag.to_string(),
            complete,
        });
        self
    }

    pub fn typedef(mut self, name: &str, underlying: TypeRef) -> UnitBuilder {
        self.unit.nodes.push(UnitNode::TypedefDeclaration {
            name: name.to_string(),
            underlying,
        });
        self
    }

    pub fn skipped(mut self, diagnostic: Diagnostic) -> UnitBuilder {
        self.unit.skipped.push(diagnostic);
        self
    }

    pub fn build(self) -> ParsedUnit {
        self.unit
    }
}

/// A [Frontend] that serves pre-assembled units from a map, for driver tests
/// that should not depend on a clang binary.
#[derive(Default)]
pub struct CannedFrontend {
    units: HashMap<PathBuf, ParsedUnit>,
}

impl CannedFrontend {
    pub fn new() -> CannedFrontend {
        CannedFrontend::default()
    }

    pub fn with_unit(mut self, unit: ParsedUnit) -> CannedFrontend {
        self.units.insert(unit.path.clone(), unit);
        self
    }
}

impl Frontend for CannedFrontend {
    fn parse_unit(&self, unit: &Path) -> Result<ParsedUnit, FrontendError> {
        self.units
            .get(unit)
            .cloned()
            .ok_or_else(|| FrontendError::ParserFailed {
                unit: unit.to_path_buf(),
                detail: "no canned unit".to_string(),
            })
    }
}
