//! Parser front-end backed by clang's JSON AST dump.
//!
//! Each translation unit is handed to `clang -Xclang -ast-dump=json
//! -fsyntax-only`; the dump is deserialized into a [clang_ast::Node] tree
//! and lowered into the normalized [ParsedUnit] the rest of the pipeline
//! consumes.

pub mod adapter;
pub mod clang;
pub mod types;

pub use crate::clang::{Clang, QualType};
pub use crate::types::{TypeParseError, TypedefMap, parse_signature, parse_type};

use clang_ast::Node;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use stubgen_core::syntax::{Frontend, FrontendError, ParsedUnit};
use tracing::{debug, info};

/// Front-end that shells out to a clang binary.
pub struct ClangFrontend {
    clang: PathBuf,
    include_dirs: Vec<PathBuf>,
}

impl ClangFrontend {
    pub fn new<P: Into<PathBuf>>(clang: P, include_dirs: Vec<PathBuf>) -> ClangFrontend {
        ClangFrontend {
            clang: clang.into(),
            include_dirs,
        }
    }
}

impl Frontend for ClangFrontend {
    fn parse_unit(&self, unit: &Path) -> Result<ParsedUnit, FrontendError> {
        let mut clang_cmd = Command::new(&self.clang);
        clang_cmd
            .args(["-x", "c", "-std=c99"])
            .args(["-Xclang", "-ast-dump=json", "-fsyntax-only"]);
        for dir in &self.include_dirs {
            clang_cmd.arg("-I").arg(dir);
        }
        clang_cmd
            .arg(unit)
            .stderr(Stdio::null())
            .stdout(Stdio::piped());
        debug!("running {clang_cmd:?}");

        let mut child = clang_cmd.spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FrontendError::ParserFailed {
                unit: unit.to_path_buf(),
                detail: "clang stdout was not captured".to_string(),
            })?;
        // Reap the child before acting on the decode result; an early return
        // here would leave a zombie process behind for every failed unit.
        // Dropping the reader on a decode error also unblocks a clang still
        // writing to the pipe.
        let decoded: Result<Node<Clang>, _> = serde_json::from_reader(stdout);
        let status = child.wait()?;
        if !status.success() {
            return Err(FrontendError::ParserFailed {
                unit: unit.to_path_buf(),
                detail: format!("clang exited with {status}"),
            });
        }
        let ast = decoded?;

        let parsed = adapter::adapt(unit, &ast);
        info!(
            "parsed {} ({} nodes, {} skipped)",
            unit.display(),
            parsed.nodes.len(),
            parsed.skipped.len()
        );
        Ok(parsed)
    }
}
