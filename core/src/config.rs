//! Configuration for one stubgen run. Values are layered by the CLI (see
//! `stubgen_generate::cli`); this type is the deserialized result.

use crate::types::WideningPolicy;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Files or directories containing the translation units to scan.
    /// Populated from the command line after deserialization.
    #[serde(default)]
    pub sources: Vec<PathBuf>,

    /// Include directories passed through to the parser front-end.
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,

    /// Directory the stub source and header are written into.
    pub output: PathBuf,

    /// Basename of the two output artifacts (`<basename>.c`, `<basename>.h`).
    pub basename: String,

    /// Worker threads for unit scanning. `None` means available parallelism.
    #[serde(default)]
    pub jobs: Option<usize>,

    /// How to unify same-rank integers that disagree in signedness during
    /// call-site inference.
    #[serde(default)]
    pub widen: WideningPolicy,

    /// The clang executable used by the default front-end.
    pub clang: PathBuf,

    /// Overwrite existing output artifacts.
    #[serde(default)]
    pub force: bool,

    /// If set, the structured diagnostics are additionally written to this
    /// path as JSON.
    #[serde(default)]
    pub diagnostics: Option<PathBuf>,

    /// Config keys we don't recognize; surfaced as warnings by the CLI.
    #[serde(flatten)]
    pub unknown: HashMap<String, serde_json::Value>,
}

impl Config {
    /// A configuration suitable for tests: scans nothing, writes nowhere
    /// until pointed somewhere.
    pub fn mock() -> Config {
        Config {
            sources: Vec::new(),
            include_dirs: Vec::new(),
            output: PathBuf::from("."),
            basename: "stubs".to_string(),
            jobs: Some(1),
            widen: WideningPolicy::default(),
            clang: PathBuf::from("clang"),
            force: true,
            diagnostics: None,
            unknown: HashMap::new(),
        }
    }
}
