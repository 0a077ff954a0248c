//! The command-line arguments and configuration system for
//! [crate::generate] and the `stubgen` binary.

use clap::{Parser, ValueEnum};
use config::FileFormat::Toml;
use directories::ProjectDirs;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use stubgen_core::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WidenArg {
    PreferSigned,
    PreferUnsigned,
    Conflict,
}

/// Command-line arguments for the `stubgen` binary.
#[derive(Debug, Parser)]
pub struct Args {
    /// Set a configuration value; format $NAME=$VALUE.
    #[arg(long, short)]
    pub config: Vec<String>,

    /// Overwrite the output artifacts if they already exist.
    #[arg(long, short)]
    pub force: bool,

    /// Files or directories containing the C translation units to scan.
    // Should always be present unless using a flag like --print-config-path
    pub sources: Vec<PathBuf>,

    /// Prints out the location of the config file.
    #[arg(long)]
    pub print_config_path: bool,

    /// Path to the directory the stub pair is written into.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Basename of the generated pair, i.e. <basename>.c and <basename>.h.
    #[arg(long)]
    pub basename: Option<String>,

    /// Include directory handed through to the parser front-end; repeatable.
    #[arg(short = 'I', long = "include")]
    pub include_dirs: Vec<PathBuf>,

    /// Worker threads for unit scanning (defaults to available parallelism).
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// How to unify same-rank integers that disagree in signedness.
    #[arg(long, value_enum)]
    pub widen: Option<WidenArg>,

    /// The clang executable the front-end invokes.
    #[arg(long)]
    pub clang: Option<PathBuf>,

    /// Additionally write the structured diagnostics to this path as JSON.
    #[arg(long)]
    pub diagnostics: Option<PathBuf>,
}

/// Prints out a warning message for every field in `unknown`.
///
/// This is intended for use by config validation routines. `prefix` should be the path to this
/// entry.
pub(crate) fn unknown_field_warning(prefix: &str, unknown: &HashMap<String, Value>) {
    let mut entries: Vec<_> = unknown.keys().collect();
    entries.sort_unstable();
    entries.into_iter().for_each(|name| match prefix {
        "" => eprintln!("Warning: unknown config key {name}"),
        p => eprintln!("Warning: unknown config key {p}.{name}"),
    });
}

/// Performs parsing and validation of the config; to be called by main() before executing any code
/// that tries to retrieve the config.
///
/// Returns the config, or None if a command line flag that calls for an early exit (such as
/// --print_config_path) was provided.
pub fn initialize(args: &Args) -> Option<Config> {
    let dirs = ProjectDirs::from("", "", "stubgen").expect("no home directory");
    if args.print_config_path {
        println!("Config file location: {:?}", config_file(dirs.config_dir()));
        return None;
    }
    let config = load_config(args, dirs.config_dir());
    unknown_field_warning("", &config.unknown);
    Some(config)
}

fn load_config(args: &Args, config_dir: &Path) -> Config {
    let mut settings = config::Config::builder()
        .add_source(config::File::from_str(
            include_str!("../default_config.toml"),
            Toml,
        ))
        .add_source(config::File::from(config_file(config_dir)).required(false))
        .add_source(config::File::from(PathBuf::from("config.toml")).required(false));
    for config_arg in &args.config {
        let Some((name, value)) = config_arg.split_once('=') else {
            panic!("failed to parse config value {config_arg:?}; no '=' found");
        };
        settings = settings
            .set_override(name, value)
            .expect("settings override failed");
    }

    if args.force {
        settings = settings
            .set_override("force", "true")
            .expect("settings override failed");
    }

    if let Some(basename) = &args.basename {
        settings = settings
            .set_override("basename", basename.as_str())
            .expect("settings override failed");
    }

    if let Some(jobs) = args.jobs {
        settings = settings
            .set_override("jobs", jobs as i64)
            .expect("settings override failed");
    }

    if let Some(widen) = args.widen {
        let policy = match widen {
            WidenArg::PreferSigned => "prefer-signed",
            WidenArg::PreferUnsigned => "prefer-unsigned",
            WidenArg::Conflict => "conflict",
        };
        settings = settings
            .set_override("widen", policy)
            .expect("settings override failed");
    }

    let mut config: Config = settings
        .build()
        .expect("failed to build settings")
        .try_deserialize()
        .expect("config deserialization failed");
    // The config crate does not support providing a Path in an override, and
    // converting through a string can be lossy, so path-valued flags are
    // applied after deserialization instead.
    if !args.sources.is_empty() {
        config.sources = args.sources.clone();
    }
    if !args.include_dirs.is_empty() {
        config.include_dirs = args.include_dirs.clone();
    }
    if let Some(ref output) = args.output {
        config.output = output.clone();
    }
    if let Some(ref clang) = args.clang {
        config.clang = clang.clone();
    }
    if args.diagnostics.is_some() {
        config.diagnostics = args.diagnostics.clone();
    }
    config
}

/// Returns the config file path, given the config directory.
fn config_file(config_dir: &Path) -> PathBuf {
    [config_dir, "stubgen.toml".as_ref()].iter().collect()
}
