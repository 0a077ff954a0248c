use clang_frontend::ClangFrontend;
use clap::Parser;
use stubgen_generate::cli::{self, Args};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let Some(config) = cli::initialize(&args) else {
        return;
    };
    if config.sources.is_empty() {
        error!("no source files or directories given");
        std::process::exit(2);
    }

    let frontend = ClangFrontend::new(&config.clang, config.include_dirs.clone());
    match stubgen_generate::generate(&config, &frontend) {
        Ok(summary) => {
            info!(
                "done: {} stubs from {} units",
                summary.stubs_emitted, summary.units_scanned
            );
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }
}
