//! `aigw-up`: one flagless invocation that brings up the local AI-gateway
//! stack. Exit code 0 only on full success; every fatal step prints a
//! diagnostic naming the step and a remediation hint on stderr.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use aigw_bootstrap::workflow::render_bootstrap_summary;
use aigw_bootstrap::{
    detect_backend, detect_effective_uid, ensure_not_root, run_bootstrap, warn_if_not_rootless,
    BootstrapConfig, BootstrapError, ComposeCli, ConsoleProgress, OllamaClient,
};

#[derive(Debug, Parser)]
#[command(
    name = "aigw-up",
    about = "Bootstraps the local AI-gateway container stack: secrets, image \
             build, model-serving dependency, model pull, gateway start.",
    version
)]
struct Cli {}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn main() {
    let _cli = Cli::parse();
    init_tracing();

    if let Err(error) = run() {
        eprintln!("aigw-up: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), BootstrapError> {
    // The superuser check precedes every other side effect, unconditionally.
    let effective_uid = detect_effective_uid()?;
    ensure_not_root(effective_uid)?;

    let backend = detect_backend()?;
    warn_if_not_rootless(backend);
    tracing::info!(backend = backend.label(), "selected compose runtime");

    let project_dir = std::env::current_dir()
        .context("failed to resolve the current directory")?;
    let config = BootstrapConfig::from_env(project_dir);

    let driver = ComposeCli::new(backend, config.project_dir.clone());
    let client = OllamaClient::new(config.ollama_base_url.clone())?;
    let mut progress = ConsoleProgress::default();
    let mut sleeper = |interval: Duration| std::thread::sleep(interval);

    let report = run_bootstrap(
        &config,
        backend,
        effective_uid,
        &driver,
        &client,
        &mut progress,
        &mut sleeper,
    )?;
    print!("{}", render_bootstrap_summary(&report));
    Ok(())
}
