//! Weft - a static site generator for markdown content and HTML templates.

mod cli;
mod compiler;
mod compose;
mod config;
mod error;
mod init;
mod logger;
mod markup;
mod registry;
mod schedule;
mod serve;
mod site;
mod source;
mod tags;
mod utils;
mod watch;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use init::{ensure_scaffold, init_site};
use schedule::Scheduler;
use serve::serve_site;
use site::{Site, SitePaths, clean_output};
use std::sync::Arc;

fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    let config: &'static SiteConfig = Box::leak(Box::new(SiteConfig::load(cli)?));

    match &cli.command {
        Commands::Init { seed } => init_site(config, *seed),
        Commands::Build { .. } => build_all(config, cli).map(|_| ()),
        Commands::Serve { .. } => {
            let scheduler = build_all(config, cli)?;
            serve_site(config, scheduler)
        }
    }
}

/// Prepare the directories and run the startup build (every phase).
///
/// `build` fails on any error. `serve` logs the failure and keeps serving
/// so the next change can fix it.
fn build_all(config: &'static SiteConfig, cli: &Cli) -> Result<Arc<Scheduler>> {
    let build = &config.build;

    if build.clean {
        clean_output(&build.output).context("Failed to clean output directory")?;
    }
    ensure_scaffold(&build.source, &build.output, false)?;

    let sink = logger::sink(cli.quiet);
    let site = Site::new(
        SitePaths::new(&build.source, &build.output),
        &config.markdown,
        build.on_error,
        sink.clone(),
    );
    let scheduler = Arc::new(Scheduler::new(site, sink));

    log!("build"; "{}", build.source.display());
    match scheduler.startup() {
        Ok(_) => log!("build"; "done"),
        Err(err) if matches!(cli.command, Commands::Serve { .. }) => {
            log!("error"; "{err}");
        }
        Err(err) => return Err(err).context("Build failed"),
    }

    Ok(scheduler)
}
