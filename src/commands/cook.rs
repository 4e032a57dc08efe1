// src/commands/cook.rs

//! Cook command - build and install a recipe

use super::plan::print_plan;
use super::Session;
use anyhow::{Context, Result};
use pantry::kitchen::Kitchen;
use pantry::pipeline;
use std::path::PathBuf;
use tracing::info;

/// Command-line adjustments to the kitchen settings
#[derive(Debug, Clone, Default)]
pub struct CookArgs {
    pub source_cache: Option<PathBuf>,
    pub jobs: Option<u32>,
    pub keep_builddir: bool,
    pub fetch_only: bool,
}

/// Plan a recipe, then fetch and build it
pub fn cmd_cook(session: &Session, args: &CookArgs) -> Result<()> {
    let recipe = &session.recipe;
    let locator = session.settings.locator();
    let plan = pipeline::plan(recipe, &session.overrides, &session.platform, &locator)?;

    let mut config = session.settings.kitchen_config();
    if let Some(cache) = &args.source_cache {
        config.source_cache = cache.clone();
    }
    if let Some(jobs) = args.jobs {
        config.jobs = jobs.max(1);
    }
    if args.keep_builddir {
        config.keep_builddir = true;
    }

    let kitchen = Kitchen::new(config);

    if args.fetch_only {
        println!("Fetching sources (fetch-only mode)...");
        let sources = kitchen
            .fetch(recipe, &plan)
            .with_context(|| format!("Failed to fetch sources for {}", plan.package()))?;

        println!("\n[COMPLETE] Fetched {} source file(s):", sources.len());
        for source in &sources {
            println!("  - {}", source.display());
        }
        return Ok(());
    }

    print_plan(&plan);
    println!(
        "\nCooking with {} parallel jobs (timeout {}s per phase)...",
        kitchen.config().jobs,
        kitchen.config().timeout.as_secs()
    );

    let result = kitchen
        .cook(recipe, &plan)
        .with_context(|| format!("Failed to cook {}", plan.package()))?;

    info!("Cook log is {} bytes", result.log.len());

    println!("\n[COMPLETE] Installed {} into {}", plan.package(), result.install_prefix.display());
    if let Some(dir) = &result.build_dir {
        println!("Build directory kept at: {}", dir.display());
    }
    for warning in &result.warnings {
        println!("Warning: {}", warning);
    }

    Ok(())
}
