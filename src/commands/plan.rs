// src/commands/plan.rs

//! Plan command - compute the build plan without building

use super::{print_json, Session};
use anyhow::Result;
use pantry::pipeline::{self, BuildPlan};

pub fn cmd_plan(session: &Session, json: bool) -> Result<()> {
    let locator = session.settings.locator();
    let plan = pipeline::plan(&session.recipe, &session.overrides, &session.platform, &locator)?;

    if json {
        return print_json(&plan);
    }
    print_plan(&plan);
    Ok(())
}

/// Human-readable rendering of a plan
pub fn print_plan(plan: &BuildPlan) {
    println!("{} {} ({})", plan.package(), plan.version(), plan.platform());

    println!("\nOptions enabled: {}", plan.config().enabled().join(", "));
    println!("Dependencies: {}", plan.dependencies().names().join(", "));

    if !plan.resources().is_empty() {
        println!("Resources:");
        for resource in plan.resources() {
            println!("  {} -> {}", resource.name, resource.stage_dir());
        }
    }

    println!("\nArguments:");
    for arg in plan.arguments().to_cmake_args() {
        println!("  {}", arg);
    }

    if !plan.arguments().environment().is_empty() {
        println!("\nEnvironment:");
        for (name, value) in plan.arguments().environment() {
            println!("  {}={}", name, value);
        }
    }

    if !plan.arguments().edits().is_empty() {
        println!("\nSource edits:");
        for edit in plan.arguments().edits() {
            println!("  {}: '{}' -> '{}'", edit.file, edit.from, edit.to);
        }
    }

    for warning in plan.warnings() {
        println!("Warning: {}", warning);
    }
}
