// src/commands/deps.rs

//! Deps command - show the effective dependency set

use super::{print_json, Session};
use anyhow::{Context, Result};
use pantry::pipeline;
use serde_json::json;

/// Show the dependency set for an option combination
///
/// Nothing is located on disk, so this works on machines where the
/// dependencies are not installed yet.
pub fn cmd_deps(session: &Session, json: bool) -> Result<()> {
    let recipe = &session.recipe;
    let validated = pipeline::validate(recipe, &session.overrides, &session.platform)
        .with_context(|| format!("Failed to resolve dependencies of {}", recipe.package.name))?;
    let deps = &validated.dependencies;

    if json {
        return print_json(&json!({
            "package": recipe.package.name,
            "platform": session.platform.to_string(),
            "dependencies": deps,
            "warnings": validated.warnings,
        }));
    }

    println!("Dependencies of {} ({}):", recipe.package.name, session.platform);
    if deps.is_empty() {
        println!("  (none)");
    }
    for dep in deps.iter() {
        let mut notes = vec![dep.kind.to_string(), dep.stage.to_string()];
        if dep.conditional {
            notes.push("conditional".to_string());
        }
        if dep.declared_as.iter().any(|d| d != &dep.name) {
            notes.push(format!("for {}", dep.declared_as.join(", ")));
        }
        println!("  {} [{}]", dep.name, notes.join(", "));
    }

    for selection in deps.selections() {
        if selection.selected.is_empty() {
            if let Some(fallback) = &selection.fallback {
                println!("  {}: bundled ({})", selection.capability, fallback);
            }
        } else {
            println!(
                "  {}: provided by {}",
                selection.capability,
                selection.selected.join(", ")
            );
        }
    }

    for warning in &validated.warnings {
        println!("Warning: {}", warning);
    }

    Ok(())
}
