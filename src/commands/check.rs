// src/commands/check.rs

//! Check command - validate a recipe and an option combination

use super::{print_json, Session};
use anyhow::Result;
use pantry::pipeline;
use serde_json::json;

/// Validate the recipe, then resolve and conflict-check the options
pub fn cmd_check(session: &Session, json: bool) -> Result<()> {
    let recipe = &session.recipe;
    let validated = pipeline::validate(recipe, &session.overrides, &session.platform)?;

    if json {
        return print_json(&json!({
            "package": recipe.package.name,
            "version": recipe.full_version(),
            "platform": session.platform.to_string(),
            "enabled": validated.config.enabled(),
            "recipe_warnings": validated.recipe_warnings,
            "warnings": validated.warnings,
        }));
    }

    for warning in &validated.recipe_warnings {
        println!("Warning: {}", warning);
    }
    for warning in &validated.warnings {
        println!("Warning: {}", warning);
    }

    println!(
        "[OK] {} {}: {} option(s) enabled, {} dependencies",
        recipe.package.name,
        recipe.full_version(),
        validated.config.enabled().len(),
        validated.dependencies.len()
    );
    Ok(())
}
