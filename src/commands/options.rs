// src/commands/options.rs

//! Options command - show what a recipe can be configured with

use super::{print_json, Session};
use anyhow::Result;
use pantry::options::{DefaultState, ValueSource};

/// List a recipe's options with their resolved values
///
/// Resolution runs without conflict validation, so this also works for
/// combinations that `check` would reject.
pub fn cmd_options(session: &Session, json: bool) -> Result<()> {
    let recipe = &session.recipe;
    let registry = recipe.registry()?;
    let resolution = registry.resolve(&session.overrides, &session.platform)?;

    if json {
        return print_json(&resolution);
    }

    println!(
        "{} {} options ({}):",
        recipe.package.name,
        recipe.full_version(),
        session.platform
    );

    let width = registry.options().iter().map(|o| o.id.len()).max().unwrap_or(0);
    for decl in registry.options() {
        let Some(resolved) = resolution.config.get(&decl.id) else {
            continue;
        };

        let value = match resolved.value.as_bool() {
            Some(true) => "on".to_string(),
            Some(false) => "off".to_string(),
            None => resolved.value.to_string(),
        };
        let origin = match resolved.source {
            ValueSource::Default if decl.default == DefaultState::Recommended => "recommended",
            ValueSource::Default => "default",
            ValueSource::User => "set",
            ValueSource::Platform => "n/a on this platform",
        };

        println!(
            "  {:<width$}  {:<8} {:<22} {}",
            decl.id,
            value,
            format!("({})", origin),
            decl.description,
            width = width
        );
        if !decl.choices.is_empty() {
            println!("  {:<width$}  choices: {}", "", decl.choices.join(", "), width = width);
        }
    }

    let aliases = registry.aliases();
    if !aliases.is_empty() {
        println!("\nDeprecated:");
        for (alias, target) in aliases {
            println!("  {} -> {}", alias, target);
        }
    }

    for warning in &resolution.warnings {
        println!("Warning: {}", warning);
    }

    Ok(())
}
