// src/arguments/synthesize.rs

//! Argument synthesis from validated state
//!
//! Emission order is fixed so identical inputs give byte-identical lists:
//!
//! 1. generator defaults from `[build]`
//! 2. mappings not owned by any option, in recipe order
//! 3. option-owned mappings, in option declaration order
//! 4. per dependency declaration: the alternative group's fallback flag
//!    (at the group's first provider), then the locate arguments,
//!    environment and edits of included dependencies
//! 5. recipe `[[environment]]` entries

use super::{gate_holds, ArgumentList, MappingForm};
use crate::condition::OptionLookup;
use crate::dependencies::{DependencyLocation, DependencyLocator, DependencySet, SourceEdit};
use crate::error::{ConfigurationError, DependencyResolutionError, Result};
use crate::options::ResolvedConfiguration;
use crate::platform::PlatformInfo;
use crate::recipe::Recipe;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Variables only the kitchen can fill in
const DEFERRED_VARS: &[&str] = &["buildpath", "install_prefix"];

/// Variables provided by a located dependency
const LOCATION_VARS: &[&str] = &["include", "lib", "bin", "prefix"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown template variable '%({0})s'")]
    Unknown(String),

    #[error("unterminated template variable in '{0}'")]
    Unterminated(String),
}

/// Expand `%(name)s` variables
///
/// Deferred variables (`%(buildpath)s`, `%(install_prefix)s`) are left in
/// place for the kitchen to render.
pub fn expand_template(
    template: &str,
    vars: &HashMap<String, String>,
) -> std::result::Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("%(") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find(")s") else {
            return Err(TemplateError::Unterminated(template.to_string()));
        };
        let name = &after[..end];
        match vars.get(name) {
            Some(value) => out.push_str(value),
            None if DEFERRED_VARS.contains(&name) => out.push_str(&rest[start..start + end + 4]),
            None => return Err(TemplateError::Unknown(name.to_string())),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Translate validated state into build-tool arguments
///
/// The locator is only consulted for included dependencies that declare
/// locate, environment or edit templates.
pub fn synthesize(
    recipe: &Recipe,
    config: &ResolvedConfiguration,
    deps: &DependencySet,
    platform: &PlatformInfo,
    locator: &dyn DependencyLocator,
) -> Result<ArgumentList> {
    for mapping in &recipe.arguments {
        if let Some(owner) = mapping.owner()
            && config.get(owner).is_none()
        {
            return Err(ConfigurationError::UnknownReference {
                context: format!("argument '{}'", mapping.key),
                option: owner.to_string(),
            }
            .into());
        }
    }

    let vars = recipe_variables(recipe, config, platform)?;
    let mut list = ArgumentList::new();

    for arg in &recipe.build.generator_args {
        let value = expand(&arg.value, &vars, &format!("generator argument '{}'", arg.key))?;
        list.set_default(arg.key.as_str(), value);
    }

    // Baseline
    for mapping in recipe.arguments.iter().filter(|m| m.owner().is_none()) {
        if mapping.is_active(config, platform) {
            let raw = mapping.raw_value(config)?;
            let value = expand(&raw, &vars, &format!("argument '{}'", mapping.key))?;
            list.push(mapping.key.as_str(), value)?;
        }
    }

    for option in config.iter() {
        for mapping in recipe
            .arguments
            .iter()
            .filter(|m| m.owner() == Some(option.id.as_str()))
        {
            if !mapping.is_active(config, platform) {
                continue;
            }
            let raw = mapping.raw_value(config)?;
            let value = match mapping.form()? {
                MappingForm::Fixed(_) => {
                    let mut scoped = vars.clone();
                    if let Some(choice) = config.choice(&option.id) {
                        scoped.insert("value".to_string(), choice.to_string());
                    }
                    expand(&raw, &scoped, &format!("argument '{}'", mapping.key))?
                }
                _ => raw,
            };
            list.push(mapping.key.as_str(), value)?;
        }
    }

    emit_dependencies(recipe, deps, locator, &vars, &mut list)?;

    for entry in &recipe.environment {
        if gate_holds(entry.when.as_ref(), entry.platform.as_ref(), config, platform) {
            let value = expand(&entry.value, &vars, &format!("environment '{}'", entry.name))?;
            list.set_env(entry.name.as_str(), value)?;
        }
    }

    debug!(
        "Synthesized {} arguments, {} environment entries, {} edits",
        list.len(),
        list.environment().len(),
        list.edits().len()
    );
    Ok(list)
}

fn emit_dependencies(
    recipe: &Recipe,
    deps: &DependencySet,
    locator: &dyn DependencyLocator,
    vars: &HashMap<String, String>,
    list: &mut ArgumentList,
) -> Result<()> {
    let mut fallbacks_done: HashSet<usize> = HashSet::new();
    let mut located: HashMap<String, DependencyLocation> = HashMap::new();

    for (index, decl) in recipe.dependencies.iter().enumerate() {
        for (group, alternative) in recipe.alternatives.iter().enumerate() {
            if !alternative.providers.contains(&decl.name) || !fallbacks_done.insert(group) {
                continue;
            }
            let Some(fallback) = &alternative.fallback else {
                continue;
            };
            let selected = deps
                .selections()
                .get(group)
                .is_some_and(|s| !s.selected.is_empty());
            list.push(fallback.as_str(), if selected { "OFF" } else { "ON" })?;
        }

        let Some(resolved) = deps.for_declaration(index) else {
            continue;
        };
        if decl.locate.is_empty() && decl.env.is_empty() && decl.edits.is_empty() {
            continue;
        }

        let location = match located.get(&resolved.name) {
            Some(location) => location.clone(),
            None => {
                debug!("Locating dependency '{}'", resolved.name);
                let location = locator
                    .locate(&resolved.name)
                    .map_err(DependencyResolutionError::from)?;
                located.insert(resolved.name.clone(), location.clone());
                location
            }
        };
        let scoped = location_variables(vars, &location);

        for template in &decl.locate {
            let value = expand_located(&template.value, &scoped, &resolved.name, &template.key)?;
            list.push(template.key.as_str(), value)?;
        }
        for template in &decl.env {
            let value = expand_located(&template.value, &scoped, &resolved.name, &template.name)?;
            list.set_env(template.name.as_str(), value)?;
        }
        for edit in &decl.edits {
            let to = expand_located(&edit.to, &scoped, &resolved.name, &edit.file)?;
            list.add_edit(SourceEdit {
                file: edit.file.clone(),
                from: edit.from.clone(),
                to,
            });
        }
    }
    Ok(())
}

/// Built-in and recipe variables; the first matching `[[variable]]` wins
fn recipe_variables(
    recipe: &Recipe,
    config: &ResolvedConfiguration,
    platform: &PlatformInfo,
) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    vars.insert("name".to_string(), recipe.package.name.clone());
    vars.insert("version".to_string(), recipe.package.version.clone());

    for decl in &recipe.variables {
        if vars.contains_key(&decl.name) {
            continue;
        }
        if gate_holds(decl.when.as_ref(), decl.platform.as_ref(), config, platform) {
            let value = expand(&decl.value, &vars, &format!("variable '{}'", decl.name))?;
            vars.insert(decl.name.clone(), value);
        }
    }
    Ok(vars)
}

fn location_variables(
    vars: &HashMap<String, String>,
    location: &DependencyLocation,
) -> HashMap<String, String> {
    let mut scoped = vars.clone();
    let paths = [
        ("prefix", &location.prefix),
        ("include", &location.include),
        ("lib", &location.lib),
        ("bin", &location.bin),
    ];
    for (name, path) in paths {
        if let Some(path) = path {
            scoped.insert(name.to_string(), path.to_string_lossy().into_owned());
        }
    }
    scoped
}

fn expand(template: &str, vars: &HashMap<String, String>, context: &str) -> Result<String> {
    expand_template(template, vars)
        .map_err(|e| ConfigurationError::Invalid(format!("{}: {}", context, e)).into())
}

fn expand_located(
    template: &str,
    vars: &HashMap<String, String>,
    dependency: &str,
    key: &str,
) -> Result<String> {
    match expand_template(template, vars) {
        Ok(value) => Ok(value),
        Err(TemplateError::Unknown(name)) if LOCATION_VARS.contains(&name.as_str()) => {
            Err(DependencyResolutionError::MissingPath {
                dependency: dependency.to_string(),
                path: name,
                key: key.to_string(),
            }
            .into())
        }
        Err(e) => Err(ConfigurationError::Invalid(format!(
            "dependency '{}' template for {}: {}",
            dependency, key, e
        ))
        .into()),
    }
}
