// src/pipeline.rs

//! The resolution pipeline: resolve → build → validate → synthesize
//!
//! Every stage is a pure function of the recipe, the user overrides and
//! the platform. The only collaborator consulted is the dependency
//! locator, and only after conflict validation has passed. The result is
//! a `BuildPlan`, which is the sole input the kitchen accepts.

use crate::arguments::{self, ArgumentList};
use crate::conflicts;
use crate::dependencies::{self, DependencyLocator, DependencySet};
use crate::error::Result;
use crate::options::{Overrides, ResolutionWarning, ResolvedConfiguration};
use crate::platform::PlatformInfo;
use crate::recipe::{validate_recipe, Recipe, ResourceDecl};
use serde::Serialize;
use tracing::{debug, info};

/// Validated build state for one invocation
///
/// Only `plan` constructs one, so holding a `BuildPlan` proves the
/// configuration passed conflict validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildPlan {
    package: String,
    version: String,
    platform: String,
    config: ResolvedConfiguration,
    dependencies: DependencySet,
    arguments: ArgumentList,
    resources: Vec<ResourceDecl>,
    warnings: Vec<ResolutionWarning>,
}

impl BuildPlan {
    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Platform the plan was computed for
    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn config(&self) -> &ResolvedConfiguration {
        &self.config
    }

    pub fn dependencies(&self) -> &DependencySet {
        &self.dependencies
    }

    /// Synthesized arguments, with build path placeholders unrendered
    pub fn arguments(&self) -> &ArgumentList {
        &self.arguments
    }

    /// Auxiliary archives this configuration needs
    pub fn resources(&self) -> &[ResourceDecl] {
        &self.resources
    }

    /// Non-fatal diagnostics from option resolution
    pub fn warnings(&self) -> &[ResolutionWarning] {
        &self.warnings
    }
}

/// Resolved options and dependencies, validated but not yet synthesized
///
/// This is the locator-free prefix of the pipeline, used by `check` and
/// `deps` where no filesystem lookup should happen.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub config: ResolvedConfiguration,
    pub dependencies: DependencySet,
    pub warnings: Vec<ResolutionWarning>,
    /// Missing metadata and similar non-fatal recipe findings
    pub recipe_warnings: Vec<String>,
}

/// Resolve, build and validate without touching the locator
///
/// The recipe is checked first: a condition, conflict rule or argument
/// naming an undeclared option is an error, not a disabled option.
pub fn validate(
    recipe: &Recipe,
    overrides: &Overrides,
    platform: &PlatformInfo,
) -> Result<Validated> {
    let recipe_warnings = validate_recipe(recipe)?;
    for warning in &recipe_warnings {
        debug!("Recipe {}: {}", recipe.package.name, warning);
    }

    let registry = recipe.registry()?;
    debug!("Registry for {} has {} options", recipe.package.name, registry.len());

    let resolution = registry.resolve(overrides, platform)?;
    let config = resolution.config;
    debug!("Enabled options: {}", config.enabled().join(", "));

    let dependencies =
        dependencies::build(&recipe.dependencies, &recipe.alternatives, &config, platform);
    debug!("Dependencies: {}", dependencies.names().join(", "));

    conflicts::validate(recipe, &config, &dependencies, platform)?;

    Ok(Validated {
        config,
        dependencies,
        warnings: resolution.warnings,
        recipe_warnings,
    })
}

/// Run the whole pipeline and produce a build plan
pub fn plan(
    recipe: &Recipe,
    overrides: &Overrides,
    platform: &PlatformInfo,
    locator: &dyn DependencyLocator,
) -> Result<BuildPlan> {
    info!(
        "Planning {} {} for {}",
        recipe.package.name,
        recipe.full_version(),
        platform
    );

    let Validated {
        config,
        dependencies,
        warnings,
        ..
    } = validate(recipe, overrides, platform)?;

    let arguments = arguments::synthesize(recipe, &config, &dependencies, platform, locator)?;

    let resources = recipe
        .resources
        .iter()
        .filter(|r| r.when.as_ref().is_none_or(|w| w.eval(&config, platform)))
        .cloned()
        .collect::<Vec<_>>();

    info!(
        "Plan: {} options enabled, {} dependencies, {} arguments, {} resources",
        config.enabled().len(),
        dependencies.len(),
        arguments.len(),
        resources.len()
    );

    Ok(BuildPlan {
        package: recipe.package.name.clone(),
        version: recipe.full_version(),
        platform: platform.to_string(),
        config,
        dependencies,
        arguments,
        resources,
        warnings,
    })
}
